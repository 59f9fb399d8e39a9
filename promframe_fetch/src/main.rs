use std::process::ExitCode;

use promframe::exposition::{fetch, FetchConfig, Fetched};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    let config = match FetchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match fetch(&config).await {
        Ok(Fetched::Families(families)) => {
            for family in families {
                println!("{family}");
            }
            ExitCode::SUCCESS
        }
        Ok(Fetched::Text(text)) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("could not fetch {}: {e}", config.endpoint);
            ExitCode::FAILURE
        }
    }
}
