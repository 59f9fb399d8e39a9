use std::process::ExitCode;

use promframe::exposition::{serve, ExpositionError, ServeConfig, ServerState};
use prometheus::Registry;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ExpositionError> {
    let config = ServeConfig::from_env()?;
    let state = ServerState::new(Registry::new())?;
    let listener = TcpListener::bind(config.listen).await?;
    serve(listener, state).await
}
