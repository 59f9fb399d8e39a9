use std::{
    collections::HashSet,
    fmt::{Display, Write},
};

use crate::{proto::client as proto, DecodeError};

/// The declared kind of every metric in a family.
#[derive(Debug, Eq, Hash, PartialEq, Clone, Copy, Default)]
pub enum MetricType {
    /// A monotonically increasing value
    #[default]
    Counter,
    /// A value that goes up and down
    Gauge,
    /// Client-side quantiles plus a sample count and sum
    Summary,
    /// A single value of unknown meaning
    Untyped,
    /// Cumulative buckets plus a sample count and sum
    Histogram,
    /// A histogram whose buckets may go down as well as up
    GaugeHistogram,
}

impl MetricType {
    /// The schema's name for this type, e.g. `COUNTER`.
    pub fn as_str(&self) -> &'static str {
        proto::MetricType::from(*self).as_str_name()
    }
}

impl Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<proto::MetricType> for MetricType {
    fn from(value: proto::MetricType) -> Self {
        match value {
            proto::MetricType::Counter => Self::Counter,
            proto::MetricType::Gauge => Self::Gauge,
            proto::MetricType::Summary => Self::Summary,
            proto::MetricType::Untyped => Self::Untyped,
            proto::MetricType::Histogram => Self::Histogram,
            proto::MetricType::GaugeHistogram => Self::GaugeHistogram,
        }
    }
}

impl From<MetricType> for proto::MetricType {
    fn from(value: MetricType) -> Self {
        match value {
            MetricType::Counter => Self::Counter,
            MetricType::Gauge => Self::Gauge,
            MetricType::Summary => Self::Summary,
            MetricType::Untyped => Self::Untyped,
            MetricType::Histogram => Self::Histogram,
            MetricType::GaugeHistogram => Self::GaugeHistogram,
        }
    }
}

/// One label name and value on a metric.
#[derive(Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Clone)]
pub struct LabelPair {
    /// Unique within one metric
    pub name: String,
    /// May be empty
    pub value: String,
}

impl LabelPair {
    /// Make a label pair
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A φ-quantile estimate from a summary.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Quantile {
    /// φ in [0, 1]
    pub quantile: f64,
    /// The estimated value at φ
    pub value: f64,
}

/// A cumulative histogram bucket.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Bucket {
    /// Inclusive upper bound of the bucket
    pub upper_bound: f64,
    /// Observations less than or equal to `upper_bound`
    pub cumulative_count: u64,
}

/// Summary observations.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Summary {
    /// Number of observations
    pub sample_count: u64,
    /// Sum of all observations
    pub sample_sum: f64,
    /// Quantiles in the order they were sent
    pub quantiles: Vec<Quantile>,
}

/// Histogram observations.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Histogram {
    /// Number of observations
    pub sample_count: u64,
    /// Sum of all observations
    pub sample_sum: f64,
    /// Buckets, conventionally in increasing order of upper bound
    pub buckets: Vec<Bucket>,
}

/// The value carried by a metric. Exactly one variant is active.
#[derive(Debug, PartialEq, Clone)]
pub enum MetricValue {
    /// Counter value
    Counter(f64),
    /// Gauge value
    Gauge(f64),
    /// Untyped value
    Untyped(f64),
    /// Summary value
    Summary(Summary),
    /// Histogram or gauge histogram value
    Histogram(Histogram),
    /// The metric arrived without any value field.
    Unset,
}

/// One labeled observation within a family.
#[derive(Debug, PartialEq, Clone)]
pub struct Metric {
    /// Label pairs in wire order
    pub labels: Vec<LabelPair>,
    /// The value matching the family's type
    pub value: MetricValue,
    /// Exposition timestamp, when the producer set one
    pub timestamp_ms: Option<i64>,
}

impl Metric {
    /// Look up a label value by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }
}

/// A named, typed group of metrics.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct MetricFamily {
    /// Family name, e.g. `http_requests_total`
    pub name: String,
    /// Help text, possibly empty
    pub help: String,
    /// The type shared by every metric in the family
    pub metric_type: MetricType,
    /// Unit, when the producer declared one
    pub unit: Option<String>,
    /// Metrics in wire order
    pub metrics: Vec<Metric>,
}

impl TryFrom<proto::MetricFamily> for MetricFamily {
    type Error = DecodeError;

    fn try_from(family: proto::MetricFamily) -> Result<Self, Self::Error> {
        let metric_type = match family.r#type {
            None => MetricType::default(),
            Some(raw) => proto::MetricType::try_from(raw)
                .map_err(|_| DecodeError::invalid(format!("unknown metric type {raw}")))?
                .into(),
        };
        let metrics = family
            .metric
            .into_iter()
            .map(|metric| as_metric(metric_type, metric))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            name: family.name.unwrap_or_default(),
            help: family.help.unwrap_or_default(),
            metric_type,
            unit: family.unit,
            metrics,
        })
    }
}

fn as_metric(metric_type: MetricType, metric: proto::Metric) -> Result<Metric, DecodeError> {
    let proto::Metric {
        label,
        gauge,
        counter,
        summary,
        untyped,
        histogram,
        timestamp_ms,
    } = metric;

    let mut seen = HashSet::with_capacity(label.len());
    for pair in &label {
        if !seen.insert(pair.name()) {
            return Err(DecodeError::invalid(format!(
                "label {} appears more than once on one metric",
                pair.name()
            )));
        }
    }

    let populated = [
        ("counter", counter.is_some()),
        ("gauge", gauge.is_some()),
        ("untyped", untyped.is_some()),
        ("summary", summary.is_some()),
        ("histogram", histogram.is_some()),
    ]
    .into_iter()
    .find_map(|(name, present)| present.then_some(name));

    let matching = match metric_type {
        MetricType::Counter => counter.map(|c| MetricValue::Counter(c.value())),
        MetricType::Gauge => gauge.map(|g| MetricValue::Gauge(g.value())),
        MetricType::Untyped => untyped.map(|u| MetricValue::Untyped(u.value())),
        MetricType::Summary => summary.map(|s| MetricValue::Summary(s.into())),
        MetricType::Histogram | MetricType::GaugeHistogram => {
            histogram.map(|h| MetricValue::Histogram(h.into()))
        }
    };
    // Extra value fields next to the matching one are ignored.
    let value = match (matching, populated) {
        (Some(value), _) => value,
        (None, Some(name)) => {
            return Err(DecodeError::invalid(format!(
                "{metric_type} family carries a {name} value"
            )))
        }
        (None, None) => MetricValue::Unset,
    };

    Ok(Metric {
        labels: label
            .into_iter()
            .map(|pair| LabelPair {
                name: pair.name.unwrap_or_default(),
                value: pair.value.unwrap_or_default(),
            })
            .collect(),
        value,
        timestamp_ms,
    })
}

impl From<proto::Summary> for Summary {
    fn from(summary: proto::Summary) -> Self {
        Self {
            sample_count: summary.sample_count(),
            sample_sum: summary.sample_sum(),
            quantiles: summary
                .quantile
                .iter()
                .map(|q| Quantile {
                    quantile: q.quantile(),
                    value: q.value(),
                })
                .collect(),
        }
    }
}

impl From<proto::Histogram> for Histogram {
    fn from(histogram: proto::Histogram) -> Self {
        Self {
            sample_count: histogram.sample_count(),
            sample_sum: histogram.sample_sum(),
            buckets: histogram
                .bucket
                .iter()
                .map(|b| Bucket {
                    upper_bound: b.upper_bound(),
                    cumulative_count: b.cumulative_count(),
                })
                .collect(),
        }
    }
}

impl From<MetricFamily> for proto::MetricFamily {
    fn from(family: MetricFamily) -> Self {
        Self {
            name: Some(family.name),
            help: Some(family.help),
            r#type: Some(proto::MetricType::from(family.metric_type) as i32),
            metric: family.metrics.into_iter().map(Into::into).collect(),
            unit: family.unit,
        }
    }
}

impl From<Metric> for proto::Metric {
    fn from(metric: Metric) -> Self {
        let mut wire = proto::Metric {
            label: metric
                .labels
                .into_iter()
                .map(|pair| proto::LabelPair {
                    name: Some(pair.name),
                    value: Some(pair.value),
                })
                .collect(),
            timestamp_ms: metric.timestamp_ms,
            ..Default::default()
        };
        match metric.value {
            MetricValue::Counter(value) => {
                wire.counter = Some(proto::Counter { value: Some(value) })
            }
            MetricValue::Gauge(value) => wire.gauge = Some(proto::Gauge { value: Some(value) }),
            MetricValue::Untyped(value) => {
                wire.untyped = Some(proto::Untyped { value: Some(value) })
            }
            MetricValue::Summary(summary) => {
                wire.summary = Some(proto::Summary {
                    sample_count: Some(summary.sample_count),
                    sample_sum: Some(summary.sample_sum),
                    quantile: summary
                        .quantiles
                        .into_iter()
                        .map(|q| proto::Quantile {
                            quantile: Some(q.quantile),
                            value: Some(q.value),
                        })
                        .collect(),
                })
            }
            MetricValue::Histogram(histogram) => {
                wire.histogram = Some(proto::Histogram {
                    sample_count: Some(histogram.sample_count),
                    sample_sum: Some(histogram.sample_sum),
                    bucket: histogram
                        .buckets
                        .into_iter()
                        .map(|b| proto::Bucket {
                            cumulative_count: Some(b.cumulative_count),
                            upper_bound: Some(b.upper_bound),
                        })
                        .collect(),
                })
            }
            MetricValue::Unset => (),
        }
        wire
    }
}

/// The scrape report: one block per family, one entry per metric.
impl Display for MetricFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Metric: {}", self.name)?;
        writeln!(f, "Help: {}", self.help)?;
        writeln!(f, "Type: {}", self.metric_type)?;
        for metric in &self.metrics {
            write!(f, "{metric}")?;
        }
        Ok(())
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("  Labels: {")?;
        for (i, label) in self.labels.iter().enumerate() {
            if 0 < i {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", label.name, Quoted(&label.value))?;
        }
        f.write_str("}\n")?;
        match &self.value {
            MetricValue::Gauge(value) => writeln!(f, "  Gauge Value: {}", Fixed(*value, 6)),
            MetricValue::Counter(value) => writeln!(f, "  Counter Value: {}", Fixed(*value, 6)),
            MetricValue::Untyped(value) => writeln!(f, "  Untyped Value: {}", Fixed(*value, 6)),
            MetricValue::Summary(summary) => {
                writeln!(f, "  Summary:")?;
                writeln!(f, "    Sample Count: {}", summary.sample_count)?;
                writeln!(f, "    Sample Sum: {}", Fixed(summary.sample_sum, 6))?;
                for q in &summary.quantiles {
                    writeln!(
                        f,
                        "    Quantile {}: {}",
                        Fixed(q.quantile, 2),
                        Fixed(q.value, 6)
                    )?;
                }
                Ok(())
            }
            MetricValue::Histogram(histogram) => {
                writeln!(f, "  Histogram:")?;
                writeln!(f, "    Sample Count: {}", histogram.sample_count)?;
                writeln!(f, "    Sample Sum: {}", Fixed(histogram.sample_sum, 6))?;
                for b in &histogram.buckets {
                    writeln!(
                        f,
                        "    Bucket [{}]: {}",
                        Fixed(b.upper_bound, 6),
                        b.cumulative_count
                    )?;
                }
                Ok(())
            }
            MetricValue::Unset => writeln!(f, "  Unknown metric type"),
        }
    }
}

/// Fixed point with `precision` decimals; non-finite values are spelled
/// `+Inf`, `-Inf` and `NaN`.
struct Fixed(f64, usize);

impl Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Fixed(value, precision) = *self;
        if value.is_nan() {
            f.write_str("NaN")
        } else if value == f64::INFINITY {
            f.write_str("+Inf")
        } else if value == f64::NEG_INFINITY {
            f.write_str("-Inf")
        } else {
            write!(f, "{value:.precision$}")
        }
    }
}

/// A double quoted string. Printable text, non-ASCII included, is kept as is;
/// control characters are escaped.
struct Quoted<'a>(&'a str);

impl Display for Quoted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\x07' => f.write_str("\\a")?,
                '\x08' => f.write_str("\\b")?,
                '\x0c' => f.write_str("\\f")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                '\x0b' => f.write_str("\\v")?,
                c if c.is_ascii_control() => write!(f, "\\x{:02x}", c as u32)?,
                c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}

#[cfg(test)]
mod test {
    use crate::{proto::client as proto, DecodeError};

    use super::{Bucket, Histogram, LabelPair, Metric, MetricFamily, MetricType, MetricValue};

    fn counter_metric(labels: &[(&str, &str)], value: f64) -> proto::Metric {
        proto::Metric {
            label: labels
                .iter()
                .map(|(name, value)| proto::LabelPair {
                    name: Some(name.to_string()),
                    value: Some(value.to_string()),
                })
                .collect(),
            counter: Some(proto::Counter { value: Some(value) }),
            ..Default::default()
        }
    }

    #[test_log::test]
    fn counter_family() {
        let family = MetricFamily::try_from(proto::MetricFamily {
            name: Some("http_requests_total".to_string()),
            help: Some("Total number of HTTP requests".to_string()),
            r#type: Some(proto::MetricType::Counter as i32),
            metric: vec![counter_metric(&[("method", "GET"), ("endpoint", "/")], 3.0)],
            unit: None,
        })
        .expect("valid family");

        assert_eq!("http_requests_total", family.name);
        assert_eq!(MetricType::Counter, family.metric_type);
        assert_eq!(1, family.metrics.len());
        assert_eq!(MetricValue::Counter(3.0), family.metrics[0].value);
        assert_eq!(Some("GET"), family.metrics[0].label("method"));
        assert_eq!(None, family.metrics[0].label("status"));
    }

    #[test_log::test]
    fn empty_record_is_a_default_family() {
        let family = MetricFamily::try_from(proto::MetricFamily::default()).expect("valid");
        assert_eq!(MetricFamily::default(), family);
    }

    #[test_log::test]
    fn gauge_histogram_reads_the_histogram_field() {
        let family = MetricFamily::try_from(proto::MetricFamily {
            name: Some("queue_depth".to_string()),
            r#type: Some(proto::MetricType::GaugeHistogram as i32),
            metric: vec![proto::Metric {
                histogram: Some(proto::Histogram {
                    sample_count: Some(2),
                    sample_sum: Some(3.5),
                    bucket: vec![proto::Bucket {
                        cumulative_count: Some(2),
                        upper_bound: Some(5.0),
                    }],
                }),
                ..Default::default()
            }],
            ..Default::default()
        })
        .expect("valid family");
        assert_eq!(
            MetricValue::Histogram(Histogram {
                sample_count: 2,
                sample_sum: 3.5,
                buckets: vec![Bucket {
                    upper_bound: 5.0,
                    cumulative_count: 2
                }],
            }),
            family.metrics[0].value
        );
    }

    #[test_log::test]
    fn metric_without_value_is_unset() {
        let family = MetricFamily::try_from(proto::MetricFamily {
            name: Some("nothing".to_string()),
            r#type: Some(proto::MetricType::Gauge as i32),
            metric: vec![proto::Metric::default()],
            ..Default::default()
        })
        .expect("valid family");
        assert_eq!(MetricValue::Unset, family.metrics[0].value);
    }

    #[test_log::test]
    fn mismatched_value_is_rejected() {
        let result = MetricFamily::try_from(proto::MetricFamily {
            name: Some("confused".to_string()),
            r#type: Some(proto::MetricType::Gauge as i32),
            metric: vec![counter_metric(&[], 1.0)],
            ..Default::default()
        });
        match result {
            Err(DecodeError::InvalidFamily { reason, .. }) => {
                assert_eq!("GAUGE family carries a counter value", reason)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test_log::test]
    fn duplicate_labels_are_rejected() {
        let result = MetricFamily::try_from(proto::MetricFamily {
            name: Some("twice".to_string()),
            metric: vec![counter_metric(&[("a", "1"), ("a", "2")], 1.0)],
            ..Default::default()
        });
        assert!(matches!(result, Err(DecodeError::InvalidFamily { .. })));
    }

    #[test_log::test]
    fn unknown_type_is_rejected() {
        let result = MetricFamily::try_from(proto::MetricFamily {
            name: Some("mystery".to_string()),
            r#type: Some(42),
            ..Default::default()
        });
        match result {
            Err(DecodeError::InvalidFamily { reason, .. }) => {
                assert_eq!("unknown metric type 42", reason)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test_log::test]
    fn model_survives_the_wire_representation() {
        let family = MetricFamily {
            name: "rpc_latency_seconds".to_string(),
            help: "RPC latency".to_string(),
            metric_type: MetricType::Summary,
            unit: Some("seconds".to_string()),
            metrics: vec![Metric {
                labels: vec![LabelPair::new("service", "users")],
                value: MetricValue::Summary(super::Summary {
                    sample_count: 10,
                    sample_sum: 1.25,
                    quantiles: vec![super::Quantile {
                        quantile: 0.99,
                        value: 0.3,
                    }],
                }),
                timestamp_ms: Some(1_700_000_000_000),
            }],
        };
        let wire = proto::MetricFamily::from(family.clone());
        assert_eq!(family, MetricFamily::try_from(wire).expect("valid"));
    }

    #[test_log::test]
    fn report_format() {
        let family = MetricFamily {
            name: "http_requests_total".to_string(),
            help: "Total number of HTTP requests".to_string(),
            metric_type: MetricType::Counter,
            unit: None,
            metrics: vec![
                Metric {
                    labels: vec![
                        LabelPair::new("method", "GET"),
                        LabelPair::new("endpoint", "/"),
                    ],
                    value: MetricValue::Counter(2.0),
                    timestamp_ms: None,
                },
                Metric {
                    labels: vec![],
                    value: MetricValue::Unset,
                    timestamp_ms: None,
                },
            ],
        };
        assert_eq!(
            "Metric: http_requests_total\n\
             Help: Total number of HTTP requests\n\
             Type: COUNTER\n  \
             Labels: {method=\"GET\", endpoint=\"/\"}\n  \
             Counter Value: 2.000000\n  \
             Labels: {}\n  \
             Unknown metric type\n",
            family.to_string()
        );
    }

    #[test_log::test]
    fn histogram_report_format() {
        let metric = Metric {
            labels: vec![],
            value: MetricValue::Histogram(Histogram {
                sample_count: 3,
                sample_sum: 0.5,
                buckets: vec![Bucket {
                    upper_bound: 0.25,
                    cumulative_count: 2,
                }],
            }),
            timestamp_ms: None,
        };
        assert_eq!(
            "  Labels: {}\n  \
             Histogram:\n    \
             Sample Count: 3\n    \
             Sample Sum: 0.500000\n    \
             Bucket [0.250000]: 2\n",
            metric.to_string()
        );
    }

    #[test_log::test]
    fn report_spells_out_non_finite_values() {
        let metric = Metric {
            labels: vec![],
            value: MetricValue::Histogram(Histogram {
                sample_count: 1,
                sample_sum: f64::NAN,
                buckets: vec![Bucket {
                    upper_bound: f64::INFINITY,
                    cumulative_count: 1,
                }],
            }),
            timestamp_ms: None,
        };
        assert_eq!(
            "  Labels: {}\n  \
             Histogram:\n    \
             Sample Count: 1\n    \
             Sample Sum: NaN\n    \
             Bucket [+Inf]: 1\n",
            metric.to_string()
        );

        let metric = Metric {
            labels: vec![],
            value: MetricValue::Gauge(f64::NEG_INFINITY),
            timestamp_ms: None,
        };
        assert_eq!("  Labels: {}\n  Gauge Value: -Inf\n", metric.to_string());
    }

    #[test_log::test]
    fn report_quotes_label_values() {
        let metric = Metric {
            labels: vec![
                LabelPair::new("city", "Zürich"),
                LabelPair::new("note", "tab\there \"quoted\" \\ bell\x07 nul\0"),
            ],
            value: MetricValue::Unset,
            timestamp_ms: None,
        };
        assert_eq!(
            "  Labels: {city=\"Zürich\", note=\"tab\\there \\\"quoted\\\" \\\\ bell\\a nul\\x00\"}\n  \
             Unknown metric type\n",
            metric.to_string()
        );
    }
}
