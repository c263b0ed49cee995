use serde::Deserialize;
use tracing::Subscriber;
use tracing_subscriber::{registry::LookupSpan, Layer};

/// A boxed fmt layer writing to stdout in the configured style
pub type LogOutputLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Basic tracing configuration
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Pretty print
    #[default]
    Pretty,
    /// JSON
    Json,
    /// Compact
    Compact,
    /// Default style
    #[serde(other)]
    Full,
}

impl Style {
    /// Build the stdout layer for this style
    pub fn layer<S>(self) -> LogOutputLayer<S>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = tracing_subscriber::fmt::layer();
        match self {
            Style::Pretty => layer.pretty().boxed(),
            Style::Json => layer.json().boxed(),
            Style::Compact => layer.compact().boxed(),
            Style::Full => layer.boxed(),
        }
    }
}
