use std::sync::Once;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt,
};

static INIT: Once = Once::new();

#[derive(Clone, Debug)]
pub struct Config {
    /// Either a simple level like "info" or a full EnvFilter string
    /// e.g. "info,converter=debug,catalog=warn".
    pub level: Option<String>,
    /// Emit logs as JSON lines when true; otherwise pretty text.
    pub json: bool,
    /// Include the target module in each line.
    pub with_targets: bool,
    /// Write to stderr so stdout stays free for row payloads.
    pub stderr: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Some("info".to_owned()),
            json: false,
            with_targets: false,
            stderr: true,
        }
    }
}

/// Install the global subscriber. Later calls are no-ops; an error is
/// returned only when another subscriber was already set elsewhere.
pub fn init(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut result = Ok(());
    INIT.call_once(|| {
        let _ = LogTracer::init();

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| {
                EnvFilter::try_new(cfg.level.as_deref().unwrap_or("info"))
            })
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = match (cfg.json, cfg.stderr) {
            (true, true) => fmt::layer()
                .with_target(cfg.with_targets)
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr)
                .boxed(),
            (true, false) => fmt::layer()
                .with_target(cfg.with_targets)
                .json()
                .with_current_span(true)
                .boxed(),
            (false, true) => fmt::layer()
                .with_target(cfg.with_targets)
                .with_writer(std::io::stderr)
                .boxed(),
            (false, false) => fmt::layer()
                .with_target(cfg.with_targets)
                .with_ansi(true)
                .boxed(),
        };

        let subscriber = Registry::default().with(filter).with(fmt_layer);
        result = tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| e.to_string());
    });
    result.map_err(Into::into)
}
