//! Process-wide observability setup: tracing subscriber, metric
//! descriptions and the panic hook.

pub mod doris_metrics;
pub mod logging;
pub mod panic;

#[derive(Clone, Debug, Default)]
pub struct O11yConfig {
    pub logging: logging::Config,
    pub install_panic_hook: bool,
}

/// Initialize everything in `cfg`. Safe to call more than once.
pub fn init_all(cfg: &O11yConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&cfg.logging)?;
    doris_metrics::describe_metrics();
    if cfg.install_panic_hook {
        panic::install_hook();
    }
    Ok(())
}
