use std::sync::Arc;

use anyhow::{Context, Result, bail};
use catalog::build_mem_catalog;
use clap::Parser;
use converter::RecordService;
use doris_config::{CatalogSeed, ConnectorCfg, load_catalog_seed, load_from_path};
use runner::dry_run::{DEFAULT_FLUSH_BYTES, DryRun};
use runner::version;
use sinks::StdoutSink;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

/// Run connector records through the row transformer against an in-memory
/// catalog and print the resulting load payloads.
#[derive(Parser, Debug)]
#[command(name = "doris-connect", version = version::VERSION)]
struct Args {
    /// Connector config (YAML)
    #[arg(short, long)]
    config: String,
    /// JSON-lines records, `-` for stdin
    #[arg(short, long)]
    input: String,
    /// Catalog seed (YAML) with the existing destination tables
    #[arg(long)]
    catalog: Option<String>,
    #[arg(long, default_value_t = DEFAULT_FLUSH_BYTES)]
    flush_bytes: usize,
    /// JSON log lines on stderr
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let o11y_cfg = o11y::O11yConfig {
        logging: o11y::logging::Config {
            level: None,
            json: args.json_logs,
            with_targets: false,
            stderr: true,
        },
        install_panic_hook: true,
    };
    let _ = o11y::init_all(&o11y_cfg);

    let cfg = load_connector_cfg(&args.config)?;
    let seed = match &args.catalog {
        Some(path) => load_catalog_seed(path)
            .with_context(|| format!("load catalog seed {path}"))?,
        None => {
            warn!("no catalog seed given, every table will be reported missing");
            CatalogSeed::default()
        }
    };
    let catalog = Arc::new(build_mem_catalog(&seed, &cfg.database));
    info!(tables = seed.tables.len(), database = %cfg.database, "catalog seeded");

    let service = RecordService::new(cfg.clone(), catalog.clone(), catalog.clone());
    let dry_run = DryRun::new(cfg.clone(), service).with_flush_bytes(args.flush_bytes);
    let sink = StdoutSink::stdout("stdout");

    let report = if args.input == "-" {
        dry_run.run(BufReader::new(tokio::io::stdin()), &sink).await?
    } else {
        let file = File::open(&args.input)
            .await
            .with_context(|| format!("open input {}", args.input))?;
        dry_run.run(BufReader::new(file), &sink).await?
    };

    for ddl in catalog.executed_ddl().await {
        info!(%ddl, "schema change executed");
    }

    if report.failed() > 0 {
        bail!(
            "{} of {} records failed: {:?}",
            report.failed(),
            report.records,
            report.failures
        );
    }
    Ok(())
}

fn load_connector_cfg(path: &str) -> Result<Arc<ConnectorCfg>> {
    let cfg = load_from_path(path).with_context(|| format!("load connector config {path}"))?;
    cfg.validate().context("validate connector config")?;
    info!(connector = %cfg.name, mode = cfg.converter_mode.as_str(), "connector config loaded");
    debug!(config = ?cfg, "connector config");
    Ok(Arc::new(cfg))
}
