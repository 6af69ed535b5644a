//! Drives records through the transformer and delivers the rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use converter::RecordService;
use doris_config::ConnectorCfg;
use doris_core::{RowSink, SinkRecord};
use metrics::counter;
use sinks::RecordBuffer;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info};

use crate::input::InputRecord;

/// Default flush threshold per table buffer.
pub const DEFAULT_FLUSH_BYTES: usize = 1 << 20;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Non-blank input lines.
    pub records: usize,
    /// Payloads buffered for delivery.
    pub rows: usize,
    /// Tombstones.
    pub skipped: usize,
    /// Failed records by error kind.
    pub failures: BTreeMap<&'static str, usize>,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }
}

pub struct DryRun {
    cfg: Arc<ConnectorCfg>,
    service: RecordService,
    flush_bytes: usize,
}

impl DryRun {
    pub fn new(cfg: Arc<ConnectorCfg>, service: RecordService) -> Self {
        Self {
            cfg,
            service,
            flush_bytes: DEFAULT_FLUSH_BYTES,
        }
    }

    pub fn with_flush_bytes(mut self, flush_bytes: usize) -> Self {
        self.flush_bytes = flush_bytes.max(1);
        self
    }

    pub fn service(&self) -> &RecordService {
        &self.service
    }

    /// Transform every line of `reader`, buffering rows per table.
    ///
    /// Record failures are logged and counted; only input and sink I/O
    /// errors abort the run.
    pub async fn run<R>(&self, reader: R, sink: &dyn RowSink) -> Result<RunReport>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut buffers: BTreeMap<String, RecordBuffer> = BTreeMap::new();
        let mut report = RunReport::default();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await.context("read input")? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            report.records += 1;

            let record = match InputRecord::parse(&line).and_then(InputRecord::into_sink_record) {
                Ok(record) => record,
                Err(e) => {
                    error!(line = line_no, error = %format!("{e:#}"), "invalid input record");
                    counter!("doris_transform_errors_total", "kind" => "input").increment(1);
                    *report.failures.entry("input").or_default() += 1;
                    continue;
                }
            };

            match self.service.transform(&record).await {
                Ok(Some(payload)) => {
                    report.rows += 1;
                    let table = self.table_for(&record);
                    let buffer = buffers
                        .entry(table.clone())
                        .or_insert_with(|| RecordBuffer::new(table, self.cfg.line_separator.as_str()));
                    buffer.push(payload);
                    if buffer.size_bytes() >= self.flush_bytes {
                        flush(sink, buffer).await?;
                    }
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    error!(
                        line = line_no,
                        topic = %record.topic,
                        offset = record.offset,
                        kind = e.kind(),
                        error = %e,
                        "record transformation failed"
                    );
                    *report.failures.entry(e.kind()).or_default() += 1;
                }
            }
        }

        for buffer in buffers.values_mut() {
            flush(sink, buffer).await?;
        }

        info!(
            records = report.records,
            rows = report.rows,
            skipped = report.skipped,
            failed = report.failed(),
            "input drained"
        );
        Ok(report)
    }

    /// Rows whose topic has no table name are grouped under the topic.
    fn table_for(&self, record: &SinkRecord) -> String {
        self.cfg
            .table_for_topic(&record.topic)
            .unwrap_or_else(|_| record.topic.clone())
    }
}

async fn flush(sink: &dyn RowSink, buffer: &mut RecordBuffer) -> Result<()> {
    let rows = buffer.rows();
    let Some(payload) = buffer.drain() else {
        return Ok(());
    };
    sink.write(buffer.table(), &payload)
        .await
        .with_context(|| format!("write {} rows for table {} to sink {}", rows, buffer.table(), sink.id()))?;
    debug!(table = %buffer.table(), rows, bytes = payload.len(), "buffer flushed");
    Ok(())
}
