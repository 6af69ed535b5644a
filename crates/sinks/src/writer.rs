use async_trait::async_trait;
use doris_core::{RowSink, SinkResult};
use metrics::counter;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tracing::debug;

/// Writes each payload to an async writer, preceded by a `-- table` line.
pub struct WriterSink<W> {
    id: String,
    out: Mutex<W>,
}

pub type StdoutSink = WriterSink<Stdout>;

impl StdoutSink {
    pub fn stdout(id: impl Into<String>) -> Self {
        Self::new(id, tokio::io::stdout())
    }
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(id: impl Into<String>, out: W) -> Self {
        Self {
            id: id.into(),
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> RowSink for WriterSink<W>
where
    W: AsyncWrite + Send + Unpin,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn write(&self, table: &str, payload: &str) -> SinkResult<()> {
        let mut out = self.out.lock().await;
        out.write_all(format!("-- {table}\n").as_bytes()).await?;
        out.write_all(payload.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;

        counter!("doris_sink_payloads_total", "sink" => self.id.clone()).increment(1);
        debug!(sink = %self.id, table = %table, bytes = payload.len(), "payload written");
        Ok(())
    }
}
