//! Row delivery side of the pipeline.
//!
//! Rows produced by the converter are collected per table in a
//! [`RecordBuffer`] and handed to a [`RowSink`](doris_core::RowSink) as one
//! payload, rows joined by the connector's line separator.
//!
//! - **`RecordBuffer`**: row and byte accounting for one table
//! - **`WriterSink`**: writes payloads to any async writer; `StdoutSink`
//!   is the stdout flavour used for dry runs

pub mod buffer;
pub mod writer;

pub use buffer::RecordBuffer;
pub use writer::{StdoutSink, WriterSink};
