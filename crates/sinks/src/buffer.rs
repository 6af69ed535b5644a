/// Rows waiting to be loaded into one table.
#[derive(Debug, Clone)]
pub struct RecordBuffer {
    table: String,
    separator: String,
    rows: Vec<String>,
    bytes: usize,
}

impl RecordBuffer {
    pub fn new(table: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            separator: separator.into(),
            rows: Vec::new(),
            bytes: 0,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Append one row payload. A payload may itself hold several rows
    /// already joined by the separator.
    pub fn push(&mut self, row: String) {
        if !self.rows.is_empty() {
            self.bytes += self.separator.len();
        }
        self.bytes += row.len();
        self.rows.push(row);
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Size of the payload `drain` would return.
    pub fn size_bytes(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Take everything buffered as one payload; `None` when empty.
    pub fn drain(&mut self) -> Option<String> {
        if self.rows.is_empty() {
            return None;
        }
        let payload = self.rows.join(&self.separator);
        self.rows.clear();
        self.bytes = 0;
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tracks_rows_and_bytes() {
        let mut buf = RecordBuffer::new("orders", "\n");
        assert!(buf.is_empty());
        assert_eq!(buf.size_bytes(), 0);

        buf.push(r#"{"a":"1"}"#.to_string());
        buf.push(r#"{"a":"22"}"#.to_string());
        assert_eq!(buf.rows(), 2);
        assert_eq!(buf.size_bytes(), 9 + 1 + 10);
    }

    #[test]
    fn drain_joins_and_resets() {
        let mut buf = RecordBuffer::new("orders", "\u{2}");
        buf.push("x".into());
        buf.push("y".into());
        buf.push("z".into());

        let payload = buf.drain().unwrap();
        assert_eq!(payload, "x\u{2}y\u{2}z");
        assert_eq!(payload.len(), 5);
        assert!(buf.is_empty());
        assert_eq!(buf.size_bytes(), 0);
        assert_eq!(buf.drain(), None);
        assert_eq!(buf.table(), "orders");
    }
}
