use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;
use tracing::debug;

use crate::{
    ImportError, Record, Result,
    collection::{RawRecordStream, RawRecords},
    connector::{
        AsyncConnector, AsyncConnectorSupply, Connector, ConnectorInfo, ConnectorOptions, ConnectorSupply, DataSource, RecoverableError,
    },
    provider::{AsyncProvider, AsyncProviderResource, Provider, ProviderResource},
};

const BASE_DIR_OPTION: &str = "base_dir";

/// Reads whole files from disk. Relative locations resolve against the `base_dir` option.
#[derive(Debug, Clone, Default)]
pub struct FileConnector {
    options: ConnectorOptions,
}

impl FileConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        self.set_base_dir(base_dir);
        self
    }

    pub fn set_base_dir(&mut self, base_dir: impl AsRef<Path>) {
        self.options
            .set(BASE_DIR_OPTION, base_dir.as_ref().to_string_lossy().into_owned());
    }

    pub fn options_mut(&mut self) -> &mut ConnectorOptions {
        &mut self.options
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        match self.options.get_str(BASE_DIR_OPTION) {
            Some(base_dir) if path.is_relative() => Path::new(base_dir).join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ConnectorInfo for FileConnector {
    fn options(&self) -> Option<&ConnectorOptions> {
        Some(&self.options)
    }
}

impl Connector for FileConnector {
    fn fetch(&self, source: &DataSource) -> anyhow::Result<Value> {
        let path = self.resolve(source.location());
        debug!(path = %path.display(), "reading file");
        let contents = std::fs::read_to_string(&path).map_err(|error| read_error(error, &path))?;
        Ok(Value::String(contents))
    }
}

#[async_trait]
impl AsyncConnector for FileConnector {
    async fn fetch_async(&self, source: &DataSource) -> anyhow::Result<Value> {
        let path = self.resolve(source.location());
        debug!(path = %path.display(), "reading file asynchronously");
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| read_error(error, &path))?;
        Ok(Value::String(contents))
    }
}

/// Transient I/O failures are marked recoverable; a missing or unreadable file is final.
fn read_error(error: io::Error, path: &Path) -> anyhow::Error {
    let transient = RecoverableError::is_transient_io(error.kind());
    let error = anyhow::Error::new(error).context(format!("read {}", path.display()));
    if transient { RecoverableError::wrap(error) } else { error }
}

/// Provider for newline-delimited JSON files.
#[derive(Debug, Clone, Default)]
pub struct JsonLinesProvider {
    connector: FileConnector,
}

impl JsonLinesProvider {
    pub const ID: &'static str = "jsonl";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        Self {
            connector: FileConnector::new().with_base_dir(base_dir),
        }
    }

    pub fn connector_mut(&mut self) -> &mut FileConnector {
        &mut self.connector
    }
}

impl Provider for JsonLinesProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn connector(&self) -> ConnectorSupply<'_> {
        ConnectorSupply::Isolated(&self.connector)
    }

    fn as_async_provider(&self) -> Option<&dyn AsyncProvider> {
        Some(self)
    }
}

impl AsyncProvider for JsonLinesProvider {
    fn async_connector(&self) -> AsyncConnectorSupply<'_> {
        AsyncConnectorSupply::Isolated(&self.connector)
    }
}

/// One JSON-lines file. Every non-blank line must hold a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLinesResource {
    path: String,
}

impl JsonLinesResource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn source(&self) -> DataSource {
        DataSource::new(self.path.clone())
    }

    fn lines(&self, payload: Value) -> anyhow::Result<JsonLines> {
        let Value::String(contents) = payload else {
            bail!("connector returned non-text payload for {}", self.path);
        };
        Ok(JsonLines::new(self.path.clone(), contents))
    }
}

/// Owning iterator over the records of a JSON-lines payload, parsing one line per `next()`.
struct JsonLines {
    path: String,
    contents: String,
    offset: usize,
    line_number: usize,
}

impl JsonLines {
    fn new(path: String, contents: String) -> Self {
        Self {
            path,
            contents,
            offset: 0,
            line_number: 0,
        }
    }

    /// Records left to yield: one per non-blank line, counted without parsing.
    fn remaining(&self) -> usize {
        self.contents[self.offset..]
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count()
    }
}

impl Iterator for JsonLines {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.contents.len() {
            let rest = &self.contents[self.offset..];
            let (line, consumed) = match rest.find('\n') {
                Some(end) => (&rest[..end], end + 1),
                None => (rest, rest.len()),
            };
            self.offset += consumed;
            self.line_number += 1;
            if !line.trim().is_empty() {
                return Some(parse_line(&self.path, self.line_number, line));
            }
        }
        None
    }
}

fn parse_line(path: &str, line_number: usize, line: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(ImportError::fetch(anyhow!(
            "{path}:{line_number}: expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(error) => Err(ImportError::fetch(anyhow!(error).context(format!("{path}:{line_number}")))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl ProviderResource for JsonLinesResource {
    fn provider_id(&self) -> &str {
        JsonLinesProvider::ID
    }

    fn fetch(&self, connector: Arc<dyn Connector>) -> anyhow::Result<RawRecords> {
        let payload = connector.fetch(&self.source())?;
        let lines = self.lines(payload)?;
        let count = lines.remaining();
        Ok(RawRecords::with_count(lines, count))
    }
}

#[async_trait]
impl AsyncProviderResource for JsonLinesResource {
    fn provider_id(&self) -> &str {
        JsonLinesProvider::ID
    }

    async fn fetch_async(&self, connector: Arc<dyn AsyncConnector>) -> anyhow::Result<RawRecordStream> {
        let payload = connector.fetch_async(&self.source()).await?;
        let lines = self.lines(payload)?;
        let count = lines.remaining();
        Ok(RawRecordStream::with_count(stream::iter(lines), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use serde_json::json;

    fn write_fixture(dir: &Path) {
        std::fs::write(dir.join("listings.jsonl"), "{\"id\":1}\n\n{\"id\":2}\n").expect("write fixture");
    }

    #[test]
    fn reads_relative_paths_from_base_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixture(dir.path());

        let connector: Arc<dyn Connector> = Arc::new(FileConnector::new().with_base_dir(dir.path()));
        let raw = JsonLinesResource::new("listings.jsonl").fetch(connector).expect("fetch");
        assert_eq!(raw.count(), Some(2));
    }

    #[test]
    fn malformed_line_is_reported_as_record_error() {
        let resource = JsonLinesResource::new("broken.jsonl");
        let records: Vec<Result<Record>> = resource
            .lines(json!("{\"id\":1}\r\n[1,2]\n\nnot json"))
            .expect("text payload")
            .collect();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        let message = records[1].as_ref().expect_err("array line").to_string();
        assert!(message.contains("broken.jsonl:2"));
        let message = format!("{:#}", records[2].as_ref().expect_err("invalid line"));
        assert!(message.contains("broken.jsonl:4"));
    }

    #[test]
    fn lines_are_parsed_only_when_pulled() {
        let mut lines = JsonLinesResource::new("big.jsonl")
            .lines(json!("{\"id\":1}\n\n{\"id\":2}\nnot json\n"))
            .expect("text payload");
        assert_eq!(lines.remaining(), 3);

        assert_eq!(lines.next().expect("first").expect("record")["id"], json!(1));
        assert_eq!(lines.remaining(), 2);
        assert_eq!(lines.next().expect("second").expect("record")["id"], json!(2));
        assert_eq!(lines.offset, "{\"id\":1}\n\n{\"id\":2}\n".len());
        assert!(lines.next().expect("third").is_err());
        assert!(lines.next().is_none());
    }

    #[test]
    fn non_text_payload_is_rejected() {
        assert!(JsonLinesResource::new("x.jsonl").lines(json!({"id": 1})).is_err());
    }

    #[test]
    fn missing_file_is_not_recoverable() {
        let connector = FileConnector::new();
        let error = connector.fetch(&DataSource::new("/nonexistent/ferry/x.jsonl")).expect_err("missing");
        assert!(!RecoverableError::is_recoverable(&error));
        assert!(error.to_string().starts_with("read /nonexistent/ferry/x.jsonl"));

        let timeout = read_error(io::Error::from(io::ErrorKind::TimedOut), Path::new("slow.jsonl"));
        assert!(RecoverableError::is_recoverable(&timeout));
    }

    #[tokio::test]
    async fn async_fetch_streams_records_in_file_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixture(dir.path());

        let connector: Arc<dyn AsyncConnector> = Arc::new(FileConnector::new().with_base_dir(dir.path()));
        let raw = JsonLinesResource::new("listings.jsonl").fetch_async(connector).await.expect("fetch");
        assert_eq!(raw.count(), Some(2));

        let collection = crate::AsyncRecordCollection::wrap(raw, crate::RecordOrigin::provider("jsonl", "JsonLinesResource"));
        let records: Vec<Record> = collection.try_collect().await.expect("records");
        assert_eq!(records[1]["id"], json!(2));
    }
}
