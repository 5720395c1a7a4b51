use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use anyhow::anyhow;
use async_trait::async_trait;
use ferry_engine::{
    AsyncConnector, AsyncImportSpecification, AsyncProvider, AsyncRecordCollection, AsyncTransformer, ConfigurationError, Connector,
    ConnectorInfo, ConnectorOptions, ConnectorSupply, Context, DataSource, FileConnector, FilterTransformer, ImportError,
    ImportSpecification, Importer, ImporterAware, JsonLinesProvider, JsonLinesResource, MemoryFetchCache, PassthroughDecorator, Provider,
    ProviderRegistry, ProviderResource, RawRecords, Record, RecordCollection, RecordOrigin, RecoverableError, StaticDataProvider,
    StaticResource, SyncTransformer, Transformer, record_from,
};
use futures_util::TryStreamExt;
use serde_json::{Value, json};

fn numbered(range: std::ops::RangeInclusive<i64>) -> Vec<Record> {
    range.map(|n| record_from([("n", json!(n))])).collect()
}

fn numbers(records: impl IntoIterator<Item = ferry_engine::Result<Record>>) -> Vec<i64> {
    records
        .into_iter()
        .map(|record| record.expect("record")["n"].as_i64().expect("n"))
        .collect()
}

fn odd() -> Arc<dyn Transformer> {
    Arc::new(FilterTransformer::new(|record, _| record["n"].as_i64().is_some_and(|n| n % 2 == 1)))
}

fn above_five() -> Arc<dyn Transformer> {
    Arc::new(FilterTransformer::new(|record, _| record["n"].as_i64().is_some_and(|n| n > 5)))
}

/// Synchronous-only transformer that counts invocations.
#[derive(Debug, Default)]
struct CountingTransformer {
    invocations: AtomicU64,
}

impl Clone for CountingTransformer {
    fn clone(&self) -> Self {
        Self {
            invocations: AtomicU64::new(self.invocations.load(Ordering::SeqCst)),
        }
    }
}

impl Transformer for CountingTransformer {
    fn as_sync(&self) -> Option<&dyn SyncTransformer> {
        Some(self)
    }
}

impl SyncTransformer for CountingTransformer {
    fn transform(&self, records: RecordCollection, _context: &Context) -> anyhow::Result<RecordCollection> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(records)
    }
}

/// Asynchronous-only pass-through. Clones share the invocation counter.
#[derive(Debug, Clone, Default)]
struct AsyncOnlyTransformer {
    invocations: Arc<AtomicU64>,
}

impl Transformer for AsyncOnlyTransformer {
    fn as_async(&self) -> Option<&dyn AsyncTransformer> {
        Some(self)
    }
}

#[async_trait]
impl AsyncTransformer for AsyncOnlyTransformer {
    async fn transform_async(&self, records: AsyncRecordCollection, _context: &Context) -> anyhow::Result<AsyncRecordCollection> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(records)
    }
}

#[test]
fn imports_every_record_in_order_with_count() {
    let importer = Importer::new(ProviderRegistry::new());
    let specification = ImportSpecification::new(StaticResource::new(numbered(1..=4)));

    let records = importer.import(&specification).expect("import");
    assert_eq!(records.record_count(), Some(4));
    assert_eq!(records.origin(), &RecordOrigin::import("static", "StaticResource"));
    assert_eq!(numbers(records), vec![1, 2, 3, 4]);
}

#[test]
fn filter_chain_applies_in_order() {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = ImportSpecification::new(StaticResource::new(numbered(1..=10)));

    specification.add_transformer(odd()).expect("odd filter");
    assert_eq!(numbers(importer.import(&specification).expect("import")), vec![1, 3, 5, 7, 9]);

    specification.add_transformer(above_five()).expect("above five filter");
    let records = importer.import(&specification).expect("import");
    assert!(!records.is_countable());
    assert_eq!(numbers(records), vec![7, 9]);
}

#[tokio::test]
async fn async_filter_chain_applies_in_order() {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = AsyncImportSpecification::new(StaticResource::new(numbered(1..=10)));
    specification.add_transformers([odd(), above_five()]).expect("filters");

    let records: Vec<Record> = importer
        .import_async(&specification)
        .await
        .expect("import")
        .try_collect()
        .await
        .expect("records");
    assert_eq!(numbers(records.into_iter().map(Ok)), vec![7, 9]);
}

#[test]
fn import_one_cardinality() {
    let importer = Importer::new(ProviderRegistry::new());

    let empty = ImportSpecification::new(StaticResource::new(Vec::new()));
    assert!(importer.import_one(&empty).expect("empty import").is_none());

    let single = ImportSpecification::new(StaticResource::new(numbered(1..=1)));
    let record = importer.import_one(&single).expect("single import").expect("record");
    assert_eq!(record["n"], json!(1));

    let many = ImportSpecification::new(StaticResource::new(numbered(1..=2)));
    let error = importer.import_one(&many).expect_err("two records");
    assert!(matches!(error, ImportError::MoreThanOneRecord));
}

#[tokio::test]
async fn import_one_async_cardinality() {
    let importer = Importer::new(ProviderRegistry::new());

    let empty = AsyncImportSpecification::new(StaticResource::new(Vec::new()));
    assert!(importer.import_one_async(&empty).await.expect("empty import").is_none());

    let mut filtered = AsyncImportSpecification::new(StaticResource::new(numbered(1..=10)));
    filtered.add_transformer(above_five()).expect("filter");
    assert!(matches!(
        importer.import_one_async(&filtered).await,
        Err(ImportError::MoreThanOneRecord)
    ));
}

#[tokio::test]
async fn sync_transformer_in_async_import_fails_before_records() {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = AsyncImportSpecification::new(StaticResource::new(numbered(1..=3)));
    specification.add_transformer(Arc::new(CountingTransformer::default())).expect("add");

    let error = importer.import_async(&specification).await.expect_err("sync transformer");
    assert!(matches!(
        error,
        ImportError::Configuration(ConfigurationError::SyncTransformerInAsyncImport { ref transformer }) if transformer == "CountingTransformer"
    ));
}

#[tokio::test]
async fn capability_is_checked_when_each_step_runs() {
    let importer = Importer::new(ProviderRegistry::new());
    let leading = AsyncOnlyTransformer::default();
    let mut specification = AsyncImportSpecification::new(StaticResource::new(numbered(1..=3)));
    let steps: [Arc<dyn Transformer>; 2] = [Arc::new(leading.clone()), Arc::new(CountingTransformer::default())];
    specification.add_transformers(steps).expect("add");

    let error = importer.import_async(&specification).await.expect_err("sync transformer");
    assert!(matches!(
        error,
        ImportError::Configuration(ConfigurationError::SyncTransformerInAsyncImport { ref transformer }) if transformer == "CountingTransformer"
    ));
    assert_eq!(leading.invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn async_only_transformer_in_sync_import_fails() {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = ImportSpecification::new(StaticResource::new(numbered(1..=3)));
    specification.add_transformer(Arc::new(AsyncOnlyTransformer::default())).expect("add");

    let error = importer.import(&specification).expect_err("async transformer");
    assert!(matches!(
        error,
        ImportError::Configuration(ConfigurationError::AsyncTransformerInSyncImport { .. })
    ));
}

#[test]
fn import_works_on_a_clone_of_the_specification() {
    let importer = Importer::new(ProviderRegistry::new());
    let counter = Arc::new(CountingTransformer::default());
    let mut specification = ImportSpecification::new(StaticResource::new(numbered(1..=2)));
    specification.add_transformer(counter.clone()).expect("add");

    assert_eq!(numbers(importer.import(&specification).expect("first import")), vec![1, 2]);
    assert_eq!(numbers(importer.import(&specification).expect("second import")), vec![1, 2]);
    assert_eq!(counter.invocations.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_provider_is_not_found() {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = ImportSpecification::new(StaticResource::new(numbered(1..=1)));
    specification.set_provider_name("warehouse");

    let error = importer.import(&specification).expect_err("unknown provider");
    assert!(matches!(error, ImportError::ProviderNotFound { ref name } if name == "warehouse"));
}

#[test]
fn resource_of_another_provider_is_foreign() {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = ImportSpecification::new(JsonLinesResource::new("listings.jsonl"));
    specification.set_provider_name("static");

    let error = importer.import(&specification).expect_err("foreign resource");
    assert!(matches!(
        error,
        ImportError::ForeignResource { ref owner, ref provider, .. } if owner == "jsonl" && provider == "static"
    ));
}

#[test]
fn registered_provider_alias_is_resolved() {
    let mut registry = ProviderRegistry::new();
    registry.register_as("fixtures", Arc::new(StaticDataProvider::new()));
    let importer = Importer::new(registry);

    let mut specification = ImportSpecification::new(StaticResource::new(numbered(1..=2)));
    specification.set_provider_name("fixtures");
    assert_eq!(numbers(importer.import(&specification).expect("import")), vec![1, 2]);
}

/// Provider whose transport fails a fixed number of times before succeeding.
#[derive(Debug, Default)]
struct FlakyTransport {
    failures: u64,
    calls: AtomicU64,
}

impl ConnectorInfo for FlakyTransport {}

impl Connector for FlakyTransport {
    fn fetch(&self, source: &DataSource) -> anyhow::Result<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(RecoverableError::wrap(anyhow!("{} unavailable", source.location())));
        }
        Ok(json!([{ "n": 1 }, { "n": 2 }]))
    }
}

#[derive(Debug)]
struct FlakyProvider {
    transport: Arc<FlakyTransport>,
}

impl FlakyProvider {
    fn failing(failures: u64) -> Self {
        Self {
            transport: Arc::new(FlakyTransport {
                failures,
                ..FlakyTransport::default()
            }),
        }
    }
}

impl Provider for FlakyProvider {
    fn id(&self) -> &str {
        "flaky"
    }

    fn connector(&self) -> ConnectorSupply<'_> {
        ConnectorSupply::Shared(self.transport.clone())
    }
}

#[derive(Debug, Clone)]
struct FlakyResource;

impl ProviderResource for FlakyResource {
    fn provider_id(&self) -> &str {
        "flaky"
    }

    fn fetch(&self, connector: Arc<dyn Connector>) -> anyhow::Result<RawRecords> {
        let payload = connector.fetch(&DataSource::new("numbers"))?;
        let records: Vec<Record> = serde_json::from_value(payload)?;
        Ok(RawRecords::from(records))
    }
}

#[test]
fn transient_fetch_failures_are_retried() {
    let provider = FlakyProvider::failing(2);
    let transport = provider.transport.clone();
    let importer = Importer::new(ProviderRegistry::new().with_provider(provider));

    let records = importer.import(&ImportSpecification::new(FlakyResource)).expect("third attempt succeeds");
    assert_eq!(numbers(records), vec![1, 2]);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn fetch_failure_surfaces_after_max_attempts() {
    let provider = FlakyProvider::failing(u64::MAX);
    let transport = provider.transport.clone();
    let importer = Importer::new(ProviderRegistry::new().with_provider(provider));
    let mut specification = ImportSpecification::new(FlakyResource);
    specification.set_max_fetch_attempts(2).expect("attempts");

    let error = importer.import(&specification).expect_err("always failing");
    assert!(matches!(error, ImportError::Fetch(_)));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn passthrough_decorator_disables_retries() {
    let provider = FlakyProvider::failing(1);
    let transport = provider.transport.clone();
    let importer = Importer::builder()
        .container(ProviderRegistry::new().with_provider(provider))
        .decorator(PassthroughDecorator)
        .build();

    assert!(importer.import(&ImportSpecification::new(FlakyResource)).is_err());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn cached_fetches_are_shared_between_imports() {
    let provider = FlakyProvider::failing(0);
    let transport = provider.transport.clone();
    let cache = Arc::new(MemoryFetchCache::new());
    let importer = Importer::builder()
        .container(ProviderRegistry::new().with_provider(provider))
        .fetch_cache(cache.clone())
        .build();

    let mut specification = ImportSpecification::new(FlakyResource);
    specification.enable_cache();
    for _ in 0..3 {
        assert_eq!(numbers(importer.import(&specification).expect("import")), vec![1, 2]);
    }
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);

    specification.disable_cache();
    importer.import(&specification).expect("uncached import");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn provider_without_async_support_is_rejected_before_ownership_check() {
    let importer = Importer::new(ProviderRegistry::new().with_provider(FlakyProvider::failing(0)));
    let mut specification = AsyncImportSpecification::new(StaticResource::new(numbered(1..=1)));
    specification.set_provider_name("flaky");

    let error = importer.import_async(&specification).await.expect_err("no async support");
    assert!(matches!(error, ImportError::Configuration(ConfigurationError::AsyncUnsupported { .. })));
}

/// Connector carrying options, wrongly handed out as a shared instance.
#[derive(Debug, Default)]
struct TokenConnector {
    options: ConnectorOptions,
}

impl ConnectorInfo for TokenConnector {
    fn options(&self) -> Option<&ConnectorOptions> {
        Some(&self.options)
    }
}

impl Connector for TokenConnector {
    fn fetch(&self, _source: &DataSource) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

#[derive(Debug, Default)]
struct SharedOptionsProvider {
    connector: Arc<TokenConnector>,
}

impl Provider for SharedOptionsProvider {
    fn id(&self) -> &str {
        "static"
    }

    fn connector(&self) -> ConnectorSupply<'_> {
        ConnectorSupply::Shared(self.connector.clone())
    }
}

#[test]
fn shared_connector_with_options_is_a_configuration_error() {
    let importer = Importer::new(ProviderRegistry::new().with_provider(SharedOptionsProvider::default()));
    let specification = ImportSpecification::new(StaticResource::new(numbered(1..=1)));

    let error = importer.import(&specification).expect_err("shared options");
    assert!(matches!(
        error,
        ImportError::Configuration(ConfigurationError::SharedConnectorOptions { .. })
    ));
}

#[test]
fn jsonl_provider_reads_from_its_base_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("numbers.jsonl"), "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n").expect("fixture");
    let importer = Importer::new(ProviderRegistry::new().with_provider(JsonLinesProvider::with_base_dir(dir.path())));

    let mut specification = ImportSpecification::new(JsonLinesResource::new("numbers.jsonl"));
    specification.add_transformer(odd()).expect("filter");
    assert_eq!(numbers(importer.import(&specification).expect("import")), vec![1, 3]);
}

#[tokio::test]
async fn jsonl_provider_streams_asynchronously() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("numbers.jsonl");
    std::fs::write(&path, "{\"n\":4}\n{\"n\":5}\n").expect("fixture");
    let importer = Importer::new(ProviderRegistry::new());

    let specification = AsyncImportSpecification::new(JsonLinesResource::new(path.to_string_lossy()));
    let records = importer.import_async(&specification).await.expect("import");
    assert_eq!(records.record_count(), Some(2));
    let records: Vec<Record> = records.try_collect().await.expect("records");
    assert_eq!(numbers(records.into_iter().map(Ok)), vec![4, 5]);
}

/// File connector that counts fetch attempts; clones share the counter.
#[derive(Debug, Clone, Default)]
struct CountingFileConnector {
    inner: FileConnector,
    calls: Arc<AtomicU64>,
}

impl ConnectorInfo for CountingFileConnector {
    fn options(&self) -> Option<&ConnectorOptions> {
        self.inner.options()
    }
}

impl Connector for CountingFileConnector {
    fn fetch(&self, source: &DataSource) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(source)
    }
}

#[derive(Debug, Default)]
struct CountingJsonLinesProvider {
    connector: CountingFileConnector,
}

impl Provider for CountingJsonLinesProvider {
    fn id(&self) -> &str {
        JsonLinesProvider::ID
    }

    fn connector(&self) -> ConnectorSupply<'_> {
        ConnectorSupply::Isolated(&self.connector)
    }
}

#[test]
fn missing_jsonl_file_is_fetched_once() {
    let provider = CountingJsonLinesProvider::default();
    let calls = provider.connector.calls.clone();
    let importer = Importer::new(ProviderRegistry::new().with_provider(provider));
    let specification = ImportSpecification::new(JsonLinesResource::new("/nonexistent/ferry/numbers.jsonl"));

    assert!(matches!(importer.import(&specification), Err(ImportError::Fetch(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn import_one_stops_before_a_malformed_tail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("numbers.jsonl");
    std::fs::write(&path, "{\"n\":1}\n{\"n\":2}\nnot json\n").expect("fixture");
    let importer = Importer::new(ProviderRegistry::new());
    let specification = ImportSpecification::new(JsonLinesResource::new(path.to_string_lossy()));

    assert!(matches!(importer.import_one(&specification), Err(ImportError::MoreThanOneRecord)));
    assert_eq!(importer.import(&specification).expect("import").record_count(), Some(3));
}

#[tokio::test]
async fn import_one_async_stops_before_a_malformed_tail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("numbers.jsonl");
    std::fs::write(&path, "{\"n\":1}\n{\"n\":2}\n[3]\n").expect("fixture");
    let importer = Importer::new(ProviderRegistry::new());
    let specification = AsyncImportSpecification::new(JsonLinesResource::new(path.to_string_lossy()));

    assert!(matches!(
        importer.import_one_async(&specification).await,
        Err(ImportError::MoreThanOneRecord)
    ));
}

/// Transformer that replaces each record with the records of a nested import.
#[derive(Debug, Default)]
struct ExpandTransformer {
    importer: Mutex<Option<Importer>>,
}

impl Clone for ExpandTransformer {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl Transformer for ExpandTransformer {
    fn as_sync(&self) -> Option<&dyn SyncTransformer> {
        Some(self)
    }

    fn as_importer_aware(&self) -> Option<&dyn ImporterAware> {
        Some(self)
    }
}

impl ImporterAware for ExpandTransformer {
    fn set_importer(&self, importer: Importer) {
        *self.importer.lock().unwrap_or_else(PoisonError::into_inner) = Some(importer);
    }
}

impl SyncTransformer for ExpandTransformer {
    fn transform(&self, records: RecordCollection, _context: &Context) -> anyhow::Result<RecordCollection> {
        let importer = self
            .importer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| anyhow!("importer was not injected"))?;

        let mut expanded = Vec::new();
        for record in records {
            let n = record?["n"].as_i64().unwrap_or_default();
            let nested = ImportSpecification::new(StaticResource::new(numbered(n * 10..=n * 10 + 1)));
            expanded.extend(importer.import(&nested)?);
        }
        Ok(RecordCollection::new(expanded, None, RecordOrigin::transformed(self.name())))
    }
}

#[test]
fn importer_aware_transformer_runs_nested_imports() {
    let importer = Importer::new(ProviderRegistry::new());
    let mut specification = ImportSpecification::new(StaticResource::new(numbered(1..=2)));
    specification.add_transformer(Arc::new(ExpandTransformer::default())).expect("add");

    assert_eq!(numbers(importer.import(&specification).expect("import")), vec![10, 11, 20, 21]);
}

#[tokio::test]
async fn async_import_of_static_records_keeps_count() {
    let importer = Importer::new(ProviderRegistry::new().with_provider(UserStaticProvider));
    let specification = AsyncImportSpecification::new(StaticResource::new(numbered(1..=3)));

    let records = importer.import_async(&specification).await.expect("import");
    assert_eq!(records.record_count(), Some(3));
    assert_eq!(records.origin(), &RecordOrigin::import("static", "StaticResource"));
}

/// Stand-in for the built-in static provider registered by the user.
#[derive(Debug)]
struct UserStaticProvider;

impl Provider for UserStaticProvider {
    fn id(&self) -> &str {
        "static"
    }

    fn connector(&self) -> ConnectorSupply<'_> {
        ConnectorSupply::Shared(Arc::new(ferry_engine::provider::NullConnector))
    }

    fn as_async_provider(&self) -> Option<&dyn AsyncProvider> {
        Some(self)
    }
}

impl AsyncProvider for UserStaticProvider {
    fn async_connector(&self) -> ferry_engine::AsyncConnectorSupply<'_> {
        let connector: Arc<dyn AsyncConnector> = Arc::new(ferry_engine::provider::NullConnector);
        ferry_engine::AsyncConnectorSupply::Shared(connector)
    }
}
