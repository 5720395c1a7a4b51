//! Import documents: a YAML or JSON description of one import.
//!
//! ```yaml
//! provider: static            # optional override
//! resource:
//!   jsonl:
//!     path: listings.jsonl
//!     base_dir: data           # optional, relative to the document
//! context: {region: eu}
//! cache: true
//! max_fetch_attempts: 3
//! filters:
//!   - {field: status, equals: active}
//!   - {field: name, matches: "^A"}
//! one: false
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result, bail};
use ferry_engine::{
    AsyncImportSpecification, FilterTransformer, ImportSpecification, Importer, JsonLinesProvider, JsonLinesResource, ProviderRegistry,
    Record, Specification, StaticResource, Transformer,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportDocument {
    #[serde(default)]
    pub provider: Option<String>,
    pub resource: ResourceDocument,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub cache: bool,
    /// Signed so that zero and negative values reach the engine's validation.
    #[serde(default)]
    pub max_fetch_attempts: Option<i64>,
    #[serde(default)]
    pub filters: Vec<FilterDocument>,
    #[serde(default)]
    pub one: bool,
    #[serde(skip)]
    location: PathBuf,
}

/// Exactly one of the fields must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDocument {
    #[serde(default, rename = "static")]
    pub static_data: Option<StaticDocument>,
    #[serde(default)]
    pub jsonl: Option<JsonLinesDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticDocument {
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonLinesDocument {
    pub path: String,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDocument {
    pub field: String,
    #[serde(default)]
    pub equals: Option<Value>,
    #[serde(default)]
    pub matches: Option<String>,
}

enum ResourceKind<'a> {
    Static(&'a StaticDocument),
    JsonLines(&'a JsonLinesDocument),
}

impl ImportDocument {
    /// Read and parse a document. JSON documents are accepted as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).with_context(|| format!("Failed to read import document: {}", path.display()))?;
        let mut document = Self::parse(&contents).with_context(|| format!("Invalid import document: {}", path.display()))?;
        document.location = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(document)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let document: Self = serde_yaml::from_str(contents)?;
        document.resource_kind()?;
        Ok(document)
    }

    fn resource_kind(&self) -> Result<ResourceKind<'_>> {
        match (&self.resource.static_data, &self.resource.jsonl) {
            (Some(static_data), None) => Ok(ResourceKind::Static(static_data)),
            (None, Some(jsonl)) => Ok(ResourceKind::JsonLines(jsonl)),
            (None, None) => bail!("resource must name one of: static, jsonl"),
            (Some(_), Some(_)) => bail!("resource must name only one of: static, jsonl"),
        }
    }

    /// Importer whose registry knows the document's providers.
    pub fn importer(&self) -> Result<Importer> {
        let mut registry = ProviderRegistry::new();
        if let ResourceKind::JsonLines(jsonl) = self.resource_kind()? {
            let base_dir = match &jsonl.base_dir {
                Some(base_dir) => self.location.join(base_dir),
                None => self.location.clone(),
            };
            debug!(base_dir = %base_dir.display(), "configuring jsonl provider");
            registry.register(JsonLinesProvider::with_base_dir(base_dir));
        }
        Ok(Importer::new(registry))
    }

    pub fn import_specification(&self) -> Result<ImportSpecification> {
        let mut specification = match self.resource_kind()? {
            ResourceKind::Static(static_data) => ImportSpecification::new(StaticResource::new(static_data.records.clone())),
            ResourceKind::JsonLines(jsonl) => ImportSpecification::new(JsonLinesResource::new(jsonl.path.clone())),
        };
        self.configure(&mut specification)?;
        Ok(specification)
    }

    pub fn async_import_specification(&self) -> Result<AsyncImportSpecification> {
        let mut specification = match self.resource_kind()? {
            ResourceKind::Static(static_data) => AsyncImportSpecification::new(StaticResource::new(static_data.records.clone())),
            ResourceKind::JsonLines(jsonl) => AsyncImportSpecification::new(JsonLinesResource::new(jsonl.path.clone())),
        };
        self.configure(&mut specification)?;
        Ok(specification)
    }

    fn configure<R: ?Sized>(&self, specification: &mut Specification<R>) -> Result<()> {
        if let Some(provider) = &self.provider {
            specification.set_provider_name(provider.clone());
        }
        specification.set_context(self.context.clone());
        if self.cache {
            specification.enable_cache();
        }
        if let Some(attempts) = self.max_fetch_attempts {
            specification.set_max_fetch_attempts(attempts)?;
        }
        let filters = self.filters.iter().map(FilterDocument::compile).collect::<Result<Vec<_>>>()?;
        specification.add_transformers(filters)?;
        Ok(())
    }
}

impl FilterDocument {
    fn compile(&self) -> Result<Arc<dyn Transformer>> {
        match (&self.equals, &self.matches) {
            (Some(expected), None) => Ok(equals_filter(self.field.clone(), expected.clone())),
            (None, Some(pattern)) => {
                let pattern = Regex::new(pattern).with_context(|| format!("Invalid pattern for field '{}'", self.field))?;
                let field = self.field.clone();
                Ok(Arc::new(FilterTransformer::new(move |record, _| {
                    record.get(&field).is_some_and(|value| pattern.is_match(&display_value(value)))
                })))
            }
            _ => bail!("filter on field '{}' must set exactly one of: equals, matches", self.field),
        }
    }
}

/// Filter keeping records whose `field` equals `expected`.
pub fn equals_filter(field: String, expected: Value) -> Arc<dyn Transformer> {
    Arc::new(FilterTransformer::new(move |record, _| record.get(&field) == Some(&expected)))
}

/// Parse a command-line value: JSON when it parses as JSON, a plain string otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
