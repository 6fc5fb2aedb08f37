//! Dataset registry: an immutable [`Catalog`] snapshot behind a swappable
//! pointer. Readers clone the `Arc` once and see one consistent catalog for
//! the whole request.

use crate::errors::{DataError, Result};
use crate::model::{DatasetDescriptor, DatasetKey};
use crate::util::blake3_hex;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use url::Url;

#[derive(Deserialize)]
struct CatalogFile {
    apis: Vec<DatasetDescriptor>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<Arc<DatasetDescriptor>>,
    index: HashMap<DatasetKey, usize>,
    fingerprint: String,
}

impl Catalog {
    pub fn from_descriptors(descriptors: Vec<DatasetDescriptor>) -> Result<Self> {
        let bytes = serde_json::to_vec(&descriptors)
            .map_err(|e| DataError::Catalog(format!("encode: {e}")))?;
        Self::build(descriptors, blake3_hex(&bytes))
    }

    /// Parses a catalog document: `{"apis": [DatasetDescriptor, ...]}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: CatalogFile = serde_json::from_slice(bytes)
            .map_err(|e| DataError::Catalog(format!("invalid catalog document: {e}")))?;
        Self::build(file.apis, blake3_hex(bytes))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| DataError::Catalog(format!("read {}: {e}", path.display())))?;
        Self::from_json(&bytes)
    }

    fn build(descriptors: Vec<DatasetDescriptor>, fingerprint: String) -> Result<Self> {
        let mut entries = Vec::with_capacity(descriptors.len());
        let mut index = HashMap::with_capacity(descriptors.len());
        for d in descriptors {
            validate_descriptor(&d)?;
            let key = d.key();
            if index.contains_key(&key) {
                return Err(DataError::Catalog(format!(
                    "duplicate dataset {}/{}",
                    key.api_key, key.version
                )));
            }
            index.insert(key, entries.len());
            entries.push(Arc::new(d));
        }
        Ok(Self {
            entries,
            index,
            fingerprint,
        })
    }

    fn with_added(&self, descriptor: DatasetDescriptor) -> Result<Self> {
        let mut all: Vec<DatasetDescriptor> =
            self.entries.iter().map(|d| d.as_ref().clone()).collect();
        all.push(descriptor);
        Self::from_descriptors(all)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All descriptors in catalog order, published or not.
    pub fn descriptors(&self) -> &[Arc<DatasetDescriptor>] {
        &self.entries
    }

    pub fn get(&self, api_key: &str, version: &str) -> Option<&Arc<DatasetDescriptor>> {
        self.index
            .get(&DatasetKey::new(api_key, version))
            .map(|&i| &self.entries[i])
    }

    /// Published descriptor for the key, or `DatasetNotFound`.
    pub fn lookup(&self, api_key: &str, version: &str) -> Result<Arc<DatasetDescriptor>> {
        match self.get(api_key, version) {
            Some(d) if d.published => Ok(d.clone()),
            _ => Err(DataError::not_found(api_key, version)),
        }
    }
}

fn validate_descriptor(d: &DatasetDescriptor) -> Result<()> {
    let fail = |msg: String| -> Result<()> { Err(DataError::Catalog(msg)) };
    if d.api_key.trim().is_empty() || d.api_version_number.trim().is_empty() {
        return fail("apiKey and apiVersionNumber must be non-empty".into());
    }
    if d.backend_index_name.trim().is_empty() {
        return fail(format!("{}: backendIndexName must be non-empty", d.api_key));
    }
    for (name, url) in [
        ("apiUrl", &d.api_url),
        ("apiDocumentationUrl", &d.api_documentation_url),
    ] {
        if !is_http_url(url) {
            return fail(format!("{}: {name} is not an http(s) URL: {url}", d.api_key));
        }
    }
    let mut seen = HashSet::new();
    for f in &d.fields {
        if f.name.is_empty() {
            return fail(format!("{}: empty field name", d.api_key));
        }
        if !seen.insert(f.name.as_str()) {
            return fail(format!("{}: duplicate field {}", d.api_key, f.name));
        }
    }
    Ok(())
}

fn is_http_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host().is_some(),
        Err(_) => false,
    }
}

pub struct Registry {
    current: RwLock<Arc<Catalog>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}

impl Registry {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current.read().clone()
    }

    pub fn list_all(&self) -> Vec<Arc<DatasetDescriptor>> {
        self.snapshot().descriptors().to_vec()
    }

    pub fn get(&self, api_key: &str, version: &str) -> Result<Arc<DatasetDescriptor>> {
        self.snapshot().lookup(api_key, version)
    }

    /// Swaps in a whole new catalog; returns the previous snapshot.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        tracing::info!(
            datasets = next.len(),
            fingerprint = %next.fingerprint(),
            "catalog swapped"
        );
        std::mem::replace(&mut *self.current.write(), next)
    }

    pub fn register(&self, descriptor: DatasetDescriptor) -> Result<()> {
        let mut guard = self.current.write();
        let next = guard.with_added(descriptor)?;
        *guard = Arc::new(next);
        Ok(())
    }
}
