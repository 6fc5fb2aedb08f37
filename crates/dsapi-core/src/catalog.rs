//! Response shapes composed from registry entries: the top-level listing and
//! the per-dataset field description.

use crate::model::{DatasetDescriptor, FieldDescriptor};
use crate::registry::Catalog;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiSummary {
    pub api_key: String,
    pub api_version_number: String,
    pub api_url: String,
    pub api_documentation_url: String,
}

impl From<&DatasetDescriptor> for ApiSummary {
    fn from(d: &DatasetDescriptor) -> Self {
        Self {
            api_key: d.api_key.clone(),
            api_version_number: d.api_version_number.clone(),
            api_url: d.api_url.clone(),
            api_documentation_url: d.api_documentation_url.clone(),
        }
    }
}

/// `total` is derived from `apis` at construction and cannot drift from it.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing {
    total: usize,
    apis: Vec<ApiSummary>,
}

impl CatalogListing {
    pub fn new(apis: Vec<ApiSummary>) -> Self {
        Self {
            total: apis.len(),
            apis,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn apis(&self) -> &[ApiSummary] {
        &self.apis
    }
}

/// Listing of every published dataset, in catalog order.
pub fn list(catalog: &Catalog) -> CatalogListing {
    CatalogListing::new(
        catalog
            .descriptors()
            .iter()
            .filter(|d| d.published)
            .map(|d| ApiSummary::from(d.as_ref()))
            .collect(),
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFields {
    #[serde(flatten)]
    pub api: ApiSummary,
    pub api_status: &'static str,
    pub field_count: usize,
    pub fields: Vec<FieldDescriptor>,
}

impl From<&DatasetDescriptor> for DatasetFields {
    fn from(d: &DatasetDescriptor) -> Self {
        let fields = crate::schema::fields(d).to_vec();
        Self {
            api: ApiSummary::from(d),
            api_status: d.status(),
            field_count: fields.len(),
            fields,
        }
    }
}
