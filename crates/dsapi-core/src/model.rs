use crate::errors::{DataError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub type ApiKey = String;
pub type ApiVersion = String;

pub const DEFAULT_ROWS: u64 = 20;

/// Composite registry key: `(apiKey, apiVersionNumber)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetKey {
    pub api_key: ApiKey,
    pub version: ApiVersion,
}

impl DatasetKey {
    pub fn new(api_key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
}

impl FieldType {
    /// Example value used when describing the field to API consumers.
    pub fn example(self) -> JsonValue {
        match self {
            FieldType::String | FieldType::Text => JsonValue::from("string"),
            FieldType::Integer => JsonValue::from(1),
            FieldType::Float => JsonValue::from(1.0),
            FieldType::Boolean => JsonValue::from(true),
            FieldType::Date => JsonValue::from("20200101"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescriptor {
    pub api_key: ApiKey,
    pub api_version_number: ApiVersion,
    pub api_url: String,
    pub api_documentation_url: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    pub backend_index_name: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

impl DatasetDescriptor {
    pub fn key(&self) -> DatasetKey {
        DatasetKey::new(&self.api_key, &self.api_version_number)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn status(&self) -> &'static str {
        if self.published {
            "PUBLISHED"
        } else {
            "UNPUBLISHED"
        }
    }
}

/// Validated inputs of a records search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCriteria {
    pub criteria: String,
    pub start: u64,
    pub rows: u64,
}

impl QueryCriteria {
    pub fn new(criteria: impl Into<String>) -> Self {
        Self {
            criteria: criteria.into(),
            start: 0,
            rows: DEFAULT_ROWS,
        }
    }

    /// Builds criteria from raw request parameters. Blank `start`/`rows` count
    /// as absent; negative or non-numeric values are rejected. `criteria` is
    /// kept verbatim so parse positions match what the client sent.
    pub fn from_params(
        criteria: Option<&str>,
        start: Option<&str>,
        rows: Option<&str>,
        default_rows: u64,
    ) -> Result<Self> {
        let criteria = criteria.unwrap_or_default();
        if criteria.trim().is_empty() {
            return Err(DataError::invalid_param("criteria", "is required"));
        }
        let start = parse_count("start", start)?.unwrap_or(0);
        let rows = parse_count("rows", rows)?.unwrap_or(default_rows);
        if rows == 0 {
            return Err(DataError::invalid_param("rows", "must be at least 1"));
        }
        Ok(Self {
            criteria: criteria.to_string(),
            start,
            rows,
        })
    }
}

fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<u64>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(s) => s,
    };
    let n: i64 = raw
        .parse()
        .map_err(|_| DataError::invalid_param(name, format!("`{raw}` is not an integer")))?;
    if n < 0 {
        return Err(DataError::invalid_param(name, "must not be negative"));
    }
    Ok(Some(n as u64))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    pub docs: Vec<JsonValue>,
}
