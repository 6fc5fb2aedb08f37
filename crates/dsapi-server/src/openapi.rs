//! OpenAPI 3 description generated from the published catalog.

use dsapi_core::{Catalog, DatasetDescriptor, FieldType};
use regex::Regex;
use serde_json::{json, Map, Value as JsonValue};

/// Path selection for the generated document. Patterns match from the start
/// of the path. A path is kept when some include pattern matches it (or there
/// are none) and no exclude pattern does.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PathFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, regex::Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let compile = |p: &str| Regex::new(&format!("^(?:{p})"));
        Ok(Self {
            include: include
                .into_iter()
                .map(|p| compile(p.as_ref()))
                .collect::<Result<_, _>>()?,
            exclude: exclude
                .into_iter()
                .map(|p| compile(p.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn keeps(&self, path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|r| r.is_match(path));
        included && !self.exclude.iter().any(|r| r.is_match(path))
    }
}

fn field_schema(t: FieldType) -> JsonValue {
    let (ty, format) = match t {
        FieldType::String | FieldType::Text => ("string", None),
        FieldType::Integer => ("integer", Some("int64")),
        FieldType::Float => ("number", Some("double")),
        FieldType::Boolean => ("boolean", None),
        FieldType::Date => ("string", Some("yyyyMMdd")),
    };
    let mut schema = json!({ "type": ty, "example": t.example() });
    if let Some(f) = format {
        schema["format"] = JsonValue::from(f);
    }
    schema
}

fn record_schema(d: &DatasetDescriptor) -> JsonValue {
    let properties: Map<String, JsonValue> = d
        .fields
        .iter()
        .map(|f| (f.name.clone(), field_schema(f.field_type)))
        .collect();
    json!({ "type": "object", "properties": properties })
}

fn schema_ref(name: &str) -> JsonValue {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn error_response(description: &str) -> JsonValue {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema_ref("Error") } }
    })
}

fn records_form(example_criteria: &str) -> JsonValue {
    let properties = json!({
        "criteria": { "type": "string", "default": "*:*", "example": example_criteria },
        "start": { "type": "integer", "minimum": 0, "default": 0 },
        "rows": { "type": "integer", "minimum": 1, "default": dsapi_core::DEFAULT_ROWS }
    });
    json!({
        "required": true,
        "content": {
            "application/x-www-form-urlencoded": {
                "schema": { "type": "object", "required": ["criteria"], "properties": properties }
            }
        }
    })
}

fn records_response(d: &DatasetDescriptor) -> JsonValue {
    let schema = json!({
        "type": "object",
        "properties": {
            "numFound": { "type": "integer", "example": 1 },
            "start": { "type": "integer", "example": 0 },
            "docs": { "type": "array", "items": record_schema(d) }
        }
    });
    json!({
        "description": "Matching records",
        "content": { "application/json": { "schema": schema } }
    })
}

fn dataset_paths(d: &DatasetDescriptor, paths: &mut Map<String, JsonValue>) {
    let tag = format!("{} {}", d.api_key, d.api_version_number);
    let searchable = d
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let example_criteria = d
        .fields
        .first()
        .map(|f| format!("{}:{}", f.name, example_text(f.field_type)))
        .unwrap_or_else(|| "*:*".to_string());

    paths.insert(
        format!("/{}/{}/fields", d.api_key, d.api_version_number),
        json!({
            "get": {
                "tags": [tag],
                "summary": "Searchable fields of the dataset",
                "externalDocs": { "url": d.api_documentation_url },
                "responses": {
                    "200": {
                        "description": "Field list",
                        "content": { "application/json": { "schema": schema_ref("DatasetFields") } }
                    },
                    "404": error_response("Dataset not found or not published")
                }
            }
        }),
    );
    paths.insert(
        format!("/{}/{}/records", d.api_key, d.api_version_number),
        json!({
            "post": {
                "tags": [tag],
                "summary": "Search records",
                "description": format!("Searchable fields: {searchable}"),
                "requestBody": records_form(&example_criteria),
                "responses": {
                    "200": records_response(d),
                    "400": error_response("Invalid parameters, criteria syntax or field"),
                    "404": error_response("Dataset not found or no matching records"),
                    "500": error_response("Backend rejected the query"),
                    "503": error_response("Search backend unavailable"),
                    "504": error_response("Search backend timed out")
                }
            }
        }),
    );
}

fn example_text(t: FieldType) -> String {
    match t.example() {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

fn component_schemas() -> JsonValue {
    let api = json!({
        "type": "object",
        "properties": {
            "apiKey": { "type": "string", "example": "oa_citations" },
            "apiVersionNumber": { "type": "string", "example": "v1" },
            "apiUrl": { "type": "string", "format": "uri" },
            "apiDocumentationUrl": { "type": "string", "format": "uri" }
        }
    });
    let listing = json!({
        "type": "object",
        "properties": {
            "total": { "type": "integer", "example": 1 },
            "apis": { "type": "array", "items": { "$ref": "#/components/schemas/Api" } }
        }
    });
    let field = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "type": {
                "type": "string",
                "enum": ["string", "text", "integer", "float", "boolean", "date"]
            }
        }
    });
    let dataset_fields = json!({
        "allOf": [
            { "$ref": "#/components/schemas/Api" },
            {
                "type": "object",
                "properties": {
                    "apiStatus": { "type": "string", "example": "PUBLISHED" },
                    "fieldCount": { "type": "integer", "example": 1 },
                    "fields": { "type": "array", "items": field }
                }
            }
        ]
    });
    let error = json!({
        "type": "object",
        "required": ["error", "message"],
        "properties": {
            "error": { "type": "string", "example": "parse_error" },
            "message": { "type": "string" },
            "field": { "type": "string" },
            "position": { "type": "integer" },
            "reason": { "type": "string" }
        }
    });
    json!({
        "Api": api,
        "Listing": listing,
        "DatasetFields": dataset_fields,
        "Error": error
    })
}

pub fn document(catalog: &Catalog) -> JsonValue {
    document_filtered(catalog, &PathFilter::default())
}

pub fn document_filtered(catalog: &Catalog, filter: &PathFilter) -> JsonValue {
    let mut paths = Map::new();
    paths.insert(
        "/".to_string(),
        json!({
            "get": {
                "summary": "List published datasets",
                "responses": {
                    "200": {
                        "description": "Catalog listing",
                        "content": { "application/json": { "schema": schema_ref("Listing") } }
                    }
                }
            }
        }),
    );
    for d in catalog.descriptors().iter().filter(|d| d.published) {
        dataset_paths(d, &mut paths);
    }
    paths.retain(|path, _| filter.keeps(path));

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Dataset search API",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": paths,
        "components": { "schemas": component_schemas() }
    })
}
