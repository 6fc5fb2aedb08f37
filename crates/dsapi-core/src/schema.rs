use crate::errors::{DataError, Result};
use crate::model::{DatasetDescriptor, FieldDescriptor};
use crate::query::QueryClause;

/// Searchable fields of a dataset, in catalog order.
pub fn fields(descriptor: &DatasetDescriptor) -> &[FieldDescriptor] {
    &descriptor.fields
}

/// Rejects the first field reference (left to right) that the dataset does
/// not declare. Unknown fields never reach the backend.
pub fn validate_field_refs(descriptor: &DatasetDescriptor, clause: &QueryClause) -> Result<()> {
    for field in clause.field_refs() {
        if !descriptor.has_field(field) {
            tracing::debug!(
                dataset = %descriptor.api_key,
                field,
                "criteria references unknown field"
            );
            return Err(DataError::InvalidField(field.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;
    use crate::parse::parse;

    fn descriptor() -> DatasetDescriptor {
        DatasetDescriptor {
            api_key: "oa_citations".into(),
            api_version_number: "v1".into(),
            api_url: "https://example.com/oa_citations/v1/fields".into(),
            api_documentation_url: "https://example.com/docs".into(),
            fields: vec![
                FieldDescriptor::new("patentNumber", FieldType::String),
                FieldDescriptor::new("filingdate", FieldType::Date),
            ],
            backend_index_name: "oa_citations_v1".into(),
            published: true,
        }
    }

    #[test]
    fn known_fields_pass() {
        let q = parse("patentNumber:1 OR filingdate:[20010101 TO 20011231] OR *:*").unwrap();
        assert!(validate_field_refs(&descriptor(), &q).is_ok());
    }

    #[test]
    fn first_unknown_field_is_reported() {
        let q = parse("patentNumber:1 AND (secret:x OR other:y)").unwrap();
        match validate_field_refs(&descriptor(), &q) {
            Err(DataError::InvalidField(f)) => assert_eq!(f, "secret"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn field_names_are_case_sensitive() {
        let q = parse("patentnumber:1").unwrap();
        assert!(validate_field_refs(&descriptor(), &q).is_err());
    }

    #[test]
    fn fields_pass_through_in_order() {
        let d = descriptor();
        let names: Vec<_> = fields(&d).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["patentNumber", "filingdate"]);
    }
}
