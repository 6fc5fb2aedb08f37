use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One side of a range clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    /// `*`
    Unbounded,
    Value(String),
}

impl Bound {
    pub fn value(v: impl Into<String>) -> Self {
        Bound::Value(v.into())
    }
}

/// Backend-agnostic criteria AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum QueryClause {
    /// `*:*`
    MatchAll,
    FieldEquals {
        field: String,
        value: String,
    },
    FieldRange {
        field: String,
        low: Bound,
        high: Bound,
    },
    DateRange {
        field: String,
        low: NaiveDate,
        high: NaiveDate,
    },
    And {
        left: Box<QueryClause>,
        right: Box<QueryClause>,
    },
    Or {
        left: Box<QueryClause>,
        right: Box<QueryClause>,
    },
}

impl QueryClause {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        QueryClause::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn range(field: impl Into<String>, low: Bound, high: Bound) -> Self {
        QueryClause::FieldRange {
            field: field.into(),
            low,
            high,
        }
    }

    pub fn date_range(field: impl Into<String>, low: NaiveDate, high: NaiveDate) -> Self {
        QueryClause::DateRange {
            field: field.into(),
            low,
            high,
        }
    }

    pub fn and(left: QueryClause, right: QueryClause) -> Self {
        QueryClause::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: QueryClause, right: QueryClause) -> Self {
        QueryClause::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Field name of a leaf clause.
    pub fn field(&self) -> Option<&str> {
        match self {
            QueryClause::FieldEquals { field, .. }
            | QueryClause::FieldRange { field, .. }
            | QueryClause::DateRange { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Every referenced field, left to right, duplicates included.
    pub fn field_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryClause::And { left, right } | QueryClause::Or { left, right } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            leaf => {
                if let Some(f) = leaf.field() {
                    out.push(f);
                }
            }
        }
    }
}

/// Concrete query syntax expected by a search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// The criteria syntax itself; dates stay in `yyyyMMdd` form.
    Standard,
    /// Lucene/Solr syntax with ISO-8601 date ranges.
    Solr,
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Dialect::Standard),
            "solr" => Ok(Dialect::Solr),
            other => Err(format!("unknown dialect `{other}`")),
        }
    }
}
