use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use services::usage_info::{UsageField, UsageQuery, UsageRow};
use std::sync::Arc;
use utoipa::ToSchema;

// ============================================
// Errors
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable description of what went wrong
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: String) -> Self {
        Self { detail }
    }
}

// ============================================
// Usage Info
// ============================================

/// Serializes usage rows with a field set chosen per request.
///
/// Record rows and grouped rows go through the same accessor, so keys that a
/// grouped row does not carry come out as `null`.
#[derive(Debug, Clone)]
pub struct UsageRowSerializer {
    fields: Arc<[UsageField]>,
}

impl UsageRowSerializer {
    pub fn new(fields: Vec<UsageField>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    /// The data fields, plus `cpi` when the query asked for it
    pub fn for_query(query: &UsageQuery) -> Self {
        let mut fields = UsageField::DATA_FIELDS.to_vec();
        if query.include_cpi {
            fields.push(UsageField::Cpi);
        }
        Self::new(fields)
    }

    pub fn serialize_rows(&self, rows: Vec<UsageRow>) -> Vec<SerializedUsageRow> {
        rows.into_iter()
            .map(|row| SerializedUsageRow {
                row,
                fields: self.fields.clone(),
            })
            .collect()
    }
}

/// A row paired with the fields to emit for it
#[derive(Debug, Clone)]
pub struct SerializedUsageRow {
    row: UsageRow,
    fields: Arc<[UsageField]>,
}

impl Serialize for SerializedUsageRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in self.fields.iter() {
            map.serialize_entry(field.as_str(), &self.row.get(*field))?;
        }
        map.end()
    }
}

/// Paginated list of usage rows
#[derive(Debug, Serialize, ToSchema)]
pub struct UsageInfoListResponse {
    /// Total number of rows (or groups) matching the query
    pub count: i64,
    /// Link to the next page, if any
    pub next: Option<String>,
    /// Link to the previous page, if any
    pub previous: Option<String>,
    /// Usage rows: date, channel, country, os, impressions, clicks, installs,
    /// spend, revenue, and cpi when requested
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<SerializedUsageRow>,
}
