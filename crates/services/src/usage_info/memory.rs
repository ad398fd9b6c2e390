//! In-memory [`UsageInfoRepository`] for tests.
//!
//! Mirrors the semantics of the PostgreSQL repository: filters run before
//! grouping, nulls sort last ascending and first descending, and ties fall
//! back to storage order (records) or group-key order (groups). Text compares
//! byte-wise, matching the `COLLATE "C"` sort terms of the SQL repository.

use super::models::{FieldValue, UsageGroup, UsageRecord, UsageRow};
use super::ports::UsageInfoRepository;
use super::validation::{SortKey, UsageFilters, UsageQuery};
use crate::common::RepositoryError;
use async_trait::async_trait;
use std::cmp::Ordering;

#[derive(Default)]
pub struct InMemoryUsageInfoRepository {
    records: Vec<UsageRecord>,
}

impl InMemoryUsageInfoRepository {
    pub fn new(records: Vec<UsageRecord>) -> Self {
        Self { records }
    }

    fn rows(&self, query: &UsageQuery) -> Vec<UsageRow> {
        let mut matching: Vec<&UsageRecord> = self
            .records
            .iter()
            .filter(|record| matches_filters(record, &query.filters))
            .collect();
        matching.sort_by_key(|record| record.id);

        let mut rows: Vec<UsageRow> = if query.is_grouped() {
            let mut groups: Vec<UsageGroup> = Vec::new();
            for record in matching {
                let key = UsageGroup::keyed_from(record, &query.group_by);
                let position = groups.iter().position(|group| {
                    group.date == key.date
                        && group.channel == key.channel
                        && group.country == key.country
                        && group.os == key.os
                });
                let index = position.unwrap_or_else(|| {
                    groups.push(key);
                    groups.len() - 1
                });
                groups[index].metrics.add(&record.metrics);
            }
            groups.into_iter().map(UsageRow::Group).collect()
        } else {
            matching
                .into_iter()
                .cloned()
                .map(UsageRow::Record)
                .collect()
        };

        let mut keys: Vec<SortKey> = query.effective_sort_keys().copied().collect();
        keys.extend(query.group_by.iter().copied().map(SortKey::asc));
        rows.sort_by(|a, b| compare_rows(a, b, &keys));
        rows
    }
}

fn matches_filters(record: &UsageRecord, filters: &UsageFilters) -> bool {
    let within = |values: &Option<Vec<String>>, value: &str| {
        values
            .as_ref()
            .map_or(true, |values| values.iter().any(|v| v == value))
    };

    filters.date_from.map_or(true, |from| record.date >= from)
        && filters.date_to.map_or(true, |to| record.date <= to)
        && within(&filters.channels, &record.channel)
        && within(&filters.countries, &record.country)
        && within(&filters.os, &record.os)
}

fn compare_rows(a: &UsageRow, b: &UsageRow, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_values(&a.get(key.field), &b.get(key.field));
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: &FieldValue<'_>, b: &FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        (FieldValue::Null, _) => Ordering::Greater,
        (_, FieldValue::Null) => Ordering::Less,
        (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
        (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
        (FieldValue::Count(a), FieldValue::Count(b)) => a.cmp(b),
        (FieldValue::Amount(a), FieldValue::Amount(b)) => a.total_cmp(b),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl UsageInfoRepository for InMemoryUsageInfoRepository {
    async fn count(&self, query: &UsageQuery) -> Result<i64, RepositoryError> {
        Ok(self.rows(query).len() as i64)
    }

    async fn list(
        &self,
        query: &UsageQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UsageRow>, RepositoryError> {
        Ok(self
            .rows(query)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}
