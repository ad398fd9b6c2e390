//! PostgreSQL repository for the `usage_info` table.
//!
//! Queries are assembled from the validated [`UsageQuery`]: filters become a
//! `WHERE` clause with bind parameters, `group_by` becomes `GROUP BY` with
//! summed metrics, and `sort_by` becomes `ORDER BY` on output column names.
//! Column names only ever come from [`UsageField`].

use crate::models::NewUsageRecord;
use crate::pool::DbPool;
use crate::repositories::utils::map_db_error;
use async_trait::async_trait;
use services::common::RepositoryError;
use services::usage_info::{
    UsageField, UsageFilters, UsageGroup, UsageInfoRepository, UsageMetrics, UsageQuery,
    UsageRecord, UsageRow,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

type SqlParam<'a> = &'a (dyn ToSql + Sync);

const TABLE: &str = "usage_info";

const RECORD_COLUMNS: &str =
    "id, date, channel, country, os, impressions, clicks, installs, spend, revenue";

const RECORD_CPI: &str = "CASE WHEN installs <> 0 AND spend <> 0 \
     THEN spend / installs::double precision END";

const GROUP_CPI: &str = "CASE WHEN SUM(installs) <> 0 AND SUM(spend) <> 0 \
     THEN SUM(spend) / SUM(installs)::double precision END";

const INSERT_RECORD: &str = r#"
    INSERT INTO usage_info (date, channel, country, os, impressions, clicks, installs, spend, revenue)
    VALUES (COALESCE($1, CURRENT_DATE), $2, $3, $4, $5, $6, $7, $8, $9)
"#;

pub struct PgUsageInfoRepository {
    pool: DbPool,
}

impl PgUsageInfoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of records in a single transaction, returning the number inserted
    pub async fn insert_batch(&self, records: &[NewUsageRecord]) -> Result<u64, RepositoryError> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| RepositoryError::PoolError(e.into()))?;

        let transaction = client.transaction().await.map_err(map_db_error)?;
        let statement = transaction
            .prepare(INSERT_RECORD)
            .await
            .map_err(map_db_error)?;

        let mut inserted = 0;
        for record in records {
            inserted += transaction
                .execute(
                    &statement,
                    &[
                        &record.date,
                        &record.channel,
                        &record.country,
                        &record.os,
                        &record.impressions,
                        &record.clicks,
                        &record.installs,
                        &record.spend,
                        &record.revenue,
                    ],
                )
                .await
                .map_err(map_db_error)?;
        }

        transaction.commit().await.map_err(map_db_error)?;
        Ok(inserted)
    }
}

/// `WHERE` clause for the filters, with its bind parameters numbered from `$1`
fn build_where<'a>(filters: &'a UsageFilters) -> (String, Vec<SqlParam<'a>>) {
    let mut conditions = Vec::new();
    let mut params: Vec<SqlParam<'a>> = Vec::new();

    if let Some(ref date_from) = filters.date_from {
        params.push(date_from);
        conditions.push(format!("date >= ${}", params.len()));
    }
    if let Some(ref date_to) = filters.date_to {
        params.push(date_to);
        conditions.push(format!("date <= ${}", params.len()));
    }
    for (column, values) in [
        (UsageField::Channel, &filters.channels),
        (UsageField::Country, &filters.countries),
        (UsageField::Os, &filters.os),
    ] {
        if let Some(values) = values {
            params.push(values);
            conditions.push(format!("{column} = ANY(${})", params.len()));
        }
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }
}

fn group_keys(query: &UsageQuery) -> String {
    query
        .group_by
        .iter()
        .map(UsageField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Aggregate expression for a metric column of a grouped query
fn sum_expr(metric: UsageField) -> String {
    let cast = match metric {
        UsageField::Spend | UsageField::Revenue => "double precision",
        _ => "bigint",
    };
    format!("COALESCE(SUM({metric}), 0)::{cast} AS {metric}")
}

fn select_list(query: &UsageQuery) -> String {
    let mut columns = if query.is_grouped() {
        let mut columns: Vec<String> = query
            .group_by
            .iter()
            .map(|key| key.as_str().to_string())
            .collect();
        columns.extend(UsageField::METRICS.into_iter().map(sum_expr));
        columns
    } else {
        vec![RECORD_COLUMNS.to_string()]
    };

    if query.include_cpi {
        let cpi = if query.is_grouped() { GROUP_CPI } else { RECORD_CPI };
        columns.push(format!("{cpi} AS cpi"));
    }
    columns.join(", ")
}

/// Sort term for a column. Text dimensions sort byte-wise so the order does not
/// depend on the database collation.
fn sort_term(field: UsageField, descending: bool) -> String {
    let direction = if descending { "DESC" } else { "ASC" };
    match field {
        UsageField::Channel | UsageField::Country | UsageField::Os => {
            format!("{field} COLLATE \"C\" {direction}")
        }
        _ => format!("{field} {direction}"),
    }
}

fn order_by(query: &UsageQuery) -> String {
    let mut terms: Vec<String> = query
        .effective_sort_keys()
        .map(|key| sort_term(key.field, key.descending))
        .collect();

    // Deterministic tiebreak so pages never overlap
    if query.is_grouped() {
        terms.extend(query.group_by.iter().map(|key| sort_term(*key, false)));
    } else {
        terms.push("id ASC".to_string());
    }
    format!(" ORDER BY {}", terms.join(", "))
}

/// Build the paginated list statement and its parameters
pub fn build_list_query<'a>(
    query: &'a UsageQuery,
    limit: &'a i64,
    offset: &'a i64,
) -> (String, Vec<SqlParam<'a>>) {
    let (where_clause, mut params) = build_where(&query.filters);

    let mut sql = format!("SELECT {} FROM {TABLE}{where_clause}", select_list(query));
    if query.is_grouped() {
        sql.push_str(&format!(" GROUP BY {}", group_keys(query)));
    }
    sql.push_str(&order_by(query));

    params.push(limit);
    sql.push_str(&format!(" LIMIT ${}", params.len()));
    params.push(offset);
    sql.push_str(&format!(" OFFSET ${}", params.len()));

    (sql, params)
}

/// Build the statement counting the rows (or groups) a query produces
pub fn build_count_query(query: &UsageQuery) -> (String, Vec<SqlParam<'_>>) {
    let (where_clause, params) = build_where(&query.filters);
    let sql = if query.is_grouped() {
        format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM {TABLE}{where_clause} GROUP BY {}) AS grouped_rows",
            group_keys(query)
        )
    } else {
        format!("SELECT COUNT(*) FROM {TABLE}{where_clause}")
    };
    (sql, params)
}

fn conversion_error(e: tokio_postgres::Error) -> RepositoryError {
    RepositoryError::DataConversionError(e.into())
}

fn row_to_metrics(row: &Row) -> Result<UsageMetrics, RepositoryError> {
    Ok(UsageMetrics {
        impressions: row.try_get("impressions").map_err(conversion_error)?,
        clicks: row.try_get("clicks").map_err(conversion_error)?,
        installs: row.try_get("installs").map_err(conversion_error)?,
        spend: row.try_get("spend").map_err(conversion_error)?,
        revenue: row.try_get("revenue").map_err(conversion_error)?,
    })
}

fn row_to_record(row: &Row) -> Result<UsageRecord, RepositoryError> {
    Ok(UsageRecord {
        id: row.try_get("id").map_err(conversion_error)?,
        date: row.try_get("date").map_err(conversion_error)?,
        channel: row.try_get("channel").map_err(conversion_error)?,
        country: row.try_get("country").map_err(conversion_error)?,
        os: row.try_get("os").map_err(conversion_error)?,
        metrics: row_to_metrics(row)?,
    })
}

fn row_to_group(row: &Row, keys: &[UsageField]) -> Result<UsageGroup, RepositoryError> {
    let mut group = UsageGroup {
        metrics: row_to_metrics(row)?,
        ..Default::default()
    };
    for key in keys {
        let column = key.as_str();
        match key {
            UsageField::Date => group.date = Some(row.try_get(column).map_err(conversion_error)?),
            UsageField::Channel => {
                group.channel = Some(row.try_get(column).map_err(conversion_error)?)
            }
            UsageField::Country => {
                group.country = Some(row.try_get(column).map_err(conversion_error)?)
            }
            UsageField::Os => group.os = Some(row.try_get(column).map_err(conversion_error)?),
            _ => {}
        }
    }
    Ok(group)
}

#[async_trait]
impl UsageInfoRepository for PgUsageInfoRepository {
    async fn count(&self, query: &UsageQuery) -> Result<i64, RepositoryError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| RepositoryError::PoolError(e.into()))?;

        let (sql, params) = build_count_query(query);
        let row = client.query_one(sql.as_str(), &params).await.map_err(map_db_error)?;
        row.try_get(0).map_err(conversion_error)
    }

    async fn list(
        &self,
        query: &UsageQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UsageRow>, RepositoryError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| RepositoryError::PoolError(e.into()))?;

        let (sql, params) = build_list_query(query, &limit, &offset);
        tracing::debug!(sql = %sql, "Listing usage info");

        let rows = client.query(sql.as_str(), &params).await.map_err(map_db_error)?;

        rows.iter()
            .map(|row| {
                if query.is_grouped() {
                    row_to_group(row, &query.group_by).map(UsageRow::Group)
                } else {
                    row_to_record(row).map(UsageRow::Record)
                }
            })
            .collect()
    }
}
