//! Query-parameter validation for the usage info list endpoint.
//!
//! Raw parameters are turned into a [`UsageQuery`], the validated plan the
//! repositories execute. Unknown parameters are ignored.

use super::models::{UsageField, DATE_FORMAT};
use super::ports::UsageInfoError;
use chrono::NaiveDate;
use std::collections::HashMap;

pub const PARAM_DATE_FROM: &str = "date_from";
pub const PARAM_DATE_TO: &str = "date_to";
pub const PARAM_CHANNELS: &str = "channels";
pub const PARAM_COUNTRIES: &str = "countries";
pub const PARAM_OS: &str = "os";
pub const PARAM_GROUP_BY: &str = "group_by";
pub const PARAM_SORT_BY: &str = "sort_by";
pub const PARAM_CPI: &str = "cpi";

/// Row filters, combined with AND. Applied before grouping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageFilters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub channels: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
    pub os: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: UsageField,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: UsageField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: UsageField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Validated list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageQuery {
    pub filters: UsageFilters,
    pub group_by: Vec<UsageField>,
    pub sort_by: Vec<SortKey>,
    pub include_cpi: bool,
}

impl UsageQuery {
    /// Validate raw query parameters and build the query plan
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, UsageInfoError> {
        let param = |name: &str| params.get(name).map(String::as_str);

        let filters = UsageFilters {
            date_from: param(PARAM_DATE_FROM)
                .map(|raw| parse_date(PARAM_DATE_FROM, raw))
                .transpose()?,
            date_to: param(PARAM_DATE_TO)
                .map(|raw| parse_date(PARAM_DATE_TO, raw))
                .transpose()?,
            channels: param(PARAM_CHANNELS)
                .map(|raw| parse_comma_list(PARAM_CHANNELS, raw))
                .transpose()?,
            countries: param(PARAM_COUNTRIES)
                .map(|raw| parse_comma_list(PARAM_COUNTRIES, raw))
                .transpose()?,
            os: param(PARAM_OS)
                .map(|raw| parse_comma_list(PARAM_OS, raw))
                .transpose()?,
        };

        let group_by = match param(PARAM_GROUP_BY) {
            Some(raw) => parse_group_by(raw)?,
            None => Vec::new(),
        };

        let sort_by = match param(PARAM_SORT_BY) {
            Some(raw) => parse_sort_by(raw)?,
            None => Vec::new(),
        };

        let query = Self {
            filters,
            group_by,
            sort_by,
            include_cpi: param(PARAM_CPI) == Some("1"),
        };
        query.check_sort_keys()?;
        Ok(query)
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Sort keys that can change row order. A dimension left out of `group_by`
    /// is null on every grouped row, so it is skipped.
    pub fn effective_sort_keys(&self) -> impl Iterator<Item = &SortKey> + '_ {
        self.sort_by.iter().filter(move |key| {
            !self.is_grouped() || !key.field.is_dimension() || self.group_by.contains(&key.field)
        })
    }

    /// `cpi` can only be sorted on when it is part of the output
    fn check_sort_keys(&self) -> Result<(), UsageInfoError> {
        let sorts_by_cpi = self.sort_by.iter().any(|key| key.field == UsageField::Cpi);
        if sorts_by_cpi && !self.include_cpi {
            return Err(UsageInfoError::invalid(
                PARAM_SORT_BY,
                format!("Cannot sort by '{}' unless {PARAM_CPI}=1 is requested", UsageField::Cpi),
            ));
        }
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(param: &str, raw: &str) -> Result<NaiveDate, UsageInfoError> {
    let invalid = || {
        UsageInfoError::invalid(
            param,
            format!("Invalid date format for '{param}': {raw:?}. Expected YYYY-MM-DD"),
        )
    };
    // chrono alone would accept signs and padding around the numbers
    if !has_date_shape(raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())
}

/// Four digit year, then one or two digit month and day
fn has_date_shape(raw: &str) -> bool {
    fn digits(part: &str, min_len: usize, max_len: usize) -> bool {
        (min_len..=max_len).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    }

    let mut parts = raw.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day), None) => {
            digits(year, 4, 4) && digits(month, 1, 2) && digits(day, 1, 2)
        }
        _ => false,
    }
}

/// Split a comma separated value. Every element must be non-empty and not purely numeric.
pub fn parse_comma_list(param: &str, raw: &str) -> Result<Vec<String>, UsageInfoError> {
    raw.split(',')
        .map(|element| {
            let element = element.trim();
            if element.is_empty() || element.chars().all(|c| c.is_ascii_digit()) {
                Err(UsageInfoError::invalid(
                    param,
                    format!(
                        "Invalid comma separated value for '{param}': {raw:?} (element {element:?})"
                    ),
                ))
            } else {
                Ok(element.to_string())
            }
        })
        .collect()
}

fn parse_group_by(raw: &str) -> Result<Vec<UsageField>, UsageInfoError> {
    let mut fields = Vec::new();
    for element in parse_comma_list(PARAM_GROUP_BY, raw)? {
        let field = UsageField::parse(&element)
            .filter(UsageField::is_dimension)
            .ok_or_else(|| not_allowed(PARAM_GROUP_BY, &element, &UsageField::GROUPABLE))?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    Ok(fields)
}

fn parse_sort_by(raw: &str) -> Result<Vec<SortKey>, UsageInfoError> {
    parse_comma_list(PARAM_SORT_BY, raw)?
        .into_iter()
        .map(|element| {
            let (name, descending) = match element.strip_prefix('-') {
                Some(name) => (name, true),
                None => (element.as_str(), false),
            };
            UsageField::parse(name)
                .map(|field| SortKey { field, descending })
                .ok_or_else(|| not_allowed(PARAM_SORT_BY, &element, &UsageField::SORTABLE))
        })
        .collect()
}

fn not_allowed(param: &str, element: &str, allowed: &[UsageField]) -> UsageInfoError {
    let choices = allowed
        .iter()
        .map(UsageField::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    UsageInfoError::invalid(
        param,
        format!("The {element:?} field is not allowed in '{param}'. Choose from: {choices}"),
    )
}
