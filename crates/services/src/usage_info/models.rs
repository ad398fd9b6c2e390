use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// Format used for dates on the wire and in query parameters
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Every field a usage row can expose, including the derived `cpi`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UsageField {
    Date,
    Channel,
    Country,
    Os,
    Impressions,
    Clicks,
    Installs,
    Spend,
    Revenue,
    Cpi,
}

impl UsageField {
    /// Persisted fields, in output order
    pub const DATA_FIELDS: [UsageField; 9] = [
        UsageField::Date,
        UsageField::Channel,
        UsageField::Country,
        UsageField::Os,
        UsageField::Impressions,
        UsageField::Clicks,
        UsageField::Installs,
        UsageField::Spend,
        UsageField::Revenue,
    ];

    /// Fields accepted by `group_by`
    pub const GROUPABLE: [UsageField; 4] = [
        UsageField::Date,
        UsageField::Channel,
        UsageField::Country,
        UsageField::Os,
    ];

    /// Fields accepted by `sort_by` (with or without a leading `-`)
    pub const SORTABLE: [UsageField; 10] = [
        UsageField::Date,
        UsageField::Channel,
        UsageField::Country,
        UsageField::Os,
        UsageField::Impressions,
        UsageField::Clicks,
        UsageField::Installs,
        UsageField::Spend,
        UsageField::Revenue,
        UsageField::Cpi,
    ];

    /// Summed metrics carried by grouped rows
    pub const METRICS: [UsageField; 5] = [
        UsageField::Impressions,
        UsageField::Clicks,
        UsageField::Installs,
        UsageField::Spend,
        UsageField::Revenue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageField::Date => "date",
            UsageField::Channel => "channel",
            UsageField::Country => "country",
            UsageField::Os => "os",
            UsageField::Impressions => "impressions",
            UsageField::Clicks => "clicks",
            UsageField::Installs => "installs",
            UsageField::Spend => "spend",
            UsageField::Revenue => "revenue",
            UsageField::Cpi => "cpi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::SORTABLE.into_iter().find(|field| field.as_str() == s)
    }

    /// Whether rows can be grouped on this field
    pub fn is_dimension(&self) -> bool {
        Self::GROUPABLE.contains(self)
    }
}

impl fmt::Display for UsageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summable metrics of a usage observation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageMetrics {
    pub impressions: i64,
    pub clicks: i64,
    pub installs: i64,
    pub spend: f64,
    pub revenue: f64,
}

impl UsageMetrics {
    pub fn add(&mut self, other: &UsageMetrics) {
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.installs += other.installs;
        self.spend += other.spend;
        self.revenue += other.revenue;
    }

    pub fn cpi(&self) -> Option<f64> {
        compute_cpi(self.spend, self.installs)
    }

    fn get(&self, field: UsageField) -> Option<FieldValue<'_>> {
        match field {
            UsageField::Impressions => Some(FieldValue::Count(self.impressions)),
            UsageField::Clicks => Some(FieldValue::Count(self.clicks)),
            UsageField::Installs => Some(FieldValue::Count(self.installs)),
            UsageField::Spend => Some(FieldValue::Amount(self.spend)),
            UsageField::Revenue => Some(FieldValue::Amount(self.revenue)),
            UsageField::Cpi => Some(self.cpi().map_or(FieldValue::Null, FieldValue::Amount)),
            _ => None,
        }
    }
}

/// Cost per install. Undefined (`None`) unless both spend and installs are non-zero.
pub fn compute_cpi(spend: f64, installs: i64) -> Option<f64> {
    if installs == 0 || spend == 0.0 {
        None
    } else {
        Some(spend / installs as f64)
    }
}

/// One persisted observation for a (date, channel, country, os) tuple
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub channel: String,
    pub country: String,
    pub os: String,
    pub metrics: UsageMetrics,
}

/// Aggregated row produced by `group_by`.
///
/// Only the grouped keys are populated; the others stay `None` and read back as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageGroup {
    pub date: Option<NaiveDate>,
    pub channel: Option<String>,
    pub country: Option<String>,
    pub os: Option<String>,
    pub metrics: UsageMetrics,
}

impl UsageGroup {
    /// Empty group keyed on `keys`, taking the key values from `record`
    pub fn keyed_from(record: &UsageRecord, keys: &[UsageField]) -> Self {
        let mut group = UsageGroup::default();
        for key in keys {
            match key {
                UsageField::Date => group.date = Some(record.date),
                UsageField::Channel => group.channel = Some(record.channel.clone()),
                UsageField::Country => group.country = Some(record.country.clone()),
                UsageField::Os => group.os = Some(record.os.clone()),
                _ => {}
            }
        }
        group
    }
}

/// A row of the list endpoint: either a full record or an aggregated group
#[derive(Debug, Clone, PartialEq)]
pub enum UsageRow {
    Record(UsageRecord),
    Group(UsageGroup),
}

impl UsageRow {
    /// Uniform field access across both row shapes. Absent fields read as `Null`.
    pub fn get(&self, field: UsageField) -> FieldValue<'_> {
        match self {
            UsageRow::Record(record) => match field {
                UsageField::Date => FieldValue::Date(record.date),
                UsageField::Channel => FieldValue::Text(&record.channel),
                UsageField::Country => FieldValue::Text(&record.country),
                UsageField::Os => FieldValue::Text(&record.os),
                metric => record.metrics.get(metric).unwrap_or(FieldValue::Null),
            },
            UsageRow::Group(group) => match field {
                UsageField::Date => group.date.map_or(FieldValue::Null, FieldValue::Date),
                UsageField::Channel => text_or_null(group.channel.as_deref()),
                UsageField::Country => text_or_null(group.country.as_deref()),
                UsageField::Os => text_or_null(group.os.as_deref()),
                metric => group.metrics.get(metric).unwrap_or(FieldValue::Null),
            },
        }
    }

    pub fn metrics(&self) -> &UsageMetrics {
        match self {
            UsageRow::Record(record) => &record.metrics,
            UsageRow::Group(group) => &group.metrics,
        }
    }

    pub fn cpi(&self) -> Option<f64> {
        self.metrics().cpi()
    }
}

fn text_or_null(value: Option<&str>) -> FieldValue<'_> {
    value.map_or(FieldValue::Null, FieldValue::Text)
}

/// A single field value read from a row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Date(NaiveDate),
    Text(&'a str),
    Count(i64),
    Amount(f64),
    Null,
}

impl Serialize for FieldValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Date(date) => serializer.collect_str(&date.format(DATE_FORMAT)),
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Count(count) => serializer.serialize_i64(*count),
            FieldValue::Amount(amount) => serializer.serialize_f64(*amount),
            FieldValue::Null => serializer.serialize_none(),
        }
    }
}
