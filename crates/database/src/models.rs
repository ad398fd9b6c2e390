use chrono::NaiveDate;
use serde::Deserialize;

/// A usage observation to insert, as read from a CSV export.
///
/// `date` may be left empty, in which case the database assigns the current date.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUsageRecord {
    pub date: Option<NaiveDate>,
    pub channel: String,
    pub country: String,
    pub os: String,
    pub impressions: i64,
    pub clicks: i64,
    pub installs: i64,
    pub spend: f64,
    pub revenue: f64,
}

pub const MAX_CHANNEL_LENGTH: usize = 256;
pub const MAX_COUNTRY_LENGTH: usize = 3;
pub const MAX_OS_LENGTH: usize = 60;

impl NewUsageRecord {
    /// Check the constraints the `usage_info` table enforces
    pub fn validate(&self) -> Result<(), String> {
        for (name, value, max) in [
            ("channel", &self.channel, MAX_CHANNEL_LENGTH),
            ("country", &self.country, MAX_COUNTRY_LENGTH),
            ("os", &self.os, MAX_OS_LENGTH),
        ] {
            if value.is_empty() {
                return Err(format!("{name} must not be empty"));
            }
            if value.chars().count() > max {
                return Err(format!("{name} must be at most {max} characters"));
            }
        }

        for (name, value) in [
            ("impressions", self.impressions),
            ("clicks", self.clicks),
            ("installs", self.installs),
        ] {
            if value < 0 {
                return Err(format!("{name} must be non-negative, got {value}"));
            }
        }

        for (name, value) in [("spend", self.spend), ("revenue", self.revenue)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative amount, got {value}"));
            }
        }

        Ok(())
    }
}
