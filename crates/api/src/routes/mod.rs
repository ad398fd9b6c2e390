pub mod api;
pub mod health;
pub mod usage_info;
