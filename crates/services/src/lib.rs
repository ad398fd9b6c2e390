pub mod common;
pub mod usage_info;
