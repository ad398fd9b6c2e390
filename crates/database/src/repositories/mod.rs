pub mod usage_info;
pub mod utils;

pub use usage_info::PgUsageInfoRepository;
