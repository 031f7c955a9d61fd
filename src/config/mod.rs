pub mod app_config;
pub mod sheets_config;
pub mod snowflake_config;
