pub mod query_file;
pub mod sheets;
pub mod snowflake;
