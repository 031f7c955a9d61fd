pub mod result_table;
pub mod sheets;
