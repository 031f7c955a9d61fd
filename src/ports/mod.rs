pub mod spreadsheet;
pub mod warehouse;
