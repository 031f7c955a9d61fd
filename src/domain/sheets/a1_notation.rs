use std::fmt::Formatter;

use super::cell_position::CellPosition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Notation(String);

impl A1Notation {
    /// A range covering every cell of the sheet titled `sheet_name`.
    pub fn whole_sheet(sheet_name: &str) -> Self {
        A1Notation(quote_sheet_name(sheet_name))
    }
}

impl std::fmt::Display for A1Notation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for A1Notation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub trait ToA1Notation {
    fn to_a1_notation(&self, sheet_name: Option<&str>) -> A1Notation;
}

impl ToA1Notation for CellPosition {
    fn to_a1_notation(&self, sheet_name: Option<&str>) -> A1Notation {
        match sheet_name {
            Some(sheet_name) => A1Notation(format!("{}!{}", quote_sheet_name(sheet_name), self)),
            None => A1Notation(self.to_string()),
        }
    }
}

// Single quotes inside a sheet name are escaped by doubling them.
fn quote_sheet_name(sheet_name: &str) -> String {
    format!("'{}'", sheet_name.replace('\'', "''"))
}
