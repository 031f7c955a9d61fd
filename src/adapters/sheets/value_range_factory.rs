use google_sheets4::api::ValueRange;
use serde_json::{Number, Value};

use crate::domain::result_table::Cell;

pub trait ValueRangeFactory {
    fn from_rows(rows: &[Vec<Cell>]) -> Self;
}

/// JSON value sent for `cell`. Nulls and non-finite floats become empty strings.
pub fn wrap_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::String(String::new()),
        Cell::Int(value) => Value::Number(Number::from(*value)),
        Cell::Float(value) => Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(String::new())),
        Cell::Bool(value) => Value::Bool(*value),
        Cell::Text(value) => Value::String(value.clone()),
    }
}

fn cells_to_values(rows: &[Vec<Cell>]) -> Vec<Vec<Value>> {
    rows.iter()
        .map(|row| row.iter().map(wrap_value).collect())
        .collect()
}

impl ValueRangeFactory for ValueRange {
    fn from_rows(rows: &[Vec<Cell>]) -> Self {
        Self {
            major_dimension: Some("ROWS".to_string()),
            range: None,
            values: Some(cells_to_values(rows)),
        }
    }
}
