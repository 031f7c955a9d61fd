pub mod a1_notation;
pub mod cell_position;
pub mod column;
pub mod row;
