pub mod sheet_writer;
pub mod sync_routine;

#[cfg(test)]
pub(crate) mod testing;
