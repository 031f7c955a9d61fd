use thiserror::Error;

use crate::domain::result_table::ResultTable;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarehouseError {
    #[error("Failed to connect to the warehouse")]
    Connection,
    #[error("Failed to execute query")]
    Query,
    #[error("Failed to close the warehouse connection")]
    Close,
}

/// An open connection to a SQL warehouse.
#[async_trait::async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs `query` to completion and materializes the whole result set in memory.
    async fn execute(&self, query: &str) -> error_stack::Result<ResultTable, WarehouseError>;

    /// Releases the connection. Further calls to [`Warehouse::execute`] fail.
    async fn close(&mut self) -> error_stack::Result<(), WarehouseError>;
}
