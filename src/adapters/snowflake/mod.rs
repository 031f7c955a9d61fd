pub mod cells;
pub mod client;
pub mod connection;
pub mod der;
pub mod errors;
pub mod jwt;
pub mod key_material;
pub mod query;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
