//! Storage layer.
//!
//! - [`store`]: the traits handlers program against
//! - [`postgres`]: production implementation over `sqlx`
//! - [`memory`]: in-process implementation for tests and throwaway instances
//! - [`models`]: request/response records exchanged with the store
//! - [`errors`]: storage error type shared by both implementations

pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;
