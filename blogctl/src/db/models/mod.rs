//! Database models: create/update requests going into a store and the records coming back.
//!
//! These types sit between the API models in [`crate::api::models`] and the store
//! implementations. Conversions from API requests are explicit `From` impls or constructors so
//! it is visible which fields are derived (password hashes, authors) and which are copied.

pub mod blogs;
pub mod categories;
pub mod permissions;
pub mod roles;
pub mod series;
pub mod users;

use crate::errors::Error;
use crate::types::Operation;

/// Records that can be seeded as immutable.
///
/// Immutable records are checked before any storage mutation is attempted, so a rejected
/// update or delete never reaches the store.
pub trait Protected {
    /// Lowercase entity name used in error messages
    const ENTITY: &'static str;

    fn is_immutable(&self) -> bool;

    /// Fail with [`Error::Immutable`] if this record may not undergo `operation`.
    fn ensure_mutable(&self, operation: Operation) -> Result<(), Error> {
        if !self.is_immutable() {
            return Ok(());
        }
        let verb = match operation {
            Operation::Delete => "remove",
            _ => "modify",
        };
        Err(Error::Immutable {
            message: format!("Can not {verb} default {}", Self::ENTITY),
        })
    }
}
