//! Authentication and authorization.
//!
//! - [`session`]: HS512 bearer tokens
//! - [`password`]: Argon2 password hashing
//! - [`permissions`]: the authority catalog and default role grants
//! - [`identity`]: resolving a token subject to a fresh authority set
//! - [`middleware`]: the authorization gate applied to every request
//! - [`current_user`]: extractor handing the resolved identity to handlers
//!
//! # Request flow
//!
//! 1. The gate looks up what the route requires. Public routes skip everything below.
//! 2. The bearer token is verified; a missing, malformed, tampered or expired token is a 401.
//! 3. The token's email is resolved against the store, so role and permission edits apply on the
//!    caller's next request.
//! 4. A required authority missing from the set is a 403.

pub mod current_user;
pub mod identity;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod session;
