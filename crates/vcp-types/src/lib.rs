//! Foundation types for VCP.
//!
//! Every other VCP crate depends on `vcp-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 digest of an encoded object record)
//! - [`UserId`] -- Opaque identifier assigned to a user at signup
//! - [`SessionToken`] -- Opaque credential bound to a user id

pub mod error;
pub mod identity;
pub mod object;

pub use error::TypeError;
pub use identity::{SessionToken, UserId};
pub use object::ObjectId;
