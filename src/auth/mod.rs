//! Authentication primitives.
//!
//! - token.rs: signed session tokens (issue/verify)
//! - password.rs: Argon2id hashing
//! - role.rs: roles and the single authorization predicate

pub mod password;
pub mod role;
pub mod token;

pub use role::{require_role, Role};
pub use token::{Claims, Identity, TokenCodec, TokenError, TokenKind};
