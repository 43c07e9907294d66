//! Well-known role label constants.
//!
//! Roles are opaque labels carried in tokens; this crate never interprets
//! them beyond assigning [`ROLE_USER`] at registration.

pub const ROLE_USER: &str = "user";

/// Role assigned to newly registered principals unless configured otherwise.
pub const DEFAULT_ROLE: &str = ROLE_USER;
