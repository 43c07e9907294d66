//! Row types and DTOs.

pub mod session;
pub mod user;
