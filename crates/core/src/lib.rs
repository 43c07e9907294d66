//! Keyward core: dependency-light building blocks shared by the store and
//! the authentication engine.
//!
//! Nothing in this crate performs I/O. Types, the error taxonomy, the
//! lockout policy, identifier validation, and the clock abstraction live
//! here so both the repository layer and the engine can use them.

pub mod clock;
pub mod error;
pub mod identifier;
pub mod lockout;
pub mod roles;
pub mod types;
