//! Long-running maintenance tasks.

pub mod session_cleanup;
