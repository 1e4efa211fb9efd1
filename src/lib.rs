//! Bookstore backend: the feature modules and the bootstrap that wires them
//! into a database, a module registry and an HTTP router.

pub mod app;
pub mod modules;

pub use app::{bootstrap, init_telemetry, migrate, Application};

#[cfg(test)]
pub(crate) mod testing;
