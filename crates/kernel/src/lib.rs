//! Kernel of the bookstore backend: the `Module` contract, the registry that
//! drives module lifecycles, layered settings, and the state shared by every
//! request handler.

pub mod module;
pub mod registry;
pub mod settings;
pub mod state;

pub use bookstore_db::Migration;
pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
pub use settings::Settings;
pub use state::AppState;
