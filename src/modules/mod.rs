pub mod auth;
pub mod books;
pub mod cart;
pub mod categories;

use bookstore_kernel::ModuleRegistry;

/// Register every feature module. Order matters: migrations run in this
/// order and later modules reference tables of earlier ones.
pub fn register_all(registry: &mut ModuleRegistry) -> anyhow::Result<()> {
    registry.register(auth::create_module())?;
    registry.register(categories::create_module())?;
    registry.register(books::create_module())?;
    registry.register(cart::create_module())?;
    Ok(())
}
