//! Site registry loading from the sites root directory.

mod loader;

pub use loader::{load_registry, site_dir};
