pub mod types;
pub mod registry;
pub mod memory;
pub mod file;
pub mod wp_cli;

pub use types::{ActivationSnapshot, PluginDescriptor};
pub use registry::{PluginRegistry, RegistryError};
pub use memory::InMemoryRegistry;
pub use file::{JsonFileRegistry, RegistryState};
pub use wp_cli::WpCliRegistry;

pub type Result<T> = registry::Result<T>;
