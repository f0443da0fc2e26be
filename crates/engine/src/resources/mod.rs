mod hashing;
mod location;
mod provider;
mod reload;

pub use hashing::content_digest;
pub use location::{ResourceLocation, ResourceLocationError, DEFAULT_NAMESPACE};
pub use provider::{
    DirectoryResourceProvider, MemoryResourceProvider, ResourceError, ResourceProvider,
};
pub use reload::{ReloadError, ReloadListener, ResourceReloadBus};
