//! Site-agnostic runtime beneath content-source extraction scripts:
//! capability-layered kits built over a host interface, a resilient
//! execution wrapper with cause-chain reporting, and a fallback-selector
//! engine that assembles structured records from unstable page markup.

pub mod config;
pub mod host;
pub mod kits;
pub mod utils;
pub mod wrapper;

// Re-export commonly used types
pub use config::{ConfigBridge, ConfigDocument, ConfigKey};
pub use host::{Host, HtmlContent, MemoryHost};
pub use kits::{
    BasicKit, ExtractRequest, ExtractionKit, GeneralKit, Kit, KitBuilder, Level, Record,
    RequestSpec, SessionKit,
};
pub use utils::error::{CoreError, ErrorLink, WrappedError};
pub use wrapper::{CallSpec, Wrapper};

pub type Result<T> = std::result::Result<T, CoreError>;
