pub mod basic;
pub mod extraction;
pub mod general;
pub mod session;

pub use basic::BasicKit;
pub use extraction::{ExtractRequest, ExtractionKit, Record};
pub use general::{GeneralKit, RequestSpec};
pub use session::SessionKit;

use std::rc::Rc;

use crate::Result;
use crate::config::{ConfigDocument, ConfigKey};
use crate::host::Host;

/// The capability levels, specialized-to-basic. Each level extends the
/// one beneath it by composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Basic,
    General,
    Extraction,
    Session,
}

impl Level {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(Level::Basic),
            "general" => Some(Level::General),
            "extraction" => Some(Level::Extraction),
            "session" => Some(Level::Session),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Basic => "basic",
            Level::General => "general",
            Level::Extraction => "extraction",
            Level::Session => "session",
        }
    }
}

/// A built capability module.
pub enum Kit<H: Host> {
    Basic(BasicKit),
    General(GeneralKit<H>),
    Extraction(ExtractionKit<H>),
    Session(SessionKit<H>),
}

impl<H: Host> Kit<H> {
    pub fn level(&self) -> Level {
        match self {
            Kit::Basic(_) => Level::Basic,
            Kit::General(_) => Level::General,
            Kit::Extraction(_) => Level::Extraction,
            Kit::Session(_) => Level::Session,
        }
    }
}

/// Composes capability kits over one host with one config key space.
pub struct KitBuilder<H: Host> {
    host: Rc<H>,
    defaults: ConfigDocument,
    session_fields: Vec<String>,
    login_fields: Vec<String>,
}

impl<H: Host> KitBuilder<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            defaults: ConfigDocument::default(),
            session_fields: Vec::new(),
            login_fields: Vec::new(),
        }
    }

    /// Declared defaults for the persisted config document.
    pub fn defaults(mut self, defaults: ConfigDocument) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn session_fields(mut self, fields: Vec<String>) -> Self {
        self.session_fields = fields;
        self
    }

    pub fn login_fields(mut self, fields: Vec<String>) -> Self {
        self.login_fields = fields;
        self
    }

    /// Builds the kit for a level. An explicit name wins; a missing name
    /// is inferred from the host's capability marker; an unknown name is
    /// a soft fallback to general, not an error.
    pub fn build(self, level: Option<&str>) -> Result<Kit<H>> {
        let level = match level {
            Some(name) => Level::from_name(name).unwrap_or_else(|| {
                tracing::debug!(name, "unknown capability level, falling back to general");
                Level::General
            }),
            None if self.host.supports_selection() => Level::Extraction,
            None => Level::General,
        };

        match level {
            Level::Basic => Ok(Kit::Basic(BasicKit)),
            Level::General => Ok(Kit::General(self.general(Vec::new())?)),
            Level::Extraction => Ok(Kit::Extraction(ExtractionKit::new(self.general(Vec::new())?))),
            Level::Session => {
                let login_fields = self.login_fields.clone();
                let general = self.general(login_fields.clone())?;
                Ok(Kit::Session(SessionKit::new(general, login_fields)?))
            }
        }
    }

    fn general(self, extra_fields: Vec<String>) -> Result<GeneralKit<H>> {
        let mut declared = self.session_fields;
        for field in extra_fields {
            // builtin keys already project; only new names get declared
            if ConfigKey::parse(&field).is_none() && !declared.contains(&field) {
                declared.push(field);
            }
        }
        GeneralKit::new(self.host, self.defaults, declared)
    }
}
