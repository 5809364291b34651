use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;
use crate::host::Host;
use crate::kits::basic::to_safe_string;
use crate::utils::error::CoreError;

/// The closed enumeration of builtin configuration fields. Declared
/// session fields extend the key space, but only through validation at
/// bridge construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SessionId,
    SessionKey,
    BaseUrl,
    KeywordFilterList,
    FilterEnabled,
    ManualCheckEnabled,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::SessionId,
        ConfigKey::SessionKey,
        ConfigKey::BaseUrl,
        ConfigKey::KeywordFilterList,
        ConfigKey::FilterEnabled,
        ConfigKey::ManualCheckEnabled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::SessionId => "sessionId",
            ConfigKey::SessionKey => "sessionKey",
            ConfigKey::BaseUrl => "baseUrl",
            ConfigKey::KeywordFilterList => "keywordFilterList",
            ConfigKey::FilterEnabled => "filterEnabled",
            ConfigKey::ManualCheckEnabled => "manualCheckEnabled",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

/// The persisted key-value document backing dynamic attributes. Declared
/// session-field keys ride along in `session_fields`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    pub session_id: i64,
    pub session_key: String,
    pub base_url: String,
    pub keyword_filter_list: Vec<String>,
    pub filter_enabled: bool,
    pub manual_check_enabled: bool,
    #[serde(flatten)]
    pub session_fields: BTreeMap<String, Value>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            session_id: 0,
            session_key: String::new(),
            base_url: String::new(),
            keyword_filter_list: Vec::new(),
            filter_enabled: true,
            manual_check_enabled: true,
            session_fields: BTreeMap::new(),
        }
    }
}

impl ConfigDocument {
    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Validated bridge over the host's persistence collaborator. The store
/// is process-wide shared state; every write is a full read-modify-write
/// with last-write-wins semantics under concurrent external writers.
pub struct ConfigBridge<H: Host> {
    host: Rc<H>,
    defaults: ConfigDocument,
    declared: Vec<String>,
}

impl<H: Host> std::fmt::Debug for ConfigBridge<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBridge")
            .field("defaults", &self.defaults)
            .field("declared", &self.declared)
            .finish_non_exhaustive()
    }
}

impl<H: Host> ConfigBridge<H> {
    pub fn new(host: Rc<H>, mut defaults: ConfigDocument, declared_fields: Vec<String>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for key in &declared_fields {
            if ConfigKey::parse(key).is_some() {
                return Err(CoreError::Validation(format!(
                    "declared session field {key:?} collides with a builtin config key"
                )));
            }
            if !seen.insert(key.clone()) {
                return Err(CoreError::Validation(format!(
                    "session field {key:?} is declared twice"
                )));
            }
            defaults
                .session_fields
                .entry(key.clone())
                .or_insert(Value::String(String::new()));
        }

        // defaults may carry extra fields of their own; treat them as declared
        let mut declared = declared_fields;
        for key in defaults.session_fields.keys() {
            if !declared.iter().any(|declared_key| declared_key == key) {
                declared.push(key.clone());
            }
        }

        Ok(Self {
            host,
            defaults,
            declared,
        })
    }

    pub fn declared_fields(&self) -> &[String] {
        &self.declared
    }

    pub fn is_declared(&self, key: &str) -> bool {
        ConfigKey::parse(key).is_some() || self.declared.iter().any(|declared| declared == key)
    }

    /// Reads the whole document. Missing or corrupt persisted data is
    /// silently reset to the declared defaults; this never fails.
    pub fn read_all(&self) -> ConfigDocument {
        let raw = self.host.read_store();
        match self.revive(&raw) {
            Some(document) => document,
            None => {
                let defaults = self.defaults.clone();
                self.persist(&defaults);
                self.host.log("config store reset to defaults");
                tracing::warn!("config store was missing or corrupt, reset to defaults");
                defaults
            }
        }
    }

    fn revive(&self, raw: &str) -> Option<ConfigDocument> {
        if raw.trim().is_empty() {
            return None;
        }
        let value: Value = serde_json::from_str(raw).ok()?;
        let mut map = value.as_object()?.clone();
        // every declared key must resolve even if an external writer
        // dropped it from the persisted document
        for (key, default) in self.defaults.to_map() {
            map.entry(key).or_insert(default);
        }
        serde_json::from_value(Value::Object(map)).ok()
    }

    fn persist(&self, document: &ConfigDocument) {
        match serde_json::to_string(document) {
            Ok(raw) => self.host.write_store(&raw),
            Err(e) => tracing::error!("failed to serialize config document: {}", e),
        }
    }

    /// Convenience over `read_all` for a single declared key.
    pub fn read_key(&self, key: &str) -> Result<Value> {
        if !self.is_declared(key) {
            return Err(CoreError::Validation(format!("unknown config key {key:?}")));
        }
        let map = self.read_all().to_map();
        Ok(map.get(key).cloned().unwrap_or(Value::Null))
    }

    /// Read-modify-write of the entire document. Returns the confirmation
    /// message recorded by the host log.
    pub fn write_key(&self, key: &str, value: Value) -> Result<String> {
        let mut document = self.read_all();
        let rendered = to_safe_string(&value);
        self.apply(&mut document, key, value)?;
        self.persist(&document);
        Ok(self.host.log(&format!("set {key} to {rendered}")) + "\n")
    }

    fn apply(&self, document: &mut ConfigDocument, key: &str, value: Value) -> Result<()> {
        match ConfigKey::parse(key) {
            Some(ConfigKey::SessionId) => document.session_id = coerce(key, value)?,
            Some(ConfigKey::SessionKey) => document.session_key = coerce(key, value)?,
            Some(ConfigKey::BaseUrl) => document.base_url = coerce(key, value)?,
            Some(ConfigKey::KeywordFilterList) => {
                document.keyword_filter_list = coerce(key, value)?
            }
            Some(ConfigKey::FilterEnabled) => document.filter_enabled = coerce(key, value)?,
            Some(ConfigKey::ManualCheckEnabled) => {
                document.manual_check_enabled = coerce(key, value)?
            }
            None if self.is_declared(key) => {
                document.session_fields.insert(key.to_string(), value);
            }
            None => {
                return Err(CoreError::Validation(format!("unknown config key {key:?}")));
            }
        }
        Ok(())
    }
}

fn coerce<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| CoreError::Parse(format!("value for {key} has the wrong shape: {e}")))
}
