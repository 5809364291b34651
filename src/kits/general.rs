use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Value, json};

use crate::Result;
use crate::config::{ConfigBridge, ConfigDocument, ConfigKey};
use crate::host::Host;
use crate::kits::basic::{self, BasicKit};
use crate::utils::error::CoreError;
use crate::wrapper::{CallSpec, Wrapper};

/// Request descriptor. When no absolute URL is given the descriptor is
/// encoded as `path,{options-json}` joined onto the base URL, which is
/// the wire format the host's URL loader understands.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSpec {
    pub url: Option<String>,
    pub base_url: Option<String>,
    pub relative_path: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub use_web_view: bool,
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self {
            url: None,
            base_url: None,
            relative_path: String::new(),
            method: "POST".to_string(),
            headers: BTreeMap::new(),
            body: String::new(),
            use_web_view: false,
        }
    }
}

impl RequestSpec {
    pub fn to(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    fn encode(&self, default_base: &str) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let options = json!({
            "headers": self.headers,
            "body": self.body,
            "method": self.method,
            "useWebView": self.use_web_view,
        });
        let base = self.base_url.as_deref().unwrap_or(default_base);
        basic::join_url(&format!("{},{}", self.relative_path, options), base)
    }
}

/// Capability level built on the host's common services: config-backed
/// dynamic attributes, notification helpers, request dispatch and
/// structured-content helpers. Embeds the basic kit and forwards to it.
pub struct GeneralKit<H: Host> {
    pub(crate) host: Rc<H>,
    pub(crate) basic: BasicKit,
    pub(crate) store: ConfigBridge<H>,
    pub(crate) wrapper: Wrapper<H>,
}

impl<H: Host> GeneralKit<H> {
    pub fn new(host: Rc<H>, defaults: ConfigDocument, session_fields: Vec<String>) -> Result<Self> {
        let store = ConfigBridge::new(host.clone(), defaults, session_fields)?;
        Ok(Self {
            basic: BasicKit,
            wrapper: Wrapper::new(host.clone()),
            store,
            host,
        })
    }

    pub fn basic(&self) -> &BasicKit {
        &self.basic
    }

    pub fn wrapper(&self) -> &Wrapper<H> {
        &self.wrapper
    }

    pub fn store(&self) -> &ConfigBridge<H> {
        &self.store
    }

    pub fn read_config(&self) -> ConfigDocument {
        self.store.read_all()
    }

    pub fn write_config(&self, key: &str, value: Value) -> Result<String> {
        self.store.write_key(key, value)
    }

    // Dynamic attributes. Reads always go back to the persisted document,
    // writes persist the whole document immediately.

    pub fn session_id(&self) -> i64 {
        self.store.read_all().session_id
    }

    pub fn set_session_id(&self, value: i64) -> Result<String> {
        self.store.write_key(ConfigKey::SessionId.name(), json!(value))
    }

    pub fn session_key(&self) -> String {
        self.store.read_all().session_key
    }

    pub fn set_session_key(&self, value: &str) -> Result<String> {
        self.store.write_key(ConfigKey::SessionKey.name(), json!(value))
    }

    pub fn base_url(&self) -> String {
        self.store.read_all().base_url
    }

    pub fn set_base_url(&self, value: &str) -> Result<String> {
        self.store.write_key(ConfigKey::BaseUrl.name(), json!(value))
    }

    pub fn keyword_filter_list(&self) -> Vec<String> {
        self.store.read_all().keyword_filter_list
    }

    pub fn set_keyword_filter_list(&self, value: &[String]) -> Result<String> {
        self.store
            .write_key(ConfigKey::KeywordFilterList.name(), json!(value))
    }

    pub fn filter_enabled(&self) -> bool {
        self.store.read_all().filter_enabled
    }

    pub fn set_filter_enabled(&self, value: bool) -> Result<String> {
        self.store.write_key(ConfigKey::FilterEnabled.name(), json!(value))
    }

    pub fn manual_check_enabled(&self) -> bool {
        self.store.read_all().manual_check_enabled
    }

    pub fn set_manual_check_enabled(&self, value: bool) -> Result<String> {
        self.store
            .write_key(ConfigKey::ManualCheckEnabled.name(), json!(value))
    }

    pub fn session_field(&self, key: &str) -> Result<Value> {
        self.store.read_key(key)
    }

    pub fn set_session_field(&self, key: &str, value: Value) -> Result<String> {
        self.store.write_key(key, value)
    }

    /// Safe-stringifies the parts, joins them and both logs and toasts
    /// the result.
    pub fn notify_log<T: Serialize>(&self, parts: &[T]) {
        self.wrapper.toast_log(&join_parts(parts));
    }

    pub fn notify_long_log<T: Serialize>(&self, parts: &[T]) {
        self.wrapper.long_toast_log(&join_parts(parts));
    }

    /// Encodes the descriptor and hands it to the host fetch.
    pub fn request(&self, spec: &RequestSpec) -> Result<String> {
        let url = spec.encode(&self.base_url());
        self.host.log(&format!("requesting {url}"));
        tracing::debug!(%url, "dispatching host fetch");
        self.host.fetch(&url)
    }

    /// Parses a source: URLs are fetched first, markup is parsed
    /// directly.
    pub fn parse(&self, src: &str) -> Result<H::Content> {
        if src.starts_with("http") {
            let markup = self.request(&RequestSpec::to(src))?;
            self.host.parse(&markup)
        } else {
            self.host.parse(src)
        }
    }

    /// Single-selector element query; an empty result is a failure at
    /// this level.
    pub fn select(&self, content: &H::Content, selector: &str) -> Result<Vec<H::Content>> {
        let elements = self.host.query(content, selector)?;
        if elements.is_empty() {
            return Err(CoreError::EmptySelection {
                subject: selector.to_string(),
            });
        }
        Ok(elements)
    }

    /// Single-selector text query; an empty result is a failure at this
    /// level.
    pub fn select_text(&self, content: &H::Content, selector: &str) -> Result<String> {
        let text = self.host.query_text(content, selector, false)?;
        if text.is_empty() {
            return Err(CoreError::EmptySelection {
                subject: selector.to_string(),
            });
        }
        Ok(text)
    }

    /// Text of the parsed source with all markup stripped.
    pub fn strip_markup(&self, src: &str) -> Result<String> {
        let content = self.parse(src)?;
        Ok(self.host.text_of(&content))
    }

    /// Config-backed base URL; shadows the basic kit's two-argument form.
    pub fn join_url(&self, relative: &str) -> String {
        basic::join_url(relative, &self.base_url())
    }

    pub(crate) fn launch_current_page(&self) {
        let url = self.base_url();
        self.host.open_in_browser(&url, &self.host.tag());
    }

    /// Opens the configured base URL in the host browser. User-initiated,
    /// so failures are reported in full.
    pub fn open_current_page(&self) -> Result<()> {
        let spec = CallSpec::named("open_current_page")
            .user_call()
            .message("tried to open the current page, check that the source site is reachable");
        self.wrapper.run(&spec, || {
            self.launch_current_page();
            Ok(())
        })
    }
}

fn join_parts<T: Serialize>(parts: &[T]) -> String {
    parts
        .iter()
        .map(basic::to_safe_string)
        .collect::<Vec<_>>()
        .join("\n")
}
