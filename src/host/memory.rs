use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::Result;
use crate::host::{Host, html};
use crate::host::html::HtmlContent;
use crate::utils::error::CoreError;

/// Offline host backed by canned responses and an in-memory store. Used
/// by the crate's own tests and by embedders exercising their extraction
/// scripts without a live site.
#[derive(Default)]
pub struct MemoryHost {
    tag: String,
    base_url: RefCell<String>,
    selection_capable: Cell<bool>,
    store: RefCell<String>,
    responses: RefCell<BTreeMap<String, String>>,
    form: RefCell<BTreeMap<String, String>>,
    logs: RefCell<Vec<String>>,
    toasts: RefCell<Vec<String>>,
    long_toasts: RefCell<Vec<String>>,
    opened: RefCell<Vec<(String, String)>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Base used when a URL-flagged text query returns a relative result.
    pub fn set_base_url(&self, base_url: impl Into<String>) {
        *self.base_url.borrow_mut() = base_url.into();
    }

    pub fn set_selection_capable(&self, capable: bool) {
        self.selection_capable.set(capable);
    }

    pub fn add_response(&self, url: impl Into<String>, body: impl Into<String>) {
        self.responses.borrow_mut().insert(url.into(), body.into());
    }

    pub fn set_form_value(&self, name: impl Into<String>, value: impl Into<String>) {
        self.form.borrow_mut().insert(name.into(), value.into());
    }

    /// Pre-seeds the persisted store, e.g. with corrupt data for
    /// self-heal tests.
    pub fn seed_store(&self, raw: impl Into<String>) {
        *self.store.borrow_mut() = raw.into();
    }

    pub fn store_raw(&self) -> String {
        self.store.borrow().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.borrow().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.toasts.borrow().clone()
    }

    pub fn long_toasts(&self) -> Vec<String> {
        self.long_toasts.borrow().clone()
    }

    pub fn opened_pages(&self) -> Vec<(String, String)> {
        self.opened.borrow().clone()
    }
}

impl Host for MemoryHost {
    type Content = HtmlContent;

    fn fetch(&self, url: &str) -> Result<String> {
        self.responses
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| CoreError::Host(format!("no response recorded for {url}")))
    }

    fn parse(&self, markup: &str) -> Result<HtmlContent> {
        Ok(HtmlContent::new(markup))
    }

    fn query(&self, content: &HtmlContent, selector: &str) -> Result<Vec<HtmlContent>> {
        html::query(content, selector)
    }

    fn query_text(&self, content: &HtmlContent, selector: &str, is_url: bool) -> Result<String> {
        html::query_text(content, selector, is_url, &self.base_url.borrow())
    }

    fn text_of(&self, content: &HtmlContent) -> String {
        html::text_of(content)
    }

    fn read_store(&self) -> String {
        self.store.borrow().clone()
    }

    fn write_store(&self, raw: &str) {
        *self.store.borrow_mut() = raw.to_string();
    }

    fn toast(&self, text: &str) {
        self.toasts.borrow_mut().push(text.to_string());
    }

    fn long_toast(&self, text: &str) {
        self.long_toasts.borrow_mut().push(text.to_string());
    }

    fn log(&self, text: &str) -> String {
        self.logs.borrow_mut().push(text.to_string());
        text.to_string()
    }

    fn open_in_browser(&self, url: &str, title: &str) {
        self.opened
            .borrow_mut()
            .push((url.to_string(), title.to_string()));
    }

    fn form_value(&self, name: &str) -> Option<String> {
        self.form.borrow().get(name).cloned()
    }

    fn supports_selection(&self) -> bool {
        self.selection_capable.get()
    }

    fn tag(&self) -> String {
        self.tag.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_uses_canned_responses() {
        let host = MemoryHost::new();
        host.add_response("http://site/list", "<ul></ul>");
        assert_eq!(host.fetch("http://site/list").unwrap(), "<ul></ul>");
        assert_eq!(host.fetch("http://site/other").unwrap_err().kind(), "HostError");
    }

    #[test]
    fn test_log_returns_recorded_text() {
        let host = MemoryHost::new();
        assert_eq!(host.log("hello"), "hello");
        assert_eq!(host.logs(), vec!["hello".to_string()]);
    }
}
