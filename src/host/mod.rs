pub mod html;
pub mod memory;

use crate::Result;

pub use html::HtmlContent;
pub use memory::MemoryHost;

/// Capabilities the embedding application provides to the runtime. Every
/// call is blocking; retries, timeouts and parallelism are the host's
/// concern.
pub trait Host {
    /// Opaque handle to parsed structured content. Cloning must be cheap
    /// enough to rebind per repeated element.
    type Content: Clone + std::fmt::Debug;

    // network
    fn fetch(&self, url: &str) -> Result<String>;

    // structured content
    fn parse(&self, markup: &str) -> Result<Self::Content>;
    fn query(&self, content: &Self::Content, selector: &str) -> Result<Vec<Self::Content>>;
    fn query_text(&self, content: &Self::Content, selector: &str, is_url: bool) -> Result<String>;
    fn text_of(&self, content: &Self::Content) -> String;

    // persistence; a missing store reads as the empty string
    fn read_store(&self) -> String;
    fn write_store(&self, raw: &str);

    // notification and logging; log returns the text it recorded
    fn toast(&self, text: &str);
    fn long_toast(&self, text: &str);
    fn log(&self, text: &str) -> String;

    // diagnostics
    fn open_in_browser(&self, url: &str, title: &str);

    /// Live value of a login form input, present only in login views.
    fn form_value(&self, _name: &str) -> Option<String> {
        None
    }

    /// Capability marker consulted when no level name is given to the
    /// builder.
    fn supports_selection(&self) -> bool {
        false
    }

    /// Display name of the hosting source profile.
    fn tag(&self) -> String {
        String::new()
    }
}
