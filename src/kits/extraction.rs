use std::cell::RefCell;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::Result;
use crate::host::Host;
use crate::kits::basic::{self, DEFAULT_ELLIPSIS};
use crate::kits::general::GeneralKit;
use crate::utils::error::CoreError;
use crate::wrapper::CallSpec;

/// One extracted listing entry with the fixed field set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    pub author: String,
    pub category: String,
    pub length: String,
    pub latest_entry: String,
    pub summary: String,
    pub cover_url: String,
    pub detail_url: String,
}

/// Field/selector configuration for one extraction run. Content may be
/// pre-parsed, fetched from `listing_url`, or left to the currently bound
/// content.
#[derive(Debug, Clone)]
pub struct ExtractRequest<C> {
    pub content: Option<C>,
    pub listing_url: Option<String>,
    pub record_selectors: Vec<String>,
    pub name_selectors: Vec<String>,
    pub author_selectors: Vec<String>,
    pub category_selectors: Vec<String>,
    pub length_selectors: Vec<String>,
    pub latest_entry_selectors: Vec<String>,
    pub summary_selectors: Vec<String>,
    pub cover_url_selectors: Vec<String>,
    pub detail_url_selectors: Vec<String>,
}

// not derived: the content handle itself needs no Default
impl<C> Default for ExtractRequest<C> {
    fn default() -> Self {
        Self {
            content: None,
            listing_url: None,
            record_selectors: Vec::new(),
            name_selectors: Vec::new(),
            author_selectors: Vec::new(),
            category_selectors: Vec::new(),
            length_selectors: Vec::new(),
            latest_entry_selectors: Vec::new(),
            summary_selectors: Vec::new(),
            cover_url_selectors: Vec::new(),
            detail_url_selectors: Vec::new(),
        }
    }
}

/// Capability level for resolving unstable page structure: ordered
/// candidate rules, first success wins. Embeds the general kit.
pub struct ExtractionKit<H: Host> {
    pub(crate) general: GeneralKit<H>,
    current: RefCell<Option<H::Content>>,
}

impl<H: Host> ExtractionKit<H> {
    pub fn new(general: GeneralKit<H>) -> Self {
        Self {
            general,
            current: RefCell::new(None),
        }
    }

    pub fn general(&self) -> &GeneralKit<H> {
        &self.general
    }

    fn rebind(&self, content: Option<&H::Content>) -> Result<H::Content> {
        if let Some(content) = content {
            *self.current.borrow_mut() = Some(content.clone());
        }
        self.current
            .borrow()
            .clone()
            .ok_or_else(|| CoreError::Validation("no parse content is bound".to_string()))
    }

    /// Tries each selector's text query in order and returns the first
    /// non-empty string. All candidates empty is a valid outcome and
    /// yields the empty string.
    pub fn resolve_string(
        &self,
        selectors: &[String],
        content: Option<&H::Content>,
    ) -> Result<String> {
        self.resolve_text("resolve_string", selectors, content, false)
    }

    /// `resolve_string` with the URL hint set, so relative results are
    /// joined by the host.
    pub fn resolve_url(&self, selectors: &[String], content: Option<&H::Content>) -> Result<String> {
        self.resolve_text("resolve_url", selectors, content, true)
    }

    fn resolve_text(
        &self,
        name: &str,
        selectors: &[String],
        content: Option<&H::Content>,
        is_url: bool,
    ) -> Result<String> {
        let spec = CallSpec::named(name)
            .args(vec![json!(selectors)])
            .message(format!("tried {selectors:?} for text"))
            .quiet();
        self.general.wrapper.run(&spec, || {
            let target = self.rebind(content)?;
            for selector in selectors {
                let text = self.general.host.query_text(&target, selector, is_url)?;
                if !text.is_empty() {
                    return Ok(text);
                }
            }
            Ok(String::new())
        })
    }

    /// Tries each selector's element query in order and returns the first
    /// non-empty element set. When every candidate comes back empty the
    /// call fails with an empty-selection error naming the current page;
    /// with manual checking enabled the page is opened in the host
    /// browser first so the user can inspect the site state.
    pub fn resolve_elements(
        &self,
        selectors: &[String],
        content: Option<&H::Content>,
    ) -> Result<Vec<H::Content>> {
        let spec = CallSpec::named("resolve_elements")
            .args(vec![json!(selectors)])
            .message(format!("tried {selectors:?} for an element set"));
        self.general.wrapper.run_rendered(
            &spec,
            || {
                let target = self.rebind(content)?;
                for selector in selectors {
                    let elements = self.general.host.query(&target, selector)?;
                    if !elements.is_empty() {
                        return Ok(elements);
                    }
                }
                let page = self.general.base_url();
                if self.general.manual_check_enabled() {
                    self.general
                        .host
                        .log(&format!("opened {page} to check the site state"));
                    self.general.launch_current_page();
                }
                Err(CoreError::EmptySelection { subject: page })
            },
            |elements| format!("{} elements", elements.len()),
        )
    }

    /// Builds the record list: locate repeating elements, resolve every
    /// field per element, then apply the configured keyword filter. Runs
    /// terminally, so any failure reaches the user.
    pub fn extract_records(&self, request: ExtractRequest<H::Content>) -> Result<Vec<Record>> {
        let source_hint = match (&request.content, &request.listing_url) {
            (Some(content), _) => format!("{content:?}"),
            (None, Some(url)) => url.clone(),
            (None, None) => "the bound content".to_string(),
        };
        let spec = CallSpec::named("extract_records")
            .message(format!(
                "tried to build a record list from {}",
                basic::truncate_middle(&source_hint, 2000, DEFAULT_ELLIPSIS)
            ))
            .terminal();
        self.general.wrapper.run(&spec, || self.build_records(request))
    }

    fn build_records(&self, request: ExtractRequest<H::Content>) -> Result<Vec<Record>> {
        let content = match request.content {
            Some(content) => Some(content),
            None => match request.listing_url.as_deref() {
                Some(url) => Some(self.general.parse(url)?),
                None => None,
            },
        };
        let elements = self.resolve_elements(&request.record_selectors, content.as_ref())?;

        let mut records = Vec::with_capacity(elements.len());
        for element in &elements {
            *self.current.borrow_mut() = Some(element.clone());
            records.push(Record {
                name: self.resolve_string(&request.name_selectors, None)?,
                author: self.resolve_string(&request.author_selectors, None)?,
                category: self.resolve_string(&request.category_selectors, None)?,
                length: self.resolve_string(&request.length_selectors, None)?,
                latest_entry: self.resolve_string(&request.latest_entry_selectors, None)?,
                summary: self.resolve_string(&request.summary_selectors, None)?,
                cover_url: self.resolve_string(&request.cover_url_selectors, None)?,
                detail_url: self.resolve_string(&request.detail_url_selectors, None)?,
            });
        }

        if self.general.filter_enabled() {
            let keywords = self.general.keyword_filter_list();
            records = filter_records(records, &keywords)?;
        }
        Ok(records)
    }
}

/// Drops every record whose serialized form matches any keyword,
/// case-insensitively. Keywords are regex patterns; plain substrings work
/// unchanged. Order is preserved.
fn filter_records(records: Vec<Record>, keywords: &[String]) -> Result<Vec<Record>> {
    let mut patterns = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let pattern = RegexBuilder::new(keyword)
            .case_insensitive(true)
            .build()
            .map_err(|e| CoreError::Parse(format!("invalid filter keyword {keyword:?}: {e}")))?;
        patterns.push(pattern);
    }
    Ok(records
        .into_iter()
        .filter(|record| {
            let serialized = basic::to_safe_string(record);
            patterns.iter().all(|pattern| !pattern.is_match(&serialized))
        })
        .collect())
}
