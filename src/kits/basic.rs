use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::utils::error::{CoreError, ErrorLink};

pub const DEFAULT_ELLIPSIS: &str = "\n......\n";
pub const DEFAULT_TRUNCATE_LEN: usize = 500;
pub const MAX_CHAIN_DEPTH: usize = 5;
pub const MAX_LINK_MESSAGE_LEN: usize = 2000;
pub const CAUSE_MARKER: &str = "<= ";
pub const CHAIN_CONTINUATION: &str = "...";

/// Centered-ellipsis truncation. Content within the limit passes through
/// unchanged; otherwise the head and tail are kept around the ellipsis so
/// the result is exactly `max_len` characters.
pub fn truncate_middle(source: &str, max_len: usize, ellipsis: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    if chars.len() <= max_len {
        return source.to_string();
    }
    let ellipsis_len = ellipsis.chars().count();
    if max_len <= ellipsis_len {
        return ellipsis.chars().take(max_len).collect();
    }

    let keep = max_len - ellipsis_len;
    let head_len = max_len.div_ceil(2) - ellipsis_len / 2;
    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[chars.len() - (keep - head_len)..].iter().collect();
    format!("{head}{ellipsis}{tail}")
}

/// Stringification that works for host values of any shape. Scalars render
/// bare, compound values render as JSON, values the host cannot serialize
/// render as an opaque placeholder.
pub fn to_safe_string<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(text)) => text,
        Ok(Value::Null) => "null".to_string(),
        Ok(value) => value.to_string(),
        Err(_) => "<opaque>".to_string(),
    }
}

/// Joins a relative path onto a base URL without doubling or dropping the
/// boundary slash.
pub fn join_url(relative: &str, base: &str) -> String {
    if base.ends_with('/') && relative.starts_with('/') {
        format!("{}{}", &base[..base.len() - 1], relative)
    } else if !base.ends_with('/') && !relative.starts_with('/') {
        format!("{base}/{relative}")
    } else {
        format!("{base}{relative}")
    }
}

/// Renders an error and its materialized cause chain, outermost first.
/// Each link is `name: message` plus an optional extra-context line, both
/// truncated independently; links after the first carry the cause marker.
/// At most `max_depth` cause links are rendered, with a continuation
/// marker when more remain.
pub fn flatten_error_chain(error: &CoreError, max_depth: usize, max_msg_len: usize) -> String {
    let mut out = render_link(&ErrorLink::of(error), max_msg_len);
    let causes: &[ErrorLink] = match error {
        CoreError::Wrapped(wrapped) => &wrapped.causes,
        _ => &[],
    };
    for (index, link) in causes.iter().enumerate() {
        if index >= max_depth {
            out.push('\n');
            out.push_str(CHAIN_CONTINUATION);
            break;
        }
        out.push('\n');
        out.push_str(CAUSE_MARKER);
        out.push_str(&render_link(link, max_msg_len));
    }
    out
}

fn render_link(link: &ErrorLink, max_msg_len: usize) -> String {
    let mut rendered = format!(
        "{}: {}",
        link.name,
        truncate_middle(&link.message, max_msg_len, DEFAULT_ELLIPSIS)
    );
    if let Some(extra) = &link.extra {
        rendered.push('\n');
        rendered.push_str(&truncate_middle(extra, max_msg_len, DEFAULT_ELLIPSIS));
    }
    rendered
}

type PartialFn<A, R> = Rc<dyn Fn(&[A]) -> R>;

/// Partial application with explicit holes: fixed arguments are bound to
/// positions up front, the remaining holes are filled in order by later
/// `apply` calls.
pub struct Partial<A, R> {
    slots: Vec<Option<A>>,
    func: PartialFn<A, R>,
}

impl<A: Clone, R> Clone for Partial<A, R> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            func: Rc::clone(&self.func),
        }
    }
}

pub enum Applied<A, R> {
    Done(R),
    Pending(Partial<A, R>),
}

impl<A: Clone, R> Partial<A, R> {
    pub fn new(arity: usize, func: impl Fn(&[A]) -> R + 'static) -> Self {
        Self {
            slots: vec![None; arity],
            func: Rc::new(func),
        }
    }

    /// Binds a fixed argument at `position`, leaving the other slots as
    /// holes.
    pub fn bind(mut self, position: usize, value: A) -> Result<Self> {
        match self.slots.get_mut(position) {
            Some(slot) if slot.is_none() => {
                *slot = Some(value);
                Ok(self)
            }
            Some(_) => Err(CoreError::Validation(format!(
                "argument position {position} is already bound"
            ))),
            None => Err(CoreError::Validation(format!(
                "argument position {position} is out of range"
            ))),
        }
    }

    pub fn holes(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    /// Fills holes in order. Returns the result once every slot is bound,
    /// or the still-pending application when holes remain.
    pub fn apply(mut self, args: &[A]) -> Result<Applied<A, R>> {
        if args.len() > self.holes() {
            return Err(CoreError::Validation(format!(
                "{} arguments supplied for {} remaining holes",
                args.len(),
                self.holes()
            )));
        }
        let mut supplied = args.iter();
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                match supplied.next() {
                    Some(value) => *slot = Some(value.clone()),
                    None => break,
                }
            }
        }
        if self.holes() > 0 {
            return Ok(Applied::Pending(self));
        }
        let full: Vec<A> = self.slots.into_iter().flatten().collect();
        Ok(Applied::Done((self.func)(&full)))
    }
}

/// The stateless base of the capability chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicKit;

impl BasicKit {
    pub fn truncate_middle(&self, source: &str, max_len: usize, ellipsis: &str) -> String {
        truncate_middle(source, max_len, ellipsis)
    }

    pub fn to_safe_string<T: Serialize>(&self, value: &T) -> String {
        to_safe_string(value)
    }

    pub fn join_url(&self, relative: &str, base: &str) -> String {
        join_url(relative, base)
    }

    pub fn flatten_error_chain(&self, error: &CoreError) -> String {
        flatten_error_chain(error, MAX_CHAIN_DEPTH, MAX_LINK_MESSAGE_LEN)
    }

    pub fn partial<A: Clone, R>(
        &self,
        arity: usize,
        func: impl Fn(&[A]) -> R + 'static,
    ) -> Partial<A, R> {
        Partial::new(arity, func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("ABCDEFGHIJ", 6, "..", "AB..IJ")]
    #[case("short", 10, "..", "short")]
    #[case("ABCDEFGHIJ", 1, "..", ".")]
    #[case("ABCDEFGHIJ", 2, "..", "..")]
    #[case("ABCDEFGHIJ", 5, "..", "AB..J")]
    fn test_truncate_middle(
        #[case] source: &str,
        #[case] max_len: usize,
        #[case] ellipsis: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(truncate_middle(source, max_len, ellipsis), expected);
    }

    #[test]
    fn test_truncate_middle_length_invariant() {
        let long = "x".repeat(4000);
        let out = truncate_middle(&long, 1000, DEFAULT_ELLIPSIS);
        assert_eq!(out.chars().count(), 1000);
        assert!(out.contains(DEFAULT_ELLIPSIS));
    }

    #[test]
    fn test_truncate_middle_multibyte() {
        let source = "日本語のテキストです".repeat(10);
        let out = truncate_middle(&source, 20, "…");
        assert_eq!(out.chars().count(), 20);
    }

    #[rstest]
    #[case("/a", "http://x/", "http://x/a")]
    #[case("a", "http://x", "http://x/a")]
    #[case("/a", "http://x", "http://x/a")]
    #[case("a", "http://x/", "http://x/a")]
    fn test_join_url(#[case] relative: &str, #[case] base: &str, #[case] expected: &str) {
        assert_eq!(join_url(relative, base), expected);
    }

    #[test]
    fn test_to_safe_string() {
        assert_eq!(to_safe_string(&"plain text"), "plain text");
        assert_eq!(to_safe_string(&42), "42");
        assert_eq!(to_safe_string(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(to_safe_string(&()), "null");
        assert_eq!(to_safe_string(&vec!["a", "b"]), r#"["a","b"]"#);
    }

    #[test]
    fn test_flatten_single_error() {
        let error = CoreError::Parse("bad input".into());
        let out = flatten_error_chain(&error, MAX_CHAIN_DEPTH, MAX_LINK_MESSAGE_LEN);
        assert_eq!(out, "ParseError: bad input");
    }

    #[test]
    fn test_flatten_doubly_wrapped_chain() {
        let inner = CoreError::wrapped(CoreError::Parse("root failure".into()));
        let outer = CoreError::wrapped(inner);
        let out = flatten_error_chain(&outer, MAX_CHAIN_DEPTH, MAX_LINK_MESSAGE_LEN);

        let markers = out.matches(CAUSE_MARKER).count();
        assert_eq!(markers, 2);
        assert!(out.starts_with("WrappedError: root failure"));
        assert!(out.ends_with("<= ParseError: root failure"));
        assert!(!out.contains(CHAIN_CONTINUATION));
    }

    #[test]
    fn test_flatten_bounds_depth_with_continuation() {
        let mut error = CoreError::Parse("root".into());
        for _ in 0..8 {
            error = CoreError::wrapped(error);
        }
        let out = flatten_error_chain(&error, MAX_CHAIN_DEPTH, MAX_LINK_MESSAGE_LEN);
        assert_eq!(out.matches(CAUSE_MARKER).count(), MAX_CHAIN_DEPTH);
        assert!(out.ends_with(CHAIN_CONTINUATION));
    }

    #[test]
    fn test_flatten_truncates_each_field() {
        let error = CoreError::Parse("y".repeat(5000));
        let out = flatten_error_chain(&error, MAX_CHAIN_DEPTH, 2000);
        // kind prefix + truncated message
        assert!(out.chars().count() <= "ParseError: ".len() + 2000);
        assert!(out.contains(DEFAULT_ELLIPSIS));
    }

    #[test]
    fn test_partial_fills_holes_in_order() {
        let concat = Partial::new(3, |args: &[String]| args.join("-"));
        let bound = concat.bind(1, "mid".to_string()).unwrap();
        assert_eq!(bound.holes(), 2);

        let pending = match bound.apply(&["head".to_string()]).unwrap() {
            Applied::Pending(partial) => partial,
            Applied::Done(_) => panic!("one hole should remain"),
        };
        match pending.apply(&["tail".to_string()]).unwrap() {
            Applied::Done(result) => assert_eq!(result, "head-mid-tail"),
            Applied::Pending(_) => panic!("all holes were filled"),
        }
    }

    #[test]
    fn test_partial_rejects_bad_positions() {
        let partial: Partial<i64, i64> = Partial::new(2, |args| args.iter().sum());
        assert!(partial.clone().bind(5, 1).is_err());
        let bound = partial.bind(0, 1).unwrap();
        assert!(bound.clone().bind(0, 2).is_err());
        assert!(bound.apply(&[1, 2, 3]).is_err());
    }
}
