use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::host::Host;
use crate::kits::basic::{
    DEFAULT_ELLIPSIS, DEFAULT_TRUNCATE_LEN, MAX_CHAIN_DEPTH, MAX_LINK_MESSAGE_LEN,
    flatten_error_chain, to_safe_string, truncate_middle,
};
use crate::utils::error::{CoreError, WrappedError};

/// Truncation limit for logged operation results.
pub const RESULT_LOG_LEN: usize = 1000;
/// Truncation limit for user notifications.
pub const NOTIFY_LEN: usize = 10_000;

/// Describes one wrapped operation: its name, a rendering of its
/// arguments, reporting flags and optional failure context. The receiver
/// binding of the original design is carried by the operation closure.
#[derive(Debug, Clone)]
pub struct CallSpec {
    pub name: String,
    pub args: Vec<Value>,
    pub log: bool,
    pub toast: bool,
    pub long_toast: bool,
    pub message: Option<String>,
    pub position: Option<String>,
    pub terminal: bool,
    pub user_call: bool,
}

impl CallSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            log: true,
            toast: false,
            long_toast: false,
            message: None,
            position: None,
            terminal: false,
            user_call: false,
        }
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Suppresses result logging for chatty inner operations.
    pub fn quiet(mut self) -> Self {
        self.log = false;
        self
    }

    pub fn toast(mut self) -> Self {
        self.toast = true;
        self
    }

    pub fn long_toast(mut self) -> Self {
        self.long_toast = true;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Marks the outermost boundary of a wrap chain, responsible for
    /// user-facing failure reporting.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// User-initiated call: reports like a terminal boundary and
    /// long-toasts the result.
    pub fn user_call(mut self) -> Self {
        self.user_call = true;
        self
    }

    fn extra_context(&self) -> Option<String> {
        let mut lines = Vec::new();
        if let Some(message) = &self.message {
            lines.push(message.clone());
        }
        if !self.name.trim().is_empty() {
            let args = truncate_middle(
                &to_safe_string(&self.args),
                DEFAULT_TRUNCATE_LEN,
                DEFAULT_ELLIPSIS,
            );
            lines.push(format!("while calling \"{}({args})\"", self.name));
        }
        if let Some(position) = &self.position {
            lines.push(format!("at {position}"));
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Executes operations with consistent truncated logging, user
/// notification and cause-chain error propagation. Failures are always
/// rethrown, never swallowed.
pub struct Wrapper<H: Host> {
    host: Rc<H>,
}

impl<H: Host> Wrapper<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self { host }
    }

    pub fn run<T, F>(&self, spec: &CallSpec, op: F) -> Result<T>
    where
        T: Serialize,
        F: FnOnce() -> Result<T>,
    {
        self.run_rendered(spec, op, |value| to_safe_string(value))
    }

    /// Variant for results the host cannot serialize; `render` supplies
    /// the log rendering.
    pub fn run_rendered<T, F, R>(&self, spec: &CallSpec, op: F, render: R) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
        R: Fn(&T) -> String,
    {
        let outcome = if spec.name.trim().is_empty() {
            Err(CoreError::Validation(
                "operation descriptor has no operation name".to_string(),
            ))
        } else {
            op()
        };

        match outcome {
            Ok(value) => {
                let rendered = truncate_middle(&render(&value), RESULT_LOG_LEN, DEFAULT_ELLIPSIS);
                if spec.log {
                    self.host.log(&rendered);
                }
                if spec.user_call || spec.long_toast {
                    self.host.long_toast(&rendered);
                } else if spec.toast {
                    self.host.toast(&rendered);
                }
                Ok(value)
            }
            Err(cause) => {
                tracing::debug!(operation = %spec.name, "wrapped operation failed: {}", cause);
                let mut wrapped = WrappedError::wrap(cause);
                wrapped.extra = spec.extra_context();
                let error = CoreError::Wrapped(Box::new(wrapped));
                if spec.terminal || spec.user_call {
                    let report = flatten_error_chain(&error, MAX_CHAIN_DEPTH, MAX_LINK_MESSAGE_LEN);
                    self.long_toast_log(&report);
                }
                Err(error)
            }
        }
    }

    /// Logs then toasts the same (truncated) text.
    pub fn toast_log(&self, text: &str) {
        let text = truncate_middle(text, NOTIFY_LEN, DEFAULT_ELLIPSIS);
        let logged = self.host.log(&text);
        self.host.toast(&logged);
    }

    /// Logs then long-toasts the same (truncated) text.
    pub fn long_toast_log(&self, text: &str) {
        let text = truncate_middle(text, NOTIFY_LEN, DEFAULT_ELLIPSIS);
        let logged = self.host.log(&text);
        self.host.long_toast(&logged);
    }
}
