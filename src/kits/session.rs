use serde_json::{Value, json};

use crate::Result;
use crate::host::Host;
use crate::kits::general::GeneralKit;
use crate::utils::error::CoreError;
use crate::wrapper::CallSpec;

/// Capability level for login/session views. Its projections of the
/// declared login fields shadow the general kit's; everything else
/// forwards through `general()`.
pub struct SessionKit<H: Host> {
    pub(crate) general: GeneralKit<H>,
    login_fields: Vec<String>,
}

impl<H: Host> std::fmt::Debug for SessionKit<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKit")
            .field("login_fields", &self.login_fields)
            .finish_non_exhaustive()
    }
}

impl<H: Host> SessionKit<H> {
    pub fn new(general: GeneralKit<H>, login_fields: Vec<String>) -> Result<Self> {
        for field in &login_fields {
            if !general.store().is_declared(field) {
                return Err(CoreError::Validation(format!(
                    "login field {field:?} is not a declared config key"
                )));
            }
        }
        Ok(Self {
            general,
            login_fields,
        })
    }

    pub fn general(&self) -> &GeneralKit<H> {
        &self.general
    }

    pub fn login_fields(&self) -> &[String] {
        &self.login_fields
    }

    fn ensure_login_field(&self, name: &str) -> Result<()> {
        if self.login_fields.iter().any(|field| field == name) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "{name:?} is not a login field of this source"
            )))
        }
    }

    pub fn login_field(&self, name: &str) -> Result<Value> {
        self.ensure_login_field(name)?;
        self.general.store().read_key(name)
    }

    pub fn set_login_field(&self, name: &str, value: Value) -> Result<String> {
        self.ensure_login_field(name)?;
        self.general.store().write_key(name, value)
    }

    /// Live value of a login form input. User-initiated: the result is
    /// long-toasted and failures are reported in full.
    pub fn current_login_input(&self, name: &str) -> Result<String> {
        let spec = CallSpec::named("current_login_input")
            .args(vec![json!(name)])
            .user_call();
        self.general.wrapper().run(&spec, || {
            self.general
                .host
                .form_value(name)
                .ok_or_else(|| CoreError::Validation(format!("no login input named {name:?}")))
        })
    }
}
