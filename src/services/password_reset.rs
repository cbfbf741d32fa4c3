//! Password reset with OTP
//!
//! Checks that the three fields of a reset request are present before the
//! request is handed to the backend. Whether the passwords match or are strong
//! enough is decided by the backend only.

use anyhow::{Context, Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reset request as received from the browser, every field optional and untyped
#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordInput {
    #[serde(default)]
    session_token: Option<Value>,
    #[serde(default)]
    new_password: Option<Value>,
    #[serde(default)]
    confirm_password: Option<Value>,
}

/// Reset request as forwarded to the backend, values passed on verbatim
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResetPasswordWithOtp {
    pub session_token: Value,
    pub new_password: Value,
    pub confirm_password: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingField {
    SessionToken,
    NewPassword,
    ConfirmPassword,
}

impl MissingField {
    pub fn message(self) -> &'static str {
        match self {
            MissingField::SessionToken => "Session token is required",
            MissingField::NewPassword => "New password is required",
            MissingField::ConfirmPassword => "Confirm password is required",
        }
    }
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

pub struct PasswordResetService;

impl PasswordResetService {
    /// Parse a raw request body
    ///
    /// Fails for anything that is not a JSON object. Field values are not
    /// type checked.
    pub fn parse(body: &[u8]) -> Result<ResetPasswordInput> {
        debug!("parse() called");
        let value: Value =
            serde_json::from_slice(body).context("failed to parse reset password request")?;
        let Value::Object(_) = value else {
            bail!("reset password request is not a JSON object");
        };
        serde_json::from_value(value).context("failed to read reset password request")
    }

    /// Check the fields in fixed order, reporting only the first one missing
    pub fn validate(input: ResetPasswordInput) -> Result<ResetPasswordWithOtp, MissingField> {
        let session_token = required(input.session_token, MissingField::SessionToken)?;
        let new_password = required(input.new_password, MissingField::NewPassword)?;
        let confirm_password = required(input.confirm_password, MissingField::ConfirmPassword)?;

        Ok(ResetPasswordWithOtp {
            session_token,
            new_password,
            confirm_password,
        })
    }
}

/// Absent, `null` and `""` are missing, anything else is passed on as is
fn required(value: Option<Value>, field: MissingField) -> Result<Value, MissingField> {
    match value {
        None | Some(Value::Null) => Err(field),
        Some(Value::String(s)) if s.is_empty() => Err(field),
        Some(value) => Ok(value),
    }
}
