// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pulls the credential string out of a login response body.
//!
//! Accepted shapes, first match wins:
//! 1. a bare string (JSON string literal or non-JSON plain text),
//! 2. an object with a `sessionkey` string field,
//! 3. an object with a `token` string field.

use serde_json::Value;

use crate::credential::{Credential, CredentialError};

const SESSION_KEY_FIELD: &str = "sessionkey";
const TOKEN_FIELD: &str = "token";

/// Extract a credential from a login response body.
pub fn extract_credential(body: &[u8]) -> Result<Credential, CredentialError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::String(secret)) => non_empty(secret, "string body"),
        Ok(Value::Object(map)) => {
            let secret = [SESSION_KEY_FIELD, TOKEN_FIELD]
                .iter()
                .find_map(|field| map.get(*field).and_then(Value::as_str).filter(|s| !s.is_empty()))
                .ok_or_else(|| {
                    CredentialError::unavailable(
                        "unable to extract credential: object has no sessionkey or token field",
                    )
                })?;
            let credential = Credential::new(secret);
            Ok(match map.get("expires_in").and_then(Value::as_u64) {
                Some(secs) => credential.with_expires_in(secs),
                None => credential,
            })
        }
        Ok(other) => Err(CredentialError::unavailable(format!(
            "unable to extract credential: unexpected {} body",
            json_kind(&other)
        ))),
        Err(_) => {
            let text = std::str::from_utf8(body).map_err(|_| {
                CredentialError::unavailable("unable to extract credential: body is not UTF-8")
            })?;
            non_empty(text.trim().to_owned(), "plain-text body")
        }
    }
}

fn non_empty(secret: String, shape: &str) -> Result<Credential, CredentialError> {
    if secret.is_empty() {
        return Err(CredentialError::unavailable(format!(
            "unable to extract credential: empty {shape}"
        )));
    }
    Ok(Credential::new(secret))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
