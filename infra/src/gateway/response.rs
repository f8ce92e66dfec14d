//! Decoding of OTP gateway responses
//!
//! The gateway sits behind a proxy that does not always hand back clean JSON.
//! Bodies arrive in one of three shapes:
//!
//! - a JSON object
//! - a JSON string whose content is a JSON object
//! - free text with a JSON object embedded somewhere in it
//!
//! [`decode_gateway_payload`] accepts exactly these and nothing deeper.

use serde::Deserialize;
use serde_json::Value;

use sv_core::errors::{VerificationError, VerificationResult};
use sv_core::services::verification::IssuedOtp;

const SUCCESS_STATUS: &str = "success";

/// Decode a raw response body into a JSON value
pub fn decode_gateway_payload(body: &str) -> VerificationResult<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(VerificationError::malformed("empty response body"));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(inner)) => serde_json::from_str(&inner).map_err(|e| {
            VerificationError::malformed(format!("string payload is not JSON: {}", e))
        }),
        Ok(value) => Ok(value),
        Err(_) => {
            let span = first_json_object(trimmed).ok_or_else(|| {
                VerificationError::malformed("no JSON object found in response body")
            })?;
            serde_json::from_str(span).map_err(|e| {
                VerificationError::malformed(format!("embedded JSON object is invalid: {}", e))
            })
        }
    }
}

/// Find the first balanced top-level `{...}` span, ignoring braces in strings
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Gateway id field; some deployments send it as a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OtpReference {
    Text(String),
    Number(u64),
}

impl OtpReference {
    fn into_string(self) -> String {
        match self {
            OtpReference::Text(id) => id.trim().to_string(),
            OtpReference::Number(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueOtpResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    id: Option<OtpReference>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidateOtpResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

fn is_success(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.trim().eq_ignore_ascii_case(SUCCESS_STATUS))
}

/// Parse the body of a successful "issue OTP" call
///
/// # Errors
///
/// * `MalformedResponse` - the body is not one of the accepted shapes
/// * `Gateway` - the payload does not confirm the request with an id
pub fn parse_issue_response(body: &str) -> VerificationResult<IssuedOtp> {
    let payload = decode_gateway_payload(body)?;
    let response: IssueOtpResponse = serde_json::from_value(payload)
        .map_err(|e| VerificationError::malformed(format!("unexpected issue response: {}", e)))?;

    let id = response
        .id
        .map(OtpReference::into_string)
        .filter(|id| !id.is_empty());

    match id {
        Some(external_otp_id) if is_success(response.status.as_deref()) => Ok(IssuedOtp {
            external_otp_id,
            message: response.message.unwrap_or_default(),
        }),
        _ => Err(VerificationError::gateway(response.message.unwrap_or_else(
            || "OTP gateway did not confirm the request".to_string(),
        ))),
    }
}

/// Parse the body of a successful "validate OTP" call
///
/// A `response` field holding a JSON string is unwrapped once.
///
/// # Errors
///
/// * `MalformedResponse` - the body is not one of the accepted shapes
/// * `Gateway` - the gateway reports the code as not valid
pub fn parse_validate_response(body: &str) -> VerificationResult<bool> {
    let mut payload = decode_gateway_payload(body)?;

    let nested = match payload.get("response") {
        Some(Value::String(inner)) => Some(serde_json::from_str::<Value>(inner).map_err(|e| {
            VerificationError::malformed(format!("nested response is not JSON: {}", e))
        })?),
        _ => None,
    };
    if let Some(nested) = nested {
        payload = nested;
    }

    let response: ValidateOtpResponse = serde_json::from_value(payload).map_err(|e| {
        VerificationError::malformed(format!("unexpected validation response: {}", e))
    })?;

    if is_success(response.status.as_deref()) || response.valid == Some(true) {
        return Ok(true);
    }

    Err(VerificationError::gateway(
        response
            .message
            .or(response.reason)
            .unwrap_or_else(|| "OTP validation failed".to_string()),
    ))
}

/// Best-effort error text from a non-success response body
pub(crate) fn error_message(body: &str) -> String {
    let from_payload = decode_gateway_payload(body).ok().and_then(|payload| {
        ["message", "reason", "error"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_str).map(str::to_string))
    });

    from_payload.unwrap_or_else(|| {
        let text = body.trim();
        if text.is_empty() {
            "empty response body".to_string()
        } else {
            text.chars().take(200).collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_json_object_skips_braces_in_strings() {
        let text = r#"ok: {"message": "use {code}", "id": "1"} trailing }"#;
        assert_eq!(
            first_json_object(text),
            Some(r#"{"message": "use {code}", "id": "1"}"#)
        );
        assert_eq!(first_json_object(r#"{"a": {"b": 1}"#), None);
        assert_eq!(first_json_object("no braces"), None);
    }

    #[test]
    fn test_error_message_falls_back_to_body_text() {
        assert_eq!(error_message(r#"{"error": "quota exceeded"}"#), "quota exceeded");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("   "), "empty response body");
    }
}
