//! Response classification: status line first, then the body shape.

use crate::error::{excerpt, BODY_EXCERPT_CHARS};
use crate::transport::HttpResponse;
use crate::{Error, ErrorContext, Result};
use serde_json::{Map, Value};

/// Turn one HTTP response into the unwrapped payload or a typed error.
///
/// 2xx bodies come in two shapes: the `{code, msg, data}` envelope, where
/// `code == 0` is success, and bare JSON from the newer endpoints.
pub(crate) fn classify(response: &HttpResponse) -> Result<Value> {
    let status = response.status;
    let body = response.body.as_str();

    if response.is_success() {
        let parsed: Value = serde_json::from_str(body)
            .map_err(|e| Error::response_format(format!("body is not JSON: {}", e), body))?;
        return unwrap_envelope(parsed, body);
    }

    match status {
        403 => Err(Error::Permission {
            message: remote_message(body),
            context: ErrorContext::new(),
        }),
        404 => Err(Error::NotFound {
            message: remote_message(body),
            context: ErrorContext::new(),
        }),
        _ => Err(Error::Http {
            status,
            body: excerpt(body, BODY_EXCERPT_CHARS),
            context: ErrorContext::new(),
        }),
    }
}

fn unwrap_envelope(parsed: Value, raw: &str) -> Result<Value> {
    let Value::Object(mut obj) = parsed else {
        return Ok(parsed);
    };
    let Some(code) = obj.get("code").cloned() else {
        return Ok(Value::Object(obj));
    };

    match code.as_i64() {
        Some(0) => Ok(obj
            .remove("data")
            .unwrap_or_else(|| Value::Object(Map::new()))),
        Some(code) => Err(Error::Application {
            code,
            message: obj
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
            context: ErrorContext::new(),
        }),
        None => Err(Error::response_format(
            format!("envelope code is not an integer: {}", code),
            raw,
        )),
    }
}

/// Prefer the platform's `msg`, fall back to a body excerpt.
fn remote_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("msg").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| excerpt(body, BODY_EXCERPT_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn ok(body: &str) -> Result<Value> {
        classify(&HttpResponse::new(200, body))
    }

    #[test]
    fn envelope_success_returns_data() {
        let v = ok(r#"{"code":0,"msg":"ok","data":[{"name":"F1","entryId":"e1"}]}"#).unwrap();
        assert_eq!(v, json!([{"name":"F1","entryId":"e1"}]));
    }

    #[test]
    fn envelope_without_data_returns_empty_object() {
        assert_eq!(ok(r#"{"code":0,"msg":"ok"}"#).unwrap(), json!({}));
    }

    #[test]
    fn envelope_failure_carries_code_and_msg() {
        let err = ok(r#"{"code":4001,"msg":"app not exist"}"#).unwrap_err();
        match err {
            Error::Application { code, message, .. } => {
                assert_eq!(code, 4001);
                assert_eq!(message, "app not exist");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bare_body_passes_through() {
        let body = r#"{"data":{"_id":"r1"},"status":"success"}"#;
        assert_eq!(ok(body).unwrap(), json!({"data":{"_id":"r1"},"status":"success"}));
        assert_eq!(ok("[1,2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn non_json_is_response_format_error() {
        assert_eq!(ok("not json").unwrap_err().kind(), ErrorKind::ResponseFormat);
        assert_eq!(
            ok(r#"{"code":"zero"}"#).unwrap_err().kind(),
            ErrorKind::ResponseFormat
        );
    }

    #[test]
    fn status_classes() {
        let e = classify(&HttpResponse::new(403, r#"{"code":8303,"msg":"no permission"}"#))
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Permission);
        assert!(e.to_string().contains("no permission"));

        let e = classify(&HttpResponse::new(404, "<html>missing</html>")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert!(e.to_string().contains("<html>missing</html>"));

        let long = "x".repeat(500);
        match classify(&HttpResponse::new(502, long)).unwrap_err() {
            Error::Http { status, body, .. } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), BODY_EXCERPT_CHARS + 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
