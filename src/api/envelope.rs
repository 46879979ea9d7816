use serde::Serialize;
use serde_json::{Map, Value};

/// The `{status, obj}` wrapper every backend response uses.
///
/// Built field by field from the response object, so any JSON object is an
/// envelope. `status`, `admin_status` and `sub_info` arrive as booleans, 0/1
/// integers or strings depending on the endpoint; a `message` may be a
/// string, a number or a map of validation errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub status: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub obj: Option<Value>,

    /// Only a non-empty string counts as a token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(skip_serializing_if = "Value::is_null")]
    pub admin_status: Value,

    #[serde(skip_serializing_if = "Value::is_null")]
    pub sub_info: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Any other top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Interpret a decoded body. Only JSON objects are envelopes, and every
    /// object is one.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };

        let access_token = match fields.remove("access_token") {
            Some(Value::String(token)) if !token.is_empty() => Some(token),
            _ => None,
        };
        let message = fields.remove("message").as_ref().and_then(message_text);

        Some(Self {
            status: fields.remove("status").unwrap_or(Value::Null),
            obj: fields.remove("obj").filter(|obj| !obj.is_null()),
            access_token,
            admin_status: fields.remove("admin_status").unwrap_or(Value::Null),
            sub_info: fields.remove("sub_info").unwrap_or(Value::Null),
            message,
            extra: fields,
        })
    }

    /// `true` or a non-zero number. Missing, `false`, `0`, null and strings
    /// all count as failure.
    pub fn is_success(&self) -> bool {
        truthy(&self.status)
    }

    pub fn is_admin(&self) -> bool {
        truthy(&self.admin_status)
    }

    /// Secondary failure discriminator, as text
    pub fn sub_info(&self) -> Option<String> {
        scalar_text(&self.sub_info)
    }

    /// The payload, `Null` when the backend sent none
    pub fn payload(&self) -> &Value {
        self.obj.as_ref().unwrap_or(&Value::Null)
    }

    pub fn into_payload(self) -> Value {
        self.obj.unwrap_or(Value::Null)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        other => Some(other.to_string()),
    }
}

/// Human-readable text for a `message` of any shape. Validation maps such as
/// `{"email": ["taken"]}` become `email: taken`.
fn message_text(value: &Value) -> Option<String> {
    let mut parts = Vec::new();
    collect_text(None, value, &mut parts);
    (!parts.is_empty()).then(|| parts.join("; "))
}

fn collect_text(field: Option<&str>, value: &Value, parts: &mut Vec<String>) {
    let text = match value {
        Value::Null => return,
        Value::String(s) if s.trim().is_empty() => return,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => {
            for item in items {
                collect_text(field, item, parts);
            }
            return;
        }
        Value::Object(map) => {
            for (key, item) in map {
                collect_text(Some(key), item, parts);
            }
            return;
        }
    };
    match field {
        Some(field) => parts.push(format!("{}: {}", field, text)),
        None => parts.push(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        Envelope::from_value(value).expect("object should parse")
    }

    #[test]
    fn status_truthiness() {
        assert!(envelope(json!({"status": true})).is_success());
        assert!(envelope(json!({"status": 1})).is_success());
        assert!(!envelope(json!({"status": false})).is_success());
        assert!(!envelope(json!({"status": 0})).is_success());
        assert!(!envelope(json!({"status": null})).is_success());
        assert!(!envelope(json!({"status": "true"})).is_success());
        assert!(!envelope(json!({"obj": [1, 2]})).is_success());
    }

    #[test]
    fn non_objects_are_not_envelopes() {
        assert!(Envelope::from_value(json!([1, 2, 3])).is_none());
        assert!(Envelope::from_value(json!("ok")).is_none());
        assert!(Envelope::from_value(Value::Null).is_none());
    }

    #[test]
    fn login_fields_are_picked_up() {
        let env = envelope(json!({
            "status": true,
            "access_token": "tok.abc",
            "admin_status": 1,
            "branch": "north"
        }));
        assert_eq!(env.access_token.as_deref(), Some("tok.abc"));
        assert!(env.is_admin());
        assert_eq!(env.extra.get("branch"), Some(&json!("north")));
        assert_eq!(env.payload(), &Value::Null);
    }

    #[test]
    fn payload_is_untouched() {
        let obj = json!({"items": [{"id": 1, "qty": 2.5}], "note": null});
        let env = envelope(json!({"status": true, "obj": obj.clone()}));
        assert_eq!(env.into_payload(), obj);
    }

    #[test]
    fn sub_info_as_text() {
        assert_eq!(
            envelope(json!({"status": false, "sub_info": "wrong_password"})).sub_info(),
            Some("wrong_password".to_string())
        );
        assert_eq!(
            envelope(json!({"status": false, "sub_info": 2})).sub_info(),
            Some("2".to_string())
        );
        assert_eq!(envelope(json!({"status": false, "sub_info": ""})).sub_info(), None);
    }

    #[test]
    fn odd_field_shapes_still_make_an_envelope() {
        let env = envelope(json!({
            "status": false,
            "message": {"email": ["taken", "invalid"], "username": "too short"},
            "access_token": 42
        }));
        assert!(!env.is_success());
        assert_eq!(
            env.message.as_deref(),
            Some("email: taken; email: invalid; username: too short")
        );
        assert_eq!(env.access_token, None);

        let env = envelope(json!({"status": true, "obj": [1, 2], "message": 0}));
        assert!(env.is_success());
        assert_eq!(env.message.as_deref(), Some("0"));
        assert_eq!(env.into_payload(), json!([1, 2]));

        let env = envelope(json!({"status": true, "message": ["", null]}));
        assert_eq!(env.message, None);
        assert_eq!(envelope(json!({})).status, Value::Null);
    }
}
