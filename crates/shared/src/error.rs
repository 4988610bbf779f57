use serde::{Deserialize, Serialize};

/// Buckets every failure surfaced to the user falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    PermissionDenied,
    Network,
    Timeout,
    Validation,
    NotFound,
    Internal,
}

/// Error body returned by the pet registry API (`{"detail": ...}`).
///
/// `detail` is a plain string for handler errors and a list of objects for
/// request validation errors, so it is kept as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    pub fn message(&self) -> Option<String> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        match self.detail.as_ref()? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|msg| msg.as_str()))
                    .map(str::to_string)
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_is_used_verbatim() {
        let body: ApiError =
            serde_json::from_str(r#"{"detail":"Mascota no encontrada"}"#).expect("decode");
        assert_eq!(body.message().as_deref(), Some("Mascota no encontrada"));
    }

    #[test]
    fn validation_detail_list_is_joined() {
        let body: ApiError = serde_json::from_str(
            r#"{"detail":[{"loc":["body","name"],"msg":"field required"},{"msg":"bad age"}]}"#,
        )
        .expect("decode");
        assert_eq!(
            body.message().as_deref(),
            Some("field required; bad age")
        );
    }

    #[test]
    fn missing_detail_yields_none() {
        let body: ApiError = serde_json::from_str("{}").expect("decode");
        assert!(body.message().is_none());
    }
}
