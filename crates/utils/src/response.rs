use serde::{Deserialize, Serialize};

/// JSON envelope returned by every API endpoint.
///
/// Successful responses carry `data`; failures carry a human readable
/// `message` and the full list of `errors` (validation can report several).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: Vec::new(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
            errors: vec![message.to_string()],
        }
    }

    pub fn errors(errors: Vec<String>) -> Self {
        let message = (!errors.is_empty()).then(|| errors.join("; "));
        Self {
            success: false,
            data: None,
            message,
            errors,
        }
    }
}
