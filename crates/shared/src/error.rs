use serde::{Deserialize, Serialize};

/// JSON body the demo backends attach to non-2xx responses.
///
/// Older endpoints fill `message`, newer ones `details`; both may carry a
/// server-side `stack`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            details: None,
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// `message` wins over `details`; blank strings count as missing.
    pub fn detail(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .or_else(|| {
                self.details
                    .as_deref()
                    .filter(|text| !text.trim().is_empty())
            })
    }
}
