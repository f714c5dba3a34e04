use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SendEbookRequest {
    /// Recipient address
    ///
    /// Outer `None` when the key is absent, inner `None` when it is `null`.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendEbookResponse {
    /// `sent` on success, `error` otherwise
    pub status: DeliveryStatus,
    /// Human-readable outcome
    pub message: String,
}

impl SendEbookResponse {
    pub fn sent(recipient: &str) -> Self {
        Self {
            status: DeliveryStatus::Sent,
            message: format!("Ebook sent to {recipient}!"),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Error,
            message: message.into(),
        }
    }
}
