use serde::{Deserialize, Serialize};

/// Typed action carried inside postback and quick-reply payload strings.
///
/// The wire form is a small JSON object tagged by `action`; unknown tags
/// fail deserialization instead of silently falling through.
///
/// ```
/// use shoplink_core::ActionPayload;
///
/// let action = ActionPayload::parse(r#"{"action":"QR_GET_PRODUCT_LIST","limit":3}"#).unwrap();
/// assert_eq!(action, ActionPayload::ProductList { limit: 3 });
/// assert!(ActionPayload::parse(r#"{"action":"QR_SELF_DESTRUCT"}"#).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action")]
pub enum ActionPayload {
    /// Carried by the messenger profile's "get started" button; opens the
    /// root menu, same as the "help" keyword.
    #[serde(rename = "GET_STARTED")]
    GetStarted,
    #[serde(rename = "QR_GET_PRODUCT_LIST")]
    ProductList { limit: u32 },
    #[serde(rename = "QR_GET_PRODUCT_DESCRIPTION")]
    ProductDescription { id: u64 },
    #[serde(rename = "QR_GET_PRODUCT_OPTIONS")]
    ProductOptions { id: u64 },
}

impl ActionPayload {
    /// Decodes a payload string received from the platform.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Encodes the action into the payload string attached to a button or
    /// quick reply.
    pub fn to_payload(&self) -> String {
        // Serialization of a tag + integer fields cannot fail.
        serde_json::to_string(self).expect("action payload serializes")
    }
}
