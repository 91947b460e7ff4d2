use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct InvoiceCreateForm {
    #[validate(range(min = 1))]
    pub transaction_id: i64,

    #[validate(length(min = 2))]
    pub payment_method: String,
}

/// Changes a buyer can make to an invoice; both parts are optional and may
/// be sent together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceUpdateForm {
    /// Receipt image as a base64 `data:` URI.
    #[serde(default)]
    pub receipt_proof: Option<String>,

    /// `"paid"` confirms the payment; any other value is ignored.
    #[serde(default)]
    pub status: Option<String>,
}
