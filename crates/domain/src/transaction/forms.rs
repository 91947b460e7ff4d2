use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Request to buy a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TransactionForm {
    #[validate(range(min = 1))]
    pub product_id: i64,

    #[validate(range(min = 1))]
    pub quantity: u32,

    #[validate(range(min = 1))]
    pub address_id: i64,

    #[serde(default)]
    pub notes: String,
}

/// Request by the seller to move a transaction to another status.
///
/// Moving to `delivered` requires the courier and tracking number.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_shipping_details"))]
pub struct UpdateTransactionForm {
    #[validate(length(min = 1))]
    pub status: String,

    #[serde(default)]
    pub awb_number: String,

    #[serde(default)]
    pub courier: String,
}

impl UpdateTransactionForm {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn delivered(awb_number: impl Into<String>, courier: impl Into<String>) -> Self {
        Self {
            status: "delivered".to_string(),
            awb_number: awb_number.into(),
            courier: courier.into(),
        }
    }
}

fn validate_shipping_details(form: &UpdateTransactionForm) -> Result<(), ValidationError> {
    if form.status.eq_ignore_ascii_case("delivered")
        && (form.awb_number.trim().is_empty() || form.courier.trim().is_empty())
    {
        return Err(ValidationError::new("shipping_details_required")
            .with_message("awb_number and courier are required for delivered status".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> TransactionForm {
        TransactionForm {
            product_id: 1,
            quantity: 2,
            address_id: 3,
            notes: String::new(),
        }
    }

    #[test]
    fn valid_transaction_form() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn ids_and_quantity_must_be_positive() {
        let mut invalid = form();
        invalid.product_id = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = form();
        invalid.quantity = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = form();
        invalid.address_id = -1;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn status_is_required() {
        assert!(UpdateTransactionForm::status("").validate().is_err());
        assert!(UpdateTransactionForm::status("paid").validate().is_ok());
    }

    #[test]
    fn delivered_requires_shipping_details() {
        assert!(UpdateTransactionForm::delivered("", "JNE").validate().is_err());
        assert!(UpdateTransactionForm::delivered("AWB1", "").validate().is_err());
        assert!(UpdateTransactionForm::delivered("AWB1", "JNE").validate().is_ok());

        let shouting = UpdateTransactionForm {
            status: "DELIVERED".to_string(),
            ..Default::default()
        };
        assert!(shouting.validate().is_err());
    }
}
