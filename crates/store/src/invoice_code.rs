use chrono::NaiveDate;
use common::TransactionId;
use serde::{Deserialize, Serialize};

const PREFIX: &str = "JSTP";
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Human-readable invoice reference, e.g. `JSTP20240115f`.
///
/// Built from the invoice date and the base-36 transaction id, so two
/// invoices for distinct transactions never share a code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceCode(String);

impl InvoiceCode {
    /// Generates the code for a transaction invoiced on `date`.
    pub fn generate(date: NaiveDate, transaction_id: TransactionId) -> Self {
        Self(format!(
            "{PREFIX}{}{}",
            date.format("%Y%m%d"),
            base36(transaction_id.as_i64())
        ))
    }

    /// Wraps a code read back from storage.
    pub fn from_stored(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn base36(value: i64) -> String {
    let mut n = value.unsigned_abs();
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();

    String::from_utf8_lossy(&digits).into_owned()
}
