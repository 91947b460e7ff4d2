use std::collections::HashMap;

use common::{ProductId, UserId};
use store::{RoleScope, TransactionQuery};

use crate::DomainError;

/// Listing filter accepted from clients.
///
/// Built from the loose query-string map at the boundary; only `role` and
/// `product_id` are recognised and every other key is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub role: RoleScope,
    pub product_id: Option<ProductId>,
}

impl TransactionFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, DomainError> {
        let role = match params.get("role").map(|role| role.to_ascii_lowercase()) {
            Some(role) if role == "buyer" => RoleScope::Buyer,
            Some(role) if role == "seller" => RoleScope::Seller,
            _ => RoleScope::Either,
        };

        let product_id = match params.get("product_id").filter(|value| !value.is_empty()) {
            Some(value) => Some(ProductId::new(value.parse().map_err(|_| {
                DomainError::Validation(format!("invalid product_id: {value}"))
            })?)),
            None => None,
        };

        Ok(Self { role, product_id })
    }

    /// Scopes the filter to one user's page of transactions.
    pub fn to_query(&self, user_id: UserId, limit: u32, offset: u32) -> TransactionQuery {
        let query = TransactionQuery::for_user(user_id)
            .role(self.role)
            .limit(limit)
            .offset(offset);

        match self.product_id {
            Some(product_id) => query.product_id(product_id),
            None => query,
        }
    }
}
