use common::{ProductId, UserId};

use crate::Transaction;

/// Page size used when the caller does not supply one.
pub const DEFAULT_LIMIT: u32 = 10;

/// Which side of a transaction the querying user must be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleScope {
    /// Only transactions where the user is the buyer.
    Buyer,

    /// Only transactions where the user is the seller.
    Seller,

    /// Transactions where the user is either party.
    #[default]
    Either,
}

/// Builder for listing a user's transactions.
///
/// Results are ordered by `updated_at` descending. The total is counted over
/// the same predicate before `limit` and `offset` are applied.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    /// The user whose transactions are listed.
    pub user_id: UserId,

    /// Restricts the user's side of the transaction.
    pub role: RoleScope,

    /// Only transactions for this product.
    pub product_id: Option<ProductId>,

    /// Maximum number of transactions to return.
    pub limit: u32,

    /// Number of transactions to skip.
    pub offset: u32,
}

impl TransactionQuery {
    /// Creates a query for every transaction the user is part of.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: RoleScope::Either,
            product_id: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Narrows the user's side of the transaction.
    pub fn role(mut self, role: RoleScope) -> Self {
        self.role = role;
        self
    }

    /// Filters by product.
    pub fn product_id(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Limits the number of transactions returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Skips this many transactions before returning results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Returns true if the transaction satisfies the filter predicate,
    /// ignoring pagination.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let party = match self.role {
            RoleScope::Buyer => transaction.buyer_id == self.user_id,
            RoleScope::Seller => transaction.seller_id == self.user_id,
            RoleScope::Either => {
                transaction.buyer_id == self.user_id || transaction.seller_id == self.user_id
            }
        };

        party
            && self
                .product_id
                .is_none_or(|product_id| transaction.product_id == product_id)
    }
}
