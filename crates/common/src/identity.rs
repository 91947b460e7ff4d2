//! The authenticated actor of a request.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Identity of the caller, resolved once at the request boundary and passed
/// explicitly into every usecase that makes an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    user_id: UserId,
}

impl Identity {
    /// Creates an identity for a user.
    ///
    /// Returns `None` for ids that cannot belong to a stored user, which
    /// callers must treat as unauthenticated.
    pub fn new(user_id: UserId) -> Option<Self> {
        user_id.is_valid().then_some(Self { user_id })
    }

    /// Returns the acting user's id.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns true if this identity is the given user.
    pub fn is(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identity() {
        let identity = Identity::new(UserId::new(3)).unwrap();
        assert_eq!(identity.user_id(), UserId::new(3));
        assert!(identity.is(UserId::new(3)));
        assert!(!identity.is(UserId::new(4)));
    }

    #[test]
    fn non_positive_id_is_unauthenticated() {
        assert!(Identity::new(UserId::new(0)).is_none());
        assert!(Identity::new(UserId::new(-1)).is_none());
    }
}
