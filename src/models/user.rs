use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Role;

/// Stored user record. Identity is issued upstream; only group membership
/// lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub groups: BTreeSet<Role>,
}

/// The authenticated identity a request acts as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: u64,
    pub username: String,
    pub is_superuser: bool,
    pub roles: BTreeSet<Role>,
}

/// Body of the group admin endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembershipRequest {
    pub user_id: u64,
    pub group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembershipResponse {
    pub status: String,
    pub user_id: u64,
    pub groups: Vec<Role>,
}

impl User {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            groups: BTreeSet::new(),
        }
    }
}

impl Caller {
    pub fn from_user(user: &User, is_superuser: bool) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_superuser,
            roles: user.groups.clone(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_manager(&self) -> bool {
        self.has_role(Role::Manager)
    }

    pub fn is_delivery_crew(&self) -> bool {
        self.has_role(Role::DeliveryCrew)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_from_user() {
        let mut user = User::new(4, "mario");
        user.groups.insert(Role::DeliveryCrew);

        let caller = Caller::from_user(&user, false);
        assert_eq!(caller.user_id, 4);
        assert!(caller.is_delivery_crew());
        assert!(!caller.is_manager());
        assert!(!caller.is_superuser);
    }

    #[test]
    fn test_user_without_groups_is_customer() {
        let caller = Caller::from_user(&User::new(1, "adrian"), false);
        assert!(caller.roles.is_empty());
    }
}
