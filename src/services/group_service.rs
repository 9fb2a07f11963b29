use std::sync::Arc;
use tracing::instrument;

use super::access_control::{can_administer_groups, ensure, NOT_AUTHORIZED};
use crate::models::{
    Caller, GroupMembershipRequest, GroupMembershipResponse, RepositoryError, Role, ServiceError,
    ServiceResult, User, Validate,
};
use crate::repositories::UserRepository;

pub const ADDED_TO_GROUP: &str = "user added to group";
pub const REMOVED_FROM_GROUP: &str = "user removed from group";

/// Group membership and per-request identity resolution
pub struct GroupService {
    users: Arc<dyn UserRepository>,
}

impl GroupService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Build the caller for a request, registering unseen users with no
    /// groups
    #[instrument(skip(self, username))]
    pub async fn resolve_caller(
        &self,
        user_id: u64,
        username: &str,
        is_superuser: bool,
    ) -> ServiceResult<Caller> {
        let user = self.users.find_or_register(user_id, username).await?;
        Ok(Caller::from_user(&user, is_superuser))
    }

    #[instrument(skip(self, caller, request), fields(user_id = request.user_id, group = %request.group))]
    pub async fn add_user_to_group(
        &self,
        caller: &Caller,
        request: GroupMembershipRequest,
    ) -> ServiceResult<GroupMembershipResponse> {
        let (user_id, role) = self.authorize(caller, &request)?;

        let user = self
            .users
            .add_group(user_id, role)
            .await
            .map_err(|e| user_error(e, user_id))?;

        crate::info_with_trace!("User added to group");
        Ok(membership_response(ADDED_TO_GROUP, user))
    }

    #[instrument(skip(self, caller, request), fields(user_id = request.user_id, group = %request.group))]
    pub async fn remove_user_from_group(
        &self,
        caller: &Caller,
        request: GroupMembershipRequest,
    ) -> ServiceResult<GroupMembershipResponse> {
        let (user_id, role) = self.authorize(caller, &request)?;

        let user = self
            .users
            .remove_group(user_id, role)
            .await
            .map_err(|e| user_error(e, user_id))?;

        crate::info_with_trace!("User removed from group");
        Ok(membership_response(REMOVED_FROM_GROUP, user))
    }

    fn authorize(
        &self,
        caller: &Caller,
        request: &GroupMembershipRequest,
    ) -> ServiceResult<(u64, Role)> {
        ensure(can_administer_groups(caller), NOT_AUTHORIZED)?;
        request.validate()?;

        let role = request
            .group
            .parse::<Role>()
            .map_err(|_| ServiceError::GroupNotFound {
                name: request.group.clone(),
            })?;
        Ok((request.user_id, role))
    }
}

fn user_error(error: RepositoryError, user_id: u64) -> ServiceError {
    match error {
        RepositoryError::NotFound => ServiceError::UserNotFound { id: user_id },
        other => other.into(),
    }
}

fn membership_response(status: &str, user: User) -> GroupMembershipResponse {
    GroupMembershipResponse {
        status: status.to_string(),
        user_id: user.id,
        groups: user.groups.into_iter().collect(),
    }
}
