use axum::{extract::State, response::Json};
use tracing::instrument;

use super::api::{ApiError, ApiState, Area};
use super::extract::JsonBody;
use crate::models::{Caller, GroupMembershipRequest, GroupMembershipResponse};

#[instrument(name = "add_user_to_group", skip(state, caller, request), fields(
    admin_id = caller.user_id,
    user_id = request.user_id,
    group = %request.group,
))]
pub async fn add_user_to_group(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<GroupMembershipRequest>,
) -> Result<Json<GroupMembershipResponse>, ApiError> {
    let result = state.group_service.add_user_to_group(&caller, request).await;
    state
        .finish(Area::Group, "add_user_to_group", result)
        .map(Json)
}

#[instrument(name = "remove_user_from_group", skip(state, caller, request), fields(
    admin_id = caller.user_id,
    user_id = request.user_id,
    group = %request.group,
))]
pub async fn remove_user_from_group(
    State(state): State<ApiState>,
    caller: Caller,
    JsonBody(request): JsonBody<GroupMembershipRequest>,
) -> Result<Json<GroupMembershipResponse>, ApiError> {
    let result = state
        .group_service
        .remove_user_from_group(&caller, request)
        .await;
    state
        .finish(Area::Group, "remove_user_from_group", result)
        .map(Json)
}
