//! # Room Handlers
//!
//! HTTP endpoints for rooms, memberships, and message history.
//!
//! Membership-changing endpoints (add-user, invite redemption, private-room
//! creation) push an `addedToRoom` notification to every live connection of
//! the affected user through the [`Notifier`]; delivery is best-effort and
//! never fails the operation.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use lib_auth::Claims;
use lib_core::dto::{
    AddUserRequest, CreateRoomRequest, JoinByInviteRequest, Message, RoomDetail, RoomInfo,
    UserInfo,
};
use lib_core::model::store::models::Room;
use lib_core::model::store::{MessageRepository, RoomRepository, UserRepository};
use lib_core::{AppError, DbPool};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::chat::{Notifier, ServerEvent};
use crate::middleware::mw_auth::credential_error;

/// Invite codes are 10 alphanumeric characters, unique per room.
const INVITE_CODE_LEN: usize = 10;

/// History page size for room detail and message listing.
const MESSAGE_HISTORY_LIMIT: i64 = 500;

fn current_user_id(claims: &Claims) -> Result<i64, AppError> {
    claims.subject_id().map_err(credential_error)
}

fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}

async fn room_info(pool: &DbPool, room: Room) -> Result<RoomInfo, AppError> {
    let participants = RoomRepository::participants_of(pool, room.id)
        .await?
        .iter()
        .map(|member| member.info())
        .collect();

    Ok(RoomInfo {
        id: room.id,
        name: room.name,
        is_group: room.is_group,
        invite_code: room.invite_code,
        participants,
    })
}

/// `GET /api/rooms` - rooms the caller belongs to, with participants.
#[instrument(skip(pool, claims))]
pub async fn list_rooms(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<RoomInfo>>, AppError> {
    let user_id = current_user_id(&claims)?;

    let rooms = RoomRepository::rooms_for_user(&pool, user_id).await?;
    let mut result = Vec::with_capacity(rooms.len());
    for room in rooms {
        result.push(room_info(&pool, room).await?);
    }

    Ok(Json(result))
}

/// `POST /api/rooms` - create a room; the creator is auto-joined and group
/// rooms get an invite code.
#[instrument(skip(pool, claims, req))]
pub async fn create_room(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomInfo>), AppError> {
    let user_id = current_user_id(&claims)?;

    lib_utils::validate_not_blank(&req.name, "room name").map_err(AppError::InvalidInput)?;

    let invite_code = req.is_group.then(generate_invite_code);
    let room = RoomRepository::create(
        &pool,
        req.name.trim(),
        req.is_group,
        invite_code.as_deref(),
        user_id,
    )
    .await?;

    info!("[ROOMS] User {} created room {} ({})", user_id, room.id, room.name);

    Ok((StatusCode::CREATED, Json(room_info(&pool, room).await?)))
}

/// `GET /api/rooms/{id}` - one room with participants and message history.
///
/// Reports `NotFound` for rooms the caller is not a member of, without
/// revealing whether the room exists.
#[instrument(skip(pool, claims))]
pub async fn get_room(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    Path(room_id): Path<i64>,
) -> Result<Json<RoomDetail>, AppError> {
    let user_id = current_user_id(&claims)?;

    let room = RoomRepository::find_by_id(&pool, room_id).await?;
    let is_member = RoomRepository::is_participant(&pool, user_id, room_id).await?;
    let Some(room) = room.filter(|_| is_member) else {
        return Err(AppError::NotFound("Room not found or access denied".to_string()));
    };

    let messages = MessageRepository::list_for_room(&pool, room_id, MESSAGE_HISTORY_LIMIT)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

    Ok(Json(RoomDetail {
        room: room_info(&pool, room).await?,
        messages,
    }))
}

/// `GET /api/rooms/{id}/messages` - message history in delivery order.
#[instrument(skip(pool, claims))]
pub async fn get_messages(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<Message>>, AppError> {
    let user_id = current_user_id(&claims)?;

    if !RoomRepository::is_participant(&pool, user_id, room_id).await? {
        return Err(AppError::Forbidden(
            "You are not a participant of this room".to_string(),
        ));
    }

    let messages = MessageRepository::list_for_room(&pool, room_id, MESSAGE_HISTORY_LIMIT)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

    Ok(Json(messages))
}

/// `POST /api/rooms/{id}/add-user` - add a member to a room the caller
/// belongs to, then notify the added user out-of-band.
#[instrument(skip(pool, notifier, claims, req))]
pub async fn add_user(
    State(pool): State<DbPool>,
    State(notifier): State<Notifier>,
    Extension(claims): Extension<Claims>,
    Path(room_id): Path<i64>,
    Json(req): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<UserInfo>), AppError> {
    let user_id = current_user_id(&claims)?;

    if RoomRepository::find_by_id(&pool, room_id).await?.is_none() {
        return Err(AppError::NotFound("Room not found".to_string()));
    }
    if !RoomRepository::is_participant(&pool, user_id, room_id).await? {
        return Err(AppError::Forbidden(
            "You are not a participant of this room".to_string(),
        ));
    }

    let Some(target) = UserRepository::find_by_id(&pool, req.user_id).await? else {
        return Err(AppError::NotFound("User not found".to_string()));
    };

    let added = RoomRepository::add_participant(&pool, target.id, room_id).await?;
    if !added {
        return Err(AppError::Forbidden(
            "User is already a participant of this room".to_string(),
        ));
    }

    info!("[ROOMS] User {} added user {} to room {}", user_id, target.id, room_id);
    notifier
        .notify_user(target.id, ServerEvent::AddedToRoom { room_id })
        .await;

    Ok((StatusCode::CREATED, Json(target.info())))
}

/// `POST /api/rooms/join-by-invite-code` - join a group room by invite code.
///
/// Idempotent per user: a second redemption returns the room unchanged and
/// triggers no notification.
#[instrument(skip(pool, notifier, claims, req))]
pub async fn join_by_invite(
    State(pool): State<DbPool>,
    State(notifier): State<Notifier>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinByInviteRequest>,
) -> Result<Json<RoomInfo>, AppError> {
    let user_id = current_user_id(&claims)?;

    let Some(room) = RoomRepository::find_by_invite_code(&pool, &req.invite_code).await? else {
        return Err(AppError::NotFound("Invite code is invalid".to_string()));
    };

    let added = RoomRepository::add_participant(&pool, user_id, room.id).await?;
    if added {
        info!("[ROOMS] User {} joined room {} by invite", user_id, room.id);
        notifier
            .notify_user(user_id, ServerEvent::AddedToRoom { room_id: room.id })
            .await;
    }

    Ok(Json(room_info(&pool, room).await?))
}

/// `POST /api/rooms/private/{target_user_id}` - open (or reuse) the private
/// room between the caller and the target.
///
/// At most one private room exists per unordered user pair: a second call
/// returns the existing room instead of creating another.
#[instrument(skip(pool, notifier, claims))]
pub async fn create_private(
    State(pool): State<DbPool>,
    State(notifier): State<Notifier>,
    Extension(claims): Extension<Claims>,
    Path(target_user_id): Path<i64>,
) -> Result<(StatusCode, Json<RoomInfo>), AppError> {
    let user_id = current_user_id(&claims)?;

    if target_user_id == user_id {
        return Err(AppError::InvalidInput(
            "Cannot open a private room with yourself".to_string(),
        ));
    }
    if UserRepository::find_by_id(&pool, target_user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    if let Some(existing) = RoomRepository::find_private_between(&pool, user_id, target_user_id).await? {
        return Ok((StatusCode::OK, Json(room_info(&pool, existing).await?)));
    }

    let room = RoomRepository::create_private(&pool, user_id, target_user_id).await?;
    info!(
        "[ROOMS] User {} opened private room {} with user {}",
        user_id, room.id, target_user_id
    );
    notifier
        .notify_user(target_user_id, ServerEvent::AddedToRoom { room_id: room.id })
        .await;

    Ok((StatusCode::CREATED, Json(room_info(&pool, room).await?)))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

/// `GET /api/rooms/search?query=` - username search, excluding the caller.
#[instrument(skip(pool, claims, params))]
pub async fn search_users(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserInfo>>, AppError> {
    let user_id = current_user_id(&claims)?;

    let users = UserRepository::search(&pool, &params.query, user_id, 10)
        .await?
        .iter()
        .map(|user| user.info())
        .collect();

    Ok(Json(users))
}
