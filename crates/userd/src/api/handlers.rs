//! HTTP request handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use super::error::{ApiError, ApiResult};
use super::extract::Payload;
use super::state::AppState;
use crate::user::{CreateUserRequest, UpdateUserRequest, User, UserStats};

const HOME_PAGE: &str = include_str!("home.html");

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started.
    pub uptime: f64,
}

/// Service metadata response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub status: &'static str,
    pub version: String,
    pub users: UserStats,
}

/// Response for the user listing.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<User>,
}

/// Response carrying a single user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: User,
}

impl UserResponse {
    fn new(data: User) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    fn with_message(message: &'static str, data: User) -> Self {
        Self {
            success: true,
            message: Some(message),
            data,
        }
    }
}

/// Response for operations that only confirm success.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Home page describing the API.
pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

/// Static service metadata.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: state.info.name.clone(),
        status: "running",
        version: state.info.version.clone(),
        users: state.users.stats().await,
    })
}

/// List active users.
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Json<UserListResponse> {
    let data = state.users.list_users().await;
    Json(UserListResponse {
        success: true,
        count: data.len(),
        data,
    })
}

/// Get a single active user.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let id = parse_user_id(&user_id)?;
    let user = state.users.get_user(id).await?;
    Ok(Json(UserResponse::new(user)))
}

/// Create a new user.
#[instrument(skip(state, request))]
pub async fn create_user(
    State(state): State<AppState>,
    Payload(request): Payload<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user = state.users.create_user(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::with_message("User created successfully", user)),
    ))
}

/// Update the supplied fields of a user.
#[instrument(skip(state, request))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Payload(request): Payload<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let id = parse_user_id(&user_id)?;
    let user = state.users.update_user(id, request).await?;
    Ok(Json(UserResponse::with_message(
        "User updated successfully",
        user,
    )))
}

/// Soft-delete a user.
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    let id = parse_user_id(&user_id)?;
    state.users.delete_user(id).await?;
    Ok(Json(SuccessResponse {
        success: true,
        message: "User deleted successfully",
    }))
}

/// Fallback for requests no route or static file matched.
pub async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}

/// Ids that are not positive integers cannot name a user.
fn parse_user_id(raw: &str) -> ApiResult<u64> {
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::user_not_found()),
    }
}
