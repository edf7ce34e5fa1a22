// src/handlers/auth.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::AdminUser},
    models::auth::{
        AuthResponse, LoginUserPayload, LogoutPayload, RefreshTokenPayload, RegisterUserPayload,
        UpdateUserStatusPayload, UpgradeToProducerPayload, User, UsernameAvailability, UsernameQuery,
        UserWithProfile,
    },
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Account and profile created", body = AuthResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email or username already taken")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state.auth_service.register_user(&payload).await?;
    Ok(ApiResponse::created(response, "Registration successful"))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account suspended")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;
    Ok(ApiResponse::ok(response, "Login successful"))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses(
        (status = 200, description = "New token pair issued", body = AuthResponse),
        (status = 401, description = "Refresh token unknown, expired or already used"),
        (status = 403, description = "Account suspended")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(ApiResponse::ok(response, "Token refreshed"))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    request_body(content = LogoutPayload, description = "Omit the token to end every session"),
    responses((status = 200, description = "Refresh tokens revoked")),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Option<Json<LogoutPayload>>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    app_state
        .auth_service
        .logout(&user, payload.refresh_token.as_deref())
        .await?;
    Ok(ApiResponse::empty("Logged out"))
}

#[utoipa::path(
    get,
    path = "/api/auth/check-username",
    tag = "Auth",
    params(UsernameQuery),
    responses(
        (status = 200, description = "Whether the producer username is free", body = UsernameAvailability),
        (status = 400, description = "Invalid username")
    )
)]
pub async fn check_username(
    State(app_state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let availability = app_state.auth_service.check_username(&query.username).await?;
    Ok(ApiResponse::ok(availability, "Username checked"))
}

#[utoipa::path(
    post,
    path = "/api/auth/upgrade",
    tag = "Auth",
    request_body = UpgradeToProducerPayload,
    responses(
        (status = 200, description = "Account is now a producer", body = UserWithProfile),
        (status = 403, description = "Admins cannot upgrade"),
        (status = 409, description = "Username already taken")
    ),
    security(("api_jwt" = []))
)]
pub async fn upgrade(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<UpgradeToProducerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let me = app_state
        .auth_service
        .upgrade_to_producer(&user, payload.username.as_deref())
        .await?;
    Ok(ApiResponse::ok(me, "Account upgraded to producer"))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current user and role profile", body = UserWithProfile),
        (status = 401, description = "Not signed in")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let me = app_state.auth_service.me(user).await?;
    Ok(ApiResponse::ok(me, "Profile loaded"))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/status",
    tag = "Admin",
    request_body = UpdateUserStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = User),
        (status = 404, description = "User not found")
    ),
    params(("id" = Uuid, Path, description = "User id")),
    security(("api_jwt" = []))
)]
pub async fn update_user_status(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    if admin.user().id == id {
        return Err(AppError::BadRequest("Admins cannot change their own status".into()));
    }
    let user = app_state.auth_service.set_status(id, payload.status).await?;
    Ok(ApiResponse::ok(user, "User status updated"))
}
