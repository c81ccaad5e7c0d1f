use axum::{
    extract::{Form, Json, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{Html, IntoResponse, Redirect},
};
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use super::middleware_auth::TOKEN_COOKIE;
use super::session::SessionId;
use crate::state::AppState;
use crate::todos::view::render_signin_page;

#[derive(Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegistrationRequest>,
) -> impl IntoResponse {
    if payload.email.trim().is_empty() || payload.password.len() < 8 {
        return (StatusCode::BAD_REQUEST, "invalid payload").into_response();
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = match Argon2::default().hash_password(payload.password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(e) => {
            error!("password hash error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "could not create user").into_response();
        }
    };
    let user_id = Uuid::new_v4();

    let res = sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1,$2,$3)
        "#,
    )
    .bind(user_id)
    .bind(&payload.email)
    .bind(&password_hash)
    .execute(&state.db)
    .await;

    match res {
        Ok(_) => {
            info!(%user_id, "user registered");
            (StatusCode::CREATED, Json(RegisterResponse { id: user_id, email: payload.email })).into_response()
        }
        Err(e) => {
            error!("DB insert error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "could not create user").into_response()
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let user_id = match verify_credentials(&state.db, &payload.email, &payload.password).await {
        Ok(Some(id)) => id,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response(),
        Err(e) => {
            error!("DB Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response();
        }
    };

    match state.keys.issue(user_id, &payload.email) {
        Ok(token) => (StatusCode::OK, Json(LoginResponse { token })).into_response(),
        Err(e) => {
            error!("jwt encode error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "token error").into_response()
        }
    }
}

pub async fn signin_page() -> Html<String> {
    Html(render_signin_page(None))
}

/// Browser sign-in: stores the token in an HttpOnly cookie.
pub async fn signin(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> impl IntoResponse {
    let user_id = match verify_credentials(&state.db, &payload.email, &payload.password).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, Html(render_signin_page(Some("Invalid credentials")))).into_response();
        }
        Err(e) => {
            error!("DB Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response();
        }
    };

    let token = match state.keys.issue(user_id, &payload.email) {
        Ok(token) => token,
        Err(e) => {
            error!("jwt encode error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "token error").into_response();
        }
    };

    info!(%user_id, "signed in");
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE,
        token,
        state.keys.ttl_seconds()
    );
    ([(SET_COOKIE, cookie)], Redirect::to("/todos")).into_response()
}

/// Ends the browser session, dropping its task list.
pub async fn signout(State(state): State<AppState>, session: SessionId) -> impl IntoResponse {
    state.sessions.end(session.0).await;
    let active = state.sessions.len().await;
    info!(active, "signed out");

    let cookie = format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", TOKEN_COOKIE);
    ([(SET_COOKIE, cookie)], Redirect::to("/signin"))
}

async fn verify_credentials(db: &PgPool, email: &str, password: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let row = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT id, password_hash FROM users WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    let Some((id, password_hash)) = row else {
        return Ok(None);
    };

    let parsed_hash = match PasswordHash::new(&password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            error!(user_id = %id, "stored password hash unreadable: {}", e);
            return Ok(None);
        }
    };

    let verified = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    Ok(verified.then_some(id))
}
