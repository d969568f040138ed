use std::sync::Arc;

use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::basic_success;
use crate::auth::LoggedIn;
use crate::error::{PaddyError, PaddyResult};
use crate::extract::JsonBody;
use crate::models::session::Session;
use crate::models::user::{NewUser, Role, User};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginInfo {
    username: String,
    password: String,
}

pub async fn signup(
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(new_user): JsonBody<NewUser>,
) -> PaddyResult<Json<Value>> {
    let user = User::register(new_user, state.config.bcrypt_cost, &*state.store).await?;

    Ok(Json(json!({
        "message": "Account created",
        "ID": user.id,
        "Role": user.role,
    })))
}

pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(form): JsonBody<LoginInfo>,
) -> PaddyResult<impl IntoResponse> {
    let user = match User::login_is_valid(&form.username, &form.password, &*state.store).await? {
        Some(user) => user,
        None => {
            warn!(login = %form.username, "failed login attempt");
            return Err(PaddyError::Unauthorized);
        }
    };
    let token = Session::get_or_generate_token(user.id, &*state.store).await?;
    info!(user = user.id, "logged in");

    Ok((
        [(SET_COOKIE, Session::cookie(&token, state.config.secure_cookies))],
        Json(json!({
            "message": "Logged in",
            "token": token,
            "Role": user.role,
        })),
    ))
}

pub async fn logout(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
) -> PaddyResult<impl IntoResponse> {
    Session::remove(user.id(), &*state.store).await?;

    Ok((
        [(SET_COOKIE, Session::expired_cookie())],
        Json(basic_success()),
    ))
}

/// Who is logged in.
pub async fn index(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
) -> PaddyResult<Json<Value>> {
    let mut identity = json!({
        "ID": user.user.id,
        "Username": user.user.username,
        "Email": user.user.email,
        "FirstName": user.user.first_name,
        "LastName": user.user.last_name,
        "Role": user.role(),
    });
    if user.role() == Role::Student {
        identity["RiceGrains"] = json!(user.student(&*state.store).await?.rice_grains);
    }

    Ok(Json(identity))
}
