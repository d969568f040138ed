use uuid::Uuid;

use crate::db::Store;
use crate::error::PaddyResult;

pub struct Session;

impl Session {
    pub const COOKIE_NAME: &'static str = "paddy_session";
    pub const TOKEN_HEADER: &'static str = "token";

    /// Returns the user's current token, issuing a new one if they have none.
    pub async fn get_or_generate_token(user_id: i64, store: &dyn Store) -> PaddyResult<String> {
        if let Some(token) = store.session_for_user(user_id).await? {
            return Ok(token);
        }

        let token = Uuid::new_v4().to_string();
        store.insert_session(&token, user_id).await?;

        Ok(token)
    }

    pub async fn remove(user_id: i64, store: &dyn Store) -> PaddyResult<()> {
        store.remove_sessions(user_id).await
    }

    pub fn cookie(token: &str, secure: bool) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax{}",
            Self::COOKIE_NAME,
            token,
            if secure { "; Secure" } else { "" }
        )
    }

    pub fn expired_cookie() -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            Self::COOKIE_NAME
        )
    }
}
