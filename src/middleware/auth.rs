use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::session::session_keys,
    models::{Role, SessionUser},
};

/// Logged-in caller. Rejects with 401 when the session carries no user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl From<&SessionUser> for AuthUser {
    fn from(user: &SessionUser) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

/// Guest or logged-in caller.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthUser>);

fn session_from_parts(parts: &Parts) -> AppResult<&Session> {
    parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session layer is not installed")))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        let user = current_user(session).await?.ok_or(AppError::Unauthorized)?;
        Ok(AuthUser::from(&user))
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        let user = current_user(session).await?;
        Ok(OptionalAuth(user.as_ref().map(AuthUser::from)))
    }
}

pub async fn current_user(session: &Session) -> AppResult<Option<SessionUser>> {
    Ok(session.get(session_keys::CURRENT_USER).await?)
}

pub async fn set_current_user(session: &Session, user: &SessionUser) -> AppResult<()> {
    session.insert(session_keys::CURRENT_USER, user).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_guard_rejects_customers() {
        let customer = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
        };
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(matches!(ensure_admin(&customer), Err(AppError::Forbidden)));
        assert!(ensure_admin(&admin).is_ok());
        assert!(ensure_role(&customer, Role::Customer).is_ok());
    }
}
