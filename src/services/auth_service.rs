use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use tower_sessions::Session;

use crate::{
    dto::auth::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    error::{AppError, AppResult},
    middleware::auth::{current_user, set_current_user},
    models::{Role, SessionUser},
    response::{Ack, ApiResponse, Meta},
    services::cart_service::spawn_guest_cart_migration,
    state::AppState,
    storage::NewUser,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register_user(
    state: &AppState,
    session: &Session,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<SessionUser>> {
    let email = normalize_email(&payload.email);
    if state.storage.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let user = state
        .storage
        .create_user(NewUser {
            email,
            password_hash: hash_password(&payload.password)?,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            role: Role::Customer,
        })
        .await?;

    let snapshot = SessionUser::from(&user);
    set_current_user(session, &snapshot).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(ApiResponse::success(
        "User created",
        snapshot,
        Some(Meta::empty()),
    ))
}

/// Checks credentials, rotates the session id and starts moving any guest
/// cart into the durable cart without waiting for it.
pub async fn login_user(
    state: &AppState,
    session: &Session,
    payload: LoginRequest,
) -> AppResult<ApiResponse<SessionUser>> {
    let email = normalize_email(&payload.email);
    let user = match state.storage.get_user_by_email(&email).await? {
        Some(u) => u,
        None => return Err(AppError::Unauthorized),
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    session.cycle_id().await?;
    let snapshot = SessionUser::from(&user);
    set_current_user(session, &snapshot).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    spawn_guest_cart_migration(state.storage.clone(), session.clone(), user.id);

    Ok(ApiResponse::success(
        "Logged in",
        snapshot,
        Some(Meta::empty()),
    ))
}

pub async fn logout_user(session: &Session) -> AppResult<ApiResponse<Ack>> {
    session.flush().await?;
    Ok(ApiResponse::success(
        "Logged out",
        Ack::ok(),
        Some(Meta::empty()),
    ))
}

pub async fn get_current_user(session: &Session) -> AppResult<ApiResponse<SessionUser>> {
    let user = current_user(session).await?.ok_or(AppError::Unauthorized)?;
    Ok(ApiResponse::success("OK", user, None))
}

/// Updates the name fields of the session snapshot.
pub async fn update_profile(
    session: &Session,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<SessionUser>> {
    let mut user = current_user(session).await?.ok_or(AppError::Unauthorized)?;
    if let Some(first_name) = payload.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = payload.last_name {
        user.last_name = last_name.trim().to_string();
    }
    set_current_user(session, &user).await?;

    Ok(ApiResponse::success(
        "Profile updated",
        user,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_original() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
