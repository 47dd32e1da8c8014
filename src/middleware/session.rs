//! Cookie-keyed server-side sessions.

use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};

use crate::config::AppConfig;

pub const SESSION_COOKIE_NAME: &str = "storefront_session";

const SESSION_INACTIVITY_DAYS: i64 = 7;

/// Keys under which values are stored in the session.
pub mod session_keys {
    pub const CURRENT_USER: &str = "current_user";
    pub const GUEST_CART: &str = "guest_cart";
}

pub fn create_session_layer(config: &AppConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_INACTIVITY_DAYS)))
        .with_secure(config.session_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
