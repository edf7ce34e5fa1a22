// src/middleware/session.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    models::{activity::Listener, auth::User, cart::CartOwner},
};

pub const SESSION_ID_HEADER: &str = "x-session-id";
const MAX_SESSION_ID_LEN: usize = 100;

fn session_header(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(value) = parts.headers.get(SESSION_ID_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::BadRequest("The x-session-id header contains invalid characters".into()))?
        .trim();
    if value.is_empty() || value.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::BadRequest("The x-session-id header is invalid".into()));
    }
    Ok(Some(value.to_string()))
}

/// Whose cart a request works on: the signed-in user, else the guest session.
#[derive(Debug, Clone)]
pub struct CartSession(pub CartOwner);

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(CartSession(CartOwner::User(user.id)));
        }
        session_header(parts)?
            .map(|id| CartSession(CartOwner::Session(id)))
            .ok_or_else(|| AppError::BadRequest("Sign in or send an x-session-id header".into()))
    }
}

/// The guest session id, required.
#[derive(Debug, Clone)]
pub struct GuestSession(pub String);

impl<S> FromRequestParts<S> for GuestSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_header(parts)?
            .map(GuestSession)
            .ok_or_else(|| AppError::BadRequest("The x-session-id header is required".into()))
    }
}

/// Who is listening, for play history: the signed-in user and any guest
/// session header. Never rejects a missing header.
#[derive(Debug, Clone)]
pub struct ListenerSession(pub Listener);

impl<S> FromRequestParts<S> for ListenerSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ListenerSession(Listener {
            user_id: parts.extensions.get::<User>().map(|u| u.id),
            session_id: session_header(parts)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(session: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(s) = session {
            builder = builder.header(SESSION_ID_HEADER, s);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn guest_cart_uses_the_session_header() {
        let mut p = parts(Some("guest-123"));
        let CartSession(owner) = CartSession::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(owner, CartOwner::Session("guest-123".into()));
    }

    #[tokio::test]
    async fn missing_or_blank_session_is_rejected() {
        let mut p = parts(None);
        assert!(matches!(
            CartSession::from_request_parts(&mut p, &()).await,
            Err(AppError::BadRequest(_))
        ));
        let mut p = parts(Some("   "));
        assert!(matches!(
            GuestSession::from_request_parts(&mut p, &()).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn anonymous_listeners_are_allowed() {
        let mut p = parts(None);
        let ListenerSession(listener) = ListenerSession::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(listener, Listener::default());

        let mut p = parts(Some("guest-9"));
        let ListenerSession(listener) = ListenerSession::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(listener.session_id.as_deref(), Some("guest-9"));
        assert_eq!(listener.user_id, None);
    }
}
