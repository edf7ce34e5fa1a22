// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    models::auth::{User, UserRole},
};

/// A set of roles allowed through a `RequireRole` guard.
pub trait RoleDef: Send + Sync + 'static {
    fn roles() -> &'static [UserRole];
    fn label() -> &'static str;
}

/// Extractor that yields the signed-in user when their role is allowed by `R`.
pub struct RequireRole<R>(pub User, PhantomData<R>);

impl<R> RequireRole<R> {
    pub fn user(&self) -> &User {
        &self.0
    }
}

pub fn check_role<R: RoleDef>(user: &User) -> Result<(), AppError> {
    if R::roles().contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("{} access is required", R::label())))
    }
}

impl<R, S> FromRequestParts<S> for RequireRole<R>
where
    R: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;
        check_role::<R>(&user)?;
        Ok(RequireRole(user, PhantomData))
    }
}

pub struct ProducerOnly;
impl RoleDef for ProducerOnly {
    fn roles() -> &'static [UserRole] {
        &[UserRole::Producer]
    }
    fn label() -> &'static str {
        "Producer"
    }
}

pub struct AdminOnly;
impl RoleDef for AdminOnly {
    fn roles() -> &'static [UserRole] {
        &[UserRole::Admin]
    }
    fn label() -> &'static str {
        "Admin"
    }
}

pub type ProducerUser = RequireRole<ProducerOnly>;
pub type AdminUser = RequireRole<AdminOnly>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::auth::UserStatus;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Someone".into(),
            email: "someone@example.com".into(),
            password_hash: String::new(),
            role,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn roles_are_checked_exactly() {
        assert!(check_role::<ProducerOnly>(&user(UserRole::Producer)).is_ok());
        assert!(check_role::<AdminOnly>(&user(UserRole::Admin)).is_ok());
        assert!(matches!(
            check_role::<ProducerOnly>(&user(UserRole::Artist)),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_role::<AdminOnly>(&user(UserRole::Producer)),
            Err(AppError::Forbidden(_))
        ));
    }
}
