//! Authentication middleware
//!
//! JWT bearer authentication and permission checks

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Permission names carried in the token
pub mod permissions {
    pub const INVENTORY_WRITE: &str = "inventory:write";
    pub const TRANSFERS_WRITE: &str = "transfers:write";
    pub const TRANSFERS_APPROVE: &str = "transfers:approve";
}

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.role == "admin" || self.permissions.iter().any(|p| p == permission)
    }

    /// Permission guard for use in handlers
    pub fn require(&self, permission: &'static str) -> AppResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user_id, permission, "permission denied");
            Err(AppError::InsufficientPermissions(permission))
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication middleware that validates JWT bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized {
            message: "Missing or invalid Authorization header".to_string(),
            message_id: "Header Authorization tidak ada atau tidak valid".to_string(),
        })?;

    let claims = decode_jwt(token, &state.config.jwt.secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: claims.role,
        permissions: claims.permissions,
    });

    Ok(next.run(request).await)
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> AppResult<Claims> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_id: "Silakan masuk terlebih dahulu".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: "staff".to_string(),
            permissions: vec![permissions::INVENTORY_WRITE.to_string()],
            exp: now + exp_offset,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_decode_valid_token() {
        let claims = decode_jwt(&token("secret", 3600), "secret").unwrap();
        assert_eq!(claims.role, "staff");
        assert_eq!(claims.permissions, vec!["inventory:write"]);
    }

    #[test]
    fn test_decode_wrong_secret() {
        assert!(matches!(
            decode_jwt(&token("secret", 3600), "other"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_decode_expired() {
        assert!(matches!(
            decode_jwt(&token("secret", -3600), "secret"),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_permissions() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: "staff".to_string(),
            permissions: vec![permissions::TRANSFERS_WRITE.to_string()],
        };
        assert!(user.require(permissions::TRANSFERS_WRITE).is_ok());
        assert!(matches!(
            user.require(permissions::TRANSFERS_APPROVE),
            Err(AppError::InsufficientPermissions("transfers:approve"))
        ));

        let admin = AuthUser {
            role: "admin".to_string(),
            permissions: vec![],
            ..user
        };
        assert!(admin.has_permission(permissions::TRANSFERS_APPROVE));
    }
}
