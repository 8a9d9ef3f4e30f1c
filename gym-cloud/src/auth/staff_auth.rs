//! Staff JWT authentication
//!
//! Coaches and admins receive tokens from the identity provider signed with
//! `JWT_SECRET`; this service only verifies them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Coach,
    Admin,
}

/// JWT claims for staff authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffClaims {
    /// Staff member id
    pub sub: String,
    /// `coach` or `admin`; other roles are refused
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated staff identity extracted from JWT
#[derive(Debug, Clone)]
pub struct StaffIdentity {
    pub staff_id: String,
    pub role: StaffRole,
}

fn parse_role(role: &str) -> Option<StaffRole> {
    match role {
        "coach" => Some(StaffRole::Coach),
        "admin" => Some(StaffRole::Admin),
        _ => None,
    }
}

/// Create a staff token (tests and local tooling)
#[cfg(test)]
pub fn create_token(
    staff_id: &str,
    role: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    use jsonwebtoken::{EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = StaffClaims {
        sub: staff_id.to_string(),
        role: role.to_string(),
        exp: (now + chrono::Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Middleware that extracts and verifies a staff JWT from the Authorization header
pub async fn staff_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::invalid_token("Invalid Authorization format").into_response()
    })?;

    let token_data = jsonwebtoken::decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        AppError::invalid_token("Invalid or expired token").into_response()
    })?;

    let role = parse_role(&token_data.claims.role)
        .ok_or_else(|| AppError::new(ErrorCode::StaffRequired).into_response())?;

    request.extensions_mut().insert(StaffIdentity {
        staff_id: token_data.claims.sub,
        role,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles() {
        assert_eq!(parse_role("coach"), Some(StaffRole::Coach));
        assert_eq!(parse_role("admin"), Some(StaffRole::Admin));
        assert_eq!(parse_role("member"), None);
    }

    #[test]
    fn token_round_trip() {
        let token = create_token("k1", "coach", "secret").unwrap();
        let data = jsonwebtoken::decode::<StaffClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "k1");
        assert_eq!(data.claims.role, "coach");
    }
}
