// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, Validation};
use serde::Deserialize;

use super::{AuthError, AuthenticatedUser, Role};
use crate::state::AppState;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Minimal JWT claims for decoding identity-provider tokens.
#[derive(Debug, Deserialize)]
struct JwtClaims {
    /// Subject (user ID)
    sub: String,
    /// Issued at timestamp
    #[serde(default)]
    #[allow(dead_code)]
    iat: i64,
    /// Expiration timestamp
    #[serde(default)]
    exp: i64,
    /// Issuer
    #[serde(default)]
    iss: String,
    /// Session ID
    #[serde(default)]
    sid: Option<String>,
    /// Email claim
    #[serde(default)]
    email: Option<String>,
    /// Audience (validated by jsonwebtoken crate, not read directly)
    #[serde(default)]
    #[allow(dead_code)]
    aud: Option<serde_json::Value>,
    /// Public metadata containing the marketplace role
    #[serde(default, rename = "publicMetadata")]
    public_metadata: Option<PublicMetadata>,
}

/// Public metadata structure.
#[derive(Debug, Deserialize, Default)]
struct PublicMetadata {
    /// User's role (set in the identity provider dashboard)
    #[serde(default)]
    role: Option<String>,
}

/// Extractor for authenticated users.
///
/// This extractor validates the JWT from the Authorization header
/// and provides the authenticated user information.
///
/// ## Authentication Modes
///
/// - **Production mode** (AUTH_JWKS_URL set): Full JWT verification against JWKS
/// - **Development mode** (`dev` feature, no AUTH_JWKS_URL): Structure validation only
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        // Decode and verify the JWT
        let user = verify_jwt(token, &state.auth_config).await?;

        Ok(Auth(user))
    }
}

/// Verify JWT and extract user information.
///
/// In production mode (JWKS configured), verifies the signature against
/// the provider JWKS. In development mode, only validates structure.
async fn verify_jwt(
    token: &str,
    auth_config: &crate::state::AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    if let Some(ref jwks) = auth_config.jwks {
        verify_jwt_production(token, jwks, auth_config).await
    } else {
        verify_jwt_development(token)
    }
}

/// Production JWT verification with JWKS.
async fn verify_jwt_production(
    token: &str,
    jwks: &super::JwksManager,
    auth_config: &crate::state::AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    // Decode header to get kid (key ID)
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

    // Get decoding key from JWKS
    let (decoding_key, algorithm) = if let Some(kid) = &header.kid {
        jwks.get_decoding_key(kid).await?
    } else {
        // No kid in header, try any key
        jwks.get_any_decoding_key().await?
    };

    // Build validation
    let mut validation = Validation::new(algorithm);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    if let Some(ref issuer) = auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    if let Some(ref audience) = auth_config.audience {
        validation.set_audience(&[audience]);
    } else {
        validation.validate_aud = false;
    }

    // Decode and validate token
    let token_data =
        decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        })?;

    Ok(user_from_claims(token_data.claims))
}

/// Development JWT verification (no signature check).
///
/// Compiled only for tests and the `dev` feature; production builds
/// without a configured JWKS refuse every token.
#[cfg(any(test, feature = "dev"))]
fn verify_jwt_development(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<JwtClaims>(token)
        .map_err(|_e| AuthError::MalformedToken)?;

    let claims = token_data.claims;

    // Check expiration manually
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(user_from_claims(claims))
}

#[cfg(not(any(test, feature = "dev")))]
fn verify_jwt_development(_token: &str) -> Result<AuthenticatedUser, AuthError> {
    Err(AuthError::InternalError(
        "AUTH_JWKS_URL is not configured".to_string(),
    ))
}

fn user_from_claims(claims: JwtClaims) -> AuthenticatedUser {
    // Extract role from public metadata (default to Member)
    let role = claims
        .public_metadata
        .as_ref()
        .and_then(|m| m.role.as_ref())
        .and_then(|r| Role::from_str(r))
        .unwrap_or(Role::Member);

    AuthenticatedUser {
        user_id: claims.sub,
        role,
        session_id: claims.sid,
        email: claims.email,
        issuer: claims.iss,
        expires_at: claims.exp,
    }
}

/// Extractor that requires a role with creator privileges.
pub struct CreatorOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for CreatorOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.has_role(Role::Creator) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(CreatorOnly(user))
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of
/// rejecting. Used by public listing endpoints that show extra fields to
/// the listing owner.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Try to authenticate, but don't fail if it doesn't work
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::Request;

    /// Helper to create a test JWT token (unsigned, for testing only)
    fn create_test_jwt(user_id: &str, role: Option<&str>) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"RS256","typ":"JWT"}"#;
        let metadata = role
            .map(|r| format!(r#","publicMetadata":{{"role":"{r}"}}"#))
            .unwrap_or_default();
        let claims = format!(
            r#"{{"sub":"{user_id}","iat":1609459200,"exp":9999999999,"iss":"test","sid":"sess_123","email":"{user_id}@example.com"{metadata}}}"#,
        );

        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.as_bytes());

        // For testing, signature doesn't matter since we use development mode
        format!("{}.{}.fake_signature", header_b64, claims_b64)
    }

    fn request_parts(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _temp) = AppState::for_tests();
        let mut parts = request_parts(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_jwt() {
        let (state, _temp) = AppState::for_tests();
        let token = create_test_jwt("user_123", None);
        let mut parts = request_parts(Some(&token));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        let Auth(user) = result.unwrap();
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.email.as_deref(), Some("user_123@example.com"));
    }

    #[tokio::test]
    async fn role_is_read_from_public_metadata() {
        let (state, _temp) = AppState::for_tests();
        let token = create_test_jwt("creator_9", Some("creator"));
        let mut parts = request_parts(Some(&token));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.role, Role::Creator);
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _temp) = AppState::for_tests();
        let mut parts = request_parts(None);

        let user = AuthenticatedUser {
            user_id: "user_from_middleware".to_string(),
            role: Role::Admin,
            session_id: None,
            email: None,
            issuer: "middleware".to_string(),
            expires_at: 0,
        };
        parts.extensions.insert(user.clone());

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap().0.user_id, "user_from_middleware");
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admin() {
        let (state, _temp) = AppState::for_tests();
        let token = create_test_jwt("user_123", Some("member"));
        let mut parts = request_parts(Some(&token));

        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn creator_only_accepts_creators_and_admins() {
        let (state, _temp) = AppState::for_tests();

        let token = create_test_jwt("creator_1", Some("creator"));
        let mut parts = request_parts(Some(&token));
        assert!(CreatorOnly::from_request_parts(&mut parts, &state)
            .await
            .is_ok());

        let token = create_test_jwt("admin_1", Some("admin"));
        let mut parts = request_parts(Some(&token));
        assert!(CreatorOnly::from_request_parts(&mut parts, &state)
            .await
            .is_ok());

        let token = create_test_jwt("member_1", Some("member"));
        let mut parts = request_parts(Some(&token));
        assert!(matches!(
            CreatorOnly::from_request_parts(&mut parts, &state).await,
            Err(AuthError::InsufficientPermissions)
        ));
    }

    #[tokio::test]
    async fn optional_auth_returns_none_without_user() {
        let (state, _temp) = AppState::for_tests();
        let mut parts = request_parts(None);

        let result = OptionalAuth::from_request_parts(&mut parts, &state).await;
        assert!(result.unwrap().0.is_none());
    }
}
