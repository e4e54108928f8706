//! Demo authentication with fixed accounts and unsigned JWT-shaped tokens.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use taskboard_core::{Role, User, UserId};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::api::{AuthResponse, LoginRequest};
use crate::backend::AuthBackend;
use crate::demo::SimulatedLatency;
use crate::error::AuthError;

/// Password shared by every demo account.
pub const DEMO_PASSWORD: &str = "pass123";

const TOKEN_LIFETIME: Duration = Duration::hours(24);
const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const TOKEN_SIGNATURE: &str = "demo-signature";

const LOGIN_DELAY_MS: u64 = 500;
const LOGOUT_DELAY_MS: u64 = 200;
const REFRESH_DELAY_MS: u64 = 200;
const PROFILE_DELAY_MS: u64 = 200;

/// Payload carried by a demo token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: UserId,
    /// User email.
    pub email: String,
    /// User role.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl TokenClaims {
    fn for_user(user: &User, now: OffsetDateTime) -> Self {
        let iat = now.unix_timestamp();
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            name: user.name.clone(),
            iat,
            exp: iat + TOKEN_LIFETIME.whole_seconds(),
        }
    }

    /// Whether the token has expired at `now`.
    #[must_use]
    pub const fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.exp < now.unix_timestamp()
    }

    /// Account described by the claims.
    #[must_use]
    pub fn user(&self) -> User {
        User {
            id: self.sub.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Encode a token for `user` issued at `now`.
///
/// # Errors
/// Returns an error if the claims cannot be serialized.
pub fn issue_token(user: &User, now: OffsetDateTime) -> Result<String, AuthError> {
    let claims = serde_json::to_vec(&TokenClaims::for_user(user, now))
        .map_err(|err| AuthError::Unavailable(err.to_string()))?;
    Ok(format!(
        "{}.{}.{}",
        STANDARD.encode(TOKEN_HEADER),
        STANDARD.encode(claims),
        STANDARD.encode(TOKEN_SIGNATURE)
    ))
}

/// Decode and check a token at `now`.
///
/// # Errors
/// Returns [`AuthError::MalformedToken`] when the token does not parse and
/// [`AuthError::TokenExpired`] when it has expired.
pub fn decode_token(token: &str, now: OffsetDateTime) -> Result<TokenClaims, AuthError> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken("expected three segments".into()));
    };
    let bytes = STANDARD
        .decode(payload)
        .or_else(|_| URL_SAFE_NO_PAD.decode(payload))
        .map_err(|err| AuthError::MalformedToken(err.to_string()))?;
    let claims: TokenClaims =
        serde_json::from_slice(&bytes).map_err(|err| AuthError::MalformedToken(err.to_string()))?;
    if claims.is_expired(now) {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

/// The three built-in demo accounts.
#[must_use]
pub fn demo_users() -> Vec<User> {
    [
        ("1", "John Owner", "owner@example.com", Role::Owner),
        ("2", "Jane Admin", "admin@example.com", Role::Admin),
        ("3", "Bob Viewer", "viewer@example.com", Role::Viewer),
    ]
    .into_iter()
    .map(|(id, name, email, role)| User {
        id: UserId::from(id),
        name: name.to_owned(),
        email: email.to_owned(),
        role,
    })
    .collect()
}

/// [`AuthBackend`] backed by [`demo_users`].
#[derive(Debug, Clone)]
pub struct DemoAuthService {
    users: Vec<User>,
    latency: SimulatedLatency,
}

impl DemoAuthService {
    /// Service over the built-in accounts.
    #[must_use]
    pub fn new(latency: SimulatedLatency) -> Self {
        Self {
            users: demo_users(),
            latency,
        }
    }

    /// Accounts that can log in.
    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    fn respond(user: User) -> Result<AuthResponse, AuthError> {
        let token = issue_token(&user, OffsetDateTime::now_utc())?;
        Ok(AuthResponse { token, user })
    }
}

impl AuthBackend for DemoAuthService {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        self.latency.wait(LOGIN_DELAY_MS).await;
        let user = self
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(request.email.trim()))
            .filter(|_| request.password == DEMO_PASSWORD)
            .ok_or(AuthError::InvalidCredentials)?;
        info!(user = %user.id, role = %user.role, "Demo login");
        Self::respond(user.clone())
    }

    async fn logout(&self, _token: &str) -> Result<(), AuthError> {
        self.latency.wait(LOGOUT_DELAY_MS).await;
        debug!("Demo logout");
        Ok(())
    }

    async fn refresh(&self, token: &str) -> Result<AuthResponse, AuthError> {
        self.latency.wait(REFRESH_DELAY_MS).await;
        let claims = decode_token(token, OffsetDateTime::now_utc())?;
        Self::respond(claims.user())
    }

    async fn profile(&self, token: &str) -> Result<User, AuthError> {
        self.latency.wait(PROFILE_DELAY_MS).await;
        Ok(decode_token(token, OffsetDateTime::now_utc())?.user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn owner() -> User {
        demo_users().remove(0)
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn issued_tokens_decode_until_expiry() {
        let issued_at = datetime!(2024-01-15 10:00 UTC);
        let token = issue_token(&owner(), issued_at).unwrap_or_else(|err| panic!("issue: {err}"));
        assert_eq!(token.split('.').count(), 3);

        let claims = decode_token(&token, issued_at + Duration::hours(23))
            .unwrap_or_else(|err| panic!("decode: {err}"));
        assert_eq!(claims.user(), owner());
        assert_eq!(claims.exp - claims.iat, 86_400);

        assert!(matches!(
            decode_token(&token, issued_at + Duration::hours(25)),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn garbage_tokens_are_malformed() {
        let now = datetime!(2024-01-15 10:00 UTC);
        for token in ["", "abc", "a.b", "a.!!!.c", "a.e30=.c.d"] {
            assert!(
                matches!(decode_token(token, now), Err(AuthError::MalformedToken(_))),
                "{token:?} should be malformed"
            );
        }
    }

    #[tokio::test]
    async fn login_checks_email_and_password() {
        let service = DemoAuthService::new(SimulatedLatency::NONE);
        let response = service
            .login(&login("Admin@Example.com", DEMO_PASSWORD))
            .await
            .unwrap_or_else(|err| panic!("login: {err}"));
        assert_eq!(response.user.role, Role::Admin);

        let profile = service
            .profile(&response.token)
            .await
            .unwrap_or_else(|err| panic!("profile: {err}"));
        assert_eq!(profile, response.user);

        assert!(matches!(
            service.login(&login("admin@example.com", "wrong")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login(&login("nobody@example.com", DEMO_PASSWORD)).await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
