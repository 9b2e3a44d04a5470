//! Authentication service: registration, login, refresh rotation and logout.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::authorization::AuthorizationEngine;
use super::error::{AuthError, AuthResult};
use super::lockout::LoginLimiter;
use super::password::{PasswordError, PasswordHasher};
use super::refresh::{generate_refresh_token, hash_refresh_token, random_hex};
use super::token::{AccessClaims, TokenIssuer};
use super::validation::{normalize_email, validate_registration, RegistrationInput, ValidationError};
use crate::config::AuthConfig;
use crate::db::{
    new_id, unique_violation_column, Database, EmailVerificationRepository, FailureReason,
    LoginAttemptRepository, NewLoginAttempt, NewSession, NewUser, PreferencesRepository,
    RbacRepository, Session, SessionRepository, User, UserRepository, UserStatus,
};
use crate::AegisError;

/// Receives freshly issued email verification tokens for delivery.
pub trait VerificationNotifier: Send + Sync {
    /// Called after a verification token has been stored.
    fn verification_issued(&self, user: &User, token: &str);
}

/// Client details recorded with a session.
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    /// User-Agent header.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
}

/// Credentials handed to a client after authentication.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    /// Signed access token.
    pub access_token: String,
    /// Opaque refresh token (plaintext, never stored).
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// When the refresh token stops working.
    pub refresh_expires_at: DateTime<Utc>,
    /// ID of the session backing the refresh token.
    pub session_id: String,
}

/// Result of register and login.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// Authenticated user.
    pub user: User,
    /// Issued credentials.
    pub tokens: AuthTokens,
}

/// Result of an email verification.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// User after verification.
    pub user: User,
    /// Whether the address had already been verified.
    pub already_verified: bool,
}

/// Orchestrates the credential store, hasher, token issuer and session store.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
    authorization: AuthorizationEngine,
    limiter: LoginLimiter,
    settings: AuthConfig,
    notifier: Option<Arc<dyn VerificationNotifier>>,
    /// Hash checked for unknown identifiers, at the configured cost.
    unknown_user_hash: Arc<str>,
}

impl AuthService {
    /// Create a service over `db` with the given settings.
    pub fn new(db: Database, settings: &AuthConfig) -> crate::Result<Self> {
        let hasher = PasswordHasher::new(&settings.hashing)
            .map_err(|e| AegisError::Config(e.to_string()))?;
        let unknown_user_hash = hasher
            .hash(&random_hex::<16>())
            .map_err(|e| AegisError::Config(e.to_string()))?
            .into();

        Ok(Self {
            tokens: TokenIssuer::new(&settings.jwt_secret, settings.access_token_expiry_secs),
            authorization: AuthorizationEngine::new(db.clone()),
            limiter: LoginLimiter::new(settings.max_failed_attempts, settings.lockout_window_secs),
            hasher,
            settings: settings.clone(),
            notifier: None,
            unknown_user_hash,
            db,
        })
    }

    /// Deliver verification tokens through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn VerificationNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Access token issuer.
    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Authorization engine.
    pub fn authorization(&self) -> &AuthorizationEngine {
        &self.authorization
    }

    /// Settings in effect.
    pub fn settings(&self) -> &AuthConfig {
        &self.settings
    }

    /// Register a new account and sign it in.
    pub async fn register(
        &self,
        input: RegistrationInput,
        meta: &SessionMetadata,
    ) -> AuthResult<AuthOutcome> {
        validate_registration(&input, self.settings.min_password_length)?;

        let email = normalize_email(&input.email);
        let users = UserRepository::new(self.db.pool());
        if users.email_exists(&email).await? {
            return Err(AuthError::DuplicateEmail);
        }
        if users.username_exists(&input.username).await? {
            return Err(AuthError::DuplicateUsername);
        }

        let default_role = RbacRepository::new(self.db.pool())
            .get_role_by_name(&self.settings.default_role)
            .await?
            .ok_or_else(|| {
                AegisError::Config(format!(
                    "default role {:?} does not exist",
                    self.settings.default_role
                ))
            })?;

        let password_hash = self.hasher.hash_async(input.password).await?;
        let new_user = NewUser {
            id: new_id(),
            email,
            username: input.username,
            password_hash,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
        };
        let verification_token = random_hex::<32>();
        let (refresh_token, session) = self.new_session(&new_user.id, meta);

        let mut tx = self.db.begin().await?;
        UserRepository::insert(&mut tx, &new_user)
            .await
            .map_err(map_user_insert_error)?;
        RbacRepository::assign_role(&mut tx, &new_user.id, &default_role.id).await?;
        PreferencesRepository::create_default(&mut tx, &new_user.id).await?;
        EmailVerificationRepository::insert(
            &mut tx,
            &new_user.id,
            &verification_token,
            self.verification_expiry(),
        )
        .await?;
        SessionRepository::insert(&mut tx, &session).await?;
        tx.commit().await?;

        let user = self.current_user(&new_user.id).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");
        self.notify_verification(&user, &verification_token);

        let tokens = self.session_tokens(&user, refresh_token, session)?;
        Ok(AuthOutcome { user, tokens })
    }

    /// Authenticate with an email or username and a password.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        meta: &SessionMetadata,
    ) -> AuthResult<AuthOutcome> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ValidationError::Required("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::Required("password").into());
        }

        let users = UserRepository::new(self.db.pool());
        let user = users.find_by_identifier(identifier).await?;

        // A known account is counted under its email, whichever name was typed.
        let lockout_key = match &user {
            Some(user) => user.email.clone(),
            None => identifier.to_lowercase(),
        };

        let limit = self.limiter.check(self.db.pool(), &lockout_key).await?;
        if let Some(minutes) = limit.remaining_minutes() {
            self.record_attempt(&lockout_key, meta, Some(FailureReason::AccountLocked))
                .await?;
            warn!(identifier = %identifier, minutes, "Login rejected: identifier locked");
            return Err(AuthError::AccountLocked { minutes });
        }

        let Some(user) = user else {
            // Same hashing work as a wrong password for a real account.
            let _ = self
                .hasher
                .verify_async(password.to_string(), self.unknown_user_hash.to_string())
                .await;
            self.record_attempt(&lockout_key, meta, Some(FailureReason::UserNotFound))
                .await?;
            debug!("Login failed: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        match self
            .hasher
            .verify_async(password.to_string(), user.password_hash.clone())
            .await
        {
            Ok(()) => {}
            Err(PasswordError::VerificationFailed) => {
                self.record_attempt(&lockout_key, meta, Some(FailureReason::InvalidPassword))
                    .await?;
                debug!(user_id = %user.id, "Login failed: wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        }

        if user.status.is_disabled() {
            self.record_attempt(&lockout_key, meta, Some(FailureReason::AccountDisabled))
                .await?;
            info!(user_id = %user.id, status = %user.status, "Login rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        users.update_last_login(&user.id).await?;
        self.record_attempt(&lockout_key, meta, None).await?;

        let user = self.current_user(&user.id).await?;
        let tokens = self.issue_session(&user, meta).await?;
        info!(user_id = %user.id, session_id = %tokens.session_id, "User logged in");
        Ok(AuthOutcome { user, tokens })
    }

    /// Create a session for `user` and sign a matching access token.
    ///
    /// Existing sessions of the user are left untouched.
    pub async fn issue_session(&self, user: &User, meta: &SessionMetadata) -> AuthResult<AuthTokens> {
        let (refresh_token, session) = self.new_session(&user.id, meta);
        SessionRepository::new(self.db.pool()).create(&session).await?;
        self.session_tokens(user, refresh_token, session)
    }

    /// A fresh session row for `user_id` and its plaintext refresh token.
    fn new_session(&self, user_id: &str, meta: &SessionMetadata) -> (String, NewSession) {
        let (refresh_token, refresh_token_hash) = generate_refresh_token();
        let session = NewSession {
            id: new_id(),
            user_id: user_id.to_string(),
            refresh_token_hash,
            user_agent: meta.user_agent.clone(),
            ip_address: meta.ip_address.clone(),
            expires_at: self.refresh_expiry(),
        };
        (refresh_token, session)
    }

    /// Sign an access token to go with a stored session.
    fn session_tokens(
        &self,
        user: &User,
        refresh_token: String,
        session: NewSession,
    ) -> AuthResult<AuthTokens> {
        let access = self.tokens.issue(&user.id, &user.email)?;
        Ok(AuthTokens {
            access_token: access.token,
            refresh_token,
            expires_in: access.expires_in,
            refresh_expires_at: session.expires_at,
            session_id: session.id,
        })
    }

    /// Exchange a refresh token for a new access token and refresh token.
    ///
    /// The presented token is consumed: a second use always fails.
    pub async fn refresh(&self, refresh_token: &str, meta: &SessionMetadata) -> AuthResult<AuthTokens> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let sessions = SessionRepository::new(self.db.pool());
        let session = sessions
            .get_by_token_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if session.is_expired() {
            debug!(session_id = %session.id, "Refresh rejected: session expired");
            return Err(AuthError::RefreshTokenExpired);
        }
        if !session.is_active {
            warn!(session_id = %session.id, "Refresh rejected: token already used or revoked");
            return Err(AuthError::InvalidRefreshToken);
        }

        let Some(user) = UserRepository::new(self.db.pool())
            .get_by_id(&session.user_id)
            .await?
        else {
            warn!(session_id = %session.id, "Refresh rejected: session owner missing");
            return Err(AuthError::InvalidRefreshToken);
        };
        if user.status.is_disabled() {
            return Err(AuthError::AccountDisabled);
        }

        let (new_token, new_hash) = generate_refresh_token();
        let replacement = NewSession {
            id: new_id(),
            user_id: user.id.clone(),
            refresh_token_hash: new_hash,
            user_agent: meta.user_agent.clone().or(session.user_agent),
            ip_address: meta.ip_address.clone().or(session.ip_address),
            expires_at: self.refresh_expiry(),
        };

        if !sessions.rotate(&session.id, &replacement).await? {
            warn!(session_id = %session.id, "Refresh rejected: lost rotation race");
            return Err(AuthError::InvalidRefreshToken);
        }

        debug!(user_id = %user.id, old_session = %session.id, new_session = %replacement.id, "Session rotated");
        self.session_tokens(&user, new_token, replacement)
    }

    /// Deactivate the caller's session tied to `refresh_token`.
    ///
    /// Returns whether a session was deactivated. Without a refresh token
    /// nothing changes; the access token stays valid until it expires.
    pub async fn logout(&self, claims: &AccessClaims, refresh_token: Option<&str>) -> AuthResult<bool> {
        let Some(token) = refresh_token.filter(|t| !t.is_empty()) else {
            debug!(user_id = %claims.sub, "Logout without refresh token");
            return Ok(false);
        };

        let deactivated = SessionRepository::new(self.db.pool())
            .deactivate_by_token_hash(&claims.sub, &hash_refresh_token(token))
            .await?;
        info!(user_id = %claims.sub, deactivated, "User logged out");
        Ok(deactivated)
    }

    /// Verify an access token.
    pub fn authenticate(&self, access_token: &str) -> AuthResult<AccessClaims> {
        self.tokens.verify(access_token)
    }

    /// Load a user by ID.
    pub async fn current_user(&self, user_id: &str) -> AuthResult<User> {
        UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("user"))
    }

    /// Active sessions of a user.
    pub async fn active_sessions(&self, user_id: &str) -> AuthResult<Vec<Session>> {
        Ok(SessionRepository::new(self.db.pool())
            .list_active_for_user(user_id)
            .await?)
    }

    /// Confirm an email address with a verification token.
    pub async fn verify_email(&self, token: &str) -> AuthResult<VerificationOutcome> {
        let verification = EmailVerificationRepository::new(self.db.pool())
            .get_by_token(token.trim())
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;
        let user = UserRepository::new(self.db.pool())
            .get_by_id(&verification.user_id)
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        if verification.verified || user.email_verified {
            return Ok(VerificationOutcome {
                user,
                already_verified: true,
            });
        }
        if verification.is_expired() {
            return Err(AuthError::VerificationTokenExpired);
        }

        let mut tx = self.db.begin().await?;
        EmailVerificationRepository::mark_verified(&mut tx, &verification.id).await?;
        UserRepository::mark_email_verified(&mut tx, &user.id).await?;
        tx.commit().await?;

        info!(user_id = %user.id, "Email verified");
        Ok(VerificationOutcome {
            user: self.current_user(&user.id).await?,
            already_verified: false,
        })
    }

    /// Replace a user's pending verification token with a fresh one.
    pub async fn resend_verification(&self, user_id: &str) -> AuthResult<()> {
        let user = self.current_user(user_id).await?;
        if user.email_verified {
            return Err(AuthError::EmailAlreadyVerified);
        }

        let token = random_hex::<32>();
        let mut tx = self.db.begin().await?;
        EmailVerificationRepository::delete_pending_for_user(&mut tx, &user.id).await?;
        EmailVerificationRepository::insert(&mut tx, &user.id, &token, self.verification_expiry())
            .await?;
        tx.commit().await?;

        info!(user_id = %user.id, "Verification token reissued");
        self.notify_verification(&user, &token);
        Ok(())
    }

    /// Clear login failures for an identifier and the account it resolves to.
    ///
    /// Returns the number of failures cleared.
    pub async fn unlock(&self, identifier: &str) -> AuthResult<u64> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ValidationError::Required("identifier").into());
        }

        let attempts = LoginAttemptRepository::new(self.db.pool());
        let mut cleared = attempts.clear_failures(&identifier.to_lowercase()).await?;

        if let Some(user) = UserRepository::new(self.db.pool())
            .find_by_identifier(identifier)
            .await?
        {
            for alias in [&user.email, &user.username] {
                if !alias.eq_ignore_ascii_case(identifier) {
                    cleared += attempts.clear_failures(alias).await?;
                }
            }
        }

        info!(identifier = %identifier, cleared, "Login lockout cleared");
        Ok(cleared)
    }

    /// Change a user's status.
    ///
    /// Moving to `inactive` or `suspended` deactivates every session of the
    /// user in the same transaction.
    pub async fn set_user_status(&self, user_id: &str, status: UserStatus) -> AuthResult<User> {
        let mut tx = self.db.begin().await?;
        if !UserRepository::set_status(&mut tx, user_id, status).await? {
            return Err(AuthError::NotFound("user"));
        }
        let revoked = if status.is_disabled() {
            SessionRepository::deactivate_all_for_user(&mut tx, user_id).await?
        } else {
            0
        };
        tx.commit().await?;

        info!(user_id = %user_id, status = %status, revoked_sessions = revoked, "User status changed");
        self.current_user(user_id).await
    }

    async fn record_attempt(
        &self,
        identifier: &str,
        meta: &SessionMetadata,
        failure: Option<FailureReason>,
    ) -> AuthResult<()> {
        LoginAttemptRepository::new(self.db.pool())
            .record(&NewLoginAttempt {
                identifier,
                ip_address: meta.ip_address.as_deref(),
                failure,
            })
            .await?;
        Ok(())
    }

    fn notify_verification(&self, user: &User, token: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.verification_issued(user, token);
        }
    }

    fn refresh_expiry(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.settings.refresh_token_expiry_secs as i64)
    }

    fn verification_expiry(&self) -> DateTime<Utc> {
        Utc::now() + Duration::hours(self.settings.email_verification_expiry_hours as i64)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .finish()
    }
}

fn map_user_insert_error(err: sqlx::Error) -> AuthError {
    match unique_violation_column(&err).as_deref() {
        Some("users.email") => AuthError::DuplicateEmail,
        Some("users.username") => AuthError::DuplicateUsername,
        _ => err.into(),
    }
}
