//! Credential & session authority: application-layer orchestration
//!
//! Owns registration, the two-step password + OTP login, token issuance,
//! per-request verification and user activation. HTTP handlers are thin
//! wrappers that delegate here.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::application::ports::EmailTransport;
use crate::config::SecurityConfig;
use crate::domain::{
    AuthError, CreateUserDto, DomainResult, FieldErrors, OtpChallenge, PublicUser, User,
    UserRepositoryInterface, UserRole,
};
use crate::infrastructure::crypto::jwt::{create_token, decode_token, JwtConfig};
use crate::infrastructure::crypto::otp::{generate_otp, otp_matches};
use crate::infrastructure::crypto::password::{hash_password, verify_password, DEFAULT_COST};
use crate::infrastructure::email::templates;
use crate::shared::validations::{
    is_valid_email, is_valid_otp_format, normalize_email, MIN_PASSWORD_LEN,
};
use crate::shared::SharedClock;

use super::session::{AuthContext, LoginSession, OtpDispatch, RequestCredentials};

/// Secrets and lifetimes the service is constructed with.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt: JwtConfig,
    pub otp_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    pub fn new(jwt: JwtConfig) -> Self {
        Self {
            jwt,
            otp_ttl: Duration::minutes(10),
            bcrypt_cost: DEFAULT_COST,
        }
    }

    pub fn from_security(security: &SecurityConfig) -> Self {
        Self {
            jwt: JwtConfig {
                secret: security.jwt_secret.clone(),
                expiration_hours: security.jwt_expiration_hours,
                issuer: security.jwt_issuer.clone(),
            },
            otp_ttl: Duration::minutes(security.otp_ttl_minutes),
            bcrypt_cost: security.bcrypt_cost,
        }
    }
}

/// Signup payload as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub password: String,
    /// Role name; `None` means the default role
    pub role: Option<String>,
}

pub struct AuthService {
    repo: Arc<dyn UserRepositoryInterface>,
    mailer: Arc<dyn EmailTransport>,
    clock: SharedClock,
    settings: AuthSettings,
    /// Hash at the configured cost, verified against for unknown emails
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        repo: Arc<dyn UserRepositoryInterface>,
        mailer: Arc<dyn EmailTransport>,
        clock: SharedClock,
        settings: AuthSettings,
    ) -> Self {
        Self {
            repo,
            mailer,
            clock,
            settings,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    // ── Registration ────────────────────────────────────────────

    pub async fn register(&self, input: RegisterInput) -> DomainResult<PublicUser> {
        let full_name = input.full_name.trim().to_string();
        let email = normalize_email(&input.email);

        let mut errors = FieldErrors::new();
        if full_name.is_empty() {
            errors.add("full_name", "Full name is required");
        }
        if email.is_empty() {
            errors.add("email", "Email is required");
        } else if !is_valid_email(&email) {
            errors.add("email", "Please enter a valid email address");
        }
        if input.password.trim().is_empty() {
            errors.add("password", "Password is required");
        } else if input.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
        let role = match input.role.as_deref().map(str::trim) {
            None | Some("") => UserRole::default(),
            Some(raw) => UserRole::parse(raw).unwrap_or_else(|| {
                errors.add("role", format!("Unknown role '{}'", raw));
                UserRole::default()
            }),
        };
        errors.into_result()?;

        if self.repo.email_exists(&email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash(input.password).await?;
        let user = self
            .repo
            .create_user(CreateUserDto {
                full_name,
                email,
                password_hash,
                role,
            })
            .await?;

        metrics::counter!("auth_registrations_total", "role" => role.as_str()).increment(1);
        info!(user_id = %user.id, email = %user.email, role = %user.role, "User registered");

        self.send_welcome(&user);
        Ok(user.to_public())
    }

    // ── Login, step 1 ───────────────────────────────────────────

    /// Check the password and mail a fresh OTP.
    pub async fn begin_login(&self, email: &str, password: &str) -> DomainResult<OtpDispatch> {
        let email = normalize_email(email);

        let Some(user) = self.repo.get_user_by_email(&email).await? else {
            // Pay the same bcrypt cost as a wrong password.
            let dummy = self.dummy_hash().await?;
            self.verify(password, dummy).await?;
            login_attempt("unknown_email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify(password, &user.password_hash).await? {
            login_attempt("wrong_password");
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            login_attempt("deactivated");
            return Err(AuthError::AccountDeactivated);
        }

        login_attempt("otp_issued");
        self.issue_otp(&user).await
    }

    pub async fn resend_otp(&self, email: &str) -> DomainResult<OtpDispatch> {
        let email = normalize_email(email);
        let user = self
            .repo
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.issue_otp(&user).await
    }

    async fn issue_otp(&self, user: &User) -> DomainResult<OtpDispatch> {
        let challenge = OtpChallenge::new(generate_otp(), self.clock.now() + self.settings.otp_ttl);
        self.repo.set_otp(&user.id, &challenge).await?;

        let message = templates::otp_email(
            &user.email,
            &user.full_name,
            &challenge.code,
            self.settings.otp_ttl.num_minutes(),
        );

        if let Err(e) = self.mailer.send(&message).await {
            metrics::counter!("auth_otp_sent_total", "outcome" => "failed").increment(1);
            error!(user_id = %user.id, error = %e, "OTP delivery failed");
            if let Err(clear_err) = self.repo.clear_otp(&user.id).await {
                error!(user_id = %user.id, error = %clear_err, "Failed to clear undelivered OTP");
            }
            return Err(AuthError::OtpDeliveryFailed);
        }

        metrics::counter!("auth_otp_sent_total", "outcome" => "sent").increment(1);
        info!(user_id = %user.id, "OTP sent");

        Ok(OtpDispatch {
            email: user.email.clone(),
            expires_in_seconds: self.settings.otp_ttl.num_seconds(),
        })
    }

    // ── Login, step 2 ───────────────────────────────────────────

    /// Exchange a pending OTP for a session token.
    pub async fn complete_login(&self, email: &str, otp: &str) -> DomainResult<LoginSession> {
        if !is_valid_otp_format(otp) {
            return Err(AuthError::InvalidOtpFormat);
        }

        let email = normalize_email(email);
        let mut user = self
            .repo
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let now = self.clock.now();
        let challenge = user.otp.as_ref().ok_or(AuthError::NoOtpPending)?;
        if challenge.is_expired_at(now) {
            login_attempt("otp_expired");
            return Err(AuthError::OtpExpired);
        }
        if !otp_matches(&challenge.code, otp) {
            login_attempt("otp_mismatch");
            return Err(AuthError::OtpMismatch);
        }

        let code = challenge.code.clone();
        if !self.repo.record_login(&user.id, &code, now).await? {
            // Redeemed or replaced by a concurrent request since the read.
            login_attempt("otp_superseded");
            return Err(AuthError::NoOtpPending);
        }
        user.otp = None;
        user.is_verified = true;
        user.last_login_at = Some(now);

        let token = create_token(
            &user.id,
            &user.email,
            user.role.as_str(),
            &self.settings.jwt,
            now,
        )
        .map_err(|e| AuthError::internal(format!("Failed to create token: {}", e)))?;

        login_attempt("success");
        info!(user_id = %user.id, "Login completed");

        Ok(LoginSession {
            token,
            token_type: "Bearer".into(),
            expires_in: self.settings.jwt.expires_in_seconds(),
            user: user.to_public(),
        })
    }

    // ── Request verification ────────────────────────────────────

    pub async fn verify_request(&self, credentials: &RequestCredentials) -> DomainResult<AuthContext> {
        let result = self.verify_token(credentials).await;
        let outcome = match &result {
            Ok(_) => "valid",
            Err(e) => e.code(),
        };
        metrics::counter!("auth_token_verifications_total", "outcome" => outcome).increment(1);
        result
    }

    async fn verify_token(&self, credentials: &RequestCredentials) -> DomainResult<AuthContext> {
        let token = credentials.token().ok_or(AuthError::NoToken)?;

        let claims = decode_token(token, &self.settings.jwt).map_err(|e| {
            debug!(error = %e, "Token rejected");
            AuthError::TokenInvalid
        })?;
        if claims.is_expired_at(self.clock.now()) {
            return Err(AuthError::TokenExpired);
        }

        let user = self
            .repo
            .get_user_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        Ok(AuthContext {
            user: user.to_public(),
            token: token.to_string(),
        })
    }

    /// Like [`verify_request`](Self::verify_request) but never fails.
    pub async fn optional_verify(&self, credentials: &RequestCredentials) -> Option<AuthContext> {
        credentials.token()?;
        self.verify_request(credentials).await.ok()
    }

    // ── Misc ────────────────────────────────────────────────────

    pub async fn email_exists(&self, email: &str) -> DomainResult<bool> {
        self.repo.email_exists(&normalize_email(email)).await
    }

    pub fn logout(&self, context: &AuthContext) {
        info!(user_id = %context.user.id, email = %context.user.email, "User logged out");
    }

    pub async fn list_users(&self) -> DomainResult<Vec<PublicUser>> {
        let users = self.repo.list_users().await?;
        Ok(users.iter().map(User::to_public).collect())
    }

    /// Activate or deactivate an account. Admins cannot deactivate themselves.
    pub async fn set_user_active(
        &self,
        actor: &AuthContext,
        user_id: &str,
        is_active: bool,
    ) -> DomainResult<PublicUser> {
        if actor.user.id == user_id && !is_active {
            let mut errors = FieldErrors::new();
            errors.add("is_active", "You cannot deactivate your own account");
            return Err(AuthError::Validation(errors));
        }

        let user = self
            .repo
            .set_active(user_id, is_active)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(
            actor = %actor.user.id,
            user_id = %user.id,
            is_active,
            "User activation changed"
        );
        Ok(user.to_public())
    }

    /// Create an admin account when the store holds no users yet.
    pub async fn seed_admin(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> DomainResult<Option<PublicUser>> {
        if self.repo.count_users().await? > 0 {
            return Ok(None);
        }

        let password_hash = self.hash(password.to_string()).await?;
        let user = self
            .repo
            .create_user(CreateUserDto {
                full_name: full_name.trim().to_string(),
                email: normalize_email(email),
                password_hash,
                role: UserRole::Admin,
            })
            .await?;

        info!(email = %user.email, "Default admin created");
        Ok(Some(user.to_public()))
    }

    pub async fn ping(&self) -> DomainResult<()> {
        self.repo.ping().await
    }

    // ── Helpers ─────────────────────────────────────────────────

    async fn hash(&self, password: String) -> DomainResult<String> {
        let cost = self.settings.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(AuthError::internal)?
            .map_err(|e| AuthError::internal(format!("Failed to hash password: {}", e)))
    }

    async fn dummy_hash(&self) -> DomainResult<&str> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash(generate_otp()))
            .await?;
        Ok(hash.as_str())
    }

    async fn verify(&self, password: &str, hash: &str) -> DomainResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(AuthError::internal)?;
        // A malformed stored hash cannot match anything.
        Ok(verified.unwrap_or(false))
    }

    fn send_welcome(&self, user: &User) {
        let mailer = self.mailer.clone();
        let message = templates::welcome_email(&user.email, &user.full_name, user.role);
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                warn!(to = %message.to, error = %e, "Welcome email not delivered");
            }
        });
    }
}

fn login_attempt(outcome: &'static str) {
    metrics::counter!("auth_login_attempts_total", "outcome" => outcome).increment(1);
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::identity::access::require_role;
    use crate::infrastructure::email::{RecordingTransport, UnconfiguredTransport};
    use crate::infrastructure::storage::InMemoryUserRepository;
    use crate::shared::{Clock, ManualClock};
    use chrono::{TimeZone, Utc};

    struct Harness {
        service: AuthService,
        repo: Arc<InMemoryUserRepository>,
        mailer: Arc<RecordingTransport>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let repo = Arc::new(InMemoryUserRepository::new());
        let mailer = Arc::new(RecordingTransport::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        ));
        let settings = AuthSettings {
            jwt: JwtConfig {
                secret: "test-secret".into(),
                expiration_hours: 168,
                issuer: "carelist-auth".into(),
            },
            otp_ttl: Duration::minutes(10),
            bcrypt_cost: 4,
        };
        let service = AuthService::new(repo.clone(), mailer.clone(), clock.clone(), settings);
        Harness {
            service,
            repo,
            mailer,
            clock,
        }
    }

    fn alice() -> RegisterInput {
        RegisterInput {
            full_name: "Alice Doe".into(),
            email: "alice@example.com".into(),
            password: "secret1".into(),
            role: Some("clinician".into()),
        }
    }

    impl Harness {
        async fn pending_otp(&self, email: &str) -> OtpChallenge {
            self.repo
                .get_user_by_email(email)
                .await
                .unwrap()
                .and_then(|u| u.otp)
                .expect("otp pending")
        }

        async fn login(&self, email: &str, password: &str) -> LoginSession {
            self.service.begin_login(email, password).await.unwrap();
            let code = self.pending_otp(email).await.code;
            self.service.complete_login(email, &code).await.unwrap()
        }
    }

    // ── Registration ──

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let h = harness();
        let user = h.service.register(alice()).await.unwrap();
        assert_eq!(user.role, UserRole::Clinician);
        assert!(user.is_active);
        assert!(!user.is_verified);

        let stored = h.repo.get_user_by_email("alice@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");
        assert!(verify_password("secret1", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn register_is_case_insensitive_on_email() {
        let h = harness();
        let mut first = alice();
        first.email = "  Alice@Example.COM ".into();
        let user = h.service.register(first).await.unwrap();
        assert_eq!(user.email, "alice@example.com");

        let err = h.service.register(alice()).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert!(h.service.email_exists("ALICE@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let h = harness();
        let err = h
            .service
            .register(RegisterInput {
                full_name: "   ".into(),
                email: "not-an-email".into(),
                password: "12345".into(),
                role: Some("superuser".into()),
            })
            .await
            .unwrap_err();

        let AuthError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        for field in ["full_name", "email", "password", "role"] {
            assert!(fields.contains(field), "missing {field}");
        }
        assert_eq!(h.repo.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn register_defaults_role_and_accepts_doctor_alias() {
        let h = harness();
        let mut input = alice();
        input.role = None;
        assert_eq!(h.service.register(input).await.unwrap().role, UserRole::Clinician);

        let mut input = alice();
        input.email = "bob@example.com".into();
        input.role = Some("doctor".into());
        assert_eq!(h.service.register(input).await.unwrap().role, UserRole::Clinician);
    }

    // ── BeginLogin ──

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_identical() {
        let h = harness();
        h.service.register(alice()).await.unwrap();

        let unknown = h
            .service
            .begin_login("nobody@example.com", "secret1")
            .await
            .unwrap_err();
        let wrong = h
            .service
            .begin_login("alice@example.com", "wrong-pass")
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.code(), wrong.code());
    }

    #[tokio::test]
    async fn unknown_email_still_runs_bcrypt() {
        let h = harness();
        assert!(h.service.dummy_hash.get().is_none());

        let err = h
            .service
            .begin_login("nobody@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let dummy = h.service.dummy_hash.get().expect("dummy hash computed");
        assert!(dummy.starts_with("$2"));
        assert!(dummy.contains("$04$"));
        assert!(!verify_password("secret1", dummy).unwrap());
    }

    #[tokio::test]
    async fn deactivated_account_only_revealed_with_right_password() {
        let h = harness();
        let user = h.service.register(alice()).await.unwrap();
        h.repo.set_active(&user.id, false).await.unwrap();

        let err = h
            .service
            .begin_login("alice@example.com", "wrong-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = h
            .service
            .begin_login("alice@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn begin_login_issues_six_digit_otp_with_ten_minute_expiry() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        let started = h.clock.now();

        let dispatch = h
            .service
            .begin_login("alice@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(dispatch.email, "alice@example.com");
        assert_eq!(dispatch.expires_in_seconds, 600);

        let otp = h.pending_otp("alice@example.com").await;
        assert!(is_valid_otp_format(&otp.code));
        assert_eq!(otp.expires_at, started + Duration::minutes(10));

        let mail = h.mailer.last_to("alice@example.com").expect("otp mail");
        assert!(mail.text_body.contains(&otp.code));
    }

    #[tokio::test]
    async fn delivery_failure_clears_otp() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        h.mailer.set_failing(true);

        let err = h
            .service
            .begin_login("alice@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::OtpDeliveryFailed));

        let stored = h.repo.get_user_by_email("alice@example.com").await.unwrap().unwrap();
        assert!(stored.otp.is_none());
    }

    #[tokio::test]
    async fn missing_relay_outside_development_fails_login() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        let service = AuthService::new(
            h.repo.clone(),
            Arc::new(UnconfiguredTransport),
            h.clock.clone(),
            h.service.settings().clone(),
        );

        let err = service
            .begin_login("alice@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::OtpDeliveryFailed));
        let stored = h.repo.get_user_by_email("alice@example.com").await.unwrap().unwrap();
        assert!(stored.otp.is_none());
    }

    // ── ResendOtp ──

    #[tokio::test]
    async fn resend_replaces_pending_code() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        h.service.begin_login("alice@example.com", "secret1").await.unwrap();
        let first = h.pending_otp("alice@example.com").await;

        // Force the regenerated code to differ from the first one.
        let mut second = first.clone();
        while second.code == first.code {
            h.service.resend_otp("alice@example.com").await.unwrap();
            second = h.pending_otp("alice@example.com").await;
        }

        let err = h
            .service
            .complete_login("alice@example.com", &first.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::OtpMismatch));
        assert!(h
            .service
            .complete_login("alice@example.com", &second.code)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn resend_for_unknown_user() {
        let h = harness();
        let err = h.service.resend_otp("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    // ── CompleteLogin ──

    #[tokio::test]
    async fn otp_valid_at_nine_fifty_nine() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        h.service.begin_login("alice@example.com", "secret1").await.unwrap();
        let otp = h.pending_otp("alice@example.com").await;

        h.clock.advance(Duration::minutes(9) + Duration::seconds(59));
        let session = h
            .service
            .complete_login("alice@example.com", &otp.code)
            .await
            .unwrap();
        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.expires_in, 168 * 3600);
        assert!(session.user.is_verified);
        assert_eq!(session.user.last_login_at, Some(h.clock.now()));
    }

    #[tokio::test]
    async fn otp_expired_at_ten_oh_one() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        h.service.begin_login("alice@example.com", "secret1").await.unwrap();
        let otp = h.pending_otp("alice@example.com").await;

        h.clock.advance(Duration::minutes(10) + Duration::seconds(1));
        let err = h
            .service
            .complete_login("alice@example.com", &otp.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::OtpExpired));
    }

    #[tokio::test]
    async fn wrong_code_vs_malformed_code() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        h.service.begin_login("alice@example.com", "secret1").await.unwrap();
        let otp = h.pending_otp("alice@example.com").await;
        let wrong = if otp.code == "000000" { "000001" } else { "000000" };

        let err = h
            .service
            .complete_login("alice@example.com", wrong)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::OtpMismatch));

        // Format is checked before the lookup, so an unknown user still gets it.
        for bad in ["12ab56", "12345", "1234567", ""] {
            let err = h
                .service
                .complete_login("ghost@example.com", bad)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidOtpFormat), "{bad}");
        }
    }

    #[tokio::test]
    async fn otp_cannot_be_replayed() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        h.service.begin_login("alice@example.com", "secret1").await.unwrap();
        let otp = h.pending_otp("alice@example.com").await;

        h.service
            .complete_login("alice@example.com", &otp.code)
            .await
            .unwrap();
        let err = h
            .service
            .complete_login("alice@example.com", &otp.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoOtpPending));
    }

    #[tokio::test]
    async fn concurrent_redemptions_issue_one_token() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        h.service.begin_login("alice@example.com", "secret1").await.unwrap();
        let code = h.pending_otp("alice@example.com").await.code;

        let (first, second) = tokio::join!(
            h.service.complete_login("alice@example.com", &code),
            h.service.complete_login("alice@example.com", &code),
        );
        let successes = [first.is_ok(), second.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();
        assert_eq!(successes, 1);
        let failure = first.err().or(second.err()).expect("one redemption fails");
        assert!(matches!(failure, AuthError::NoOtpPending));
    }

    #[tokio::test]
    async fn complete_login_for_unknown_user() {
        let h = harness();
        let err = h
            .service
            .complete_login("ghost@example.com", "123456")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    // ── VerifyRequest ──

    #[tokio::test]
    async fn verify_requires_a_token() {
        let h = harness();
        let err = h
            .service
            .verify_request(&RequestCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoToken));
        assert!(h
            .service
            .optional_verify(&RequestCredentials::default())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn verify_rejects_garbage_and_foreign_tokens() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        let err = h
            .service
            .verify_request(&RequestCredentials::bearer("not.a.jwt"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));

        let foreign = JwtConfig {
            secret: "other-secret".into(),
            ..h.service.settings().jwt.clone()
        };
        let user = h.repo.get_user_by_email("alice@example.com").await.unwrap().unwrap();
        let token = create_token(&user.id, &user.email, "admin", &foreign, h.clock.now()).unwrap();
        let err = h
            .service
            .verify_request(&RequestCredentials::bearer(token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn verify_detects_expired_token() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        let session = h.login("alice@example.com", "secret1").await;

        h.clock.advance(Duration::hours(168) + Duration::seconds(1));
        let err = h
            .service
            .verify_request(&RequestCredentials::bearer(session.token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn verify_rejects_deactivated_user() {
        let h = harness();
        let user = h.service.register(alice()).await.unwrap();
        let session = h.login("alice@example.com", "secret1").await;
        h.repo.set_active(&user.id, false).await.unwrap();

        let creds = RequestCredentials::bearer(session.token);
        let err = h.service.verify_request(&creds).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
        assert!(h.service.optional_verify(&creds).await.is_none());
    }

    #[tokio::test]
    async fn header_token_wins_over_cookie() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        let session = h.login("alice@example.com", "secret1").await;

        let creds = RequestCredentials {
            bearer: Some(session.token.clone()),
            cookie: Some("garbage".into()),
        };
        assert!(h.service.verify_request(&creds).await.is_ok());

        let creds = RequestCredentials {
            bearer: Some("garbage".into()),
            cookie: Some(session.token.clone()),
        };
        assert!(matches!(
            h.service.verify_request(&creds).await,
            Err(AuthError::TokenInvalid)
        ));

        let ctx = h
            .service
            .verify_request(&RequestCredentials::cookie(session.token))
            .await
            .unwrap();
        assert_eq!(ctx.user.email, "alice@example.com");
    }

    // ── User management ──

    #[tokio::test]
    async fn admin_cannot_deactivate_self() {
        let h = harness();
        h.service
            .seed_admin("admin@example.com", "Admin", "admin123")
            .await
            .unwrap()
            .expect("seeded");
        let admin = h.login("admin@example.com", "admin123").await;
        let ctx = h
            .service
            .verify_request(&RequestCredentials::bearer(admin.token))
            .await
            .unwrap();

        let err = h
            .service
            .set_user_active(&ctx, &ctx.user.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let other = h.service.register(alice()).await.unwrap();
        let updated = h.service.set_user_active(&ctx, &other.id, false).await.unwrap();
        assert!(!updated.is_active);

        let err = h.service.set_user_active(&ctx, "missing", true).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn seed_admin_only_into_empty_store() {
        let h = harness();
        h.service.register(alice()).await.unwrap();
        let seeded = h
            .service
            .seed_admin("admin@example.com", "Admin", "admin123")
            .await
            .unwrap();
        assert!(seeded.is_none());
        assert_eq!(h.service.list_users().await.unwrap().len(), 1);
    }

    // ── End to end ──

    #[tokio::test]
    async fn clinician_signup_login_and_role_gate() {
        let h = harness();
        h.service.register(alice()).await.unwrap();

        let dispatch = h
            .service
            .begin_login("alice@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(dispatch.email, "alice@example.com");

        let mail = h.mailer.last_to("alice@example.com").expect("otp mail");
        let code = h.pending_otp("alice@example.com").await.code;
        assert!(mail.text_body.contains(&code));

        let session = h
            .service
            .complete_login("alice@example.com", &code)
            .await
            .unwrap();
        assert_eq!(session.user.role, UserRole::Clinician);

        let ctx = h
            .service
            .verify_request(&RequestCredentials::bearer(session.token))
            .await
            .unwrap();
        assert_eq!(ctx.user.email, "alice@example.com");

        assert!(matches!(
            require_role(Some(&ctx), &[UserRole::Admin]),
            Err(AuthError::Forbidden { .. })
        ));
        assert!(require_role(Some(&ctx), &[UserRole::Admin, UserRole::Clinician]).is_ok());
    }
}
