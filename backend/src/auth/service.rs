//! Authentication service
//!
//! Member registration, e-mail/password login and access token handling.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;
use validator::Validate;

use crate::loan_request::Actor;
use crate::models::{
    AuthTokensResponse, LoginRequest, Member, MemberResponse, MemberRole, RegisterRequest,
};
use crate::store::{MemberStore, StoreError};

use super::jwt::{generate_access_token, verify_token, Claims, JwtError};
use super::password::{hash_password, verify_password, PasswordError};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    #[error("E-mail already registered")]
    EmailTaken,

    #[error("Member not found")]
    MemberNotFound,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Session revoked")]
    TokenRevoked,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => AuthError::EmailTaken,
            other => AuthError::Storage(other.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::TokenExpired => AuthError::TokenExpired,
            JwtError::InvalidToken(msg) => AuthError::InvalidToken(msg),
            JwtError::EncodingFailed(msg) => AuthError::Hashing(msg),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        AuthError::Hashing(e.to_string())
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    members: Arc<dyn MemberStore>,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    bcrypt_cost: u32,
    bootstrap_president_email: Option<String>,
    /// Verified against when the e-mail is unknown, so that path costs the
    /// same bcrypt work as a wrong password
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        members: Arc<dyn MemberStore>,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        bcrypt_cost: u32,
        bootstrap_president_email: Option<String>,
    ) -> Self {
        Self {
            members,
            jwt_secret,
            access_token_ttl_seconds,
            bcrypt_cost,
            bootstrap_president_email: bootstrap_president_email.map(|e| e.to_lowercase()),
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Register a member. New accounts are plain members unless the e-mail
    /// is the configured bootstrap president.
    pub async fn register(&self, request: RegisterRequest) -> Result<Member, AuthError> {
        let email = request.email.trim().to_lowercase();
        let role = if self.bootstrap_president_email.as_deref() == Some(email.as_str()) {
            MemberRole::President
        } else {
            MemberRole::Member
        };
        self.register_with_role(request, role).await
    }

    /// Register a member directly into `role`; used for seeding
    pub async fn register_with_role(
        &self,
        request: RegisterRequest,
        role: MemberRole,
    ) -> Result<Member, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let email = request.email.trim().to_lowercase();
        if self.members.find_member_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(request.password, self.bcrypt_cost).await?;

        let member = Member {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            email,
            password_hash,
            role,
            npi: request.npi.trim().to_string(),
            phone: request.phone.trim().to_string(),
            created_at: Utc::now(),
        };

        // A concurrent registration can still win the race; the store's
        // unique index reports it as Duplicate.
        let member = self.members.insert_member(member).await?;

        tracing::info!(member_id = %member.id, role = %member.role, "Member registered");
        Ok(member)
    }

    /// Exchange e-mail and password for an access token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthTokensResponse, AuthError> {
        let email = request.email.trim().to_lowercase();

        let member = match self.members.find_member_by_email(&email).await? {
            Some(member) => member,
            None => {
                let dummy = self
                    .dummy_hash
                    .get_or_try_init(|| {
                        hash_password(Uuid::new_v4().to_string(), self.bcrypt_cost)
                    })
                    .await?;
                verify_password(request.password, dummy.clone()).await;
                tracing::debug!("Login attempt for unknown e-mail");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(request.password, member.password_hash.clone()).await {
            tracing::warn!(member_id = %member.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let jti = Uuid::new_v4().to_string();
        let access_token = generate_access_token(
            &member,
            &jti,
            &self.jwt_secret,
            self.access_token_ttl_seconds,
        )?;

        tracing::info!(member_id = %member.id, "Member logged in");

        Ok(AuthTokensResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            member: member.into(),
        })
    }

    /// Validate a bearer token and load its member. The role comes from the
    /// store, so role changes apply to tokens already issued.
    pub async fn authenticate(&self, token: &str) -> Result<(Member, Claims), AuthError> {
        let claims = verify_token(token, &self.jwt_secret)?;

        if self.members.is_token_revoked(&claims.jti).await? {
            return Err(AuthError::TokenRevoked);
        }

        let member_id = claims.member_id()?;
        let member = self
            .members
            .find_member(member_id)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("unknown member".to_string()))?;

        Ok((member, claims))
    }

    /// Revoke the token identified by `jti` until it would have expired anyway
    pub async fn logout(&self, jti: &str, expires_at: i64) -> Result<(), AuthError> {
        let expires_at: DateTime<Utc> = Utc
            .timestamp_opt(expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now);
        self.members.revoke_token(jti, expires_at).await?;

        tracing::info!(jti = %jti, "Access token revoked");
        Ok(())
    }

    pub async fn get_member(&self, id: Uuid) -> Result<Member, AuthError> {
        self.members
            .find_member(id)
            .await?
            .ok_or(AuthError::MemberNotFound)
    }

    /// Member directory, visible to office holders
    pub async fn list_members(&self, actor: &Actor) -> Result<Vec<MemberResponse>, AuthError> {
        if !actor.role.is_approver() {
            return Err(AuthError::Forbidden(
                "Only office holders can list members".to_string(),
            ));
        }
        let members = self.members.list_members().await?;
        Ok(members.into_iter().map(MemberResponse::from).collect())
    }

    /// Change a member's role; only the president appoints
    pub async fn assign_role(
        &self,
        actor: &Actor,
        member_id: Uuid,
        role: MemberRole,
    ) -> Result<Member, AuthError> {
        if actor.role != MemberRole::President {
            return Err(AuthError::Forbidden(
                "Only the president can assign roles".to_string(),
            ));
        }

        let member = self
            .members
            .update_member_role(member_id, role)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::MemberNotFound,
                other => other.into(),
            })?;

        tracing::info!(
            member_id = %member.id,
            role = %member.role,
            by = %actor.member_id,
            "Member role changed"
        );
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn service(bootstrap: Option<&str>) -> AuthService {
        AuthService::new(
            Arc::new(InMemoryStore::new()),
            "test-secret".to_string(),
            900,
            4,
            bootstrap.map(str::to_string),
        )
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Agbo".to_string(),
            first_name: "Kossi".to_string(),
            email: email.to_string(),
            password: "long enough password".to_string(),
            npi: "9988776655".to_string(),
            phone: "+22997000000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let auth = service(None);
        let member = auth.register(registration("Kossi@Example.com")).await.unwrap();
        assert_eq!(member.role, MemberRole::Member);
        assert_eq!(member.email, "kossi@example.com");

        let tokens = auth
            .login(LoginRequest {
                email: "KOSSI@example.com".to_string(),
                password: "long enough password".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.member.id, member.id);

        let (loaded, claims) = auth.authenticate(&tokens.access_token).await.unwrap();
        assert_eq!(loaded.id, member.id);
        assert_eq!(claims.email, "kossi@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let auth = service(None);
        auth.register(registration("dup@example.com")).await.unwrap();
        let err = auth
            .register(registration("DUP@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = service(None);
        auth.register(registration("a@example.com")).await.unwrap();
        let err = auth
            .login(LoginRequest {
                email: "a@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_email_still_verifies_a_hash() {
        let auth = service(None);
        assert!(!auth.dummy_hash.initialized());

        let err = auth
            .login(LoginRequest {
                email: "ghost@example.com".to_string(),
                password: "whatever it is".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // Hashed once at the configured cost, then reused
        let dummy = auth.dummy_hash.get().unwrap().clone();
        assert!(dummy.starts_with("$2b$04$"));
        let _ = auth
            .login(LoginRequest {
                email: "ghost@example.com".to_string(),
                password: "again".to_string(),
            })
            .await;
        assert_eq!(auth.dummy_hash.get(), Some(&dummy));
    }

    #[tokio::test]
    async fn test_bootstrap_president() {
        let auth = service(Some("Chief@Example.com"));
        let member = auth.register(registration("chief@example.com")).await.unwrap();
        assert_eq!(member.role, MemberRole::President);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let auth = service(None);
        auth.register(registration("out@example.com")).await.unwrap();
        let tokens = auth
            .login(LoginRequest {
                email: "out@example.com".to_string(),
                password: "long enough password".to_string(),
            })
            .await
            .unwrap();

        let (_, claims) = auth.authenticate(&tokens.access_token).await.unwrap();
        auth.logout(&claims.jti, claims.exp).await.unwrap();

        let err = auth.authenticate(&tokens.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_only_president_assigns_roles() {
        let auth = service(None);
        let president = auth
            .register_with_role(registration("p@example.com"), MemberRole::President)
            .await
            .unwrap();
        let member = auth.register(registration("m@example.com")).await.unwrap();

        let as_member = Actor::new(member.id, member.role);
        let err = auth
            .assign_role(&as_member, member.id, MemberRole::Treasurer)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));

        let as_president = Actor::new(president.id, president.role);
        let updated = auth
            .assign_role(&as_president, member.id, MemberRole::Treasurer)
            .await
            .unwrap();
        assert_eq!(updated.role, MemberRole::Treasurer);

        let err = auth
            .assign_role(&as_president, Uuid::new_v4(), MemberRole::Secretary)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MemberNotFound));
    }
}
