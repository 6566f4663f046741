//! Client session: the one place credentials live

use tokio::sync::RwLock;

use crate::models::{AuthTokensResponse, MemberResponse, MemberRole};

#[derive(Debug, Clone)]
struct Credentials {
    token: String,
    member: MemberResponse,
}

/// Login state shared by the API client and the views
#[derive(Debug, Default)]
pub struct Session {
    credentials: RwLock<Option<Credentials>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn login(&self, tokens: AuthTokensResponse) {
        tracing::debug!(member_id = %tokens.member.id, "Session opened");
        *self.credentials.write().await = Some(Credentials {
            token: tokens.access_token,
            member: tokens.member,
        });
    }

    /// Drop the credentials. Returns whether a session was open.
    pub async fn logout(&self) -> bool {
        let previous = self.credentials.write().await.take();
        if let Some(credentials) = &previous {
            tracing::debug!(member_id = %credentials.member.id, "Session closed");
        }
        previous.is_some()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    pub async fn token(&self) -> Option<String> {
        self.credentials
            .read()
            .await
            .as_ref()
            .map(|c| c.token.clone())
    }

    pub async fn role(&self) -> Option<MemberRole> {
        self.credentials.read().await.as_ref().map(|c| c.member.role)
    }

    pub async fn member(&self) -> Option<MemberResponse> {
        self.credentials
            .read()
            .await
            .as_ref()
            .map(|c| c.member.clone())
    }
}
