use serde::{Deserialize, Serialize};

use tastemark_core::{Email, UserId};

/// Identity of an authenticated caller, as vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    user_id: UserId,
    email: Email,
}

impl AuthContext {
    pub fn new(user_id: UserId, email: Email) -> Self {
        Self { user_id, email }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }
}

/// Whoever is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(AuthContext),
}

impl Caller {
    pub fn user(ctx: AuthContext) -> Self {
        Caller::User(ctx)
    }

    pub fn auth(&self) -> Option<&AuthContext> {
        match self {
            Caller::Anonymous => None,
            Caller::User(ctx) => Some(ctx),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.auth().map(AuthContext::user_id)
    }
}

impl From<AuthContext> for Caller {
    fn from(ctx: AuthContext) -> Self {
        Caller::User(ctx)
    }
}
