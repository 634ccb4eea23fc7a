//! User profile documents (`users` collection).
//!
//! Profiles carry presentation data only. Admin rights are not stored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tastemark_core::{Document, DomainError, DomainResult, Email, Entity, UserId};

use crate::context::AuthContext;

pub const MAX_DISPLAY_NAME_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn register(ctx: &AuthContext, display_name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ctx.user_id(),
            email: ctx.email().clone(),
            display_name: validate_display_name(display_name)?,
            created_at: now,
            updated_at: None,
        })
    }

    pub fn rename(&mut self, display_name: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.display_name = validate_display_name(display_name)?;
        self.updated_at = Some(now);
        Ok(())
    }
}

fn validate_display_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("display name cannot be empty"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "display name is limited to {MAX_DISPLAY_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Name shown next to a caller's posts: profile name, else the email's local part.
pub fn display_name_for(ctx: &AuthContext, profile: Option<&UserProfile>) -> String {
    profile
        .map(|p| p.display_name.clone())
        .unwrap_or_else(|| ctx.email().local_part().to_string())
}

impl Entity for UserProfile {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for UserProfile {
    const COLLECTION: &'static str = "users";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AuthContext {
        AuthContext::new(UserId::new(), Email::parse("Chef.Ana@example.com").unwrap())
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let ctx = ctx();
        assert_eq!(display_name_for(&ctx, None), "chef.ana");

        let profile = UserProfile::register(&ctx, " Ana ", Utc::now()).unwrap();
        assert_eq!(display_name_for(&ctx, Some(&profile)), "Ana");
    }

    #[test]
    fn display_names_are_validated_on_rename() {
        let mut profile = UserProfile::register(&ctx(), "Ana", Utc::now()).unwrap();
        assert!(profile.rename("", Utc::now()).is_err());
        assert!(profile.rename(&"n".repeat(MAX_DISPLAY_NAME_CHARS + 1), Utc::now()).is_err());
        profile.rename("Ana B", Utc::now()).unwrap();
        assert_eq!(profile.display_name, "Ana B");
        assert!(profile.updated_at.is_some());
    }
}
