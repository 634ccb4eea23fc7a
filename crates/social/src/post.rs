use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tastemark_core::{CommentId, Document, DomainError, DomainResult, Entity, PostId, UserId};

pub const MAX_POST_CHARS: usize = 2000;
pub const MAX_COMMENT_CHARS: usize = 500;

fn validate_body(body: &str, max_chars: usize, what: &str) -> DomainResult<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be empty")));
    }
    if body.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "{what} is limited to {max_chars} characters"
        )));
    }
    Ok(body.to_string())
}

/// A chat board post. `comment_count` and `like_count` mirror the number of
/// comment/like documents and change in the same write as them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPost {
    pub id: PostId,
    pub author: UserId,
    pub author_name: String,
    pub body: String,
    pub comment_count: u64,
    pub like_count: u64,
    pub created_at: DateTime<Utc>,
}

impl ChatPost {
    /// Counter fields, maintained by store-side increments.
    pub const COMMENT_COUNT_FIELD: &'static str = "comment_count";
    pub const LIKE_COUNT_FIELD: &'static str = "like_count";

    pub fn create(
        author: UserId,
        author_name: impl Into<String>,
        body: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: PostId::new(),
            author,
            author_name: author_name.into(),
            body: validate_body(body, MAX_POST_CHARS, "post")?,
            comment_count: 0,
            like_count: 0,
            created_at: now,
        })
    }
}

impl Entity for ChatPost {
    type Id = PostId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for ChatPost {
    const COLLECTION: &'static str = "chat_posts";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatComment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: UserId,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ChatComment {
    pub fn write(
        post: &ChatPost,
        author: UserId,
        author_name: impl Into<String>,
        body: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: CommentId::new(),
            post_id: post.id,
            author,
            author_name: author_name.into(),
            body: validate_body(body, MAX_COMMENT_CHARS, "comment")?,
            created_at: now,
        })
    }
}

impl Entity for ChatComment {
    type Id = CommentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for ChatComment {
    const COLLECTION: &'static str = "chat_comments";
}

/// Key of a like: one per user per post.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikeKey {
    pub post_id: PostId,
    pub user_id: UserId,
}

impl core::fmt::Display for LikeKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.post_id, self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLike {
    #[serde(flatten)]
    pub key: LikeKey,
    pub created_at: DateTime<Utc>,
}

impl ChatLike {
    pub fn new(post_id: PostId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            key: LikeKey { post_id, user_id },
            created_at: now,
        }
    }
}

impl Entity for ChatLike {
    type Id = LikeKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

impl Document for ChatLike {
    const COLLECTION: &'static str = "chat_likes";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_body_is_trimmed_and_bounded() {
        let post = ChatPost::create(UserId::new(), "ann", "  hello board ", Utc::now()).unwrap();
        assert_eq!(post.body, "hello board");

        assert!(ChatPost::create(UserId::new(), "ann", " ", Utc::now()).unwrap_err().is_validation());
        let long = "x".repeat(MAX_POST_CHARS + 1);
        assert!(ChatPost::create(UserId::new(), "ann", &long, Utc::now()).unwrap_err().is_validation());
    }

    #[test]
    fn comments_are_bounded_tighter_than_posts() {
        let post = ChatPost::create(UserId::new(), "ann", "hi", Utc::now()).unwrap();
        let long = "y".repeat(MAX_COMMENT_CHARS + 1);
        assert!(ChatComment::write(&post, UserId::new(), "bo", &long, Utc::now()).is_err());
        let ok = ChatComment::write(&post, UserId::new(), "bo", "nice", Utc::now()).unwrap();
        assert_eq!(ok.post_id, post.id);
    }

    #[test]
    fn counter_field_names_match_the_stored_document() {
        let post = ChatPost::create(UserId::new(), "ann", "hi", Utc::now()).unwrap();
        let doc = serde_json::to_value(&post).unwrap();
        assert_eq!(doc[ChatPost::COMMENT_COUNT_FIELD], 0);
        assert_eq!(doc[ChatPost::LIKE_COUNT_FIELD], 0);
    }

    #[test]
    fn like_key_is_post_then_user() {
        let like = ChatLike::new(PostId::new(), UserId::new(), Utc::now());
        assert_eq!(like.key(), format!("{}:{}", like.key.post_id, like.key.user_id));
    }
}
