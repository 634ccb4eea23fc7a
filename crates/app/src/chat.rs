//! The community chat board: posts, comments and likes.
//!
//! Chat content is not moderated. Counters on a post are maintained with
//! store-side increments in the same batch as the comment or like they
//! count, so concurrent writers never lose an update.

use chrono::Utc;

use tastemark_auth::{
    AdminCapability, AuthContext, AuthzError, Caller, UserProfile, display_name_for, ensure_owner_or_admin,
};
use tastemark_core::{CommentId, Document, DomainError, PostId};
use tastemark_infra::{DocumentStore, DocumentStoreExt, Filter, WriteBatch};
use tastemark_social::{ChatComment, ChatLike, ChatPost, LikeKey};

use crate::backend::Backend;
use crate::error::AppResult;
use crate::live::LiveQuery;

/// Collections a chat screen listens to.
pub const CHAT_COLLECTIONS: [&str; 3] = [ChatPost::COLLECTION, ChatComment::COLLECTION, ChatLike::COLLECTION];

#[derive(Debug, Clone)]
pub struct ChatBoard<S, O, A> {
    backend: Backend<S, O, A>,
}

impl<S, O, A> ChatBoard<S, O, A>
where
    S: DocumentStore,
    A: AdminCapability,
{
    pub fn new(backend: Backend<S, O, A>) -> Self {
        Self { backend }
    }

    fn authenticated(caller: &Caller) -> Result<&AuthContext, AuthzError> {
        caller.auth().ok_or(AuthzError::Unauthenticated)
    }

    fn display_name(&self, ctx: &AuthContext) -> AppResult<String> {
        let profile = self.backend.store.fetch::<UserProfile>(&ctx.user_id())?;
        Ok(display_name_for(ctx, profile.as_ref()))
    }

    fn fetch_post(&self, post_id: &PostId) -> AppResult<ChatPost> {
        Ok(self
            .backend
            .store
            .fetch::<ChatPost>(post_id)?
            .ok_or(DomainError::NotFound)?)
    }

    /// Create or rename the caller's profile.
    pub fn register_profile(&self, caller: &Caller, display_name: &str) -> AppResult<UserProfile> {
        let ctx = Self::authenticated(caller)?;
        let now = Utc::now();
        let profile = match self.backend.store.fetch::<UserProfile>(&ctx.user_id())? {
            Some(mut existing) => {
                existing.rename(display_name, now)?;
                existing
            }
            None => UserProfile::register(ctx, display_name, now)?,
        };
        self.backend.store.save(&profile)?;
        Ok(profile)
    }

    pub fn create_post(&self, caller: &Caller, body: &str) -> AppResult<PostId> {
        let ctx = Self::authenticated(caller)?;
        let post = ChatPost::create(ctx.user_id(), self.display_name(ctx)?, body, Utc::now())?;

        let mut batch = WriteBatch::new();
        batch.create(&post)?;
        self.backend.store.commit(batch)?;

        tracing::debug!(post_id = %post.id, user_id = %ctx.user_id(), "post created");
        Ok(post.id)
    }

    /// Newest first.
    pub fn list_posts(&self) -> AppResult<Vec<ChatPost>> {
        let mut posts = self.backend.store.find::<ChatPost>(&Filter::all())?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(posts)
    }

    pub fn get_post(&self, post_id: &PostId) -> AppResult<Option<ChatPost>> {
        Ok(self.backend.store.fetch::<ChatPost>(post_id)?)
    }

    /// Delete a post with its comments and likes (author or admin).
    pub fn delete_post(&self, caller: &Caller, post_id: &PostId) -> AppResult<()> {
        let post = self.fetch_post(post_id)?;
        let ctx = ensure_owner_or_admin(&self.backend.admins, caller, post.author)?;

        let by_post = Filter::all().eq_id("post_id", post_id);
        let comments = self.backend.store.find::<ChatComment>(&by_post)?;
        let likes = self.backend.store.find::<ChatLike>(&by_post)?;

        let mut batch = WriteBatch::new();
        batch.remove_existing::<ChatPost>(post_id);
        for comment in &comments {
            batch.delete::<ChatComment>(&comment.id);
        }
        for like in &likes {
            batch.delete::<ChatLike>(&like.key);
        }
        self.backend.store.commit(batch)?;

        tracing::info!(%post_id, user_id = %ctx.user_id(), comments = comments.len(), "post deleted");
        Ok(())
    }

    /// Comments of a post, oldest first.
    pub fn comments(&self, post_id: &PostId) -> AppResult<Vec<ChatComment>> {
        let mut comments = self
            .backend
            .store
            .find::<ChatComment>(&Filter::all().eq_id("post_id", post_id))?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(comments)
    }

    pub fn add_comment(&self, caller: &Caller, post_id: &PostId, body: &str) -> AppResult<CommentId> {
        let ctx = Self::authenticated(caller)?;
        let post = self.fetch_post(post_id)?;
        let comment = ChatComment::write(&post, ctx.user_id(), self.display_name(ctx)?, body, Utc::now())?;

        let mut batch = WriteBatch::new();
        batch
            .create(&comment)?
            .increment::<ChatPost>(post_id, ChatPost::COMMENT_COUNT_FIELD, 1);
        self.backend.store.commit(batch)?;
        Ok(comment.id)
    }

    /// Delete a comment (author or admin) and decrement the post's counter.
    pub fn delete_comment(&self, caller: &Caller, comment_id: &CommentId) -> AppResult<()> {
        let comment = self
            .backend
            .store
            .fetch::<ChatComment>(comment_id)?
            .ok_or(DomainError::NotFound)?;
        ensure_owner_or_admin(&self.backend.admins, caller, comment.author)?;

        let mut batch = WriteBatch::new();
        batch.remove_existing::<ChatComment>(comment_id);
        if self.backend.store.fetch::<ChatPost>(&comment.post_id)?.is_some() {
            batch.increment::<ChatPost>(&comment.post_id, ChatPost::COMMENT_COUNT_FIELD, -1);
        }
        self.backend.store.commit(batch)?;
        Ok(())
    }

    /// Like or unlike a post. Returns whether the caller now likes it.
    ///
    /// The like document is keyed by post and user, so a user holds at most
    /// one like per post; a racing duplicate fails its precondition.
    pub fn toggle_like(&self, caller: &Caller, post_id: &PostId) -> AppResult<bool> {
        let ctx = Self::authenticated(caller)?;
        self.fetch_post(post_id)?;

        let key = LikeKey {
            post_id: *post_id,
            user_id: ctx.user_id(),
        };
        let mut batch = WriteBatch::new();
        let liked = if self.backend.store.fetch::<ChatLike>(&key)?.is_some() {
            batch
                .remove_existing::<ChatLike>(&key)
                .increment::<ChatPost>(post_id, ChatPost::LIKE_COUNT_FIELD, -1);
            false
        } else {
            batch
                .create(&ChatLike::new(*post_id, ctx.user_id(), Utc::now()))?
                .increment::<ChatPost>(post_id, ChatPost::LIKE_COUNT_FIELD, 1);
            true
        };
        self.backend.store.commit(batch)?;
        Ok(liked)
    }

    pub fn has_liked(&self, caller: &Caller, post_id: &PostId) -> AppResult<bool> {
        let Some(user_id) = caller.user_id() else {
            return Ok(false);
        };
        let key = LikeKey {
            post_id: *post_id,
            user_id,
        };
        Ok(self.backend.store.fetch::<ChatLike>(&key)?.is_some())
    }

    /// Push notifications for every chat write made after this call.
    pub fn watch(&self) -> LiveQuery {
        LiveQuery::new(self.backend.store.subscribe(), &CHAT_COLLECTIONS)
    }
}
