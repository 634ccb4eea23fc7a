//! Chat board domain: posts, comments and likes with denormalized counters.

pub mod post;

pub use post::{ChatComment, ChatLike, ChatPost, LikeKey, MAX_COMMENT_CHARS, MAX_POST_CHARS};
