//! Comments on reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Comment row joined with its author's username
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: comment.author,
            pub_date: comment.pub_date,
        }
    }
}

/// Body of a new comment
#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

/// Partial update of a comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCommentRequest {
    pub text: Option<String>,
}
