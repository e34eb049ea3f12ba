use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Either direction a user's vote can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Like => "like",
            VoteKind::Dislike => "dislike",
        }
    }
}

/// A confession as served to clients. Counts are the cached aggregates
/// maintained by the vote ledger, not live counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confession {
    pub id: i64,
    pub author_id: Option<i64>,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub dislikes: i64,
    pub is_hidden: bool,
    pub hidden_by: Option<i64>,
    pub hidden_at: Option<DateTime<Utc>>,
}

/// A confession annotated with the requesting user's own vote, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedConfession {
    #[serde(flatten)]
    pub confession: Confession,
    pub user_vote: Option<VoteKind>,
}
