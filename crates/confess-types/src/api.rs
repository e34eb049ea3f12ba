use serde::{Deserialize, Serialize};

use crate::models::{AnnotatedConfession, Confession, VoteKind};

// -- Submissions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitRequest {
    pub text: String,
    pub author_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub confession: Confession,
}

#[derive(Debug, Serialize)]
pub struct CanSubmitResponse {
    pub can_submit: bool,
}

// -- Votes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub voter_id: i64,
    pub vote: VoteKind,
}

/// What the vote operation did. `previous_vote` is set only when an
/// existing vote was switched to the other kind.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub action: VoteAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_vote: Option<VoteKind>,
    pub new_vote: VoteKind,
    pub is_admin: bool,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Created,
    Updated,
}

// -- Moderation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerateRequest {
    pub acting_user_id: i64,
    pub hide: bool,
}

#[derive(Debug, Serialize)]
pub struct ModerateResponse {
    pub action: ModerateAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerateAction {
    Hidden,
    Unhidden,
}

// -- Listing --

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub confessions: Vec<AnnotatedConfession>,
}

// -- Top submissions --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopWindow {
    Daily,
    Weekly,
}

impl TopWindow {
    /// Default result count when the caller does not ask for one:
    /// the daily post features a single winner, the weekly one a podium.
    pub fn default_limit(self) -> u32 {
        match self {
            TopWindow::Daily => 1,
            TopWindow::Weekly => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TopWindow::Daily => "daily",
            TopWindow::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopResponse {
    pub window: TopWindow,
    pub confessions: Vec<Confession>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_kind_wire_format_is_lowercase() {
        let req: VoteRequest =
            serde_json::from_str(r#"{"voter_id": 7, "vote": "dislike"}"#).unwrap();
        assert_eq!(req.vote, VoteKind::Dislike);
        assert_eq!(serde_json::to_string(&VoteKind::Like).unwrap(), r#""like""#);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<SubmitRequest>(r#"{"text": "x", "bogus": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn window_default_limits() {
        assert_eq!(TopWindow::Daily.default_limit(), 1);
        assert_eq!(TopWindow::Weekly.default_limit(), 3);
    }
}
