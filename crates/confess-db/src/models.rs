//! Outcomes handed back by store mutations. Wire-facing response
//! types live in confess-types; these stay internal to the server.

use confess_types::models::VoteKind;

/// Result of `cast_vote`: whether a row was created or updated, the
/// vote that was replaced (when switching sides), and the freshly
/// recomputed aggregates.
#[derive(Debug)]
pub struct VoteOutcome {
    pub created: bool,
    pub previous: Option<VoteKind>,
    pub new_vote: VoteKind,
    pub is_admin: bool,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug)]
pub struct ModerateOutcome {
    pub hidden: bool,
}
