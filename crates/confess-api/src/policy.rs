/// The privilege policy: a single fixed admin identity, exempt from
/// the daily submission gate and the one-vote rule, and the only user
/// allowed to moderate or see hidden confessions. Resolved once per
/// request and passed to the store as a plain capability flag, so the
/// admin constant is compared in exactly one place.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    admin_id: i64,
    /// Whether submissions must carry an author id. When false,
    /// anonymous confessions are accepted (and cannot be throttled).
    pub require_author: bool,
}

impl Policy {
    pub fn new(admin_id: i64, require_author: bool) -> Self {
        Self {
            admin_id,
            require_author,
        }
    }

    pub fn is_privileged(&self, user_id: Option<i64>) -> bool {
        user_id == Some(self.admin_id)
    }
}
