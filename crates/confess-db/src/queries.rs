use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use confess_types::api::TopWindow;
use confess_types::models::{AnnotatedConfession, Confession, VoteKind};

use crate::Database;
use crate::error::{StoreError, is_unique_violation};
use crate::models::{ModerateOutcome, VoteOutcome};

/// Upper bound on confession length, in characters.
pub const MAX_TEXT_LEN: usize = 1000;

const CONFESSION_COLS: &str =
    "id, author_id, text, created_at, likes, dislikes, is_hidden, hidden_by, hidden_at";

impl Database {
    // -- Submission gate --

    /// Whether `author_id` may submit right now. Privileged users are
    /// never throttled; everyone else gets one confession per UTC
    /// calendar day.
    pub fn can_submit_today(&self, author_id: i64, privileged: bool) -> Result<bool, StoreError> {
        if privileged {
            return Ok(true);
        }
        self.with_conn(|conn| Ok(!has_submitted_today(conn, author_id, Utc::now())?))
    }

    /// Validate and insert a new confession. The daily gate and the
    /// insert run in one immediate transaction so two same-day
    /// submissions cannot slip past each other.
    pub fn submit(
        &self,
        text: &str,
        author_id: Option<i64>,
        require_author: bool,
        privileged: bool,
    ) -> Result<Confession, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::InvalidInput(
                "confession text must not be empty".into(),
            ));
        }
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(StoreError::InvalidInput(format!(
                "confession text exceeds {} characters",
                MAX_TEXT_LEN
            )));
        }
        if author_id.is_none() && require_author {
            return Err(StoreError::InvalidInput("author id is required".into()));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let now = Utc::now();
            // Anonymous rows carry no identity to throttle on.
            if let Some(author) = author_id {
                if !privileged && has_submitted_today(&tx, author, now)? {
                    return Err(StoreError::AlreadySubmittedToday);
                }
            }

            tx.execute(
                "INSERT INTO confessions (author_id, text, created_at) VALUES (?1, ?2, ?3)",
                params![author_id, text, now],
            )?;
            let id = tx.last_insert_rowid();

            let confession = tx.query_row(
                &format!("SELECT {} FROM confessions WHERE id = ?1", CONFESSION_COLS),
                [id],
                confession_from_row,
            )?;

            tx.commit()?;
            Ok(confession)
        })
    }

    // -- Vote ledger --

    /// Cast a vote. Non-privileged voters hold at most one ledger row
    /// per confession: a repeat of the same kind is rejected, the
    /// opposite kind updates the row in place. Privileged voters
    /// append a fresh row every time. Aggregates are re-derived from
    /// the ledger inside the same transaction, never incremented.
    pub fn cast_vote(
        &self,
        confession_id: i64,
        voter_id: i64,
        kind: VoteKind,
        privileged: bool,
    ) -> Result<VoteOutcome, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists: Option<i64> = tx
                .query_row(
                    "SELECT id FROM confessions WHERE id = ?1",
                    [confession_id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound);
            }

            let now = Utc::now();
            let (created, previous) = if privileged {
                tx.execute(
                    "INSERT INTO votes (confession_id, voter_id, vote_type, is_admin, created_at)
                     VALUES (?1, ?2, ?3, 1, ?4)",
                    params![confession_id, voter_id, kind.as_str(), now],
                )?;
                (true, None)
            } else {
                let existing: Option<(i64, String)> = tx
                    .query_row(
                        "SELECT id, vote_type FROM votes
                         WHERE confession_id = ?1 AND voter_id = ?2 AND is_admin = 0",
                        params![confession_id, voter_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                match existing {
                    Some((_, ref prior)) if prior == kind.as_str() => {
                        return Err(StoreError::DuplicateVote(kind));
                    }
                    Some((vote_id, prior)) => {
                        tx.execute(
                            "UPDATE votes SET vote_type = ?1 WHERE id = ?2",
                            params![kind.as_str(), vote_id],
                        )?;
                        (false, Some(parse_kind(&prior)?))
                    }
                    None => {
                        // The partial unique index backstops the check
                        // above if another writer won the race.
                        let inserted = tx.execute(
                            "INSERT INTO votes (confession_id, voter_id, vote_type, is_admin, created_at)
                             VALUES (?1, ?2, ?3, 0, ?4)",
                            params![confession_id, voter_id, kind.as_str(), now],
                        );
                        match inserted {
                            Ok(_) => {}
                            Err(e) if is_unique_violation(&e) => {
                                return Err(StoreError::DuplicateVote(kind));
                            }
                            Err(e) => return Err(e.into()),
                        }
                        (true, None)
                    }
                }
            };

            let (likes, dislikes) = recompute_counts(&tx, confession_id)?;
            tx.commit()?;

            Ok(VoteOutcome {
                created,
                previous,
                new_vote: kind,
                is_admin: privileged,
                likes,
                dislikes,
            })
        })
    }

    // -- Moderation --

    /// Hide or unhide a confession. The flag, the actor, and the
    /// timestamp move in a single UPDATE so a half-moderated row is
    /// never observable.
    pub fn moderate(
        &self,
        confession_id: i64,
        acting_user_id: i64,
        hide: bool,
        privileged: bool,
    ) -> Result<ModerateOutcome, StoreError> {
        if !privileged {
            return Err(StoreError::Unauthorized);
        }

        self.with_conn(|conn| {
            let changed = if hide {
                conn.execute(
                    "UPDATE confessions SET is_hidden = 1, hidden_by = ?1, hidden_at = ?2
                     WHERE id = ?3",
                    params![acting_user_id, Utc::now(), confession_id],
                )?
            } else {
                conn.execute(
                    "UPDATE confessions SET is_hidden = 0, hidden_by = NULL, hidden_at = NULL
                     WHERE id = ?1",
                    [confession_id],
                )?
            };

            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(ModerateOutcome { hidden: hide })
        })
    }

    // -- Listing --

    /// Newest-first listing. Hidden confessions are visible only to a
    /// privileged requester. When a requester is given, each row is
    /// annotated with that user's own vote, batch-fetched in one query.
    pub fn list(
        &self,
        requester_id: Option<i64>,
        privileged: bool,
    ) -> Result<Vec<AnnotatedConfession>, StoreError> {
        self.with_conn(|conn| {
            let sql = if privileged {
                format!(
                    "SELECT {} FROM confessions ORDER BY created_at DESC, id DESC",
                    CONFESSION_COLS
                )
            } else {
                format!(
                    "SELECT {} FROM confessions WHERE is_hidden = 0
                     ORDER BY created_at DESC, id DESC",
                    CONFESSION_COLS
                )
            };

            let mut stmt = conn.prepare(&sql)?;
            let confessions = stmt
                .query_map([], confession_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let vote_map = match requester_id {
                Some(requester) => {
                    let ids: Vec<i64> = confessions.iter().map(|c| c.id).collect();
                    votes_by_confession(conn, requester, &ids)?
                }
                None => std::collections::HashMap::new(),
            };

            Ok(confessions
                .into_iter()
                .map(|c| {
                    let user_vote = vote_map.get(&c.id).copied();
                    AnnotatedConfession {
                        confession: c,
                        user_vote,
                    }
                })
                .collect())
        })
    }

    // -- Top-submission selector --

    /// Highest-liked non-hidden confessions inside a rolling window:
    /// 24 hours for daily, 7 days for weekly. Raw like count is the
    /// ranking signal; id breaks ties so the order is stable.
    pub fn top_submissions(
        &self,
        window: TopWindow,
        limit: u32,
    ) -> Result<Vec<Confession>, StoreError> {
        let since = match window {
            TopWindow::Daily => Utc::now() - Duration::hours(24),
            TopWindow::Weekly => Utc::now() - Duration::days(7),
        };

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM confessions
                 WHERE is_hidden = 0 AND datetime(created_at) >= datetime(?1)
                 ORDER BY likes DESC, id ASC
                 LIMIT ?2",
                CONFESSION_COLS
            ))?;

            let rows = stmt
                .query_map(params![since, limit], confession_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Re-derive both aggregates from the ledger and write them onto the
/// confession row. Always computed from ground truth, so stale counts
/// heal on the next vote.
fn recompute_counts(conn: &Connection, confession_id: i64) -> Result<(i64, i64), StoreError> {
    conn.execute(
        "UPDATE confessions SET
            likes = (SELECT COUNT(*) FROM votes
                     WHERE confession_id = ?1 AND vote_type = 'like'),
            dislikes = (SELECT COUNT(*) FROM votes
                        WHERE confession_id = ?1 AND vote_type = 'dislike')
         WHERE id = ?1",
        [confession_id],
    )?;

    let counts = conn.query_row(
        "SELECT likes, dislikes FROM confessions WHERE id = ?1",
        [confession_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

fn has_submitted_today(
    conn: &Connection,
    author_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    // Calendar-day boundary at UTC midnight, not a rolling 24 hours.
    let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM confessions
         WHERE author_id = ?1 AND datetime(created_at) >= datetime(?2)",
        params![author_id, day_start],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Batch-fetch one user's votes for a set of confessions. Rows come
/// back oldest first so the newest admin row wins the map insert.
fn votes_by_confession(
    conn: &Connection,
    voter_id: i64,
    confession_ids: &[i64],
) -> Result<std::collections::HashMap<i64, VoteKind>, StoreError> {
    let mut map = std::collections::HashMap::new();
    if confession_ids.is_empty() {
        return Ok(map);
    }

    let placeholders: Vec<String> = (2..=confession_ids.len() + 1)
        .map(|i| format!("?{}", i))
        .collect();
    let sql = format!(
        "SELECT confession_id, vote_type FROM votes
         WHERE voter_id = ?1 AND confession_id IN ({})
         ORDER BY created_at ASC, id ASC",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut sql_params: Vec<&dyn rusqlite::types::ToSql> = vec![&voter_id];
    for id in confession_ids {
        sql_params.push(id);
    }

    let rows = stmt.query_map(sql_params.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (confession_id, kind) = row?;
        map.insert(confession_id, parse_kind(&kind)?);
    }
    Ok(map)
}

fn confession_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Confession> {
    Ok(Confession {
        id: row.get(0)?,
        author_id: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
        likes: row.get(4)?,
        dislikes: row.get(5)?,
        is_hidden: row.get(6)?,
        hidden_by: row.get(7)?,
        hidden_at: row.get(8)?,
    })
}

fn parse_kind(s: &str) -> Result<VoteKind, StoreError> {
    match s {
        "like" => Ok(VoteKind::Like),
        "dislike" => Ok(VoteKind::Dislike),
        other => Err(StoreError::Unavailable(format!(
            "corrupt vote type '{}' in ledger",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    /// Seed a confession bypassing the daily gate.
    fn seed(db: &Database, author: Option<i64>) -> Confession {
        db.submit("something I never told anyone", author, false, true)
            .unwrap()
    }

    fn backdate(db: &Database, id: i64, hours: i64) {
        let ts = Utc::now() - Duration::hours(hours);
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE confessions SET created_at = ?1 WHERE id = ?2",
                params![ts, id],
            )?;
            Ok(())
        })
        .unwrap();
    }

    fn set_likes(db: &Database, id: i64, likes: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE confessions SET likes = ?1 WHERE id = ?2",
                params![likes, id],
            )?;
            Ok(())
        })
        .unwrap();
    }

    fn ledger_counts(db: &Database, id: i64) -> (i64, i64) {
        db.with_conn(|conn| {
            let likes: i64 = conn.query_row(
                "SELECT COUNT(*) FROM votes WHERE confession_id = ?1 AND vote_type = 'like'",
                [id],
                |row| row.get(0),
            )?;
            let dislikes: i64 = conn.query_row(
                "SELECT COUNT(*) FROM votes WHERE confession_id = ?1 AND vote_type = 'dislike'",
                [id],
                |row| row.get(0),
            )?;
            Ok((likes, dislikes))
        })
        .unwrap()
    }

    fn cached_counts(db: &Database, id: i64) -> (i64, i64) {
        db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT likes, dislikes FROM confessions WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?)
        })
        .unwrap()
    }

    #[test]
    fn aggregates_always_match_the_ledger() {
        let db = db();
        let c = seed(&db, Some(1));

        db.cast_vote(c.id, 10, VoteKind::Like, false).unwrap();
        db.cast_vote(c.id, 11, VoteKind::Like, false).unwrap();
        db.cast_vote(c.id, 12, VoteKind::Dislike, false).unwrap();

        assert_eq!(cached_counts(&db, c.id), (2, 1));
        assert_eq!(cached_counts(&db, c.id), ledger_counts(&db, c.id));
    }

    #[test]
    fn repeat_vote_of_same_kind_is_rejected() {
        let db = db();
        let c = seed(&db, Some(1));

        db.cast_vote(c.id, 10, VoteKind::Like, false).unwrap();
        let err = db.cast_vote(c.id, 10, VoteKind::Like, false).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateVote(VoteKind::Like)));
        assert!(err.to_string().contains("liked"));
        assert_eq!(cached_counts(&db, c.id), (1, 0));
    }

    #[test]
    fn switching_vote_updates_the_row_in_place() {
        let db = db();
        let c = seed(&db, Some(1));

        db.cast_vote(c.id, 10, VoteKind::Like, false).unwrap();
        let outcome = db.cast_vote(c.id, 10, VoteKind::Dislike, false).unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.previous, Some(VoteKind::Like));
        assert_eq!(outcome.new_vote, VoteKind::Dislike);
        assert_eq!((outcome.likes, outcome.dislikes), (0, 1));

        let rows: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM votes WHERE confession_id = ?1 AND voter_id = 10",
                    [c.id],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn admin_votes_append_without_limit() {
        let db = db();
        let c = seed(&db, Some(1));

        let first = db.cast_vote(c.id, 999, VoteKind::Like, true).unwrap();
        let second = db.cast_vote(c.id, 999, VoteKind::Like, true).unwrap();

        assert!(first.created && second.created);
        assert!(second.is_admin);
        assert_eq!(cached_counts(&db, c.id), (2, 0));
        assert_eq!(ledger_counts(&db, c.id), (2, 0));
    }

    #[test]
    fn vote_on_missing_confession_is_not_found() {
        let db = db();
        let err = db.cast_vote(12345, 10, VoteKind::Like, false).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn daily_gate_blocks_a_second_submission() {
        let db = db();
        db.submit("first of the day", Some(5), true, false).unwrap();

        let err = db
            .submit("second of the day", Some(5), true, false)
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadySubmittedToday));
        assert!(!db.can_submit_today(5, false).unwrap());

        // A different user is unaffected.
        db.submit("someone else's secret", Some(6), true, false)
            .unwrap();
    }

    #[test]
    fn gate_clears_on_the_next_utc_day() {
        let db = db();
        let c = db.submit("yesterday's secret", Some(5), true, false).unwrap();
        backdate(&db, c.id, 30);

        assert!(db.can_submit_today(5, false).unwrap());
        db.submit("today's secret", Some(5), true, false).unwrap();
    }

    #[test]
    fn admin_submits_without_limit() {
        let db = db();
        db.submit("one", Some(999), true, true).unwrap();
        db.submit("two", Some(999), true, true).unwrap();
        assert!(db.can_submit_today(999, true).unwrap());
    }

    #[test]
    fn author_requirement_follows_policy() {
        let db = db();

        let err = db.submit("anonymous", None, true, false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        // With the requirement lifted, anonymous rows are accepted and
        // are not subject to the daily gate.
        db.submit("anonymous one", None, false, false).unwrap();
        db.submit("anonymous two", None, false, false).unwrap();
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        let db = db();

        let err = db.submit("   \n\t ", Some(1), true, false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let too_long = "x".repeat(MAX_TEXT_LEN + 1);
        let err = db.submit(&too_long, Some(1), true, false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let c = db.submit("  padded  ", Some(1), true, false).unwrap();
        assert_eq!(c.text, "padded");
        assert_eq!((c.likes, c.dislikes), (0, 0));
        assert!(!c.is_hidden);
    }

    #[test]
    fn moderation_requires_privilege_and_is_atomic() {
        let db = db();
        let c = seed(&db, Some(1));

        let err = db.moderate(c.id, 10, true, false).unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));

        let outcome = db.moderate(c.id, 999, true, true).unwrap();
        assert!(outcome.hidden);
        let hidden = db.list(None, true).unwrap();
        let row = hidden.iter().find(|a| a.confession.id == c.id).unwrap();
        assert!(row.confession.is_hidden);
        assert_eq!(row.confession.hidden_by, Some(999));
        assert!(row.confession.hidden_at.is_some());

        let outcome = db.moderate(c.id, 999, false, true).unwrap();
        assert!(!outcome.hidden);
        let rows = db.list(None, true).unwrap();
        let row = rows.iter().find(|a| a.confession.id == c.id).unwrap();
        assert!(!row.confession.is_hidden);
        assert_eq!(row.confession.hidden_by, None);
        assert_eq!(row.confession.hidden_at, None);

        let err = db.moderate(98765, 999, true, true).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn listing_is_newest_first_and_respects_visibility() {
        let db = db();
        let a = seed(&db, Some(1));
        let b = seed(&db, Some(2));
        backdate(&db, a.id, 2);
        db.moderate(b.id, 999, true, true).unwrap();

        // Non-privileged listing excludes the hidden row entirely.
        let public = db.list(Some(10), false).unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].confession.id, a.id);

        // The admin sees everything, newest first.
        let all = db.list(Some(999), true).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].confession.id, b.id);
        assert_eq!(all[1].confession.id, a.id);
    }

    #[test]
    fn listing_annotates_the_requesters_own_vote() {
        let db = db();
        let a = seed(&db, Some(1));
        let b = seed(&db, Some(2));

        db.cast_vote(a.id, 10, VoteKind::Like, false).unwrap();
        db.cast_vote(b.id, 11, VoteKind::Dislike, false).unwrap();

        let for_10 = db.list(Some(10), false).unwrap();
        let vote_on = |rows: &[AnnotatedConfession], id: i64| {
            rows.iter()
                .find(|r| r.confession.id == id)
                .unwrap()
                .user_vote
        };
        assert_eq!(vote_on(&for_10, a.id), Some(VoteKind::Like));
        assert_eq!(vote_on(&for_10, b.id), None);

        // No requester means no annotation anywhere.
        let anonymous = db.list(None, false).unwrap();
        assert!(anonymous.iter().all(|r| r.user_vote.is_none()));
    }

    #[test]
    fn top_selector_filters_window_and_hidden_rows() {
        let db = db();
        let a = seed(&db, Some(1));
        let b = seed(&db, Some(2));
        let c = seed(&db, Some(3));
        let d = seed(&db, Some(4));

        backdate(&db, a.id, 2);
        backdate(&db, b.id, 2);
        backdate(&db, c.id, 2);
        backdate(&db, d.id, 30);
        set_likes(&db, a.id, 5);
        set_likes(&db, b.id, 9);
        set_likes(&db, c.id, 20);
        set_likes(&db, d.id, 3);
        db.moderate(c.id, 999, true, true).unwrap();

        let top = db.top_submissions(TopWindow::Daily, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, b.id);

        // The weekly window reaches the 30-hour-old entry.
        let weekly = db.top_submissions(TopWindow::Weekly, 3).unwrap();
        let ids: Vec<i64> = weekly.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id, d.id]);
    }

    #[test]
    fn empty_window_yields_an_empty_list() {
        let db = db();
        let c = seed(&db, Some(1));
        backdate(&db, c.id, 30);

        let top = db.top_submissions(TopWindow::Daily, 5).unwrap();
        assert!(top.is_empty());
    }

    #[test]
    fn like_ties_keep_a_stable_order() {
        let db = db();
        let a = seed(&db, Some(1));
        let b = seed(&db, Some(2));
        set_likes(&db, a.id, 4);
        set_likes(&db, b.id, 4);

        let first = db.top_submissions(TopWindow::Daily, 2).unwrap();
        let second = db.top_submissions(TopWindow::Daily, 2).unwrap();
        let ids = |rows: &[Confession]| rows.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first), vec![a.id, b.id]);
    }
}
