use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS confessions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            author_id   INTEGER,
            text        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            likes       INTEGER NOT NULL DEFAULT 0,
            dislikes    INTEGER NOT NULL DEFAULT 0,
            is_hidden   INTEGER NOT NULL DEFAULT 0,
            hidden_by   INTEGER,
            hidden_at   TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_confessions_created
            ON confessions(created_at);

        CREATE INDEX IF NOT EXISTS idx_confessions_author
            ON confessions(author_id, created_at);

        CREATE TABLE IF NOT EXISTS votes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            confession_id   INTEGER NOT NULL REFERENCES confessions(id),
            voter_id        INTEGER NOT NULL,
            vote_type       TEXT NOT NULL CHECK (vote_type IN ('like', 'dislike')),
            is_admin        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        -- One vote per user per confession, enforced by the store
        -- itself. Admin ledger rows are exempt from the uniqueness
        -- rule and may repeat without bound.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_votes_one_per_voter
            ON votes(confession_id, voter_id) WHERE is_admin = 0;

        CREATE INDEX IF NOT EXISTS idx_votes_confession
            ON votes(confession_id, vote_type);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
