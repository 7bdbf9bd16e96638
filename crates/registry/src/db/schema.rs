// Startup schema bootstrap for the three registry tables.
//
// Idempotent `CREATE ... IF NOT EXISTS` statements only; existing tables are
// never altered.

use anyhow::{Context, Result};
use sqlx::PgPool;

pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS public.documents (
        id                 TEXT PRIMARY KEY,
        metadata           TEXT NOT NULL,
        timestamp_datetime TIMESTAMPTZ,
        timestamp_source   TEXT,
        timestamp_proof    TEXT,
        creator            TEXT NOT NULL,
        CONSTRAINT documents_timestamp_complete CHECK (
            (timestamp_datetime IS NULL) = (timestamp_source IS NULL)
            AND (timestamp_source IS NULL) = (timestamp_proof IS NULL)
        )
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS public.events (
        id                 TEXT PRIMARY KEY,
        document_id        TEXT NOT NULL REFERENCES public.documents (id),
        metadata           TEXT NOT NULL,
        sender             TEXT NOT NULL,
        origin             TEXT NOT NULL,
        hash               TEXT NOT NULL,
        external_hash      TEXT,
        timestamp_datetime TIMESTAMPTZ,
        timestamp_source   TEXT,
        timestamp_proof    TEXT,
        CONSTRAINT events_timestamp_complete CHECK (
            (timestamp_datetime IS NULL) = (timestamp_source IS NULL)
            AND (timestamp_source IS NULL) = (timestamp_proof IS NULL)
        )
    )
    "#,
    "CREATE INDEX IF NOT EXISTS events_document_id_idx ON public.events (document_id)",
    r#"
    CREATE TABLE IF NOT EXISTS public.accesses (
        id          BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        subject     TEXT NOT NULL,
        document_id TEXT NOT NULL REFERENCES public.documents (id),
        granted_by  TEXT NOT NULL,
        permission  TEXT NOT NULL CHECK (permission IN ('write', 'delegate', 'creator'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS accesses_subject_idx ON public.accesses (subject)",
    "CREATE INDEX IF NOT EXISTS accesses_document_id_idx ON public.accesses (document_id)",
];

const SCHEMA_LOCK_KEY: i64 = 0x746e_745f_7265_67;

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await.context("failed to open schema bootstrap transaction")?;
    // Concurrent `CREATE TABLE IF NOT EXISTS` can still collide in pg_type.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .context("failed to take registry schema lock")?;
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .context("failed to apply registry schema statement")?;
    }
    tx.commit().await.context("failed to commit registry schema bootstrap")?;

    Ok(())
}
