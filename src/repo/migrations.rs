use sqlx::{Executor, PgPool};
use tracing::info;

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    tx.execute(
        r#"
        CREATE SCHEMA IF NOT EXISTS notes;
        "#,
    )
    .await?;

    tx.execute(
        r#"
        CREATE TABLE IF NOT EXISTS notes.notes (
          id             BIGSERIAL PRIMARY KEY,
          title          TEXT,
          text           TEXT NOT NULL,
          content        TEXT,
          original_url   TEXT,
          tags           TEXT NOT NULL DEFAULT '',
          created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .await?;

    tx.execute(
        r#"
        CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes.notes(created_at DESC);
        "#,
    )
    .await?;

    tx.commit().await?;
    info!("notes schema ready");
    Ok(())
}
