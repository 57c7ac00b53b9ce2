use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
pub struct NoteRow {
    pub id: i64,
    pub title: Option<String>,
    pub text: String,
    pub content: Option<String>,
    pub original_url: Option<String>,
    pub tags: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: Option<String>,
    pub text: String,
    pub content: Option<String>,
    pub original_url: Option<String>,
    pub tags: String,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_note(pool: &PgPool, note: &NewNote) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO notes.notes (title, text, content, original_url, tags, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&note.title)
    .bind(&note.text)
    .bind(&note.content)
    .bind(&note.original_url)
    .bind(&note.tags)
    .bind(note.created_at)
    .fetch_one(pool)
    .await
}

pub async fn list_notes(pool: &PgPool) -> Result<Vec<NoteRow>, sqlx::Error> {
    sqlx::query_as::<_, NoteRow>(
        r#"
        SELECT id,
               title,
               text,
               content,
               original_url,
               tags,
               created_at
        FROM notes.notes
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_note(pool: &PgPool, id: i64) -> Result<Option<NoteRow>, sqlx::Error> {
    sqlx::query_as::<_, NoteRow>(
        r#"
        SELECT id,
               title,
               text,
               content,
               original_url,
               tags,
               created_at
        FROM notes.notes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_all_notes(pool: &PgPool) -> Result<u64, sqlx::Error> {
    sqlx::query(
        r#"
        DELETE FROM notes.notes
        "#,
    )
    .execute(pool)
    .await
    .map(|result| result.rows_affected())
}
