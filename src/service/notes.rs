use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    model::{CreateNotePayload, NoteOut},
    pipeline::{ContentPipeline, ProcessedContent},
    repo::{
        self,
        notes::{NewNote, NoteRow},
    },
};

pub async fn create(
    pool: &PgPool,
    pipeline: &ContentPipeline,
    payload: CreateNotePayload,
) -> AppResult<NoteOut> {
    let processed = pipeline
        .process_note_content(&payload.text)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "note content rejected");
            AppError::from(err)
        })?;

    let note = new_note(processed, Utc::now());
    let id = repo::notes::insert_note(pool, &note).await?;

    tracing::info!(id, tags = %note.tags, "note saved");

    Ok(NoteOut {
        id,
        title: note.title,
        text: note.text,
        content: note.content,
        original_url: note.original_url,
        tags: note.tags,
        created_at: note.created_at.to_rfc3339(),
    })
}

pub async fn list(pool: &PgPool) -> AppResult<Vec<NoteOut>> {
    let rows = repo::notes::list_notes(pool).await?;
    tracing::debug!(count = rows.len(), "notes listed");
    Ok(rows.into_iter().map(note_out).collect())
}

pub async fn get(pool: &PgPool, id: i64) -> AppResult<NoteOut> {
    repo::notes::get_note(pool, id)
        .await?
        .map(note_out)
        .ok_or_else(|| AppError::NotFound(format!("note {id} not found")))
}

pub async fn delete_all(pool: &PgPool) -> AppResult<u64> {
    let deleted = repo::notes::delete_all_notes(pool).await?;
    tracing::info!(deleted, "all notes deleted");
    Ok(deleted)
}

fn new_note(processed: ProcessedContent, created_at: DateTime<Utc>) -> NewNote {
    let ProcessedContent {
        original_url,
        title,
        plain_text,
        html_content,
        generated_tags,
    } = processed;

    NewNote {
        title,
        text: plain_text,
        content: Some(html_content).filter(|html| !html.is_empty()),
        original_url,
        tags: generated_tags,
        created_at,
    }
}

fn note_out(row: NoteRow) -> NoteOut {
    NoteOut {
        id: row.id,
        title: row.title,
        text: row.text,
        content: row.content,
        original_url: row.original_url,
        tags: row.tags,
        created_at: row.created_at.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builds_note_from_processed_content() {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let note = new_note(
            ProcessedContent {
                original_url: Some("https://e.com/a".to_string()),
                title: Some("A".to_string()),
                plain_text: "body".to_string(),
                html_content: "<div class=\"parsed-content\"><p>body</p></div>".to_string(),
                generated_tags: "x, y".to_string(),
            },
            created_at,
        );

        assert_eq!(
            note,
            NewNote {
                title: Some("A".to_string()),
                text: "body".to_string(),
                content: Some("<div class=\"parsed-content\"><p>body</p></div>".to_string()),
                original_url: Some("https://e.com/a".to_string()),
                tags: "x, y".to_string(),
                created_at,
            }
        );
    }

    #[test]
    fn serializes_rows_with_rfc3339_timestamps() {
        let out = note_out(NoteRow {
            id: 7,
            title: None,
            text: "t".to_string(),
            content: None,
            original_url: None,
            tags: "no tags".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        });

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["created_at"], "2024-05-01T12:00:00+00:00");
        assert!(json.get("title").is_none());
        assert!(json.get("original_url").is_none());
    }
}
