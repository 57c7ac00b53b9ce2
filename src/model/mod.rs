use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct NoteOut {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    pub tags: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateNotePayload {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct NoteCreatedResp {
    pub message: &'static str,
    pub note: NoteOut,
}

#[derive(Debug, Serialize)]
pub struct NoteResp {
    pub note: NoteOut,
}

#[derive(Debug, Serialize)]
pub struct NoteListResp {
    pub count: usize,
    pub notes: Vec<NoteOut>,
}

#[derive(Debug, Serialize)]
pub struct NotesDeletedResp {
    pub message: &'static str,
    pub deleted_count: u64,
}
