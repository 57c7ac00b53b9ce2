use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use crate::{
    app::AppState,
    error::{AppError, AppResult},
    model::{CreateNotePayload, NoteCreatedResp, NoteListResp, NoteResp, NotesDeletedResp},
    service,
};

pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<CreateNotePayload>, JsonRejection>,
) -> AppResult<Json<NoteCreatedResp>> {
    let Json(payload) =
        payload.map_err(|err| AppError::BadRequest(format!("invalid request body: {err}")))?;
    let note = service::notes::create(&state.pool, &state.pipeline, payload).await?;
    Ok(Json(NoteCreatedResp {
        message: "note created",
        note,
    }))
}

pub async fn list_notes(State(state): State<AppState>) -> AppResult<Json<NoteListResp>> {
    let notes = service::notes::list(&state.pool).await?;
    Ok(Json(NoteListResp {
        count: notes.len(),
        notes,
    }))
}

pub async fn get_note(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<NoteResp>> {
    let Path(id) = id.map_err(|err| AppError::BadRequest(format!("invalid note id: {err}")))?;
    let note = service::notes::get(&state.pool, id).await?;
    Ok(Json(NoteResp { note }))
}

pub async fn delete_notes(State(state): State<AppState>) -> AppResult<Json<NotesDeletedResp>> {
    let deleted_count = service::notes::delete_all(&state.pool).await?;
    Ok(Json(NotesDeletedResp {
        message: "all notes deleted",
        deleted_count,
    }))
}
