//! Accounting export API endpoints.

use api_types::accounting::{ExportCreated, ExportView, ExportsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use engine::{EngineError, exports, members};

use crate::{ServerError, server::ServerState};

fn require_export_permission(member: &members::Model) -> Result<(), ServerError> {
    if member.export_permission {
        Ok(())
    } else {
        Err(ServerError::Engine(EngineError::Forbidden(format!(
            "member {} may not manage exports",
            member.username
        ))))
    }
}

fn view(model: exports::Model, include_content: bool) -> ExportView {
    ExportView {
        id: model.id,
        status: model.status,
        aggregation: model.aggregation,
        start_date: model.start_date,
        end_date: model.end_date,
        signer_member_id: model.signer_member_id,
        created_at: model.created_at,
        completed_at: model.completed_at,
        content: if include_content { model.content } else { None },
    }
}

/// Queue an export of one calendar month, signed by the requesting member.
pub async fn request(
    Extension(member): Extension<members::Model>,
    State(state): State<ServerState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<(StatusCode, Json<ExportCreated>), ServerError> {
    require_export_permission(&member)?;

    let export = state.engine.request_export(year, month, member.id).await?;
    Ok((StatusCode::CREATED, Json(ExportCreated { id: export.id })))
}

/// List all export jobs.
pub async fn list(
    Extension(member): Extension<members::Model>,
    State(state): State<ServerState>,
) -> Result<Json<ExportsResponse>, ServerError> {
    require_export_permission(&member)?;

    let exports = state.engine.list_exports().await?;
    Ok(Json(ExportsResponse {
        exports: exports.into_iter().map(|e| view(e, false)).collect(),
    }))
}

/// Fetch one export job, including the rendered SIE text once completed.
pub async fn get_export(
    Extension(member): Extension<members::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<Json<ExportView>, ServerError> {
    require_export_permission(&member)?;

    let export = state.engine.export(id).await?;
    Ok(Json(view(export, true)))
}

/// Download the rendered SIE file of a completed export.
///
/// The body is code page 437, not UTF-8, so it goes out as raw bytes.
pub async fn content(
    Extension(member): Extension<members::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    require_export_permission(&member)?;

    let bytes = state.engine.export_content(id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"export-{id}.se\""),
            ),
        ],
        bytes,
    ))
}
