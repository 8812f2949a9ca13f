use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::server::AppState;
use crate::server::dto::{CreateExtensionRequest, DocumentUpload, ReplaceDocumentsRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{validate_extension_id, validate_filename};
use crate::service::FileUpload;

pub fn extensions_router() -> Router<Arc<AppState>> {
    Router::new()
        // Extensions
        .route("/extensions", get(list_extensions))
        .route("/extensions", post(create_extension))
        .route("/extensions/{id}", delete(delete_extension))
        .route("/extensions/{id}/documents", get(get_extension_documents))
        .route("/extensions/{id}/documents", put(replace_documents))
        // Documents
        .route("/documents/{id}", get(get_document))
        .route("/documents/{id}/content", get(download_document))
}

fn decode_files(files: Vec<DocumentUpload>) -> Result<Vec<FileUpload>, ApiError> {
    let mut decoded = Vec::with_capacity(files.len());
    for file in files {
        validate_filename(&file.filename)?;
        let content = STANDARD.decode(&file.content).map_err(|_| {
            ApiError::bad_request(format!("File {} is not valid base64", file.filename))
        })?;
        decoded.push(FileUpload {
            filename: file.filename,
            content,
        });
    }
    Ok(decoded)
}

async fn list_extensions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let summaries = state.extensions.list_extensions()?;
    Ok::<_, ApiError>(Json(ApiResponse::success(summaries)))
}

async fn create_extension(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateExtensionRequest>,
) -> impl IntoResponse {
    validate_extension_id(&req.extension_id)?;

    let files = decode_files(req.files)?;
    let docs = state
        .extensions
        .create_extension(&req.extension_id, &req.root_filename, files)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(docs))))
}

async fn replace_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReplaceDocumentsRequest>,
) -> impl IntoResponse {
    let files = decode_files(req.files)?;
    let docs = state.extensions.replace_documents(&id, files)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(docs)))
}

async fn delete_extension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.extensions.delete_extension(&id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

async fn get_extension_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let docs = state.extensions.get_extension_documents(&id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(docs)))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let doc = state.extensions.get_document(&id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(doc)))
}

async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let doc = state.extensions.get_document(&id)?;

    Ok::<_, ApiError>(([(header::CONTENT_TYPE, "application/xml")], doc.content))
}
