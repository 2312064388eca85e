//! HTTP surface of the form.

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Form, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ExportError, SubmissionError};
use crate::form::FormSpec;
use crate::package::{export_workspace, Artifact};
use crate::render::{render_page, Outcome};
use crate::submission::Submission;
use crate::upload::UploadedFile;
use crate::workspace;
use crate::WebForm;

const FAILURE_MESSAGE: &str = "An unexpected error occurred:\n\n";

#[derive(Clone)]
struct AppState {
    form: Arc<WebForm>,
    config: Arc<ServerConfig>,
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    workspace: String,
}

/// Builds the router serving `form`
///
/// - `GET /` renders the form
/// - `GET /form.json` returns the form specification
/// - `POST /` handles a multipart submission
/// - `POST /export` downloads the results of a previous submission
pub fn router(form: Arc<WebForm>, config: ServerConfig) -> Router {
    let body_limit = config.max_upload_bytes;
    let state = AppState {
        form,
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(index).post(submit))
        .route("/form.json", get(form_json))
        .route("/export", post(export))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serves `form` on `addr` until the process stops.
///
/// The workspace root is created here, once, if it does not exist.
pub async fn serve(form: WebForm, config: ServerConfig, addr: SocketAddr) -> io::Result<()> {
    workspace::ensure_root(&config.temp_root)?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        "Serving `{}` on http://{}",
        form.spec().title,
        listener.local_addr()?
    );

    axum::serve(listener, router(Arc::new(form), config)).await
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(state.form.spec(), &Outcome::Empty))
}

async fn form_json(State(state): State<AppState>) -> Json<FormSpec> {
    Json(state.form.spec().clone())
}

async fn submit(State(state): State<AppState>, multipart: Multipart) -> Response {
    let result = match read_submission(multipart).await {
        Ok(submission) => {
            let form = state.form.clone();
            let temp_root = state.config.temp_root.clone();
            tokio::task::spawn_blocking(move || form.handle_submission(&submission, &temp_root))
                .await
                .unwrap_or_else(|e| Err(SubmissionError::Task(e.to_string())))
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            let outcome = match outcome.workspace {
                Some(workspace) => Outcome::Ready { workspace },
                None => Outcome::NoOutput,
            };
            Html(render_page(state.form.spec(), &outcome)).into_response()
        }
        Err(err) => {
            tracing::warn!("Submission failed: {}", err);
            let mut message = FAILURE_MESSAGE.to_string();
            if state.config.verbose_errors {
                message.push_str(&err.to_string());
            }
            let page = render_page(state.form.spec(), &Outcome::Failed { message });
            (StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response()
        }
    }
}

/// Collects every part of the multipart body. Parts carrying a file name
/// (even an empty one) are uploads, the rest are text values.
async fn read_submission(mut multipart: Multipart) -> Result<Submission, SubmissionError> {
    let malformed = |e: axum::extract::multipart::MultipartError| SubmissionError::Malformed(e.to_string());

    let mut submission = Submission::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let data = field.bytes().await.map_err(malformed)?;
                submission.push_file(name, UploadedFile::new(file_name, data.to_vec()));
            }
            None => {
                let text = field.text().await.map_err(malformed)?;
                submission.push_value(name, text);
            }
        }
    }

    Ok(submission)
}

async fn export(State(state): State<AppState>, Form(request): Form<ExportRequest>) -> Response {
    let temp_root = state.config.temp_root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let artifact = export_workspace(&temp_root, &request.workspace)?;
        let data = fs::read(&artifact.path).map_err(|source| ExportError::Io {
            path: artifact.path.clone(),
            source,
        })?;
        Ok::<_, ExportError>((artifact, data))
    })
    .await
    .unwrap_or_else(|e| Err(ExportError::Task(e.to_string())));

    match result {
        Ok((artifact, data)) => download(&artifact, data),
        Err(err) => {
            tracing::warn!("Export failed: {}", err);
            let status = match err {
                ExportError::InvalidReference(_) => StatusCode::BAD_REQUEST,
                ExportError::Empty(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, err.to_string()).into_response()
        }
    }
}

fn download(artifact: &Artifact, data: Vec<u8>) -> Response {
    let content_type = if artifact.is_archive() {
        "application/zip"
    } else {
        "application/octet-stream"
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        artifact.name.replace(['"', '\\'], "_")
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response()
}
