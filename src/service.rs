use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    config::TimetableConfig,
    error::Result,
    helpers::{
        csv::build_timetable,
        source::TimeEntrySource,
        storage::{self, DocumentStore},
    },
    models::timetable::{DateRange, ExportOutcome, GenerateForm, PickerDefaults},
};

/// Turns a submitted date range into a downloadable timetable CSV.
#[derive(Clone)]
pub struct TimetableService {
    pub source: Arc<dyn TimeEntrySource>,
    pub store: Arc<dyn DocumentStore>,
    pub config: TimetableConfig,
}

impl TimetableService {
    pub fn new(
        source: Arc<dyn TimeEntrySource>,
        store: Arc<dyn DocumentStore>,
        config: TimetableConfig,
    ) -> Self {
        info!("Creating new TimetableService instance");
        Self {
            source,
            store,
            config,
        }
    }

    /// Create an Axum router for the timetable pages
    pub fn router(self) -> Router {
        info!("Creating timetable service router");
        let shared_state = Arc::new(self);

        Router::new()
            .route("/timetable", get(timetable_form).post(timetable_generate))
            .route("/document", get(timetable_document))
            .with_state(shared_state)
    }

    /// Validates the form, then runs the export for the submitted range.
    pub async fn generate(&self, form: &GenerateForm) -> Result<ExportOutcome> {
        let range = match form.parse_range() {
            Ok(range) => range,
            Err(e) => {
                warn!("Rejected timetable request: {}", e);
                return Err(e);
            }
        };
        self.export(&range).await
    }

    /// Fetch, pivot, write. Nothing is written unless the pivot succeeded.
    pub async fn export(&self, range: &DateRange) -> Result<ExportOutcome> {
        info!("Generating timetable for {}", range);

        let entries = self.source.fetch(range).await?;
        let timetable = build_timetable(range, &entries)?;
        let relative_path = self.store.write(&timetable.filename, &timetable.content).await?;
        let url = storage::download_url(&self.config.document_url, &relative_path);

        info!("Timetable {} available at {}", timetable.filename, url);
        Ok(ExportOutcome {
            filename: timetable.filename,
            relative_path,
            url,
            rows: timetable.rows,
            users: timetable.users,
        })
    }
}

/// Body returned after a form submission. The picker defaults are always
/// present so the form can be shown again.
#[derive(Serialize, Debug)]
pub struct GenerateResponse {
    pub defaults: PickerDefaults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExportOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DocumentQuery {
    pub modulepart: String,
    pub file: String,
}

// Route handlers
async fn timetable_form() -> Json<PickerDefaults> {
    let today = Local::now().date_naive();
    Json(GenerateForm::default().picker_defaults(today))
}

async fn timetable_generate(
    State(service): State<Arc<TimetableService>>,
    Form(form): Form<GenerateForm>,
) -> (StatusCode, Json<GenerateResponse>) {
    let defaults = form.picker_defaults(Local::now().date_naive());

    if !form.wants_export() {
        info!("Timetable form submitted without generate action");
        return (
            StatusCode::OK,
            Json(GenerateResponse {
                defaults,
                outcome: None,
                error: None,
            }),
        );
    }

    match service.generate(&form).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(GenerateResponse {
                defaults,
                outcome: Some(outcome),
                error: None,
            }),
        ),
        Err(e) => {
            let status = if e.is_user_error() {
                StatusCode::OK
            } else {
                error!("Timetable export failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(GenerateResponse {
                    defaults,
                    outcome: None,
                    error: Some(e.user_message().to_string()),
                }),
            )
        }
    }
}

async fn timetable_document(
    State(service): State<Arc<TimetableService>>,
    Query(query): Query<DocumentQuery>,
) -> Response {
    if query.modulepart != "timetable" || !storage::is_export_path(&query.file) {
        warn!("Refused document request for {}", query.file);
        return (StatusCode::BAD_REQUEST, "invalid document path").into_response();
    }

    match service.store.read(&query.file).await {
        Ok(Some(bytes)) => {
            let name = query.file.rsplit('/').next().unwrap_or(query.file.as_str());
            info!("Serving timetable document {}", name);
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{name}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "document not found").into_response(),
        Err(e) => {
            error!("Failed to read document {}: {}", query.file, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.user_message()).into_response()
        }
    }
}
