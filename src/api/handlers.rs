use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use crate::config::watcher::LiveValidation;
use crate::deploy::{ConfigBundle, DeployError, EnvOverrides, ValidationReport};
use crate::http::request::request_id;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_live_validation: Option<LiveValidation>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Document name → content; `null` means "not supplied".
    pub config: BTreeMap<String, Option<String>>,
    /// Override file name → content.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    /// Directory to validate; the live store when absent.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub ok: bool,
    pub code: Option<i32>,
    pub result: Value,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl From<ValidationReport> for ValidateResponse {
    fn from(report: ValidationReport) -> Self {
        Self {
            ok: report.is_valid,
            code: report.exit_code,
            result: report.result,
            stderr: report.stderr,
            diagnostic: report.diagnostic,
            raw_output: report.raw_output,
        }
    }
}

fn failure(status: StatusCode, error: impl ToString) -> Response {
    let body = ImportResponse {
        ok: false,
        validation: None,
        error: Some(error.to_string()),
    };
    (status, Json(body)).into_response()
}

fn deploy_failure(error: &DeployError) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    failure(status, error)
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        last_live_validation: state.live_status.load_full().map(|s| (*s).clone()),
    })
}

pub async fn export_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    match state.orchestrator.store().read_all().await {
        Ok(bundle) => Json(serde_json::json!({ "ok": true, "config": bundle })).into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id(&headers), error = %e, "Failed to read live config");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

pub async fn import_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ImportRequest>,
) -> Response {
    let request_id = request_id(&headers);

    let env = match EnvOverrides::from_entries(request.env) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected import request");
            return deploy_failure(&e);
        }
    };
    let bundle = ConfigBundle::from_entries(request.config);

    tracing::info!(
        request_id = %request_id,
        documents = bundle.len(),
        overrides = env.len(),
        "Import requested"
    );

    match state.orchestrator.import(&bundle, &env).await {
        Ok(outcome) => {
            tracing::info!(request_id = %request_id, accepted = outcome.accepted, "Import finished");
            Json(ImportResponse {
                ok: outcome.accepted,
                validation: Some(outcome.report),
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Import failed");
            deploy_failure(&e)
        }
    }
}

pub async fn validate_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Option<Json<ValidateRequest>>,
) -> Json<ValidateResponse> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let report = match &request.dir {
        Some(dir) => state.orchestrator.validate_dir(dir).await,
        None => state.orchestrator.validate_live().await,
    };

    tracing::info!(
        request_id = %request_id(&headers),
        dir = ?request.dir,
        is_valid = report.is_valid,
        "Validation requested"
    );
    Json(report.into())
}
