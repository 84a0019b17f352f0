use crate::backend::BackendKind;
use crate::config::{ServerConfig, SolverConfig};
use crate::data::{AssignmentInput, SolveOutcome};
use crate::error::AssignmentError;
use crate::solver;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /v1/assignment/solve`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub problem: AssignmentInput,
    /// Overrides the server's default solver settings.
    #[serde(default)]
    pub solver: Option<SolverConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    pub kind: BackendKind,
    pub name: String,
    pub available: bool,
}

#[derive(Clone)]
struct AppState {
    default_solver: Arc<SolverConfig>,
}

type ApiError = (StatusCode, String);

async fn solve_handler(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveOutcome>, ApiError> {
    let config = request
        .solver
        .unwrap_or_else(|| state.default_solver.as_ref().clone());
    info!(
        "Received problem with {} teachers and {} courses",
        request.problem.teachers.len(),
        request.problem.courses.len()
    );

    // the solve blocks until the backend returns
    let problem = request.problem;
    let result = tokio::task::spawn_blocking(move || solver::solve(&problem, &config))
        .await
        .map_err(|e| {
            error!("Solve task aborted: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("solve task aborted: {}", e))
        })?;

    match result {
        Ok(outcome) => {
            info!("{}", outcome);
            Ok(Json(outcome))
        }
        Err(e @ AssignmentError::MalformedInput(_)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!("{}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn backends_handler() -> Json<Vec<BackendInfo>> {
    Json(
        BackendKind::ALL
            .iter()
            .map(|&kind| BackendInfo {
                kind,
                name: kind.to_string(),
                available: kind.is_available(),
            })
            .collect(),
    )
}

pub fn router(default_solver: SolverConfig) -> Router {
    let state = AppState {
        default_solver: Arc::new(default_solver),
    };
    Router::new()
        .route("/v1/assignment/solve", post(solve_handler))
        .route("/v1/backends", get(backends_handler))
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(config.solver);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
