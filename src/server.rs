use crate::backend::{Backend, BranchAndBound, HighsBackend};
use crate::config::{BackendKind, SolverConfig};
use crate::data::ResultStatus;
use crate::solver::Scheduler;
use crate::submission::SchedulingRequest;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub backend: BackendKind,
    pub solver: Arc<SolverConfig>,
}

impl AppState {
    fn backend(&self) -> Box<dyn Backend + Send> {
        match self.backend {
            BackendKind::Highs => Box::new(HighsBackend::new((*self.solver).clone())),
            BackendKind::Search => Box::new(BranchAndBound::new(&self.solver)),
        }
    }
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(input): Json<SchedulingRequest>,
) -> Result<Json<ResultStatus>, (StatusCode, String)> {
    let problem = input.into_problem().map_err(|e| {
        warn!("Rejected submission: {e}");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    // CPU-bound; keep it off the async workers.
    let scheduler = Scheduler::new(state.backend());
    let result = tokio::task::spawn_blocking(move || {
        scheduler.solve(
            &problem.instructors,
            &problem.patterns,
            &problem.rooms,
            &problem.sections,
        )
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(result))
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
