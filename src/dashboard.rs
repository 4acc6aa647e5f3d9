//! Read-only HTTP surface for the board.
//!
//! Serves the kanban columns, the timeline and the plan catalog as JSON so a
//! rendering layer can draw them.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{BoardError, ErrorCode};
use crate::format::task_effort_label;
use crate::membership::{self, Plan};
use crate::repository::TaskRepository;
use crate::scheduler::{CapacityRule, Scheduler, TimelineDay};
use crate::types::{KanbanColumn, ScheduledTask, Task, Tokens};

/// Shared state for the handlers.
#[derive(Clone)]
pub struct DashboardState {
    repo: TaskRepository,
    capacity: CapacityRule,
    window_days: usize,
    /// Fixed horizon; today's date when unset.
    horizon: Option<NaiveDate>,
}

impl DashboardState {
    pub fn new(repo: TaskRepository, capacity: CapacityRule, window_days: usize) -> Self {
        Self {
            repo,
            capacity,
            window_days,
            horizon: None,
        }
    }

    pub fn with_horizon(mut self, horizon: NaiveDate) -> Self {
        self.horizon = Some(horizon);
        self
    }

    fn scheduler(&self) -> Scheduler {
        match self.horizon {
            Some(horizon) => Scheduler::new(horizon, self.capacity),
            None => Scheduler::from_today(self.capacity),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// A task with its card label.
#[derive(Debug, Serialize)]
pub struct TaskCard {
    #[serde(flatten)]
    pub task: Task,
    pub label: String,
}

impl From<Task> for TaskCard {
    fn from(task: Task) -> Self {
        let label = task_effort_label(task.tokens);
        Self { task, label }
    }
}

#[derive(Debug, Serialize)]
pub struct ColumnView {
    pub column: KanbanColumn,
    pub title: &'static str,
    pub total_tokens: Tokens,
    pub tasks: Vec<TaskCard>,
}

#[derive(Debug, Serialize)]
pub struct TimelineView {
    pub horizon: NaiveDate,
    pub days: Vec<TimelineDay>,
    pub tasks: Vec<ScheduledTask>,
}

struct ApiError(BoardError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            ErrorCode::TaskNotFound | ErrorCode::GroupNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized | ErrorCode::NotEditable => StatusCode::FORBIDDEN,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(self.0)).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn column_view(repo: &TaskRepository, column: KanbanColumn) -> ColumnView {
    let tasks = repo.tasks_by_column(column);
    ColumnView {
        column,
        title: column.label(),
        total_tokens: crate::ledger::total_tokens(&tasks),
        tasks: tasks.into_iter().map(TaskCard::from).collect(),
    }
}

async fn api_board(State(state): State<DashboardState>) -> Json<Vec<ColumnView>> {
    Json(
        KanbanColumn::ALL
            .iter()
            .map(|&column| column_view(&state.repo, column))
            .collect(),
    )
}

async fn api_column(
    State(state): State<DashboardState>,
    Path(column): Path<String>,
) -> Result<Json<ColumnView>, ApiError> {
    let column: KanbanColumn = column
        .parse()
        .map_err(|e: String| ApiError(BoardError::invalid_value("column", &e)))?;
    Ok(Json(column_view(&state.repo, column)))
}

async fn api_timeline(State(state): State<DashboardState>) -> Json<TimelineView> {
    let timeline = state.scheduler().build(&state.repo.approved_tasks());
    Json(TimelineView {
        horizon: timeline.horizon,
        days: timeline.days(state.window_days),
        tasks: timeline.tasks,
    })
}

async fn api_plans() -> Json<Vec<Plan>> {
    Json(membership::plans())
}

/// Build the router with all routes.
pub fn build_router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/board", get(api_board))
        .route("/api/columns/{column}", get(api_column))
        .route("/api/timeline", get(api_timeline))
        .route("/api/plans", get(api_plans))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on `port` (0 picks a free port).
///
/// Returns a sender that stops the server and the bound address.
pub async fn start_server(
    state: DashboardState,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Dashboard listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Dashboard shutting down");
            })
            .await
        {
            tracing::error!("Dashboard server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
