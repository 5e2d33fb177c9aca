use crate::core::aggregate::AggregateConfig;
use crate::domain::model::{Agent, Team, Workflow};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub type AppState = Arc<AggregateConfig>;

#[derive(Serialize)]
pub struct ConfigResponse {
    name: String,
    assembled_at: DateTime<Utc>,
    agents: usize,
    teams: usize,
    workflows: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

pub async fn livez() -> &'static str {
    "ok"
}

pub async fn get_config(State(config): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        name: config.name.clone(),
        assembled_at: config.assembled_at,
        agents: config.agents.len(),
        teams: config.teams.len(),
        workflows: config.workflows.len(),
    })
}

pub async fn list_agents(State(config): State<AppState>) -> Json<Vec<Arc<Agent>>> {
    Json(config.agents.clone())
}

pub async fn list_teams(State(config): State<AppState>) -> Json<Vec<Arc<Team>>> {
    Json(config.teams.clone())
}

pub async fn list_workflows(State(config): State<AppState>) -> Json<Vec<Arc<Workflow>>> {
    Json(config.workflows.clone())
}

/// 以 id 或 name 查詢獨立 agent
pub async fn get_agent(State(config): State<AppState>, Path(key): Path<String>) -> Response {
    let found = config
        .agents
        .iter()
        .find(|agent| agent.id.as_deref() == Some(key.as_str()) || agent.name.as_deref() == Some(key.as_str()));

    match found {
        Some(agent) => (StatusCode::OK, Json(agent.clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Agent '{key}' not found"),
            }),
        )
            .into_response(),
    }
}
