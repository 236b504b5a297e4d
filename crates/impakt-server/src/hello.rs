//! `/hello` greeting endpoint.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;

/// Query string of `/hello`.
#[derive(Debug, Deserialize)]
pub struct HelloParams {
    /// Who to greet.
    pub name: Option<String>,
}

/// `Hello, <name>!, <environment>`.
pub fn greeting(name: &str, environment: &str) -> String {
    format!("Hello, {name}!, {environment}")
}

/// GET /hello?name=X
pub async fn hello_handler(
    State(state): State<AppState>,
    params: Result<Query<HelloParams>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(params) = params?;
    let name = params
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing query parameter `name`"))?;
    Ok(greeting(&name, state.environment.as_str()))
}
