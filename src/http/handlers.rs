//! Demo routes exercising each labelling path.
//!
//! - `GET /health`: always 200
//! - `GET /greet?user=<name>`: 200, `user` label when the parameter is set
//! - `POST /orders/{id}/cancel`: fails with [`AppError`], which is recorded
//!   as the `exception` label
//! - `GET /panic`: handler panic, recorded as `exception=panic`

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observation::ObservedError;

/// Errors returned by the demo handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("order {0} not found")]
    OrderNotFound(u64),

    #[error("order {0} has already shipped")]
    AlreadyShipped(u64),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyShipped(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Request failed");
        let mut response = (self.status(), self.to_string()).into_response();
        ObservedError::new(&self).attach(&mut response);
        response
    }
}

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct GreetParams {
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: String,
}

pub async fn greet(Query(params): Query<GreetParams>) -> Json<Greeting> {
    let name = params.user.as_deref().unwrap_or("world");
    Json(Greeting {
        message: format!("Hello, {}", name),
    })
}

pub async fn cancel_order(Path(id): Path<u64>) -> Result<StatusCode, AppError> {
    if id == 0 {
        return Err(AppError::OrderNotFound(id));
    }
    Err(AppError::AlreadyShipped(id))
}

pub async fn trigger_panic() -> &'static str {
    panic!("handler panicked on purpose")
}
