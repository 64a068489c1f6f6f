//! HTTP surface: health check and prediction endpoints.

use std::sync::Arc;

use axum::extract::{FromRequest, Request, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use lyrio_ai::{GenreModel, TextEncoder};
use lyrio_core::Prediction;

use crate::error::ApiError;

/// Shared server state: the loaded model, never mutated after startup.
/// Requests call straight into it; ensemble mode serialises only its
/// encode step internally.
pub struct AppState<E> {
    model: Arc<GenreModel<E>>,
}

impl<E> AppState<E> {
    pub fn new(model: GenreModel<E>) -> Self {
        Self {
            model: Arc::new(model),
        }
    }
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
        }
    }
}

pub fn router<E>(state: AppState<E>) -> Router
where
    E: TextEncoder + Send + 'static,
{
    Router::new()
        .route("/health", get(health::<E>))
        .route("/predict", post(predict::<E>))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// JSON body extractor whose rejection keeps the `{"detail": ...}` error
/// shape instead of axum's plain-text default.
struct JsonBody<T>(T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(rejection.status(), rejection.body_text())),
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    ensemble: bool,
    classes: usize,
}

async fn health<E>(State(state): State<AppState<E>>) -> Json<Health>
where
    E: TextEncoder + Send + 'static,
{
    Json(Health {
        status: "ok",
        ensemble: state.model.is_ensemble(),
        classes: state.model.n_classes(),
    })
}

#[derive(Deserialize)]
struct PredictRequest {
    /// Missing field is treated the same as blank text.
    #[serde(default)]
    text: String,
}

async fn predict<E>(
    State(state): State<AppState<E>>,
    JsonBody(req): JsonBody<PredictRequest>,
) -> Result<Json<Prediction>, ApiError>
where
    E: TextEncoder + Send + 'static,
{
    let prediction = state.model.predict(&req.text)?;
    Ok(Json(prediction))
}
