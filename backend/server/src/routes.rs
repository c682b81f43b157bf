use std::sync::Arc;

use axum::{
    Json,
    extract::{State as AxumState, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    canvas::CanvasSnapshot,
    error::AppError,
    state::State,
    utils::{PlacementPayload, now_millis, validate_placement},
};

#[derive(Serialize)]
pub struct CanvasResponse {
    pub canvas: CanvasSnapshot,
}

#[derive(Serialize)]
pub struct PlacedResponse {
    pub success: bool,
    pub cooldown: u64,
}

pub async fn canvas_handler(AxumState(state): AxumState<Arc<State>>) -> impl IntoResponse {
    Json(CanvasResponse {
        canvas: state.canvas.snapshot(),
    })
}

pub async fn place_pixel_handler(
    AxumState(state): AxumState<Arc<State>>,
    payload: Result<Json<PlacementPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let request = validate_placement(payload, &state.canvas).map_err(AppError::InvalidInput)?;
    let admitted = state.placement.place(&request, now_millis())?;

    debug!(
        "{} placed {} at ({}, {})",
        request.user_id,
        request.color,
        request.x,
        request.y
    );

    Ok(Json(PlacedResponse {
        success: true,
        cooldown: admitted.cooldown,
    }))
}
