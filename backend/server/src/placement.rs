use std::sync::Arc;

use thiserror::Error;

use crate::{
    canvas::{Canvas, CanvasError},
    cooldown::{CooldownActive, CooldownTracker},
    utils::FieldError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub user_id: String,
    pub x: u32,
    pub y: u32,
    pub color: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum PlaceError {
    #[error("Invalid input")]
    InvalidInput(Vec<FieldError>),

    #[error(transparent)]
    CooldownActive(#[from] CooldownActive),

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admitted {
    /// Milliseconds until the user may place again.
    pub cooldown: u64,
}

/// Runs one placement through validation, the cooldown check and the canvas write.
pub struct Coordinator {
    canvas: Arc<Canvas>,
    cooldowns: CooldownTracker,
    cooldown_ms: u64,
}

impl Coordinator {
    pub fn new(canvas: Arc<Canvas>, cooldowns: CooldownTracker, cooldown_ms: u64) -> Self {
        Self {
            canvas,
            cooldowns,
            cooldown_ms,
        }
    }

    /// Either records the cooldown and paints the pixel, or changes nothing.
    pub fn place(&self, request: &PlacementRequest, now: u64) -> Result<Admitted, PlaceError> {
        self.check(request)?;

        self.cooldowns
            .check_and_record(&request.user_id, now, self.cooldown_ms)?;

        // cannot fail, bounds and color were checked above
        self.canvas.set(request.x, request.y, &request.color)?;

        Ok(Admitted {
            cooldown: self.cooldown_ms,
        })
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    fn check(&self, request: &PlacementRequest) -> Result<(), PlaceError> {
        let mut errors = Vec::new();

        if request.user_id.is_empty() {
            errors.push(FieldError::new("userId", "must not be empty", None));
        }
        if request.x >= self.canvas.size() {
            errors.push(FieldError::new("x", "out of range", Some(request.x.into())));
        }
        if request.y >= self.canvas.size() {
            errors.push(FieldError::new("y", "out of range", Some(request.y.into())));
        }
        if !self.canvas.palette().contains(&request.color) {
            errors.push(FieldError::new(
                "color",
                "not in palette",
                Some(request.color.clone().into()),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlaceError::InvalidInput(errors))
        }
    }
}
