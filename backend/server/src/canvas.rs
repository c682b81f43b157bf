//! # Canvas
//!
//! Grid store holding the color of every cell.
//!
//! ## Requirements
//!
//! - Fixed N × N cells, created once at startup, never added or removed
//! - O(1) lookups and writes by coordinate
//! - Point-in-time copies for the backup job and the canvas endpoint
//!
//! ## Implementation
//!
//! - One flat buffer of palette indices, cell `(x, y)` lives at `x * N + y`
//! - A single `RwLock` over the buffer, held only for one read or write
//! - Snapshots clone the index buffer under the read lock and resolve color
//!   names afterwards, so a snapshot never mixes half-written cells
//! - Estimated memory usage: N² bytes, 2.5 KB for the default 50 × 50 grid
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CanvasError {
    #[error("Coordinate ({x}, {y}) is outside the canvas")]
    OutOfBounds { x: u32, y: u32 },

    #[error("Color {0} is not in the palette")]
    InvalidColor(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PaletteError {
    #[error("Palette has no colors")]
    Empty,

    #[error("Palette has {0} colors, at most 256 are supported")]
    TooManyColors(usize),

    #[error("Base color {0} is not in the palette")]
    MissingBase(String),
}

/// Allowed cell colors, in the order they were configured.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
    base: u8,
}

impl Palette {
    pub fn new(colors: Vec<String>, base: &str) -> Result<Self, PaletteError> {
        let mut unique: Vec<String> = Vec::with_capacity(colors.len());
        for color in colors {
            if !unique.contains(&color) {
                unique.push(color);
            }
        }

        if unique.is_empty() {
            return Err(PaletteError::Empty);
        }
        if unique.len() > usize::from(u8::MAX) + 1 {
            return Err(PaletteError::TooManyColors(unique.len()));
        }

        let base = unique
            .iter()
            .position(|color| color == base)
            .ok_or_else(|| PaletteError::MissingBase(base.to_string()))?;

        Ok(Self {
            colors: unique,
            base: base as u8,
        })
    }

    pub fn index_of(&self, color: &str) -> Option<u8> {
        self.colors
            .iter()
            .position(|known| known == color)
            .map(|index| index as u8)
    }

    pub fn contains(&self, color: &str) -> bool {
        self.index_of(color).is_some()
    }

    pub fn name(&self, index: u8) -> &str {
        &self.colors[usize::from(index)]
    }

    pub fn base(&self) -> &str {
        self.name(self.base)
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        let colors = [
            "red", "blue", "green", "yellow", "purple", "orange", "pink", "cyan", "brown", "white",
            "black", "gray",
        ];

        Self {
            colors: colors.iter().map(|color| color.to_string()).collect(),
            base: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    pub color: String,
}

pub struct Canvas {
    size: u32,
    palette: Arc<Palette>,
    cells: RwLock<Vec<u8>>,
}

impl Canvas {
    /// Fresh canvas with every cell set to the palette's base color.
    pub fn new(size: u32, palette: Arc<Palette>) -> Self {
        let cells = vec![palette.base; cell_count(size)];

        Self {
            size,
            palette,
            cells: RwLock::new(cells),
        }
    }

    /// Resets every cell to the base color, then overlays `pixels`.
    ///
    /// Records outside the grid or with unknown colors are skipped. Returns the
    /// number of records applied.
    pub fn restore<I>(&self, pixels: I) -> usize
    where
        I: IntoIterator<Item = Pixel>,
    {
        let mut fresh = vec![self.palette.base; cell_count(self.size)];
        let mut applied = 0;

        for pixel in pixels {
            let Some(index) = self.index(pixel.x, pixel.y) else {
                warn!("Skipping restored pixel outside canvas: ({}, {})", pixel.x, pixel.y);
                continue;
            };
            let Some(color) = self.palette.index_of(&pixel.color) else {
                warn!("Skipping restored pixel with unknown color: {}", pixel.color);
                continue;
            };

            fresh[index] = color;
            applied += 1;
        }

        *self.cells.write() = fresh;
        applied
    }

    pub fn get(&self, x: u32, y: u32) -> Result<Pixel, CanvasError> {
        let index = self.index(x, y).ok_or(CanvasError::OutOfBounds { x, y })?;
        let color = self.cells.read()[index];

        Ok(Pixel {
            x,
            y,
            color: self.palette.name(color).to_string(),
        })
    }

    pub fn set(&self, x: u32, y: u32, color: &str) -> Result<(), CanvasError> {
        let index = self.index(x, y).ok_or(CanvasError::OutOfBounds { x, y })?;
        let color = self
            .palette
            .index_of(color)
            .ok_or_else(|| CanvasError::InvalidColor(color.to_string()))?;

        self.cells.write()[index] = color;
        Ok(())
    }

    pub fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            size: self.size,
            palette: self.palette.clone(),
            cells: self.cells.read().clone(),
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        self.contains(x, y)
            .then(|| x as usize * self.size as usize + y as usize)
    }
}

/// Immutable copy of the canvas taken at one instant.
pub struct CanvasSnapshot {
    size: u32,
    palette: Arc<Palette>,
    cells: Vec<u8>,
}

impl CanvasSnapshot {
    /// Cells in x-major, y-minor order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        let size = self.size as usize;

        self.cells.iter().enumerate().map(move |(index, &color)| Pixel {
            x: (index / size) as u32,
            y: (index % size) as u32,
            color: self.palette.name(color).to_string(),
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.cells.len()
    }
}

impl Serialize for CanvasSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.pixels())
    }
}

fn cell_count(size: u32) -> usize {
    size as usize * size as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(size: u32) -> Canvas {
        Canvas::new(size, Arc::new(Palette::default()))
    }

    fn pixel(x: u32, y: u32, color: &str) -> Pixel {
        Pixel {
            x,
            y,
            color: color.to_string(),
        }
    }

    #[test]
    fn test_new_canvas_is_base_color() {
        let canvas = canvas(4);

        for x in 0..4 {
            for y in 0..4 {
                assert_eq!(canvas.get(x, y).unwrap().color, "white");
            }
        }
        assert_eq!(canvas.snapshot().pixel_count(), 16);
    }

    #[test]
    fn test_set_then_get() {
        let canvas = canvas(3);

        canvas.set(2, 1, "red").unwrap();

        assert_eq!(canvas.get(2, 1).unwrap(), pixel(2, 1, "red"));
        assert_eq!(canvas.get(1, 2).unwrap().color, "white");
    }

    #[test]
    fn test_out_of_bounds() {
        let canvas = canvas(3);

        assert_eq!(canvas.get(3, 0), Err(CanvasError::OutOfBounds { x: 3, y: 0 }));
        assert_eq!(
            canvas.set(0, 3, "red"),
            Err(CanvasError::OutOfBounds { x: 0, y: 3 })
        );
    }

    #[test]
    fn test_invalid_color() {
        let canvas = canvas(3);

        assert_eq!(
            canvas.set(0, 0, "magenta"),
            Err(CanvasError::InvalidColor("magenta".to_string()))
        );
        assert_eq!(canvas.get(0, 0).unwrap().color, "white");
    }

    #[test]
    fn test_snapshot_order() {
        let canvas = canvas(2);
        let pixels: Vec<Pixel> = canvas.snapshot().pixels().collect();

        let coords: Vec<(u32, u32)> = pixels.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let canvas = canvas(2);
        let snapshot = canvas.snapshot();

        canvas.set(0, 0, "blue").unwrap();

        assert_eq!(snapshot.pixels().next().unwrap().color, "white");
        assert_eq!(canvas.snapshot().pixels().next().unwrap().color, "blue");
    }

    #[test]
    fn test_restore_round_trip() {
        let original = canvas(3);
        original.set(0, 0, "red").unwrap();
        original.set(2, 2, "black").unwrap();
        original.set(1, 0, "cyan").unwrap();

        let restored = canvas(3);
        let applied = restored.restore(original.snapshot().pixels());

        assert_eq!(applied, 9);
        assert_eq!(
            restored.snapshot().pixels().collect::<Vec<_>>(),
            original.snapshot().pixels().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_restore_partial_fills_base() {
        let canvas = canvas(3);
        canvas.set(1, 1, "green").unwrap();

        let applied = canvas.restore(vec![pixel(0, 2, "red")]);

        assert_eq!(applied, 1);
        assert_eq!(canvas.snapshot().pixel_count(), 9);
        assert_eq!(canvas.get(0, 2).unwrap().color, "red");
        assert_eq!(canvas.get(1, 1).unwrap().color, "white");
    }

    #[test]
    fn test_restore_skips_bad_records() {
        let canvas = canvas(2);

        let applied = canvas.restore(vec![
            pixel(5, 0, "red"),
            pixel(0, 0, "magenta"),
            pixel(1, 1, "blue"),
        ]);

        assert_eq!(applied, 1);
        assert_eq!(canvas.get(0, 0).unwrap().color, "white");
        assert_eq!(canvas.get(1, 1).unwrap().color, "blue");
    }

    #[test]
    fn test_palette() {
        let colors = vec!["red".to_string(), "red".to_string(), "white".to_string()];
        let palette = Palette::new(colors, "white").unwrap();

        assert_eq!(palette.colors().len(), 2);
        assert_eq!(palette.base(), "white");
        assert!(palette.contains("red"));
        assert!(!palette.contains("blue"));

        assert_eq!(
            Palette::new(vec!["red".to_string()], "white").unwrap_err(),
            PaletteError::MissingBase("white".to_string())
        );
        assert_eq!(Palette::new(Vec::new(), "white").unwrap_err(), PaletteError::Empty);
    }

    #[test]
    fn test_snapshot_serializes_as_array() {
        let canvas = canvas(1);
        let json = serde_json::to_string(&canvas.snapshot()).unwrap();

        assert_eq!(json, r#"[{"x":0,"y":0,"color":"white"}]"#);
    }
}
