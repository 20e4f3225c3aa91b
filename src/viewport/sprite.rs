//! Sprite sheets and seek-preview indexes

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::ContentHints;
use crate::utils::time::format_vtt_timestamp;

/// Most tiles one sheet holds; longer sources are sampled more sparsely
pub const MAX_SPRITE_TILES: usize = 400;

/// Caller-chosen arrangement of sprite tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteGrid {
    pub columns: u32,
    pub rows: u32,
}

impl SpriteGrid {
    pub fn new(columns: u32, rows: u32) -> Result<Self, DomainError> {
        if columns == 0 || rows == 0 {
            return Err(DomainError::BadArgs(format!(
                "sprite grid {}x{} has no cells",
                columns, rows
            )));
        }
        if columns.checked_mul(rows).is_none() {
            return Err(DomainError::BadArgs(format!(
                "sprite grid {}x{} has too many cells",
                columns, rows
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Smallest grid with `columns` columns holding `frames` tiles
    pub fn for_frames(columns: u32, frames: usize) -> Result<Self, DomainError> {
        let columns = columns.max(1);
        let too_many = || DomainError::BadArgs(format!("{} sprite tiles do not fit one sheet", frames));
        let count = u32::try_from(frames).map_err(|_| too_many())?;
        let grid = Self::new(columns, count.div_ceil(columns).max(1))?;
        if grid.capacity() < frames {
            return Err(too_many());
        }
        Ok(grid)
    }

    pub fn capacity(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Top-left pixel of tile `index`
    pub fn tile_origin(&self, index: usize, tile_width: u32, tile_height: u32) -> (u32, u32) {
        let index = index as u32;
        (
            (index % self.columns) * tile_width,
            (index / self.columns) * tile_height,
        )
    }
}

/// Arrange equally sized frames left-to-right, top-to-bottom
pub fn build_sprite_sheet(frames: &[RgbImage], grid: SpriteGrid) -> Result<RgbImage, DomainError> {
    let first = frames
        .first()
        .ok_or_else(|| DomainError::BadArgs("sprite sheet needs at least one frame".to_string()))?;
    if frames.len() > grid.capacity() {
        return Err(DomainError::BadArgs(format!(
            "{} frames do not fit a {}x{} sprite grid",
            frames.len(),
            grid.columns,
            grid.rows
        )));
    }

    let (tile_w, tile_h) = first.dimensions();
    let (Some(sheet_w), Some(sheet_h)) = (tile_w.checked_mul(grid.columns), tile_h.checked_mul(grid.rows)) else {
        return Err(DomainError::InvalidDimensions(format!(
            "{}x{} grid of {}x{} tiles is too large",
            grid.columns, grid.rows, tile_w, tile_h
        )));
    };
    let mut sheet = RgbImage::new(sheet_w, sheet_h);
    for (index, frame) in frames.iter().enumerate() {
        if frame.dimensions() != (tile_w, tile_h) {
            return Err(DomainError::InvalidDimensions(format!(
                "sprite frame {} is {}x{}, expected {}x{}",
                index,
                frame.width(),
                frame.height(),
                tile_w,
                tile_h
            )));
        }
        let (x, y) = grid.tile_origin(index, tile_w, tile_h);
        imageops::replace(&mut sheet, frame, x as i64, y as i64);
    }
    Ok(sheet)
}

/// Timestamps to sample: the hinted ones when present, otherwise a fixed
/// interval starting at zero. Never more than [`MAX_SPRITE_TILES`]: the
/// interval widens to fit, and surplus hints are thinned evenly.
pub fn sprite_timestamps(duration: f64, interval: f64, hints: Option<&ContentHints>) -> Vec<f64> {
    if let Some(hinted) = hints.map(|h| h.timestamps_within(duration)) {
        if !hinted.is_empty() {
            return thin(hinted, MAX_SPRITE_TILES);
        }
    }

    let interval = if interval.is_finite() && interval > 0.0 {
        interval
    } else {
        1.0
    };
    let duration = if duration.is_finite() { duration } else { 0.0 };
    let interval = interval.max(duration / MAX_SPRITE_TILES as f64);
    let mut timestamps = vec![0.0];
    let mut t = interval;
    while t < duration && timestamps.len() < MAX_SPRITE_TILES {
        timestamps.push(t);
        t += interval;
    }
    timestamps
}

/// Keep `max` evenly spread entries, first one included
fn thin(values: Vec<f64>, max: usize) -> Vec<f64> {
    if values.len() <= max {
        return values;
    }
    let len = values.len();
    (0..max).map(|i| values[i * len / max]).collect()
}

/// WebVTT thumbnail track pointing into `sheet_name`
pub fn webvtt_index(
    timestamps: &[f64],
    duration: f64,
    grid: SpriteGrid,
    tile_width: u32,
    tile_height: u32,
    sheet_name: &str,
) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for (index, &start) in timestamps.iter().enumerate() {
        let end = match timestamps.get(index + 1) {
            Some(&next) => next,
            None if duration > start => duration,
            None => start + 1.0,
        };
        let (x, y) = grid.tile_origin(index, tile_width, tile_height);
        out.push_str(&format!(
            "{} --> {}\n{}#xywh={},{},{},{}\n\n",
            format_vtt_timestamp(start),
            format_vtt_timestamp(end),
            sheet_name,
            x,
            y,
            tile_width,
            tile_height
        ));
    }
    out
}
