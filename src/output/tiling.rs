//! Tiled variants for viewport-adaptive delivery

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{normalize_yaw, BitrateLevel, TileDescriptor, TiledVariant, Viewport};

/// Out-of-view tiles stream at this fraction of their full bitrate
const REDUCED_BITRATE_FRACTION: f64 = 0.25;

/// Fixed rows x columns partition of an equirectangular frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
}

impl TileGrid {
    pub fn new(columns: u32, rows: u32) -> Result<Self, DomainError> {
        if columns == 0 || rows == 0 {
            return Err(DomainError::BadArgs(format!(
                "tile grid {}x{} has a zero dimension",
                columns, rows
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self { columns: 4, rows: 2 }
    }
}

/// Partition one ladder level into tiles, row-major from the top-left
pub fn tile_level(level: &BitrateLevel, grid: TileGrid) -> Result<TiledVariant, DomainError> {
    if grid.columns > level.width || grid.rows > level.height {
        return Err(DomainError::InvalidDimensions(format!(
            "{}x{} grid does not fit level {} ({}x{})",
            grid.columns, grid.rows, level.name, level.width, level.height
        )));
    }

    let yaw_span = 360.0 / grid.columns as f64;
    let pitch_span = 180.0 / grid.rows as f64;
    let full = (level.bitrate_kbps as f64 / grid.tile_count() as f64).ceil() as u32;
    let reduced = ((full as f64 * REDUCED_BITRATE_FRACTION).round() as u32).max(1);

    let mut tiles = Vec::with_capacity(grid.tile_count() as usize);
    for row in 0..grid.rows {
        let y = edge(level.height, grid.rows, row);
        let height = edge(level.height, grid.rows, row + 1) - y;
        for column in 0..grid.columns {
            let x = edge(level.width, grid.columns, column);
            let width = edge(level.width, grid.columns, column + 1) - x;
            tiles.push(TileDescriptor {
                index: row * grid.columns + column,
                row,
                column,
                yaw_center: -180.0 + (column as f64 + 0.5) * yaw_span,
                pitch_center: 90.0 - (row as f64 + 0.5) * pitch_span,
                yaw_span,
                pitch_span,
                x,
                y,
                width,
                height,
                full_bitrate_kbps: full,
                reduced_bitrate_kbps: reduced,
            });
        }
    }

    Ok(TiledVariant {
        level: level.name.clone(),
        columns: grid.columns,
        rows: grid.rows,
        tiles,
    })
}

/// Indices of tiles that overlap what `viewport` sees
pub fn tiles_for_viewport(variant: &TiledVariant, viewport: &Viewport) -> Vec<u32> {
    let half_v = viewport.vertical_fov() / 2.0;
    let view_low = viewport.pitch() - half_v;
    let view_high = viewport.pitch() + half_v;

    variant
        .tiles
        .iter()
        .filter(|tile| {
            let tile_low = tile.pitch_center - tile.pitch_span / 2.0;
            let tile_high = tile.pitch_center + tile.pitch_span / 2.0;
            if tile_low >= view_high || view_low >= tile_high {
                return false;
            }
            // A view over a pole sees every longitude of the polar row
            let over_pole = (view_high >= 90.0 && tile_high >= 90.0) || (view_low <= -90.0 && tile_low <= -90.0);
            if over_pole {
                return true;
            }
            let distance = normalize_yaw(tile.yaw_center - viewport.yaw()).abs();
            distance < (tile.yaw_span + horizontal_reach(viewport, tile_low, tile_high)) / 2.0
        })
        .map(|tile| tile.index)
        .collect()
}

/// Longitude range the view spans inside a latitude band; widens toward the poles
fn horizontal_reach(viewport: &Viewport, band_low: f64, band_high: f64) -> f64 {
    let nearest_equator = if band_low <= 0.0 && band_high >= 0.0 {
        0.0
    } else {
        band_low.abs().min(band_high.abs())
    };
    let latitude = viewport.pitch().abs().max(nearest_equator).min(89.0);
    (viewport.horizontal_fov() / latitude.to_radians().cos()).min(360.0)
}

fn edge(length: u32, parts: u32, index: u32) -> u32 {
    (length as u64 * index as u64 / parts as u64) as u32
}
