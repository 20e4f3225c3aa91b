// Cubemap faces and frame layouts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::projection::ray::Ray;

/// One face of the cube, named by the axis it faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    Right,
    Left,
    Up,
    Down,
    Front,
    Back,
}

impl CubeFace {
    /// Frame order used by every layout
    pub const ORDER: [CubeFace; 6] = [
        CubeFace::Right,
        CubeFace::Left,
        CubeFace::Up,
        CubeFace::Down,
        CubeFace::Front,
        CubeFace::Back,
    ];

    /// Ray through in-face coordinates `a` (right) and `b` (down), both in [-1, 1]
    pub fn ray(&self, a: f64, b: f64) -> Ray {
        let (x, y, z) = match self {
            CubeFace::Front => (a, -b, 1.0),
            CubeFace::Back => (-a, -b, -1.0),
            CubeFace::Right => (1.0, -b, -a),
            CubeFace::Left => (-1.0, -b, a),
            CubeFace::Up => (a, 1.0, b),
            CubeFace::Down => (a, -1.0, -b),
        };
        Ray::new(x, y, z)
    }

    /// Face hit by `ray` and the in-face coordinates of the hit
    pub fn locate(ray: &Ray) -> (CubeFace, f64, f64) {
        let (ax, ay, az) = (ray.x.abs(), ray.y.abs(), ray.z.abs());
        if ax >= ay && ax >= az {
            if ray.x > 0.0 {
                (CubeFace::Right, -ray.z / ax, -ray.y / ax)
            } else {
                (CubeFace::Left, ray.z / ax, -ray.y / ax)
            }
        } else if ay >= az {
            if ray.y > 0.0 {
                (CubeFace::Up, ray.x / ay, ray.z / ay)
            } else {
                (CubeFace::Down, ray.x / ay, -ray.z / ay)
            }
        } else if ray.z > 0.0 {
            (CubeFace::Front, ray.x / az, -ray.y / az)
        } else {
            (CubeFace::Back, -ray.x / az, -ray.y / az)
        }
    }

    fn order_index(&self) -> usize {
        CubeFace::ORDER
            .iter()
            .position(|f| f == self)
            .unwrap_or_default()
    }
}

/// Arrangement of the six faces inside one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubemapLayout {
    /// Six faces side by side (6:1)
    HorizontalStrip,
    /// Six faces stacked (1:6)
    VerticalStrip,
    /// Three columns, two rows (3:2)
    Grid3x2,
}

impl CubemapLayout {
    /// Faces per row and column
    pub fn cells(&self) -> (u32, u32) {
        match self {
            CubemapLayout::HorizontalStrip => (6, 1),
            CubemapLayout::VerticalStrip => (1, 6),
            CubemapLayout::Grid3x2 => (3, 2),
        }
    }

    /// Face edge length for a frame, or `InvalidDimensions` when the frame
    /// does not hold six square faces
    pub fn face_size(&self, width: u32, height: u32) -> Result<u32, DomainError> {
        let (columns, rows) = self.cells();
        if width == 0 || width % columns != 0 || height % rows != 0 {
            return Err(DomainError::InvalidDimensions(format!(
                "{}x{} is not divisible into a {} cubemap",
                width, height, self
            )));
        }
        let face = width / columns;
        if height / rows != face {
            return Err(DomainError::InvalidDimensions(format!(
                "{}x{} gives non-square faces for a {} cubemap",
                width, height, self
            )));
        }
        Ok(face)
    }

    /// Frame size holding faces of `face` pixels
    pub fn frame_size(&self, face: u32) -> (u32, u32) {
        let (columns, rows) = self.cells();
        (face * columns, face * rows)
    }

    /// Top-left cell (column, row) of a face
    pub fn cell_of(&self, face: CubeFace) -> (u32, u32) {
        let (columns, _) = self.cells();
        let index = face.order_index() as u32;
        (index % columns, index / columns)
    }

    /// Face occupying a cell
    pub fn face_at(&self, column: u32, row: u32) -> Option<CubeFace> {
        let (columns, rows) = self.cells();
        if column >= columns || row >= rows {
            return None;
        }
        CubeFace::ORDER.get((row * columns + column) as usize).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CubemapLayout::HorizontalStrip => "horizontal_strip",
            CubemapLayout::VerticalStrip => "vertical_strip",
            CubemapLayout::Grid3x2 => "grid_3x2",
        }
    }
}

impl fmt::Display for CubemapLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CubemapLayout {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizontal_strip" | "horizontal" | "6x1" => Ok(CubemapLayout::HorizontalStrip),
            "vertical_strip" | "vertical" | "1x6" => Ok(CubemapLayout::VerticalStrip),
            "grid_3x2" | "grid" | "3x2" => Ok(CubemapLayout::Grid3x2),
            other => Err(DomainError::BadArgs(format!("Unknown cubemap layout: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_face_round_trip() {
        for face in CubeFace::ORDER {
            for &(a, b) in &[(0.0, 0.0), (0.5, -0.25), (-0.9, 0.9)] {
                let ray = face.ray(a, b);
                let (found, fa, fb) = CubeFace::locate(&ray);
                assert_eq!(found, face);
                assert!(close(fa, a), "{:?} a {} != {}", face, fa, a);
                assert!(close(fb, b), "{:?} b {} != {}", face, fb, b);
            }
        }
    }

    #[test]
    fn test_face_centres_point_along_axes() {
        assert_eq!(CubeFace::Front.ray(0.0, 0.0), Ray::new(0.0, 0.0, 1.0));
        assert_eq!(CubeFace::Up.ray(0.0, 0.0), Ray::new(0.0, 1.0, 0.0));
        assert_eq!(CubeFace::Left.ray(0.0, 0.0), Ray::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_layout_face_size() {
        assert_eq!(CubemapLayout::HorizontalStrip.face_size(1536, 256).unwrap(), 256);
        assert_eq!(CubemapLayout::VerticalStrip.face_size(128, 768).unwrap(), 128);
        assert_eq!(CubemapLayout::Grid3x2.face_size(768, 512).unwrap(), 256);
        assert!(matches!(
            CubemapLayout::Grid3x2.face_size(768, 256),
            Err(DomainError::InvalidDimensions(_))
        ));
        assert!(CubemapLayout::HorizontalStrip.face_size(1000, 256).is_err());
    }

    #[test]
    fn test_layout_cells() {
        let grid = CubemapLayout::Grid3x2;
        assert_eq!(grid.cell_of(CubeFace::Right), (0, 0));
        assert_eq!(grid.cell_of(CubeFace::Up), (2, 0));
        assert_eq!(grid.cell_of(CubeFace::Down), (0, 1));
        assert_eq!(grid.cell_of(CubeFace::Back), (2, 1));
        assert_eq!(grid.face_at(1, 1), Some(CubeFace::Front));
        assert_eq!(grid.face_at(3, 0), None);

        let strip = CubemapLayout::VerticalStrip;
        assert_eq!(strip.cell_of(CubeFace::Front), (0, 4));
    }
}
