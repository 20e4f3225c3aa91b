//! Projection geometry
//!
//! Every supported topology maps destination pixels to rays on the sphere
//! and rays back to continuous source coordinates. The converter and the
//! viewport extractor both sit on these two mappings.

pub mod converter;
pub mod cubemap;
pub mod ray;
pub mod sampler;

use std::f64::consts::{FRAC_PI_2, PI};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::ProjectionType;

pub use converter::convert_frame;
pub use cubemap::{CubeFace, CubemapLayout};
pub use ray::Ray;
pub use sampler::{sample_bilinear, SampleBounds, SourcePoint};

/// Pole a stereographic image is centred on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pole {
    /// Nadir in the centre, horizon around it ("little planet")
    #[default]
    South,
    /// Zenith in the centre ("tunnel")
    North,
}

impl FromStr for Pole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "south" | "nadir" => Ok(Pole::South),
            "north" | "zenith" => Ok(Pole::North),
            other => Err(DomainError::BadArgs(format!(
                "Invalid pole: {}. Valid poles: south, north",
                other
            ))),
        }
    }
}

/// Tunables for the parametric projections
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    /// Vertical extent of the cylindrical band, degrees
    pub cylindrical_vfov: f64,
    pub stereographic_pole: Pole,
    /// Angular diameter covered by the stereographic disc, degrees
    pub stereographic_fov: f64,
    /// Equidistant fisheye field of view, degrees
    pub fisheye_fov: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            cylindrical_vfov: 90.0,
            stereographic_pole: Pole::South,
            stereographic_fov: 270.0,
            fisheye_fov: 190.0,
        }
    }
}

/// Concrete geometry for one side of a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionGeometry {
    Equirectangular,
    Cubemap(CubemapLayout),
    Cylindrical { vfov: f64 },
    Stereographic { pole: Pole, fov: f64 },
    Fisheye { fov: f64 },
}

impl ProjectionGeometry {
    /// Resolve a classified projection into geometry. Cubemaps need an
    /// explicit layout.
    pub fn resolve(
        projection: ProjectionType,
        layout: Option<CubemapLayout>,
        params: &ProjectionParams,
    ) -> Result<Self, DomainError> {
        let geometry = match projection {
            ProjectionType::Equirectangular => ProjectionGeometry::Equirectangular,
            ProjectionType::Cubemap => ProjectionGeometry::Cubemap(layout.ok_or_else(|| {
                DomainError::BadArgs("cubemap projection requires a face layout".to_string())
            })?),
            ProjectionType::Cylindrical => ProjectionGeometry::Cylindrical {
                vfov: params.cylindrical_vfov,
            },
            ProjectionType::Stereographic => ProjectionGeometry::Stereographic {
                pole: params.stereographic_pole,
                fov: params.stereographic_fov,
            },
            ProjectionType::Fisheye => ProjectionGeometry::Fisheye {
                fov: params.fisheye_fov,
            },
            ProjectionType::Unknown => {
                return Err(DomainError::UnsupportedProjection(
                    "unknown projection has no geometry".to_string(),
                ))
            }
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn projection_type(&self) -> ProjectionType {
        match self {
            ProjectionGeometry::Equirectangular => ProjectionType::Equirectangular,
            ProjectionGeometry::Cubemap(_) => ProjectionType::Cubemap,
            ProjectionGeometry::Cylindrical { .. } => ProjectionType::Cylindrical,
            ProjectionGeometry::Stereographic { .. } => ProjectionType::Stereographic,
            ProjectionGeometry::Fisheye { .. } => ProjectionType::Fisheye,
        }
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), DomainError> {
        let check = |name: &str, value: f64, max: f64| {
            if value.is_finite() && value > 0.0 && value < max {
                Ok(())
            } else {
                Err(DomainError::BadArgs(format!(
                    "{} must be in (0, {}), got {}",
                    name, max, value
                )))
            }
        };
        match *self {
            ProjectionGeometry::Cylindrical { vfov } => check("cylindrical vfov", vfov, 180.0),
            ProjectionGeometry::Stereographic { fov, .. } => {
                check("stereographic fov", fov, 360.0)
            }
            ProjectionGeometry::Fisheye { fov } => check("fisheye fov", fov, 360.0),
            _ => Ok(()),
        }
    }

    /// Check a frame size against the geometry's layout constraints
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidDimensions(format!(
                "{}x{} has a zero dimension",
                width, height
            )));
        }
        if let ProjectionGeometry::Cubemap(layout) = self {
            layout.face_size(width, height)?;
        }
        Ok(())
    }

    /// Ray through the continuous pixel location `(u, v)` of a `width`x`height`
    /// frame, or `None` when the location lies outside the projected area
    pub fn pixel_to_ray(
        &self,
        u: f64,
        v: f64,
        width: u32,
        height: u32,
    ) -> Result<Option<Ray>, DomainError> {
        let (w, h) = (width as f64, height as f64);
        let ray = match *self {
            ProjectionGeometry::Equirectangular => {
                let lon = u / w * 2.0 * PI - PI;
                let lat = FRAC_PI_2 - v / h * PI;
                Some(Ray::from_lon_lat(lon, lat))
            }
            ProjectionGeometry::Cubemap(layout) => {
                let face_size = layout.face_size(width, height)? as f64;
                let column = (u / face_size).floor().max(0.0) as u32;
                let row = (v / face_size).floor().max(0.0) as u32;
                layout.face_at(column, row).map(|face| {
                    let a = 2.0 * (u - column as f64 * face_size) / face_size - 1.0;
                    let b = 2.0 * (v - row as f64 * face_size) / face_size - 1.0;
                    face.ray(a, b)
                })
            }
            ProjectionGeometry::Cylindrical { vfov } => {
                let lon = u / w * 2.0 * PI - PI;
                let half_extent = (vfov.to_radians() / 2.0).tan();
                let t = (1.0 - 2.0 * v / h) * half_extent;
                Some(Ray::from_lon_lat(lon, t.atan()))
            }
            ProjectionGeometry::Stereographic { pole, fov } => {
                let (nx, ny) = disc_coords(u, v, w, h);
                let r = (nx * nx + ny * ny).sqrt();
                let k = (fov.to_radians() / 4.0).tan();
                let c = 2.0 * (r * k).atan();
                let (dx, dy) = unit_or_zero(nx, ny, r);
                Some(match pole {
                    Pole::South => Ray::new(c.sin() * dx, -c.cos(), -c.sin() * dy),
                    Pole::North => Ray::new(c.sin() * dx, c.cos(), c.sin() * dy),
                })
            }
            ProjectionGeometry::Fisheye { fov } => {
                let (nx, ny) = disc_coords(u, v, w, h);
                let r = (nx * nx + ny * ny).sqrt();
                if r > 1.0 {
                    None
                } else {
                    let c = r * fov.to_radians() / 2.0;
                    let (dx, dy) = unit_or_zero(nx, ny, r);
                    Some(Ray::new(c.sin() * dx, -c.sin() * dy, c.cos()))
                }
            }
        };

        match ray {
            Some(ray) if !ray.is_finite() => Err(DomainError::GeometryOutOfRange(format!(
                "non-finite ray at ({:.2}, {:.2})",
                u, v
            ))),
            other => Ok(other),
        }
    }

    /// Continuous source location of `ray` inside a `width`x`height` frame
    pub fn ray_to_pixel(
        &self,
        ray: &Ray,
        width: u32,
        height: u32,
    ) -> Result<SourcePoint, DomainError> {
        if !ray.is_finite() {
            return Err(DomainError::GeometryOutOfRange(format!(
                "non-finite ray ({}, {}, {})",
                ray.x, ray.y, ray.z
            )));
        }
        let (w, h) = (width as f64, height as f64);
        let point = match *self {
            ProjectionGeometry::Equirectangular => {
                let u = (ray.lon() + PI) / (2.0 * PI) * w;
                let v = (FRAC_PI_2 - ray.lat()) / PI * h;
                SourcePoint::wrapped(u, v)
            }
            ProjectionGeometry::Cubemap(layout) => {
                let face_size = layout.face_size(width, height)?;
                let (face, a, b) = CubeFace::locate(ray);
                let (column, row) = layout.cell_of(face);
                let (x0, y0) = (column * face_size, row * face_size);
                let f = face_size as f64;
                SourcePoint {
                    x: x0 as f64 + (a + 1.0) / 2.0 * f,
                    y: y0 as f64 + (b + 1.0) / 2.0 * f,
                    bounds: SampleBounds::Rect {
                        x: x0,
                        y: y0,
                        width: face_size,
                        height: face_size,
                    },
                }
            }
            ProjectionGeometry::Cylindrical { vfov } => {
                let half = vfov.to_radians() / 2.0;
                let half_extent = half.tan();
                let t = ray.lat().clamp(-half, half).tan();
                let u = (ray.lon() + PI) / (2.0 * PI) * w;
                let v = (1.0 - t / half_extent) / 2.0 * h;
                SourcePoint::wrapped(u, v)
            }
            ProjectionGeometry::Stereographic { pole, fov } => {
                let k = (fov.to_radians() / 4.0).tan();
                let (c, dx, dy) = match pole {
                    Pole::South => {
                        let horizontal = (ray.x * ray.x + ray.z * ray.z).sqrt();
                        let (dx, dy) = unit_or_zero(ray.x, -ray.z, horizontal);
                        ((-ray.y).clamp(-1.0, 1.0).acos(), dx, dy)
                    }
                    Pole::North => {
                        let horizontal = (ray.x * ray.x + ray.z * ray.z).sqrt();
                        let (dx, dy) = unit_or_zero(ray.x, ray.z, horizontal);
                        (ray.y.clamp(-1.0, 1.0).acos(), dx, dy)
                    }
                };
                let r = (c / 2.0).tan() / k;
                let (u, v) = from_disc(dx * r, dy * r, w, h);
                SourcePoint::clamped(u, v, width, height)
            }
            ProjectionGeometry::Fisheye { fov } => {
                let c = ray.z.clamp(-1.0, 1.0).acos();
                let r = c / (fov.to_radians() / 2.0);
                let horizontal = (ray.x * ray.x + ray.y * ray.y).sqrt();
                let (dx, dy) = unit_or_zero(ray.x, -ray.y, horizontal);
                let (u, v) = from_disc(dx * r, dy * r, w, h);
                SourcePoint::clamped(u, v, width, height)
            }
        };

        if point.x.is_finite() && point.y.is_finite() {
            Ok(point)
        } else {
            Err(DomainError::GeometryOutOfRange(format!(
                "{} mapped ray to ({}, {})",
                self.projection_type(),
                point.x,
                point.y
            )))
        }
    }
}

/// Normalized disc coordinates; the unit circle touches the shorter frame edge
fn disc_coords(u: f64, v: f64, w: f64, h: f64) -> (f64, f64) {
    let radius = w.min(h) / 2.0;
    ((u - w / 2.0) / radius, (v - h / 2.0) / radius)
}

fn from_disc(nx: f64, ny: f64, w: f64, h: f64) -> (f64, f64) {
    let radius = w.min(h) / 2.0;
    (w / 2.0 + nx * radius, h / 2.0 + ny * radius)
}

fn unit_or_zero(x: f64, y: f64, length: f64) -> (f64, f64) {
    if length > 0.0 {
        (x / length, y / length)
    } else {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn geometries() -> Vec<ProjectionGeometry> {
        vec![
            ProjectionGeometry::Equirectangular,
            ProjectionGeometry::Cubemap(CubemapLayout::Grid3x2),
            ProjectionGeometry::Cylindrical { vfov: 90.0 },
            ProjectionGeometry::Stereographic { pole: Pole::South, fov: 270.0 },
            ProjectionGeometry::Stereographic { pole: Pole::North, fov: 270.0 },
            ProjectionGeometry::Fisheye { fov: 190.0 },
        ]
    }

    #[test]
    fn test_pixel_ray_pixel_round_trip() {
        let (width, height) = (300, 200);
        for geometry in geometries() {
            for &(u, v) in &[(40.5, 60.5), (150.5, 100.5), (160.25, 90.75), (260.5, 140.5)] {
                let Some(ray) = geometry.pixel_to_ray(u, v, width, height).unwrap() else {
                    continue;
                };
                let point = geometry.ray_to_pixel(&ray, width, height).unwrap();
                assert!(close(point.x, u, 1e-6), "{:?}: x {} != {}", geometry, point.x, u);
                assert!(close(point.y, v, 1e-6), "{:?}: y {} != {}", geometry, point.y, v);
            }
        }
    }

    #[test]
    fn test_equirect_centre_is_forward() {
        let ray = ProjectionGeometry::Equirectangular
            .pixel_to_ray(100.0, 50.0, 200, 100)
            .unwrap()
            .unwrap();
        assert!(close(ray.z, 1.0, 1e-12));
    }

    #[test]
    fn test_little_planet_centre_is_nadir() {
        let geometry = ProjectionGeometry::Stereographic { pole: Pole::South, fov: 270.0 };
        let ray = geometry.pixel_to_ray(50.0, 50.0, 100, 100).unwrap().unwrap();
        assert!(close(ray.y, -1.0, 1e-12));

        // top of the disc looks forward
        let ray = geometry.pixel_to_ray(50.0, 10.0, 100, 100).unwrap().unwrap();
        assert!(ray.z > 0.0);
    }

    #[test]
    fn test_fisheye_outside_circle() {
        let geometry = ProjectionGeometry::Fisheye { fov: 180.0 };
        assert!(geometry.pixel_to_ray(1.0, 1.0, 100, 100).unwrap().is_none());
    }

    #[test]
    fn test_non_finite_ray_is_rejected() {
        let ray = Ray { x: f64::NAN, y: 0.0, z: 1.0 };
        let err = ProjectionGeometry::Equirectangular
            .ray_to_pixel(&ray, 100, 50)
            .unwrap_err();
        assert!(matches!(err, DomainError::GeometryOutOfRange(_)));
    }

    #[test]
    fn test_resolve() {
        let params = ProjectionParams::default();
        assert!(matches!(
            ProjectionGeometry::resolve(ProjectionType::Cubemap, None, &params),
            Err(DomainError::BadArgs(_))
        ));
        assert!(matches!(
            ProjectionGeometry::resolve(ProjectionType::Unknown, None, &params),
            Err(DomainError::UnsupportedProjection(_))
        ));
        let bad = ProjectionParams { cylindrical_vfov: 180.0, ..params };
        assert!(ProjectionGeometry::resolve(ProjectionType::Cylindrical, None, &bad).is_err());
        assert_eq!(
            ProjectionGeometry::resolve(ProjectionType::Fisheye, None, &params).unwrap(),
            ProjectionGeometry::Fisheye { fov: 190.0 }
        );
    }
}
