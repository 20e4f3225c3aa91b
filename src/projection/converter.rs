// Projection converter - per-pixel inverse mapping between topologies

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::Resolution;
use crate::projection::sampler::sample_bilinear;
use crate::projection::ProjectionGeometry;

/// Converts frames from one projection geometry into another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConverter {
    source: ProjectionGeometry,
    target: ProjectionGeometry,
}

impl ProjectionConverter {
    pub fn new(source: ProjectionGeometry, target: ProjectionGeometry) -> Result<Self, DomainError> {
        source.validate()?;
        target.validate()?;
        Ok(Self { source, target })
    }

    pub fn source(&self) -> ProjectionGeometry {
        self.source
    }

    pub fn target(&self) -> ProjectionGeometry {
        self.target
    }

    /// Render `frame` into the target geometry at `output` size.
    ///
    /// Destination pixels outside the target's projected area are black.
    /// A non-finite coordinate anywhere aborts the whole frame.
    pub fn convert(&self, frame: &RgbImage, output: Resolution) -> Result<RgbImage, DomainError> {
        let (src_w, src_h) = frame.dimensions();
        self.source.check_dimensions(src_w, src_h)?;
        self.target.check_dimensions(output.width, output.height)?;

        debug!(
            from = %self.source.projection_type(),
            to = %self.target.projection_type(),
            source = %format!("{}x{}", src_w, src_h),
            output = %output,
            "Converting frame"
        );

        let mut out = RgbImage::new(output.width, output.height);
        for j in 0..output.height {
            for i in 0..output.width {
                let ray = self.target.pixel_to_ray(
                    i as f64 + 0.5,
                    j as f64 + 0.5,
                    output.width,
                    output.height,
                )?;
                let pixel = match ray {
                    Some(ray) => {
                        let point = self.source.ray_to_pixel(&ray, src_w, src_h)?;
                        sample_bilinear(frame, point)
                    }
                    None => Rgb([0, 0, 0]),
                };
                out.put_pixel(i, j, pixel);
            }
        }
        Ok(out)
    }
}

/// Convert one frame between geometries
pub fn convert_frame(
    frame: &RgbImage,
    source: ProjectionGeometry,
    target: ProjectionGeometry,
    output: Resolution,
) -> Result<RgbImage, DomainError> {
    ProjectionConverter::new(source, target)?.convert(frame, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{CubeFace, CubemapLayout, Pole};

    fn checkerboard(width: u32, height: u32, cell: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn res(width: u32, height: u32) -> Resolution {
        Resolution::new(width, height).unwrap()
    }

    #[test]
    fn test_equirect_cubemap_round_trip() {
        let source = checkerboard(512, 256, 64);
        let layout = CubemapLayout::HorizontalStrip;
        let face = 256u32;
        let (cube_w, cube_h) = layout.frame_size(face);

        let cube = convert_frame(
            &source,
            ProjectionGeometry::Equirectangular,
            ProjectionGeometry::Cubemap(layout),
            res(cube_w, cube_h),
        )
        .unwrap();
        let back = convert_frame(
            &cube,
            ProjectionGeometry::Cubemap(layout),
            ProjectionGeometry::Equirectangular,
            res(512, 256),
        )
        .unwrap();

        let seam = 1.0 - 2.0 / face as f64;
        let mut total = 0.0;
        let mut count = 0u64;
        for (x, y, pixel) in back.enumerate_pixels() {
            let ray = ProjectionGeometry::Equirectangular
                .pixel_to_ray(x as f64 + 0.5, y as f64 + 0.5, 512, 256)
                .unwrap()
                .unwrap();
            let (_, a, b) = CubeFace::locate(&ray);
            if a.abs() > seam || b.abs() > seam {
                continue;
            }
            let original = source.get_pixel(x, y);
            for c in 0..3 {
                total += (pixel[c] as f64 - original[c] as f64).abs();
                count += 1;
            }
        }
        let mean = total / count as f64;
        assert!(mean < 5.0, "mean absolute difference {} too large", mean);
    }

    #[test]
    fn test_cubemap_faces_are_placed_by_layout() {
        // colour equirect by the face each pixel belongs to
        let colours = [
            (CubeFace::Right, Rgb([255, 0, 0])),
            (CubeFace::Left, Rgb([0, 255, 0])),
            (CubeFace::Up, Rgb([0, 0, 255])),
            (CubeFace::Down, Rgb([255, 255, 0])),
            (CubeFace::Front, Rgb([0, 255, 255])),
            (CubeFace::Back, Rgb([255, 0, 255])),
        ];
        let source = RgbImage::from_fn(400, 200, |x, y| {
            let ray = ProjectionGeometry::Equirectangular
                .pixel_to_ray(x as f64 + 0.5, y as f64 + 0.5, 400, 200)
                .unwrap()
                .unwrap();
            let (face, _, _) = CubeFace::locate(&ray);
            colours
                .iter()
                .find(|(f, _)| *f == face)
                .map(|(_, c)| *c)
                .unwrap()
        });

        let layout = CubemapLayout::Grid3x2;
        let cube = convert_frame(
            &source,
            ProjectionGeometry::Equirectangular,
            ProjectionGeometry::Cubemap(layout),
            res(192, 128),
        )
        .unwrap();

        for (face, colour) in colours {
            let (column, row) = layout.cell_of(face);
            let centre = cube.get_pixel(column * 64 + 32, row * 64 + 32);
            assert_eq!(*centre, colour, "{:?}", face);
        }
    }

    #[test]
    fn test_cylindrical_keeps_equator() {
        let source = RgbImage::from_fn(360, 180, |_, y| {
            if y < 90 {
                Rgb([200, 10, 10])
            } else {
                Rgb([10, 10, 200])
            }
        });
        let out = convert_frame(
            &source,
            ProjectionGeometry::Equirectangular,
            ProjectionGeometry::Cylindrical { vfov: 90.0 },
            res(360, 100),
        )
        .unwrap();
        assert_eq!(*out.get_pixel(100, 10), Rgb([200, 10, 10]));
        assert_eq!(*out.get_pixel(100, 90), Rgb([10, 10, 200]));
    }

    #[test]
    fn test_little_planet_centre_shows_ground() {
        let source = RgbImage::from_fn(360, 180, |_, y| {
            if y < 90 {
                Rgb([30, 120, 250])
            } else {
                Rgb([40, 160, 40])
            }
        });
        let out = convert_frame(
            &source,
            ProjectionGeometry::Equirectangular,
            ProjectionGeometry::Stereographic { pole: Pole::South, fov: 270.0 },
            res(101, 101),
        )
        .unwrap();
        assert_eq!(*out.get_pixel(50, 50), Rgb([40, 160, 40]));
        assert_eq!(*out.get_pixel(0, 0), Rgb([30, 120, 250]));
    }

    #[test]
    fn test_fisheye_outside_circle_is_black() {
        let source = RgbImage::from_pixel(200, 100, Rgb([90, 90, 90]));
        let out = convert_frame(
            &source,
            ProjectionGeometry::Equirectangular,
            ProjectionGeometry::Fisheye { fov: 180.0 },
            res(64, 64),
        )
        .unwrap();
        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(32, 32), Rgb([90, 90, 90]));
    }

    #[test]
    fn test_bad_cubemap_output_size() {
        let source = RgbImage::new(64, 32);
        let err = convert_frame(
            &source,
            ProjectionGeometry::Equirectangular,
            ProjectionGeometry::Cubemap(CubemapLayout::HorizontalStrip),
            res(100, 32),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidDimensions(_)));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let source = checkerboard(128, 64, 16);
        let target = ProjectionGeometry::Stereographic { pole: Pole::North, fov: 240.0 };
        let a = convert_frame(&source, ProjectionGeometry::Equirectangular, target, res(48, 48)).unwrap();
        let b = convert_frame(&source, ProjectionGeometry::Equirectangular, target, res(48, 48)).unwrap();
        assert_eq!(a, b);
    }
}
