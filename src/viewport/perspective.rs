// Rectilinear virtual camera over a spherical frame

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::{Resolution, Viewport};
use crate::projection::{sample_bilinear, ProjectionGeometry, Ray};

/// Pinhole camera rotated by yaw then pitch from the forward axis
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveCamera {
    yaw: f64,
    pitch: f64,
    tan_half_h: f64,
    tan_half_v: f64,
    output: Resolution,
}

impl PerspectiveCamera {
    pub fn new(viewport: &Viewport) -> Self {
        let output = viewport.output();
        let tan_half_h = (viewport.horizontal_fov().to_radians() / 2.0).tan();
        Self {
            yaw: viewport.yaw().to_radians(),
            pitch: viewport.pitch().to_radians(),
            tan_half_h,
            tan_half_v: tan_half_h / output.aspect_ratio(),
            output,
        }
    }

    /// World ray through the continuous output location `(u, v)`
    pub fn ray(&self, u: f64, v: f64) -> Ray {
        let nx = 2.0 * u / self.output.width as f64 - 1.0;
        let ny = 2.0 * v / self.output.height as f64 - 1.0;
        Ray::new(nx * self.tan_half_h, -ny * self.tan_half_v, 1.0)
            .rotate_pitch(self.pitch)
            .rotate_yaw(self.yaw)
    }
}

/// Render the view seen through `viewport` from a spherical frame
pub fn render_perspective(
    frame: &RgbImage,
    source: ProjectionGeometry,
    viewport: &Viewport,
) -> Result<RgbImage, DomainError> {
    let (src_w, src_h) = frame.dimensions();
    source.check_dimensions(src_w, src_h)?;

    let camera = PerspectiveCamera::new(viewport);
    let output = viewport.output();

    debug!(
        yaw = viewport.yaw(),
        pitch = viewport.pitch(),
        fov = viewport.horizontal_fov(),
        output = %output,
        "Extracting viewport"
    );

    let mut out = RgbImage::new(output.width, output.height);
    for j in 0..output.height {
        for i in 0..output.width {
            let ray = camera.ray(i as f64 + 0.5, j as f64 + 0.5);
            let point = source.ray_to_pixel(&ray, src_w, src_h)?;
            out.put_pixel(i, j, sample_bilinear(frame, point));
        }
    }
    Ok(out)
}

/// Whole-frame resize used when the source is not spherical
pub fn render_flat(frame: &RgbImage, output: Resolution) -> RgbImage {
    imageops::resize(frame, output.width, output.height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ViewDirection;
    use crate::projection::CubeFace;
    use image::Rgb;

    fn face_colour(face: CubeFace) -> Rgb<u8> {
        match face {
            CubeFace::Right => Rgb([255, 0, 0]),
            CubeFace::Left => Rgb([0, 255, 0]),
            CubeFace::Up => Rgb([0, 0, 255]),
            CubeFace::Down => Rgb([255, 255, 0]),
            CubeFace::Front => Rgb([0, 255, 255]),
            CubeFace::Back => Rgb([255, 0, 255]),
        }
    }

    fn direction_face(direction: ViewDirection) -> CubeFace {
        match direction {
            ViewDirection::Front => CubeFace::Front,
            ViewDirection::Back => CubeFace::Back,
            ViewDirection::Left => CubeFace::Left,
            ViewDirection::Right => CubeFace::Right,
            ViewDirection::Up => CubeFace::Up,
            ViewDirection::Down => CubeFace::Down,
        }
    }

    /// Equirect frame coloured by the dominant axis of each pixel's ray
    fn axis_pattern(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let ray = ProjectionGeometry::Equirectangular
                .pixel_to_ray(x as f64 + 0.5, y as f64 + 0.5, width, height)
                .unwrap()
                .unwrap();
            face_colour(CubeFace::locate(&ray).0)
        })
    }

    #[test]
    fn test_canonical_directions_hit_reference_colour() {
        let source = axis_pattern(720, 360);
        let output = Resolution::new(65, 65).unwrap();
        for direction in ViewDirection::ALL {
            let viewport = Viewport::from_direction(direction, 90.0, output).unwrap();
            let view =
                render_perspective(&source, ProjectionGeometry::Equirectangular, &viewport)
                    .unwrap();
            assert_eq!(
                *view.get_pixel(32, 32),
                face_colour(direction_face(direction)),
                "{:?}",
                direction
            );
        }
    }

    #[test]
    fn test_camera_centre_ray_matches_direction() {
        let output = Resolution::new(64, 64).unwrap();
        for direction in ViewDirection::ALL {
            let viewport = Viewport::from_direction(direction, 60.0, output).unwrap();
            let ray = PerspectiveCamera::new(&viewport).ray(32.0, 32.0);
            let (yaw, pitch) = direction.yaw_pitch();
            let expected = Ray::from_lon_lat(yaw.to_radians(), pitch.to_radians());
            assert!(ray.angle_to(&expected) < 1e-6, "{:?}", direction);
        }
    }

    #[test]
    fn test_right_edge_turns_right() {
        let output = Resolution::new(100, 50).unwrap();
        let viewport = Viewport::new(0.0, 0.0, 90.0, output).unwrap();
        let ray = PerspectiveCamera::new(&viewport).ray(100.0, 25.0);
        assert!((ray.lon().to_degrees() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_resize() {
        let frame = RgbImage::from_pixel(40, 20, Rgb([10, 20, 30]));
        let out = render_flat(&frame, Resolution::new(8, 4).unwrap());
        assert_eq!(out.dimensions(), (8, 4));
        let pixel = out.get_pixel(3, 2);
        for (got, want) in pixel.0.iter().zip([10u8, 20, 30]) {
            assert!(got.abs_diff(want) <= 1);
        }
    }
}
