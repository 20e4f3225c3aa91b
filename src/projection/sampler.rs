// Bilinear sampling of RGB frames at continuous coordinates

use image::{Rgb, RgbImage};

/// How out-of-range neighbours are resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleBounds {
    /// Columns wrap around (longitude), rows clamp (latitude)
    WrapX,
    /// Both axes clamp to a pixel rectangle, e.g. one cube face
    Rect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

/// Continuous source location; pixel centres sit at `i + 0.5`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePoint {
    pub x: f64,
    pub y: f64,
    pub bounds: SampleBounds,
}

impl SourcePoint {
    pub fn wrapped(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            bounds: SampleBounds::WrapX,
        }
    }

    pub fn clamped(x: f64, y: f64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            bounds: SampleBounds::Rect {
                x: 0,
                y: 0,
                width,
                height,
            },
        }
    }
}

/// Sample `frame` with bilinear interpolation
pub fn sample_bilinear(frame: &RgbImage, point: SourcePoint) -> Rgb<u8> {
    let (width, height) = frame.dimensions();
    let (rx, ry, rw, rh) = match point.bounds {
        SampleBounds::WrapX => (0, 0, width, height),
        SampleBounds::Rect {
            x,
            y,
            width: w,
            height: h,
        } => (x, y, w.max(1), h.max(1)),
    };

    let gx = point.x - 0.5;
    let gy = point.y - 0.5;
    let x0 = gx.floor();
    let y0 = gy.floor();
    let fx = gx - x0;
    let fy = gy - y0;

    let column = |i: f64| -> u32 {
        match point.bounds {
            SampleBounds::WrapX => (i as i64).rem_euclid(width as i64) as u32,
            SampleBounds::Rect { .. } => {
                (i.max(rx as f64).min((rx + rw - 1) as f64)) as u32
            }
        }
    };
    let row = |j: f64| -> u32 { (j.max(ry as f64).min((ry + rh - 1) as f64)) as u32 };

    let (c0, c1) = (column(x0), column(x0 + 1.0));
    let (r0, r1) = (row(y0), row(y0 + 1.0));

    let p00 = frame.get_pixel(c0, r0).0;
    let p10 = frame.get_pixel(c1, r0).0;
    let p01 = frame.get_pixel(c0, r1).0;
    let p11 = frame.get_pixel(c1, r1).0;

    let mut out = [0u8; 3];
    for (channel, value) in out.iter_mut().enumerate() {
        let top = p00[channel] as f64 * (1.0 - fx) + p10[channel] as f64 * fx;
        let bottom = p01[channel] as f64 * (1.0 - fx) + p11[channel] as f64 * fx;
        *value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> RgbImage {
        RgbImage::from_fn(4, 2, |x, y| Rgb([(x * 60) as u8, (y * 100) as u8, 7]))
    }

    #[test]
    fn test_pixel_centre_is_exact() {
        let frame = gradient();
        let sample = sample_bilinear(&frame, SourcePoint::clamped(2.5, 1.5, 4, 2));
        assert_eq!(sample, Rgb([120, 100, 7]));
    }

    #[test]
    fn test_midpoint_interpolates() {
        let frame = gradient();
        let sample = sample_bilinear(&frame, SourcePoint::clamped(1.0, 0.5, 4, 2));
        assert_eq!(sample, Rgb([30, 0, 7]));
    }

    #[test]
    fn test_wrap_blends_first_and_last_column() {
        let frame = gradient();
        let sample = sample_bilinear(&frame, SourcePoint::wrapped(0.0, 0.5));
        // halfway between column 3 (180) and column 0 (0)
        assert_eq!(sample, Rgb([90, 0, 7]));
    }

    #[test]
    fn test_clamp_outside_rect() {
        let frame = gradient();
        let sample = sample_bilinear(&frame, SourcePoint::clamped(-10.0, 50.0, 4, 2));
        assert_eq!(sample, Rgb([0, 100, 7]));
    }
}
