//! Unit ray directions on the viewing sphere
//!
//! Axes: `x` points right, `y` up, `z` forward. Longitude is measured from
//! `+z` towards `+x`, latitude from the equator towards `+y`.

use std::f64::consts::FRAC_PI_2;

/// Direction from the sphere centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Ray {
    pub const FORWARD: Ray = Ray { x: 0.0, y: 0.0, z: 1.0 };

    /// Build a ray and normalize it to unit length
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Ray { x, y, z }.normalized()
    }

    /// Ray for a longitude/latitude pair in radians
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        let cos_lat = lat.cos();
        Ray {
            x: cos_lat * lon.sin(),
            y: lat.sin(),
            z: cos_lat * lon.cos(),
        }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return self;
        }
        Ray {
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Longitude in (-PI, PI]
    pub fn lon(&self) -> f64 {
        self.x.atan2(self.z)
    }

    /// Latitude in [-PI/2, PI/2]
    pub fn lat(&self) -> f64 {
        self.y.clamp(-1.0, 1.0).asin().clamp(-FRAC_PI_2, FRAC_PI_2)
    }

    /// Tilt about the x axis; positive angles look up
    pub fn rotate_pitch(self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Ray {
            x: self.x,
            y: self.y * cos + self.z * sin,
            z: -self.y * sin + self.z * cos,
        }
    }

    /// Turn about the y axis; positive angles look right
    pub fn rotate_yaw(self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Ray {
            x: self.x * cos + self.z * sin,
            y: self.y,
            z: -self.x * sin + self.z * cos,
        }
    }

    /// Angle between two unit rays in radians
    pub fn angle_to(&self, other: &Ray) -> f64 {
        let dot = self.x * other.x + self.y * other.y + self.z * other.z;
        dot.clamp(-1.0, 1.0).acos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_lon_lat_round_trip() {
        for &(lon, lat) in &[(0.0, 0.0), (1.0, 0.5), (-2.5, -1.2), (PI * 0.99, 0.1)] {
            let ray = Ray::from_lon_lat(lon, lat);
            assert!(close(ray.length(), 1.0));
            assert!(close(ray.lon(), lon));
            assert!(close(ray.lat(), lat));
        }
    }

    #[test]
    fn test_yaw_turns_right() {
        let ray = Ray::FORWARD.rotate_yaw(FRAC_PI_2);
        assert!(close(ray.x, 1.0));
        assert!(close(ray.z, 0.0));
    }

    #[test]
    fn test_pitch_looks_up() {
        let ray = Ray::FORWARD.rotate_pitch(FRAC_PI_2);
        assert!(close(ray.y, 1.0));
        assert!(close(ray.z, 0.0));
    }

    #[test]
    fn test_angle_to() {
        let right = Ray::new(1.0, 0.0, 0.0);
        assert!(close(Ray::FORWARD.angle_to(&right), FRAC_PI_2));
        assert!(close(Ray::FORWARD.angle_to(&Ray::FORWARD), 0.0));
    }
}
