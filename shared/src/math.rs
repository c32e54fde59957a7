use serde::{Deserialize, Serialize};

/// A point or direction in the free 3D plane units move on.
///
/// Y is up; the ground plane is `y == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the magnitude of the vector.
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns the unit vector in the same direction, or zero for the zero vector.
    pub fn normalize(self) -> Vector3 {
        let len = self.length();
        if len == 0.0 {
            Vector3::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }

    pub fn scale(self, scalar: f64) -> Vector3 {
        Vector3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    pub fn add(self, other: Vector3) -> Vector3 {
        Vector3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn subtract(self, other: Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Vector3) -> f64 {
        other.subtract(self).length()
    }
}

/// A tile on the integer building lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridLocation {
    pub x: i32,
    pub z: i32,
}

impl GridLocation {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The tile projected onto the ground plane.
    pub fn to_vector3(self) -> Vector3 {
        Vector3::new(self.x as f64, 0.0, self.z as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_length_and_normalize() {
        let v = Vector3::new(3.0, 0.0, 4.0);
        assert_eq!(v.length(), 5.0);

        let n = v.normalize();
        assert_approx_eq!(n.length(), 1.0, 1e-12);
        assert_approx_eq!(n.x, 0.6, 1e-12);
        assert_approx_eq!(n.z, 0.8, 1e-12);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vector3::ZERO.normalize(), Vector3::ZERO);
    }

    #[test]
    fn test_add_subtract_scale() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(0.5, -1.0, 2.0);

        assert_eq!(a.add(b), Vector3::new(1.5, 1.0, 5.0));
        assert_eq!(a.subtract(b), Vector3::new(0.5, 3.0, 1.0));
        assert_eq!(a.scale(2.0), Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(a.subtract(a), Vector3::ZERO);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Vector3::new(-2.0, 0.0, 1.0);
        let b = Vector3::new(4.0, 0.0, 9.0);
        assert_eq!(a.distance(b), 10.0);
        assert_eq!(b.distance(a), 10.0);
    }

    #[test]
    fn test_grid_location_projects_to_ground() {
        let tile = GridLocation::new(7, -3);
        assert_eq!(tile.to_vector3(), Vector3::new(7.0, 0.0, -3.0));
    }
}
