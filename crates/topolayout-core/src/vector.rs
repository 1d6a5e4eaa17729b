//! Mutable 2D vector used for both positions and velocities.
//!
//! Arithmetic is in place so the O(n²) solver loops never allocate.

use serde::{Deserialize, Serialize};

/// A 2D point or vector with in-place arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn set(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Accumulate another vector into this one.
    pub fn add(&mut self, other: Vector2) {
        self.x += other.x;
        self.y += other.y;
    }

    pub fn add_xy(&mut self, x: f64, y: f64) {
        self.x += x;
        self.y += y;
    }

    /// Scale both components by `factor`.
    pub fn multiply(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
    }

    /// Euclidean norm.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Convert to unit length in place.
    ///
    /// A zero vector has no direction and is left at (0, 0).
    pub fn normalize(&mut self) {
        let magnitude = self.magnitude();
        if magnitude == 0.0 {
            return;
        }
        self.x /= magnitude;
        self.y /= magnitude;
    }

    /// `self - other` as a new vector.
    pub fn minus(&self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }

    /// Z component of the cross product of two 2D vectors.
    pub fn cross(&self, other: Vector2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Vector2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}
