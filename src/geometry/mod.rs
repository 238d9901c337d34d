//! Planar boxes and world-space points.
//!
//! `Rect` follows the network's `(x, y, width, height)` layout with `(x, y)`
//! as the origin corner; the unit is whatever the network emits (normalized
//! or pixels), as long as both boxes being compared share it.

use crate::util::{ArLabelError, ArLabelResult};

/// Axis-aligned rectangle with non-negative extent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle, rejecting negative or non-finite extents.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> ArLabelResult<Self> {
        if !(width >= 0.0 && height >= 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(ArLabelError::NegativeExtent { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Right edge.
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Overlapping area with `other`; zero when disjoint or only touching.
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        self.overlap(other) as f32
    }

    /// Intersection over union in `[0, 1]`, defined as 0 when the union is
    /// empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.overlap(other);
        let union = self.area_f64() + other.area_f64() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0) as f32
    }

    // Edges of two f32 values sum exactly in f64, so a box's overlap with
    // itself equals its own area bit for bit.
    fn overlap(&self, other: &Rect) -> f64 {
        let w = edge(self.x, self.width).min(edge(other.x, other.width))
            - f64::from(self.x).max(f64::from(other.x));
        let h = edge(self.y, self.height).min(edge(other.y, other.height))
            - f64::from(self.y).max(f64::from(other.y));
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    fn area_f64(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }
}

fn edge(origin: f32, extent: f32) -> f64 {
    f64::from(origin) + f64::from(extent)
}

/// Point in the view (screen) coordinate system handed to hit testing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// World-space point in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance, accumulated in `f64`.
    pub fn distance(&self, other: &Point3) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Running sum of points for count-weighted averaging.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PointSum {
    x: f64,
    y: f64,
    z: f64,
    count: usize,
}

impl PointSum {
    pub(crate) fn starting_at(point: Point3) -> Self {
        Self {
            x: f64::from(point.x),
            y: f64::from(point.y),
            z: f64::from(point.z),
            count: 1,
        }
    }

    pub(crate) fn add(&mut self, point: Point3) {
        self.x += f64::from(point.x);
        self.y += f64::from(point.y);
        self.z += f64::from(point.z);
        self.count += 1;
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn mean(&self) -> Point3 {
        let n = self.count as f64;
        Point3::new(
            (self.x / n) as f32,
            (self.y / n) as f32,
            (self.z / n) as f32,
        )
    }
}
