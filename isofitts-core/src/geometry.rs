use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A circular region in screen coordinates (y grows downward).
///
/// Persisted as a `(center_x, center_y, radius)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64, f64)", into = "(f64, f64, f64)")]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Targets are fixed for a run.
pub type Target = Circle;
/// The cursor only changes through motion integration.
pub type Cursor = Circle;

impl Circle {
    pub const fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn center_distance(&self, other: &Circle) -> f64 {
        distance(self.center(), other.center())
    }
}

impl From<(f64, f64, f64)> for Circle {
    fn from((x, y, radius): (f64, f64, f64)) -> Self {
        Self { x, y, radius }
    }
}

impl From<Circle> for (f64, f64, f64) {
    fn from(c: Circle) -> Self {
        (c.x, c.y, c.radius)
    }
}

/// Boundary convention for cursor/target overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureRule {
    /// Center distance below the mean of both radii.
    #[default]
    HalfRadiusSum,
    /// Center distance below the sum of both radii (circles touching).
    RadiusSum,
    /// Cursor center inside the target circle.
    TargetRadius,
}

impl CaptureRule {
    pub fn capture_distance(self, cursor_radius: f64, target_radius: f64) -> f64 {
        match self {
            CaptureRule::HalfRadiusSum => (cursor_radius + target_radius) / 2.0,
            CaptureRule::RadiusSum => cursor_radius + target_radius,
            CaptureRule::TargetRadius => target_radius,
        }
    }
}

/// Which extent of the goal counts as the Fitts' law width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidthConvention {
    #[default]
    Diameter,
    Radius,
}

impl WidthConvention {
    pub fn width_of(self, target: &Target) -> f64 {
        match self {
            WidthConvention::Diameter => target.radius * 2.0,
            WidthConvention::Radius => target.radius,
        }
    }
}

/// Places `count` targets evenly on a ring, clockwise from 0°.
pub fn layout(
    center: (f64, f64),
    outer_radius: f64,
    target_radius: f64,
    count: usize,
) -> Result<Vec<Target>> {
    if count < 2 {
        return Err(Error::InvalidConfiguration(format!(
            "target count must be at least 2, got {count}"
        )));
    }
    if !(outer_radius.is_finite() && outer_radius > 0.0) {
        return Err(Error::InvalidConfiguration(format!(
            "layout radius must be positive, got {outer_radius}"
        )));
    }
    if !(target_radius.is_finite() && target_radius > 0.0) {
        return Err(Error::InvalidConfiguration(format!(
            "target radius must be positive, got {target_radius}"
        )));
    }

    let step = 360.0 / count as f64;
    Ok((0..count)
        .map(|i| {
            let theta = (i as f64 * step).to_radians();
            Circle::new(
                center.0 + outer_radius * theta.cos(),
                center.1 + outer_radius * theta.sin(),
                target_radius,
            )
        })
        .collect())
}

/// Overlap test under the default [`CaptureRule`].
pub fn contains(cursor: &Cursor, target: &Target) -> bool {
    contains_with(cursor, target, CaptureRule::default())
}

pub fn contains_with(cursor: &Cursor, target: &Target, rule: CaptureRule) -> bool {
    cursor.center_distance(target) < rule.capture_distance(cursor.radius, target.radius)
}

pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Sum of consecutive distances; zero for fewer than two points.
pub fn path_length(points: &[(f64, f64)]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// `log2(distance / width + 1)`. Callers guard `width > 0`.
pub fn fitts_index_of_difficulty(distance: f64, width: f64) -> f64 {
    (distance / width + 1.0).log2()
}
