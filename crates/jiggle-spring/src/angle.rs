//! Swing limits relative to a pivot frame.

use glam::Vec3;

const DEGENERATE_PROJECTION: f32 = 1e-6;

/// A swing limit in degrees, measured in the plane spanned by a pivot's
/// `forward` and `side` axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AngleLimit {
    /// Whether the limit is applied.
    pub active: bool,
    /// Lower bound in degrees.
    pub min: f32,
    /// Upper bound in degrees.
    pub max: f32,
}

impl AngleLimit {
    /// An active limit between `min` and `max` degrees.
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            active: true,
            min,
            max,
        }
    }

    /// Swap `min` and `max` if they are inverted and clamp both to
    /// `[-90, 90]`.
    pub fn normalized(self) -> Self {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        Self {
            active: self.active,
            min: lo.clamp(-90.0, 90.0),
            max: hi.clamp(-90.0, 90.0),
        }
    }

    /// Pull `vector` back inside the limit.
    ///
    /// The component along `up` is left untouched. The remainder is
    /// projected onto the `forward`/`side` plane and its sine against
    /// `side` is moved towards the nearest bound by `correction`
    /// (`0` = no change, `1` = snap to the bound). Returns `None` when
    /// the vector is already within bounds or the projection is
    /// degenerate.
    pub fn constrain(
        &self,
        vector: Vec3,
        side: Vec3,
        up: Vec3,
        forward: Vec3,
        correction: f32,
    ) -> Option<Vec3> {
        if !self.active {
            return None;
        }
        let up_part = up * vector.dot(up);
        let projection = vector - up_part;
        let length = projection.length();
        if length < DEGENERATE_PROJECTION {
            return None;
        }

        let sine = (projection / length).dot(side).clamp(-1.0, 1.0);
        let min_sine = self.min.to_radians().sin();
        let max_sine = self.max.to_radians().sin();
        let bounded = sine.clamp(min_sine, max_sine);
        if bounded == sine {
            return None;
        }

        let new_sine = sine + (bounded - sine) * correction.clamp(0.0, 1.0);
        let new_cosine = (1.0 - new_sine * new_sine).max(0.0).sqrt();
        Some(up_part + (side * new_sine + forward * new_cosine) * length)
    }
}
