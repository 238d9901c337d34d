//! Spoken announcements for nearby anchors.

use crate::aggregate::NearbyAnchor;
use std::fmt;

/// A nearby anchor phrased for a text-to-speech collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct Announcement {
    pub label: String,
    /// Distance in meters, already rounded to 0.1.
    pub distance: f64,
}

impl From<NearbyAnchor> for Announcement {
    fn from(value: NearbyAnchor) -> Self {
        Self {
            label: value.label,
            distance: value.distance,
        }
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accurate. Distance: {:.1} meters.",
            self.label, self.distance
        )
    }
}
