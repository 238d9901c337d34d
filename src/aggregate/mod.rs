//! Spatial aggregation of world-space labels.
//!
//! Each placement is a detection already hit-tested into a world point. A
//! placement merges with every existing anchor of the same class within the
//! recombining threshold: the matched anchors are removed and replaced by one
//! anchor at the count-weighted mean of all points. In frozen mode an
//! existing nearby anchor wins and the placement is dropped.
//!
//! `AnchorSet` itself is not synchronized; share it between frame workers
//! and the query path through [`SharedAnchorSet`].

mod announce;
mod shared;

pub use announce::Announcement;
pub use shared::{FrameOutcome, Placement, SharedAnchorSet};

use crate::geometry::{Point3, PointSum};
use crate::trace::{trace_event, trace_span};
use crate::util::math::{round_to_tenth, score_percent};
use crate::util::{ArLabelError, ArLabelResult};

/// Default merge radius in meters.
pub const DEFAULT_RECOMBINING_THRESHOLD: f64 = 0.25;
/// Default announcement radius in meters.
pub const DEFAULT_QUERY_RANGE: f64 = 1.5;

/// How an incoming class name is compared against existing anchors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LabelMatch {
    /// The anchor's class name equals the incoming one.
    Exact,
    /// The anchor's display label contains the incoming class name, so
    /// "chair" also matches "armchair: 71.0%".
    #[default]
    Substring,
}

impl LabelMatch {
    fn matches(self, anchor: &LabelAnchor, class_name: &str) -> bool {
        match self {
            LabelMatch::Exact => anchor.class_name == class_name,
            LabelMatch::Substring => anchor.label.contains(class_name),
        }
    }
}

/// Aggregator options.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// Maximum distance in meters at which two placements are one object.
    pub recombining_threshold: f64,
    /// Label comparison strategy.
    pub label_match: LabelMatch,
    /// Ignore frame results older than the newest applied frame.
    pub discard_stale_frames: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            recombining_threshold: DEFAULT_RECOMBINING_THRESHOLD,
            label_match: LabelMatch::Substring,
            discard_stale_frames: false,
        }
    }
}

impl AggregatorConfig {
    /// Checks that the recombining threshold is a finite non-negative distance.
    pub fn validate(&self) -> ArLabelResult<()> {
        if !(self.recombining_threshold.is_finite() && self.recombining_threshold >= 0.0) {
            return Err(ArLabelError::InvalidParameter(
                "recombining_threshold must be a finite non-negative distance",
            ));
        }
        Ok(())
    }
}

/// Persistent labeled world-space point.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelAnchor {
    /// Unique id; a merge replaces anchors, so the result gets a fresh id.
    pub id: u64,
    /// Class name the anchor was placed for.
    pub class_name: String,
    /// Display label, `"<class>: <percent>%"`.
    pub label: String,
    /// World position in meters.
    pub position: Point3,
}

/// Nearby anchor returned by [`AnchorSet::query_nearby`].
#[derive(Clone, Debug, PartialEq)]
pub struct NearbyAnchor {
    pub label: String,
    /// Distance from the query origin, rounded to 0.1 m.
    pub distance: f64,
}

/// Result of a single placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// No matching anchor nearby; a new one was inserted.
    Created { id: u64 },
    /// `replaced` matching anchors were folded into the new anchor `id`.
    Merged { id: u64, replaced: usize },
    /// A matching anchor exists and positions are frozen; nothing changed.
    Frozen,
}

/// Unsynchronized set of label anchors.
#[derive(Clone, Debug)]
pub struct AnchorSet {
    cfg: AggregatorConfig,
    anchors: Vec<LabelAnchor>,
    next_id: u64,
    last_sequence: Option<u64>,
}

impl AnchorSet {
    /// Creates an empty set, failing fast on an invalid configuration.
    pub fn new(cfg: AggregatorConfig) -> ArLabelResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            anchors: Vec::new(),
            next_id: 0,
            last_sequence: None,
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.cfg
    }

    /// Current anchors in insertion order.
    pub fn anchors(&self) -> &[LabelAnchor] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    fn is_same_object(&self, anchor: &LabelAnchor, class_name: &str, point: &Point3) -> bool {
        self.cfg.label_match.matches(anchor, class_name)
            && anchor.position.distance(point) <= self.cfg.recombining_threshold
    }

    /// Places a detection of `class_name` resolved to `point`.
    ///
    /// With `update_position` every matching anchor within the recombining
    /// threshold is removed and averaged into one new anchor. Without it, any
    /// matching anchor freezes the placement.
    pub fn place(
        &mut self,
        class_name: &str,
        score: f32,
        point: Point3,
        update_position: bool,
    ) -> PlaceOutcome {
        let _span = trace_span!("place", class = class_name).entered();

        if !update_position
            && self
                .anchors
                .iter()
                .any(|anchor| self.is_same_object(anchor, class_name, &point))
        {
            trace_event!("place_frozen");
            return PlaceOutcome::Frozen;
        }

        let mut sum = PointSum::starting_at(point);
        let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.anchors)
            .into_iter()
            .partition(|anchor| self.is_same_object(anchor, class_name, &point));
        self.anchors = rest;
        for anchor in &matched {
            sum.add(anchor.position);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.anchors.push(LabelAnchor {
            id,
            class_name: class_name.to_owned(),
            label: format!("{class_name}: {:.1}%", score_percent(score)),
            position: sum.mean(),
        });

        if matched.is_empty() {
            trace_event!("place_created", id = id);
            PlaceOutcome::Created { id }
        } else {
            trace_event!("place_merged", id = id, replaced = matched.len());
            debug_assert_eq!(sum.count(), matched.len() + 1);
            PlaceOutcome::Merged {
                id,
                replaced: matched.len(),
            }
        }
    }

    /// Anchors within `range` meters of `origin`, with rounded distances.
    pub fn query_nearby(&self, origin: Point3, range: f64) -> Vec<NearbyAnchor> {
        self.anchors
            .iter()
            .filter_map(|anchor| {
                let distance = anchor.position.distance(&origin);
                (distance <= range).then(|| NearbyAnchor {
                    label: anchor.label.clone(),
                    distance: round_to_tenth(distance),
                })
            })
            .collect()
    }

    /// Records a frame sequence number; returns false if the frame is stale
    /// and stale frames are being discarded.
    pub(crate) fn accept_sequence(&mut self, sequence: u64) -> bool {
        if let Some(last) = self.last_sequence {
            if self.cfg.discard_stale_frames && sequence < last {
                return false;
            }
            self.last_sequence = Some(last.max(sequence));
        } else {
            self.last_sequence = Some(sequence);
        }
        true
    }
}
