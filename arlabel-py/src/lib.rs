//! Python bindings for the arlabel decoding and aggregation core.
//!
//! Exposes the detection decoder over numpy arrays and a thread-safe anchor
//! set via PyO3.

use numpy::{PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use arlabel::{
    AggregatorConfig as RustAggregatorConfig, ArLabelError, Decoder as RustDecoder,
    DecoderConfig as RustDecoderConfig, Detection as RustDetection,
    LabelAnchor as RustLabelAnchor, LabelMatch, PlaceOutcome, Point3,
    SharedAnchorSet as RustSharedAnchorSet, SuppressionMode, TensorView,
};

/// Convert an ArLabelError to a Python exception.
fn to_py_err(err: ArLabelError) -> PyErr {
    match err {
        ArLabelError::InvalidThreshold { .. }
        | ArLabelError::InvalidParameter(_)
        | ArLabelError::NegativeExtent { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn tensor_view<'a>(array: &'a PyReadonlyArray2<'_, f32>) -> PyResult<TensorView<'a, f32>> {
    let shape = array.shape();
    let rows = shape[0];
    let cols = shape[1];
    let data = array.as_slice()?;
    TensorView::from_slice(data, rows, cols).map_err(to_py_err)
}

/// One decoded detection.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    #[pyo3(get)]
    pub class_index: usize,
    #[pyo3(get)]
    pub score: f32,
    /// Box as (x, y, width, height).
    #[pyo3(get)]
    pub rect: (f32, f32, f32, f32),
    /// Source row of the raw tensors.
    #[pyo3(get)]
    pub candidate: usize,
}

#[pymethods]
impl Detection {
    fn __repr__(&self) -> String {
        let (x, y, w, h) = self.rect;
        format!(
            "Detection(class_index={}, score={:.4}, rect=({:.3}, {:.3}, {:.3}, {:.3}))",
            self.class_index, self.score, x, y, w, h
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            class_index: d.class_index,
            score: d.score,
            rect: (d.rect.x, d.rect.y, d.rect.width, d.rect.height),
            candidate: d.candidate,
        }
    }
}

/// Decoder thresholds.
#[pyclass]
#[derive(Clone)]
pub struct DecoderConfig {
    inner: RustDecoderConfig,
}

#[pymethods]
impl DecoderConfig {
    /// Create a new DecoderConfig.
    ///
    /// Args:
    ///     confidence_threshold: Minimum arg-max confidence (default: 0.3)
    ///     iou_threshold: Suppression IoU threshold (default: 0.5)
    ///     max_boxes: Maximum detections per frame (default: 10)
    ///     suppression: 'cross_class' or 'per_class' (default: 'cross_class')
    ///     parallel: Scan rows in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        confidence_threshold = 0.3,
        iou_threshold = 0.5,
        max_boxes = 10,
        suppression = "cross_class",
        parallel = false
    ))]
    fn new(
        confidence_threshold: f32,
        iou_threshold: f32,
        max_boxes: usize,
        suppression: &str,
        parallel: bool,
    ) -> PyResult<Self> {
        let suppression = match suppression.to_lowercase().as_str() {
            "cross_class" => SuppressionMode::CrossClass,
            "per_class" => SuppressionMode::PerClass,
            _ => {
                return Err(PyValueError::new_err(
                    "suppression must be 'cross_class' or 'per_class'",
                ))
            }
        };
        let inner = RustDecoderConfig {
            confidence_threshold,
            iou_threshold,
            max_boxes,
            suppression,
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        let suppression = match self.inner.suppression {
            SuppressionMode::CrossClass => "cross_class",
            SuppressionMode::PerClass => "per_class",
        };
        format!(
            "DecoderConfig(confidence_threshold={}, iou_threshold={}, max_boxes={}, suppression='{}')",
            self.inner.confidence_threshold,
            self.inner.iou_threshold,
            self.inner.max_boxes,
            suppression
        )
    }
}

#[pyclass]
pub struct Decoder {
    inner: RustDecoder,
}

#[pymethods]
impl Decoder {
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<DecoderConfig>) -> PyResult<Self> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = RustDecoder::new(cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Decode `confidence[N, C]` and `coordinates[N, 4]` float32 arrays.
    fn decode(
        &self,
        confidence: PyReadonlyArray2<'_, f32>,
        coordinates: PyReadonlyArray2<'_, f32>,
    ) -> PyResult<Vec<Detection>> {
        let conf = tensor_view(&confidence)?;
        let coords = tensor_view(&coordinates)?;
        let detections = self.inner.decode(conf, coords).map_err(to_py_err)?;
        Ok(detections.into_iter().map(Detection::from).collect())
    }
}

/// Persistent world-space label.
#[pyclass]
#[derive(Clone)]
pub struct Anchor {
    #[pyo3(get)]
    pub id: u64,
    #[pyo3(get)]
    pub class_name: String,
    #[pyo3(get)]
    pub label: String,
    #[pyo3(get)]
    pub position: (f32, f32, f32),
}

#[pymethods]
impl Anchor {
    fn __repr__(&self) -> String {
        let (x, y, z) = self.position;
        format!(
            "Anchor(id={}, label='{}', position=({:.3}, {:.3}, {:.3}))",
            self.id, self.label, x, y, z
        )
    }
}

impl From<RustLabelAnchor> for Anchor {
    fn from(a: RustLabelAnchor) -> Self {
        Self {
            id: a.id,
            class_name: a.class_name,
            label: a.label,
            position: (a.position.x, a.position.y, a.position.z),
        }
    }
}

/// Thread-safe set of label anchors.
#[pyclass]
pub struct AnchorSet {
    inner: RustSharedAnchorSet,
}

#[pymethods]
impl AnchorSet {
    /// Create an empty anchor set.
    ///
    /// Args:
    ///     recombining_threshold: Merge radius in meters (default: 0.25)
    ///     label_match: 'substring' or 'exact' (default: 'substring')
    #[new]
    #[pyo3(signature = (recombining_threshold = 0.25, label_match = "substring"))]
    fn new(recombining_threshold: f64, label_match: &str) -> PyResult<Self> {
        let label_match = match label_match.to_lowercase().as_str() {
            "substring" => LabelMatch::Substring,
            "exact" => LabelMatch::Exact,
            _ => {
                return Err(PyValueError::new_err(
                    "label_match must be 'substring' or 'exact'",
                ))
            }
        };
        let inner = RustSharedAnchorSet::new(RustAggregatorConfig {
            recombining_threshold,
            label_match,
            ..RustAggregatorConfig::default()
        })
        .map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Place a detection; returns 'created', 'merged' or 'frozen'.
    #[pyo3(signature = (class_name, score, point, update_position = true))]
    fn place(
        &self,
        class_name: &str,
        score: f32,
        point: (f32, f32, f32),
        update_position: bool,
    ) -> &'static str {
        let placement = arlabel::Placement {
            class_name: class_name.to_owned(),
            score,
            point: Point3::new(point.0, point.1, point.2),
        };
        match self.inner.place(&placement, update_position) {
            PlaceOutcome::Created { .. } => "created",
            PlaceOutcome::Merged { .. } => "merged",
            PlaceOutcome::Frozen => "frozen",
        }
    }

    /// Anchors within `range` of `origin` as (label, rounded distance).
    #[pyo3(signature = (origin, range = 1.5))]
    fn query_nearby(&self, origin: (f32, f32, f32), range: f64) -> Vec<(String, f64)> {
        self.inner
            .query_nearby(Point3::new(origin.0, origin.1, origin.2), range)
            .into_iter()
            .map(|n| (n.label, n.distance))
            .collect()
    }

    /// Announcement sentences for anchors within `range` of `origin`.
    #[pyo3(signature = (origin, range = 1.5))]
    fn announce(&self, origin: (f32, f32, f32), range: f64) -> Vec<String> {
        self.inner
            .announce(Point3::new(origin.0, origin.1, origin.2), range)
            .into_iter()
            .map(|a| a.to_string())
            .collect()
    }

    #[getter]
    fn anchors(&self) -> Vec<Anchor> {
        self.inner.snapshot().into_iter().map(Anchor::from).collect()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("AnchorSet(len={})", self.inner.len())
    }
}

/// Python module for arlabel.
#[pymodule]
fn _arlabel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<DecoderConfig>()?;
    m.add_class::<Decoder>()?;
    m.add_class::<Anchor>()?;
    m.add_class::<AnchorSet>()?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
