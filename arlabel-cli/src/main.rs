use arlabel::{
    AggregatorConfig, Decoder, DecoderConfig, Detection, FramePipeline, FramePool, FrameReport,
    HitTest, InferenceModel, LabelAnchor, LabelMatch, OwnedTensor, Point3, ProcessingMode,
    RawPrediction, ScreenPoint, SharedAnchorSet, SuppressionMode, ViewProjection,
};
use arlabel::aggregate::DEFAULT_QUERY_RANGE;
use arlabel::pool::MAX_INFLIGHT_BUFFERS;
use arlabel::{ArLabelError, ArLabelResult};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::thread;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "arlabel CLI: replay recorded network output (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SuppressionConfig {
    CrossClass,
    PerClass,
}

impl From<SuppressionConfig> for SuppressionMode {
    fn from(value: SuppressionConfig) -> Self {
        match value {
            SuppressionConfig::CrossClass => SuppressionMode::CrossClass,
            SuppressionConfig::PerClass => SuppressionMode::PerClass,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LabelMatchConfig {
    Exact,
    Substring,
}

impl From<LabelMatchConfig> for LabelMatch {
    fn from(value: LabelMatchConfig) -> Self {
        match value {
            LabelMatchConfig::Exact => LabelMatch::Exact,
            LabelMatchConfig::Substring => LabelMatch::Substring,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ProcessingModeConfig {
    Crop,
    ScaleFit,
}

impl From<ProcessingModeConfig> for ProcessingMode {
    fn from(value: ProcessingModeConfig) -> Self {
        match value {
            ProcessingModeConfig::Crop => ProcessingMode::Crop,
            ProcessingModeConfig::ScaleFit => ProcessingMode::ScaleFit,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DecoderConfigJson {
    confidence_threshold: f32,
    iou_threshold: f32,
    max_boxes: usize,
    suppression: SuppressionConfig,
    parallel: bool,
}

impl Default for DecoderConfigJson {
    fn default() -> Self {
        let cfg = DecoderConfig::default();
        Self {
            confidence_threshold: cfg.confidence_threshold,
            iou_threshold: cfg.iou_threshold,
            max_boxes: cfg.max_boxes,
            suppression: SuppressionConfig::CrossClass,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AggregatorConfigJson {
    recombining_threshold: f64,
    label_match: LabelMatchConfig,
    discard_stale_frames: bool,
}

impl Default for AggregatorConfigJson {
    fn default() -> Self {
        let cfg = AggregatorConfig::default();
        Self {
            recombining_threshold: cfg.recombining_threshold,
            label_match: LabelMatchConfig::Substring,
            discard_stale_frames: cfg.discard_stale_frames,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ProjectionConfigJson {
    view_width: f32,
    view_height: f32,
    image_long: usize,
    image_short: usize,
    input_size: usize,
    mode: ProcessingModeConfig,
    scale_fit_x_bias: f32,
}

impl Default for ProjectionConfigJson {
    fn default() -> Self {
        Self {
            view_width: 375.0,
            view_height: 812.0,
            image_long: 1920,
            image_short: 1440,
            input_size: arlabel::decode::INPUT_WIDTH,
            mode: ProcessingModeConfig::ScaleFit,
            scale_fit_x_bias: arlabel::projection::DEFAULT_SCALE_FIT_X_BIAS,
        }
    }
}

/// Flat floor standing in for the AR session's plane hit test.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct GroundConfigJson {
    meters_per_point: f32,
    floor_height: f32,
    /// View rows above this line see no floor.
    horizon_y: f32,
}

impl Default for GroundConfigJson {
    fn default() -> Self {
        Self {
            meters_per_point: 0.005,
            floor_height: -1.4,
            horizon_y: 0.0,
        }
    }
}

impl HitTest for GroundConfigJson {
    fn hit_test(&self, point: ScreenPoint) -> Option<Point3> {
        if !(point.x.is_finite() && point.y.is_finite()) || point.y < self.horizon_y {
            return None;
        }
        Some(Point3::new(
            point.x * self.meters_per_point,
            self.floor_height,
            -(point.y - self.horizon_y) * self.meters_per_point,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct FrameJson {
    confidence: Vec<Vec<f32>>,
    coordinates: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct QueryJson {
    origin: [f32; 3],
    range: f64,
}

impl Default for QueryJson {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            range: DEFAULT_QUERY_RANGE,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    labels: Vec<String>,
    decoder: DecoderConfigJson,
    aggregator: AggregatorConfigJson,
    projection: ProjectionConfigJson,
    ground: GroundConfigJson,
    update_position: bool,
    inflight_slots: usize,
    frames: Vec<FrameJson>,
    query: Option<QueryJson>,
    output_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            decoder: DecoderConfigJson::default(),
            aggregator: AggregatorConfigJson::default(),
            projection: ProjectionConfigJson::default(),
            ground: GroundConfigJson::default(),
            update_position: true,
            inflight_slots: MAX_INFLIGHT_BUFFERS,
            frames: Vec::new(),
            query: None,
            output_path: None,
        }
    }
}

/// Replays recorded tensors: the "preprocessed input" already is the output.
struct ReplayModel;

impl InferenceModel for ReplayModel {
    type Input = Option<RawPrediction>;

    fn infer(&self, input: &Option<RawPrediction>) -> ArLabelResult<RawPrediction> {
        input
            .clone()
            .ok_or_else(|| ArLabelError::InferenceUnavailable("frame tensors malformed".into()))
    }
}

fn raw_prediction(frame: &FrameJson) -> ArLabelResult<RawPrediction> {
    let classes = frame.confidence.first().map_or(1, Vec::len);
    let confidence = OwnedTensor::from_rows(&frame.confidence, classes)?;
    let coordinates = OwnedTensor::from_rows(&frame.coordinates, 4)?;
    RawPrediction::new(confidence, coordinates)
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    class_index: usize,
    label: Option<String>,
    score: f32,
    rect: [f32; 4],
}

#[derive(Debug, Serialize)]
struct FrameRecord {
    sequence: Option<u64>,
    detections: Vec<DetectionRecord>,
    created: usize,
    merged: usize,
    frozen: usize,
    stale: bool,
    missed_hits: usize,
    unknown_classes: usize,
}

impl FrameRecord {
    fn new(report: FrameReport, pipeline: &FramePipeline) -> Self {
        let detections = report
            .detections
            .iter()
            .map(|det: &Detection| DetectionRecord {
                class_index: det.class_index,
                label: pipeline.label_for(det.class_index).map(str::to_owned),
                score: det.score,
                rect: [det.rect.x, det.rect.y, det.rect.width, det.rect.height],
            })
            .collect();
        Self {
            sequence: report.sequence,
            detections,
            created: report.outcome.created,
            merged: report.outcome.merged,
            frozen: report.outcome.frozen,
            stale: report.outcome.stale,
            missed_hits: report.missed_hits,
            unknown_classes: report.unknown_classes,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnchorRecord {
    id: u64,
    label: String,
    position: [f32; 3],
}

impl From<LabelAnchor> for AnchorRecord {
    fn from(value: LabelAnchor) -> Self {
        Self {
            id: value.id,
            label: value.label,
            position: [value.position.x, value.position.y, value.position.z],
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    frames: Vec<FrameRecord>,
    anchors: Vec<AnchorRecord>,
    announcements: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("arlabel=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.labels.is_empty() {
        return Err("labels must be set in the config".into());
    }

    let decoder = Decoder::new(DecoderConfig {
        confidence_threshold: config.decoder.confidence_threshold,
        iou_threshold: config.decoder.iou_threshold,
        max_boxes: config.decoder.max_boxes,
        suppression: config.decoder.suppression.into(),
        parallel: config.decoder.parallel,
    })?;
    let projection = ViewProjection {
        view_width: config.projection.view_width,
        view_height: config.projection.view_height,
        image_long: config.projection.image_long,
        image_short: config.projection.image_short,
        input_size: config.projection.input_size,
        mode: config.projection.mode.into(),
        scale_fit_x_bias: config.projection.scale_fit_x_bias,
    };
    let pipeline = FramePipeline::new(decoder, projection, config.labels)?;
    pipeline.set_update_position(config.update_position);

    let anchors = SharedAnchorSet::new(AggregatorConfig {
        recombining_threshold: config.aggregator.recombining_threshold,
        label_match: config.aggregator.label_match.into(),
        discard_stale_frames: config.aggregator.discard_stale_frames,
    })?;
    let pool = FramePool::new(config.inflight_slots, |_| None::<RawPrediction>)?;
    let ground = &config.ground;

    let mut reports: Vec<FrameReport> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(config.frames.len());
        for frame in &config.frames {
            let mut slot = pool.acquire();
            *slot = match raw_prediction(frame) {
                Ok(raw) => Some(raw),
                Err(err) => {
                    tracing::warn!(sequence = slot.sequence(), error = %err, "dropping malformed frame");
                    None
                }
            };
            let pipeline = &pipeline;
            let anchors = &anchors;
            handles.push(
                scope.spawn(move || pipeline.process(&ReplayModel, &slot, ground, anchors)),
            );
        }
        handles
            .into_iter()
            .enumerate()
            .filter_map(|(frame, handle)| match handle.join() {
                Ok(report) => Some(report),
                Err(_) => {
                    tracing::warn!(frame, "frame worker panicked, report dropped");
                    None
                }
            })
            .collect()
    });
    reports.sort_by_key(|report| report.sequence);

    let announcements = config
        .query
        .map(|query| {
            let [x, y, z] = query.origin;
            anchors
                .announce(Point3::new(x, y, z), query.range)
                .into_iter()
                .map(|a| a.to_string())
                .collect()
        })
        .unwrap_or_default();

    let output = Output {
        frames: reports
            .into_iter()
            .map(|report| FrameRecord::new(report, &pipeline))
            .collect(),
        anchors: anchors.snapshot().into_iter().map(AnchorRecord::from).collect(),
        announcements,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
