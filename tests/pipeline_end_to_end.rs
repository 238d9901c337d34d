use arlabel::{
    AggregatorConfig, ArLabelError, ArLabelResult, Decoder, DecoderConfig, FramePipeline,
    FramePool, InferenceModel, OwnedTensor, Point3, RawPrediction, ScreenPoint, SharedAnchorSet,
    ViewProjection,
};

/// Stand-in network: the input buffer holds the tensors it should "predict".
struct EchoModel;

impl InferenceModel for EchoModel {
    type Input = Option<RawPrediction>;

    fn infer(&self, input: &Option<RawPrediction>) -> ArLabelResult<RawPrediction> {
        input
            .clone()
            .ok_or_else(|| ArLabelError::InferenceUnavailable("empty buffer".into()))
    }
}

fn frame(rows: &[([f32; 3], [f32; 4])]) -> RawPrediction {
    let conf: Vec<[f32; 3]> = rows.iter().map(|(c, _)| *c).collect();
    let coords: Vec<[f32; 4]> = rows.iter().map(|(_, b)| *b).collect();
    RawPrediction::new(
        OwnedTensor::from_rows(&conf, 3).unwrap(),
        OwnedTensor::from_rows(&coords, 4).unwrap(),
    )
    .unwrap()
}

/// Floor one meter below the camera; view rows above 100 see sky.
fn floor(point: ScreenPoint) -> Option<Point3> {
    (point.y >= 100.0).then(|| Point3::new(point.x / 100.0, -1.0, -point.y / 100.0))
}

fn pipeline() -> FramePipeline {
    FramePipeline::new(
        Decoder::new(DecoderConfig::default()).unwrap(),
        ViewProjection::new(400.0, 400.0, 400, 400).unwrap(),
        vec!["person".into(), "chair".into(), "cup".into()],
    )
    .unwrap()
}

#[test]
fn repeated_sightings_converge_to_one_anchor() {
    let pipe = pipeline();
    let anchors = SharedAnchorSet::new(AggregatorConfig::default()).unwrap();
    let pool = FramePool::new(3, |_| None).unwrap();

    // A chair drifting a few centimeters between frames, plus a cup in the sky.
    for (i, dx) in [0.0f32, 0.01, 0.02].into_iter().enumerate() {
        let mut slot = pool.acquire();
        *slot = Some(frame(&[
            ([0.1, 0.9, 0.0], [0.5 + dx, 0.5, 0.2, 0.1]),
            ([0.0, 0.1, 0.8], [0.5, 0.05, 0.05, 0.05]),
        ]));
        let report = pipe.process(&EchoModel, &slot, &floor, &anchors);
        assert_eq!(report.sequence, Some(i as u64));
        assert_eq!(report.detections.len(), 2);
        assert_eq!(report.missed_hits, 1);
        if i == 0 {
            assert_eq!(report.outcome.created, 1);
        } else {
            assert_eq!(report.outcome.merged, 1);
        }
    }

    let snapshot = anchors.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].class_name, "chair");
    assert_eq!(snapshot[0].label, "chair: 90.0%");
}

#[test]
fn frozen_mode_keeps_first_position() {
    let pipe = pipeline();
    pipe.set_update_position(false);
    assert!(!pipe.update_position());
    let anchors = SharedAnchorSet::new(AggregatorConfig::default()).unwrap();
    let pool = FramePool::new(1, |_| None).unwrap();

    for dx in [0.0f32, 0.03] {
        let mut slot = pool.acquire();
        *slot = Some(frame(&[([0.0, 0.0, 0.7], [0.4 + dx, 0.6, 0.1, 0.1])]));
        pipe.process(&EchoModel, &slot, &floor, &anchors);
    }

    let snapshot = anchors.snapshot();
    assert_eq!(snapshot.len(), 1);
    let first = floor(pipe.projection().anchor_point(
        &arlabel::Rect::new(0.4, 0.6, 0.1, 0.1).unwrap(),
    ))
    .unwrap();
    assert_eq!(snapshot[0].position, first);
}

#[test]
fn failed_inference_places_nothing() {
    let pipe = pipeline();
    let anchors = SharedAnchorSet::new(AggregatorConfig::default()).unwrap();
    let pool = FramePool::new(1, |_| None).unwrap();
    let slot = pool.acquire();
    let report = pipe.process(&EchoModel, &slot, &floor, &anchors);
    assert!(report.detections.is_empty());
    assert!(anchors.is_empty());
}

#[test]
fn nearby_query_announces_placed_objects() {
    let pipe = pipeline();
    let anchors = SharedAnchorSet::new(AggregatorConfig::default()).unwrap();
    let raw = frame(&[([0.95, 0.0, 0.0], [0.5, 0.5, 0.1, 0.1])]);
    let detections = pipe
        .decoder()
        .decode(raw.confidence().view(), raw.coordinates().view())
        .unwrap();
    pipe.place_detections(None, detections, &floor, &anchors);

    // Anchor sits at the projected floor point; listen from right above it.
    let anchor = anchors.snapshot()[0].position;
    let origin = Point3::new(anchor.x, anchor.y + 1.0, anchor.z);
    let spoken = anchors.announce(origin, arlabel::aggregate::DEFAULT_QUERY_RANGE);
    assert_eq!(spoken.len(), 1);
    assert_eq!(
        spoken[0].to_string(),
        "person: 95.0% accurate. Distance: 1.0 meters."
    );
}
