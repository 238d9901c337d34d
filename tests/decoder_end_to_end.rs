use arlabel::{
    ArLabelError, ArLabelResult, Decoder, DecoderConfig, InferenceModel, OwnedTensor,
    RawPrediction, SuppressionMode, TensorView,
};

fn decoder(cfg: DecoderConfig) -> Decoder {
    Decoder::new(cfg).unwrap()
}

fn tensors(conf: &[&[f32]], coords: &[[f32; 4]]) -> (OwnedTensor, OwnedTensor) {
    let classes = conf[0].len();
    (
        OwnedTensor::from_rows(conf, classes).unwrap(),
        OwnedTensor::from_rows(coords, 4).unwrap(),
    )
}

#[test]
fn argmax_row_is_kept_with_its_class() {
    let (conf, coords) = tensors(&[&[0.1, 0.9, 0.2]], &[[0.2, 0.3, 0.1, 0.1]]);
    let dets = decoder(DecoderConfig::default())
        .decode(conf.view(), coords.view())
        .unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].class_index, 1);
    assert!((dets[0].score - 0.9).abs() < 1e-6);
    assert_eq!(dets[0].rect.x, 0.2);
    assert_eq!(dets[0].rect.height, 0.1);
}

#[test]
fn rows_below_threshold_are_dropped() {
    let (conf, coords) = tensors(
        &[&[0.1, 0.29, 0.2], &[0.3, 0.0, 0.0]],
        &[[0.0, 0.0, 0.1, 0.1], [0.5, 0.5, 0.1, 0.1]],
    );
    let dets = decoder(DecoderConfig::default())
        .decode(conf.view(), coords.view())
        .unwrap();
    // exactly at the threshold is kept
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].candidate, 1);
    assert_eq!(dets[0].class_index, 0);
}

#[test]
fn heavy_overlap_suppresses_lower_score() {
    let d = 1.0f32 / 9.0;
    let (conf, coords) = tensors(
        &[&[0.6, 0.0], &[0.95, 0.0]],
        &[[d, 0.0, 1.0, 1.0], [0.0, 0.0, 1.0, 1.0]],
    );
    let a = arlabel::Rect::new(0.0, 0.0, 1.0, 1.0).unwrap();
    let b = arlabel::Rect::new(d, 0.0, 1.0, 1.0).unwrap();
    assert!((a.iou(&b) - 0.8).abs() < 1e-5);

    let dets = decoder(DecoderConfig::default())
        .decode(conf.view(), coords.view())
        .unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].candidate, 1);
}

#[test]
fn cross_class_overlap_depends_on_suppression_mode() {
    let (conf, coords) = tensors(
        &[&[0.9, 0.1], &[0.1, 0.8]],
        &[[0.0, 0.0, 1.0, 1.0], [0.05, 0.0, 1.0, 1.0]],
    );
    let cross = decoder(DecoderConfig::default())
        .decode(conf.view(), coords.view())
        .unwrap();
    assert_eq!(cross.len(), 1);

    let per_class = decoder(DecoderConfig {
        suppression: SuppressionMode::PerClass,
        ..DecoderConfig::default()
    })
    .decode(conf.view(), coords.view())
    .unwrap();
    assert_eq!(per_class.len(), 2);
    assert_eq!(per_class[1].class_index, 1);
}

#[test]
fn output_is_capped_and_sorted() {
    let rows: Vec<Vec<f32>> = (0..20).map(|i| vec![0.3 + i as f32 * 0.03]).collect();
    let boxes: Vec<[f32; 4]> = (0..20).map(|i| [i as f32 * 2.0, 0.0, 1.0, 1.0]).collect();
    let conf = OwnedTensor::from_rows(&rows, 1).unwrap();
    let coords = OwnedTensor::from_rows(&boxes, 4).unwrap();
    let dets = decoder(DecoderConfig::default())
        .decode(conf.view(), coords.view())
        .unwrap();
    assert_eq!(dets.len(), arlabel::decode::MAX_BOUNDING_BOXES);
    assert!(dets.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(dets[0].candidate, 19);
}

#[test]
fn padded_tensors_decode_like_contiguous_ones() {
    // stride 3 with one padding column after two classes
    let conf_data = [0.1f32, 0.7, 99.0, 0.8, 0.2, 99.0];
    let coord_data = [0.0f32, 0.0, 0.1, 0.1, 0.5, 0.5, 0.1, 0.1];
    let conf = TensorView::new(&conf_data, 2, 2, 3).unwrap();
    let coords = TensorView::from_slice(&coord_data, 2, 4).unwrap();
    let dets = decoder(DecoderConfig::default())
        .decode(conf, coords)
        .unwrap();
    assert_eq!(dets.len(), 2);
    assert_eq!((dets[0].candidate, dets[0].class_index), (1, 0));
    assert_eq!((dets[1].candidate, dets[1].class_index), (0, 1));
}

#[test]
fn zero_candidates_decode_to_nothing() {
    let conf = TensorView::<f32>::from_slice(&[], 0, 80).unwrap();
    let coords = TensorView::<f32>::from_slice(&[], 0, 4).unwrap();
    let dets = decoder(DecoderConfig::default())
        .decode(conf, coords)
        .unwrap();
    assert!(dets.is_empty());
}

#[test]
fn mismatched_tensors_are_rejected_by_decode() {
    let (conf, _) = tensors(&[&[0.9]], &[[0.0; 4]]);
    let coords = OwnedTensor::new(vec![0.0; 3], 1, 3).unwrap();
    let err = decoder(DecoderConfig::default())
        .decode(conf.view(), coords.view())
        .err()
        .unwrap();
    assert_eq!(err, ArLabelError::InvalidCoordinateWidth { cols: 3 });
}

struct FixedModel {
    output: ArLabelResult<RawPrediction>,
}

impl InferenceModel for FixedModel {
    type Input = ();

    fn infer(&self, _input: &()) -> ArLabelResult<RawPrediction> {
        self.output.clone()
    }
}

#[test]
fn predict_decodes_successful_inference() {
    let (conf, coords) = tensors(&[&[0.2, 0.6]], &[[0.1, 0.1, 0.2, 0.2]]);
    let model = FixedModel {
        output: RawPrediction::new(conf, coords),
    };
    let dets = decoder(DecoderConfig::default()).predict(&model, &());
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].class_index, 1);
}

#[test]
fn predict_swallows_inference_failure() {
    let model = FixedModel {
        output: Err(ArLabelError::InferenceUnavailable("model not loaded".into())),
    };
    assert!(decoder(DecoderConfig::default())
        .predict(&model, &())
        .is_empty());
}
