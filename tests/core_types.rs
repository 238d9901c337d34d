use arlabel::{
    AggregatorConfig, AnchorSet, ArLabelError, Decoder, DecoderConfig, FramePool, OwnedTensor,
    ProcessingMode, RawPrediction, Rect, TensorView, ViewProjection,
};

#[test]
fn tensor_view_rejects_zero_columns() {
    let data = [0.0f32; 4];
    let err = TensorView::from_slice(&data, 4, 0).err().unwrap();
    assert_eq!(err, ArLabelError::InvalidDimensions { rows: 4, cols: 0 });
}

#[test]
fn tensor_view_rejects_invalid_stride() {
    let data = [0.0f32; 8];
    let err = TensorView::new(&data, 2, 4, 3).err().unwrap();
    assert_eq!(err, ArLabelError::InvalidStride { cols: 4, stride: 3 });
}

#[test]
fn tensor_view_rejects_small_buffer() {
    let data = [0.0f32; 7];
    let err = TensorView::from_slice(&data, 2, 4).err().unwrap();
    assert_eq!(err, ArLabelError::BufferTooSmall { needed: 8, got: 7 });
}

#[test]
fn owned_tensor_requires_exact_length() {
    let err = OwnedTensor::new(vec![0.0; 9], 2, 4).err().unwrap();
    assert_eq!(err, ArLabelError::LengthMismatch { expected: 8, got: 9 });
    let err = OwnedTensor::new(vec![0.0; 7], 2, 4).err().unwrap();
    assert_eq!(err, ArLabelError::LengthMismatch { expected: 8, got: 7 });
    let tensor = OwnedTensor::new(vec![0.0; 8], 2, 4).unwrap();
    assert_eq!(tensor.view().row(1).unwrap().len(), 4);
}

#[test]
fn raw_prediction_rejects_row_mismatch() {
    let conf = OwnedTensor::new(vec![0.5; 6], 3, 2).unwrap();
    let coords = OwnedTensor::new(vec![0.1; 8], 2, 4).unwrap();
    let err = RawPrediction::new(conf, coords).err().unwrap();
    assert_eq!(
        err,
        ArLabelError::ShapeMismatch {
            confidence_rows: 3,
            coordinate_rows: 2,
        }
    );
}

#[test]
fn decoder_rejects_thresholds_outside_unit_interval() {
    for (confidence_threshold, iou_threshold) in [(-0.1, 0.5), (0.3, 1.01), (0.3, -0.5)] {
        let cfg = DecoderConfig {
            confidence_threshold,
            iou_threshold,
            ..DecoderConfig::default()
        };
        let err = Decoder::new(cfg).err().unwrap();
        assert!(matches!(err, ArLabelError::InvalidThreshold { .. }));
    }
    let edge = DecoderConfig {
        confidence_threshold: 0.0,
        iou_threshold: 1.0,
        ..DecoderConfig::default()
    };
    assert!(Decoder::new(edge).is_ok());
}

#[test]
fn aggregator_rejects_non_finite_threshold() {
    let cfg = AggregatorConfig {
        recombining_threshold: f64::INFINITY,
        ..AggregatorConfig::default()
    };
    assert!(matches!(
        AnchorSet::new(cfg).err().unwrap(),
        ArLabelError::InvalidParameter(_)
    ));
}

#[test]
fn rect_rejects_negative_dimensions() {
    let err = Rect::new(0.0, 0.0, 1.0, -0.5).err().unwrap();
    assert_eq!(
        err,
        ArLabelError::NegativeExtent {
            width: 1.0,
            height: -0.5,
        }
    );
}

#[test]
fn projection_rejects_degenerate_view() {
    assert!(ViewProjection::new(0.0, 812.0, 1920, 1440).is_err());
    assert!(ViewProjection::new(375.0, 812.0, 0, 1440).is_err());
    let proj = ViewProjection::new(375.0, 812.0, 1920, 1440).unwrap();
    assert!(proj.with_mode(ProcessingMode::Crop).is_ok());
}

#[test]
fn frame_pool_requires_a_slot() {
    let err = FramePool::new(0, |_| 0u8).err().unwrap();
    assert!(matches!(err, ArLabelError::InvalidParameter(_)));
}

#[test]
fn errors_render_readable_messages() {
    let err = ArLabelError::InvalidThreshold {
        name: "iou_threshold",
        value: 2.0,
    };
    assert_eq!(err.to_string(), "threshold iou_threshold = 2 is outside [0, 1]");
}
