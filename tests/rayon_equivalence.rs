#![cfg(feature = "rayon")]

use arlabel::{Decoder, DecoderConfig, OwnedTensor, SuppressionMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_output(rng: &mut StdRng, rows: usize, classes: usize) -> (OwnedTensor, OwnedTensor) {
    let conf: Vec<f32> = (0..rows * classes)
        .map(|_| rng.random_range(0.0..1.0f32))
        .collect();
    let coords: Vec<f32> = (0..rows)
        .flat_map(|_| {
            [
                rng.random_range(0.0..1.0f32),
                rng.random_range(0.0..1.0f32),
                rng.random_range(0.0..0.3f32),
                rng.random_range(0.0..0.3f32),
            ]
        })
        .collect();
    (
        OwnedTensor::new(conf, rows, classes).unwrap(),
        OwnedTensor::new(coords, rows, 4).unwrap(),
    )
}

#[test]
fn parallel_scan_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(2024);
    for suppression in [SuppressionMode::CrossClass, SuppressionMode::PerClass] {
        let (conf, coords) = random_output(&mut rng, 2535, 80);
        let base = DecoderConfig {
            confidence_threshold: 0.9,
            max_boxes: 50,
            suppression,
            ..DecoderConfig::default()
        };
        let sequential = Decoder::new(base.clone()).unwrap();
        let parallel = Decoder::new(DecoderConfig {
            parallel: true,
            ..base
        })
        .unwrap();

        let seq = sequential.decode(conf.view(), coords.view()).unwrap();
        let par = parallel.decode(conf.view(), coords.view()).unwrap();
        assert!(!seq.is_empty());
        assert_eq!(seq, par);
    }
}
