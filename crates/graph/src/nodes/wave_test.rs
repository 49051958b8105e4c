//! Tests for wave generator parameters

use serde_json::json;

use thalamus_observable::ObservableCollection;

use super::wave::WaveParams;
use crate::error::GraphError;

fn config(fields: serde_json::Value) -> ObservableCollection {
    let root = ObservableCollection::map();
    root.merge(&fields).unwrap();
    root
}

#[test]
fn test_defaults() {
    let params = WaveParams::from_config(&config(json!({}))).unwrap();
    assert_eq!(params.sample_rate, 1000.0);
    assert_eq!(params.channel_count, 1);
    assert_eq!(params.interval_ns(), 1_000_000);
    assert_eq!(params.frequency, 1.0);
    assert_eq!(params.amplitude, 1.0);
    assert_eq!(params.offset, 0.0);
}

#[test]
fn test_sine_samples() {
    let params = WaveParams::from_config(&config(json!({
        "Frequency": 1.0,
        "Amplitude": 2.0,
        "Sample Rate": 4.0
    })))
    .unwrap();

    // One period at 4 Hz: 0, peak, 0, trough
    assert!(params.sample(0).abs() < 1e-9);
    assert!((params.sample(1) - 2.0).abs() < 1e-9);
    assert!(params.sample(2).abs() < 1e-6);
    assert!((params.sample(3) + 2.0).abs() < 1e-6);
}

#[test]
fn test_square_with_offset() {
    let params = WaveParams::from_config(&config(json!({
        "Frequency": 1.0,
        "Amplitude": 1.0,
        "Offset": 10.0,
        "Shape": "Square",
        "Sample Rate": 4.0
    })))
    .unwrap();

    assert_eq!(params.sample(1), 11.0);
    assert_eq!(params.sample(3), 9.0);
}

#[test]
fn test_invalid_sample_rate_rejected() {
    let err = WaveParams::from_config(&config(json!({"Sample Rate": 0.0}))).unwrap_err();
    assert!(matches!(err, GraphError::ConfigInvalid(_)));

    let err = WaveParams::from_config(&config(json!({"Sample Rate": -100.0}))).unwrap_err();
    assert!(matches!(err, GraphError::ConfigInvalid(_)));
}

#[test]
fn test_unknown_shape_rejected() {
    let err = WaveParams::from_config(&config(json!({"Shape": "Sawtooth"}))).unwrap_err();
    assert!(matches!(err, GraphError::ConfigInvalid(_)));
}
