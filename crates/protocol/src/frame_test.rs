//! Tests for typed frames

use super::frame::*;
use super::ProtocolError;

fn two_channel_frame() -> AnalogFrame {
    AnalogFrame::new(
        vec![1.0, 2.0, 3.0, 4.0, 5.0],
        vec![Span::new("a", 0, 3), Span::new("b", 3, 5)],
        vec![1_000_000, 2_000_000],
        ChannelType::Voltage,
        42,
    )
    .unwrap()
}

// ============================================================================
// Analog invariants
// ============================================================================

#[test]
fn test_analog_accessors() {
    let frame = two_channel_frame();
    assert_eq!(frame.num_channels(), 2);
    assert_eq!(frame.channel_data(0).unwrap(), &[1.0, 2.0, 3.0]);
    assert_eq!(frame.channel_data(1).unwrap(), &[4.0, 5.0]);
    assert_eq!(frame.channel_by_name("b").unwrap(), &[4.0, 5.0]);
    assert!(frame.channel_by_name("c").is_none());
    assert_eq!(frame.time_ns(), 42);
}

#[test]
fn test_analog_rejects_uncovered_samples() {
    let err = AnalogFrame::new(
        vec![1.0, 2.0, 3.0],
        vec![Span::new("a", 0, 2)],
        vec![1_000_000],
        ChannelType::Voltage,
        0,
    )
    .unwrap_err();
    assert!(matches!(err, ProtocolError::SpanMismatch { covered: 2, len: 3 }));
}

#[test]
fn test_analog_rejects_interval_count_mismatch() {
    let err = AnalogFrame::new(
        vec![1.0, 2.0],
        vec![Span::new("a", 0, 2)],
        vec![1_000_000, 2_000_000],
        ChannelType::Voltage,
        0,
    )
    .unwrap_err();
    assert!(matches!(err, ProtocolError::IntervalMismatch { .. }));
}

#[test]
fn test_analog_rejects_out_of_bounds_span() {
    let err = AnalogFrame::new(
        vec![1.0, 2.0],
        vec![Span::new("a", 0, 5)],
        vec![1_000_000],
        ChannelType::Voltage,
        0,
    )
    .unwrap_err();
    assert!(matches!(err, ProtocolError::SpanOutOfBounds { .. }));
}

#[test]
fn test_single_channel_constructor() {
    let frame = AnalogFrame::single_channel("x", vec![0.5, 1.5], 500_000, 7);
    assert_eq!(frame.spans(), &[Span::new("x", 0, 2)]);
    assert_eq!(frame.sample_intervals(), &[500_000]);
    assert_eq!(frame.channel_by_name("x").unwrap(), &[0.5, 1.5]);
}

#[test]
fn test_layout_only_is_empty_but_keeps_names() {
    let meta = two_channel_frame().layout_only();
    assert!(meta.data().is_empty());
    assert_eq!(meta.spans().len(), 2);
    assert_eq!(meta.spans()[0].name, "a");
    assert_eq!(meta.spans()[1].name, "b");
    assert_eq!(meta.sample_intervals(), &[1_000_000, 2_000_000]);
    // Still a valid frame: zero-length spans cover the empty buffer.
    assert!(meta.spans().iter().all(|s| s.is_empty()));
}

#[test]
fn test_same_layout() {
    let a = two_channel_frame();
    let b = two_channel_frame();
    assert!(a.same_layout(&b));

    let c = AnalogFrame::new(
        vec![0.0; 5],
        vec![Span::new("a", 0, 3), Span::new("c", 3, 5)],
        vec![1_000_000, 2_000_000],
        ChannelType::Voltage,
        0,
    )
    .unwrap();
    assert!(!a.same_layout(&c));
}

// ============================================================================
// Motion segments
// ============================================================================

#[test]
fn test_segment_id_bounds() {
    let mut segment = Segment {
        id: 1,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        q0: 1.0,
        q1: 0.0,
        q2: 0.0,
        q3: 0.0,
    };
    assert!(segment.validate().is_ok());

    segment.id = 0;
    assert!(segment.validate().is_err());

    segment.id = SEGMENT_ID_MAX + 1;
    assert!(segment.validate().is_err());
}

#[test]
fn test_segment_names() {
    assert_eq!(segment_name(1), "pelvis");
    assert_eq!(segment_name(7), "head");
    assert_eq!(segment_name(0), "");
    assert_eq!(segment_name(63), "");
}
