//! Tests for analog pass-through channel selection

use thalamus_protocol::{AnalogFrame, ChannelType, Span};

use super::analog::select_channels;

fn two_channel() -> AnalogFrame {
    AnalogFrame::new(
        vec![1.0, 2.0, 10.0, 20.0, 30.0],
        vec![Span::new("a", 0, 2), Span::new("b", 2, 5)],
        vec![1_000_000, 2_000_000],
        ChannelType::Voltage,
        7,
    )
    .unwrap()
}

#[test]
fn test_empty_selection_keeps_everything() {
    let frame = two_channel();
    let selected = select_channels(&frame, &[]).unwrap();
    assert_eq!(selected, frame);
}

#[test]
fn test_selection_keeps_named_channel_only() {
    let frame = two_channel();
    let selected = select_channels(&frame, &["b".to_string()]).unwrap();

    assert_eq!(selected.num_channels(), 1);
    assert_eq!(selected.channel_by_name("b").unwrap(), &[10.0, 20.0, 30.0]);
    assert_eq!(selected.sample_intervals(), &[2_000_000]);
    assert_eq!(selected.time_ns(), 7);
    assert!(selected.channel_by_name("a").is_none());
}

#[test]
fn test_selection_with_no_match_yields_nothing() {
    let frame = two_channel();
    assert!(select_channels(&frame, &["zzz".to_string()]).is_none());
}

#[test]
fn test_rename_rules_rewrite_span_names() {
    use super::analog::rename_channels;

    let frame = two_channel();
    let rules = vec![("a".to_string(), "Eye X".to_string())];
    let renamed = rename_channels(frame, &rules).unwrap();

    assert_eq!(renamed.channel_by_name("Eye X").unwrap(), &[1.0, 2.0]);
    assert!(renamed.channel_by_name("a").is_none());
    assert_eq!(renamed.channel_by_name("b").unwrap(), &[10.0, 20.0, 30.0]);
}
