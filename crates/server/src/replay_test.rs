//! Tests for replay record round trips

use thalamus_protocol::{AnalogFrame, MotionFrame, Segment};

use super::replay::*;

fn analog_record(node: &str, time_ns: u64, value: f64) -> ReplayRecord {
    ReplayRecord {
        node: node.to_string(),
        time_ns,
        payload: ReplayPayload::Analog(AnalogFrame::single_channel(
            "X",
            vec![value],
            1_000_000,
            time_ns,
        )),
    }
}

#[tokio::test]
async fn test_round_trip_preserves_order_and_content() {
    let records = vec![
        analog_record("wave", 100, 1.0),
        ReplayRecord {
            node: "mocap".into(),
            time_ns: 150,
            payload: ReplayPayload::Motion(MotionFrame {
                pose_name: "npose".into(),
                segments: vec![Segment {
                    id: 1,
                    x: 1.0,
                    y: 2.0,
                    z: 3.0,
                    q0: 1.0,
                    q1: 0.0,
                    q2: 0.0,
                    q3: 0.0,
                }],
                time_ns: 150,
            }),
        },
        analog_record("wave", 200, 2.0),
    ];

    let mut buffer = Vec::new();
    for record in &records {
        write_record(&mut buffer, record).await.unwrap();
    }

    let decoded = read_session(&mut buffer.as_slice()).await.unwrap();
    assert_eq!(decoded, records);
}

#[tokio::test]
async fn test_empty_session() {
    let decoded = read_session(&mut (&[] as &[u8])).await.unwrap();
    assert!(decoded.is_empty());
}

#[tokio::test]
async fn test_truncated_record_is_an_error() {
    let mut buffer = Vec::new();
    write_record(&mut buffer, &analog_record("wave", 100, 1.0))
        .await
        .unwrap();
    buffer.truncate(buffer.len() - 3);

    assert!(read_session(&mut buffer.as_slice()).await.is_err());
}

#[tokio::test]
async fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.tha");

    let records = vec![analog_record("a", 1, 0.5), analog_record("a", 2, 0.6)];
    {
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        for record in &records {
            write_record(&mut file, record).await.unwrap();
        }
    }

    let mut file = tokio::fs::File::open(&path).await.unwrap();
    let decoded = read_session(&mut file).await.unwrap();
    assert_eq!(decoded, records);
}
