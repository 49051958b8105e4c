//! Tests for address parsing and formatting

use super::address::*;

#[test]
fn test_display_round_trip() {
    let address = Address(vec![
        Key::Field("nodes".into()),
        Key::Index(0),
        Key::Field("Running".into()),
    ]);
    let text = address.to_string();
    assert_eq!(text, "['nodes'][0]['Running']");
    assert_eq!(Address::parse(&text).unwrap(), address);
}

#[test]
fn test_root_is_empty() {
    assert!(Address::root().is_root());
    assert_eq!(Address::parse("").unwrap(), Address::root());
    assert_eq!(Address::root().to_string(), "");
}

#[test]
fn test_child_extends() {
    let address = Address::root()
        .child(Key::Field("nodes".into()))
        .child(Key::Index(3));
    assert_eq!(address.to_string(), "['nodes'][3]");
}

#[test]
fn test_parse_rejects_malformed() {
    assert!(Address::parse("nodes").is_err());
    assert!(Address::parse("['nodes'").is_err());
    assert!(Address::parse("[nodes]").is_err());
    assert!(Address::parse("[-1]").is_err());
}
