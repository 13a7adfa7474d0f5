//! Tests for Rectangle.

use wms_common::Rectangle;

#[test]
fn test_validity() {
    assert!(Rectangle::new(0.0, 0.0, 1.0, 1.0).is_valid());
    assert!(Rectangle::WORLD.is_valid());
    assert!(!Rectangle::new(10.0, 10.0, 5.0, 5.0).is_valid());
    assert!(!Rectangle::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
    assert!(!Rectangle::new(0.0, 0.0, f64::INFINITY, 1.0).is_valid());
}

#[test]
fn test_serializes_with_edge_names() {
    let rect = Rectangle::new(1.0, 2.0, 3.0, 4.0);
    let json = serde_json::to_value(rect).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"west": 1.0, "south": 2.0, "east": 3.0, "north": 4.0})
    );
    let back: Rectangle = serde_json::from_value(json).unwrap();
    assert_eq!(back, rect);
}
