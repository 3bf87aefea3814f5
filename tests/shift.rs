// Attribute shift between two estimate tables keyed by the same target ids.

mod common;

use areal::{attribute_shift, Estimates, FeatureId};
use common::assert_close;

fn shares(values: &[(&str, f64)]) -> Estimates {
    Estimates::new(
        values.iter().map(|(id, _)| FeatureId::new(id)).collect(),
        vec!["share".to_string()],
        vec![values.iter().map(|(_, v)| *v).collect()],
    ).unwrap()
}

#[test]
fn shift_between_two_elections() {
    let a = shares(&[("A", 0.5), ("B", 0.6), ("C", 0.4)]);
    let b = shares(&[("A", 0.45), ("B", 0.6), ("C", 0.5)]);

    let shifts = attribute_shift(&a, &b, "share").unwrap();
    let expected = [("A", 0.05), ("B", 0.0), ("C", -0.1)];
    assert_eq!(shifts.len(), 3);
    for (shift, (id, value)) in shifts.iter().zip(expected) {
        assert_eq!(shift.id.as_str(), id);
        assert_close(shift.value.unwrap(), value, 1e-12);
    }
}

#[test]
fn shift_is_antisymmetric() {
    let a = shares(&[("A", 0.31), ("B", 0.77), ("D", 0.5)]);
    let b = shares(&[("A", 0.42), ("B", 0.13), ("C", 0.9)]);

    let ab = attribute_shift(&a, &b, "share").unwrap();
    let ba = attribute_shift(&b, &a, "share").unwrap();
    assert_eq!(ab.len(), ba.len());
    for (x, y) in ab.iter().zip(&ba) {
        assert_eq!(x.id, y.id);
        match (x.value, y.value) {
            (Some(p), Some(q)) => assert_eq!(p, -q),
            (None, None) => {}
            other => panic!("one-sided value for {}: {other:?}", x.id),
        }
    }
}

#[test]
fn shift_csv_keeps_missing_as_empty() {
    let a = shares(&[("A", 0.5), ("B", 0.6)]);
    let b = shares(&[("A", 0.25)]);
    let shifts = attribute_shift(&a, &b, "share").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shift.csv");
    areal::write_shifts_csv(&shifts, &path, "ward", "share_shift").unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "ward,share_shift");
    assert_eq!(lines[1], "A,0.25");
    assert_eq!(lines[2], "B,");
}
