// Layer files in, estimates table out.

mod common;

use areal::{interpolate, Estimates, FeatureId, Layer, OverlayConfig};
use common::assert_close;

const PRECINCTS: &str = r#"{
    "type": "FeatureCollection",
    "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::26915" } },
    "features": [
        { "type": "Feature", "properties": { "PRECINCT": "01", "DEM": 300, "REP": 100 },
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[200,0],[200,100],[0,100],[0,0]]] } },
        { "type": "Feature", "properties": { "PRECINCT": "02", "DEM": 50, "REP": 150 },
          "geometry": { "type": "Polygon", "coordinates": [[[200,0],[400,0],[400,100],[200,100],[200,0]]] } }
    ]
}"#;

const WARDS: &str = r#"{
    "type": "FeatureCollection",
    "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::26915" } },
    "features": [
        { "type": "Feature", "properties": { "WARD": "W1" },
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[100,0],[100,100],[0,100],[0,0]]] } },
        { "type": "Feature", "properties": { "WARD": "W2" },
          "geometry": { "type": "Polygon", "coordinates": [[[100,0],[300,0],[300,100],[100,100],[100,0]]] } }
    ]
}"#;

#[test]
fn geojson_layers_to_estimates_csv() {
    let dir = tempfile::tempdir().unwrap();
    let precincts_path = dir.path().join("precincts.geojson");
    let wards_path = dir.path().join("wards.geojson");
    std::fs::write(&precincts_path, PRECINCTS).unwrap();
    std::fs::write(&wards_path, WARDS).unwrap();

    let precincts = Layer::read_geojson(&precincts_path, Some("PRECINCT"), None).unwrap();
    let wards = Layer::read_geojson(&wards_path, Some("WARD"), None).unwrap();
    assert_eq!(precincts.ids()[0], FeatureId::new("01"));

    let attrs = vec!["DEM".to_string(), "REP".to_string()];
    let est = interpolate(&precincts, &wards, &attrs, &OverlayConfig::default()).unwrap()
        .with_share("dem_share", "DEM", &["DEM", "REP"]).unwrap();

    // W2 is half in each precinct: 300*0.5 + 50*0.5 DEM, 100*0.5 + 150*0.5 REP.
    assert_close(est.get(&FeatureId::new("W2"), "DEM").unwrap().unwrap(), 175.0, 1e-9);
    assert_close(est.get(&FeatureId::new("W2"), "REP").unwrap().unwrap(), 125.0, 1e-9);
    assert_close(est.get(&FeatureId::new("W1"), "dem_share").unwrap().unwrap(), 0.75, 1e-12);

    let out = dir.path().join("wards.csv");
    est.write_csv(&out, "WARD").unwrap();
    let back = Estimates::read_csv(&out, "WARD").unwrap();
    assert_eq!(back.ids(), est.ids());
    assert_eq!(back.columns(), &["DEM", "REP", "dem_share"]);
}

#[test]
fn csv_attributes_join_onto_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let wards_path = dir.path().join("wards.geojson");
    let csv_path = dir.path().join("turnout.csv");
    std::fs::write(&wards_path, WARDS).unwrap();
    std::fs::write(&csv_path, "WARD,voters\nW2,900\nW1,400\n").unwrap();

    let wards = Layer::read_geojson(&wards_path, Some("WARD"), None).unwrap()
        .join_csv(&csv_path, "WARD").unwrap();
    assert_eq!(wards.attribute("voters").unwrap(), vec![400.0, 900.0]);
}

#[test]
fn points_join_to_wards() {
    let wards = Layer::from_geojson_bytes(WARDS.as_bytes(), Some("WARD"), None).unwrap();
    let points = [geo::Point::new(50.0, 50.0), geo::Point::new(250.0, 10.0), geo::Point::new(500.0, 50.0)];
    let w1 = FeatureId::new("W1");
    let w2 = FeatureId::new("W2");
    assert_eq!(wards.locate(&points), vec![Some(&w1), Some(&w2), None]);
}
