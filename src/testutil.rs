//! Small in-memory fixtures shared by the module tests.

use crate::config::{AppConfig, InputConfig};
use crate::data::SourceData;
use crate::types::{GemeindeFeature, Municipality, RecordSet};
use geo::{polygon, MultiPolygon};
use std::collections::HashMap;
use std::path::PathBuf;

pub fn input(geojson: PathBuf, data_csv: PathBuf) -> InputConfig {
    InputConfig {
        geojson,
        data_csv,
        join_column_shape: "AGS".to_string(),
        name_column_shape: "GEN".to_string(),
        join_column_csv: "AGS".to_string(),
        name_column_csv: "GEN".to_string(),
    }
}

pub fn config() -> AppConfig {
    AppConfig::from_toml(
        r#"
        [input]
        geojson = "gemeinde.geo.json"
        data_csv = "gemeinde_data.csv"
        "#,
    )
    .unwrap()
}

pub fn record(ags: &str, name: &str, question_01: &str) -> Municipality {
    Municipality {
        ags: ags.to_string(),
        name: name.to_string(),
        values: HashMap::from([("question_01".to_string(), question_01.to_string())]),
    }
}

/// Unit square with its lower-left corner at `(x, y)`.
pub fn square(ags: &str, name: &str, x: f64, y: f64) -> GemeindeFeature {
    let poly = polygon![
        (x: x, y: y),
        (x: x + 1.0, y: y),
        (x: x + 1.0, y: y + 1.0),
        (x: x, y: y + 1.0),
        (x: x, y: y),
    ];
    let mut properties = serde_json::Map::new();
    properties.insert("AGS".to_string(), ags.into());
    properties.insert("GEN".to_string(), name.into());

    GemeindeFeature {
        ags: ags.to_string(),
        name: name.to_string(),
        feature: geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&poly))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        },
        geometry: MultiPolygon::new(vec![poly]),
    }
}

/// Three municipalities in state prefix 0100 and one in 0900.
pub fn sources() -> SourceData {
    SourceData {
        features: Some(vec![
            square("01001", "Flensburg", 9.0, 54.0),
            square("01002", "Kiel", 10.0, 54.0),
            square("01003", "Lübeck", 11.0, 54.0),
            square("09162", "München", 11.0, 48.0),
        ]),
        records: Some(RecordSet::new(vec![
            record("01001", "Flensburg", "10"),
            record("01002", "Kiel", "30"),
            record("01003", "Lübeck", "n/a"),
            record("09162", "München", "50"),
        ])),
    }
}
