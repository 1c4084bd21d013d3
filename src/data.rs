use crate::config::{AppConfig, InputConfig};
use crate::types::{GemeindeFeature, Municipality, RecordSet};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tokio::task::JoinError;
use tracing::{info, warn};

const AGS_WIDTH: usize = 5;

/// Both halves of the input, each absent when its load failed.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub features: Option<Vec<GemeindeFeature>>,
    pub records: Option<RecordSet>,
}

/// Left-pads a municipality code with zeros to five characters.
pub fn normalize_ags(raw: &str) -> String {
    format!("{:0>width$}", raw.trim(), width = AGS_WIDTH)
}

/// Loads the geometry and the CSV concurrently. Either side failing just leaves it unset.
pub async fn load_sources(config: &AppConfig) -> SourceData {
    let geo_input = config.input.clone();
    let csv_input = config.input.clone();

    let features = tokio::task::spawn_blocking(move || load_features(&geo_input.geojson, &geo_input));
    let records = tokio::task::spawn_blocking(move || load_records(&csv_input.data_csv, &csv_input));
    let (features, records) = tokio::join!(features, records);

    SourceData {
        features: settle("geometry", features),
        records: settle("CSV data", records),
    }
}

fn settle<T>(what: &str, joined: std::result::Result<Result<T>, JoinError>) -> Option<T> {
    match joined {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("Loading {} failed, continuing without it: {:#}", what, e);
            None
        }
        Err(e) => {
            warn!("Loader task for {} did not finish: {}", what, e);
            None
        }
    }
}

pub fn load_records(path: &Path, input: &InputConfig) -> Result<RecordSet> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let records = parse_records(file, input)?;
    info!("Loaded CSV data for {} municipalities", records.len());
    Ok(records)
}

pub fn parse_records<R: Read>(reader: R, input: &InputConfig) -> Result<RecordSet> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let join_col_idx = headers.iter().position(|h| h == input.join_column_csv)
        .ok_or_else(|| anyhow!("Join column '{}' not found in CSV", input.join_column_csv))?;
    let name_col_idx = headers.iter().position(|h| h == input.name_column_csv);

    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let raw_id = record.get(join_col_idx).unwrap_or("").trim();

        if raw_id.is_empty() { continue; }

        let name = name_col_idx
            .and_then(|idx| record.get(idx))
            .unwrap_or("")
            .to_string();

        let values: HashMap<String, String> = headers.iter().enumerate()
            .filter(|(i, _)| *i != join_col_idx && Some(*i) != name_col_idx)
            .filter_map(|(i, h)| record.get(i).map(|v| (h.to_string(), v.to_string())))
            .collect();

        rows.push(Municipality {
            ags: normalize_ags(raw_id),
            name,
            values,
        });
    }

    Ok(RecordSet::new(rows))
}

pub fn load_features(path: &Path, input: &InputConfig) -> Result<Vec<GemeindeFeature>> {
    info!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let features = parse_features(BufReader::new(file), input)?;
    info!("Loaded {} municipality polygons", features.len());
    Ok(features)
}

pub fn parse_features<R: Read>(reader: R, input: &InputConfig) -> Result<Vec<GemeindeFeature>> {
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();

    for feature in collection.features {
        let Some(ags) = property_text(&feature, &input.join_column_shape) else {
            continue;
        };
        let name = property_text(&feature, &input.name_column_shape).unwrap_or_default();

        let geometry = match &feature.geometry {
            Some(geom) => {
                let valid_geo: geo::Geometry<f64> = geom.value.clone().try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry of {}: {:?}", ags, e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        features.push(GemeindeFeature {
            ags: normalize_ags(&ags),
            name,
            geometry,
            feature,
        });
    }

    Ok(features)
}

fn property_text(feature: &geojson::Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use crate::testutil::input;
    use std::path::PathBuf;

    const CSV: &str = "AGS,GEN,question_01,question_02\n\
                       1001,Flensburg,10,3\n\
                       01002,Kiel,20,\n\
                       ,Nowhere,5,5\n\
                       123456,Long,1,1\n";

    const GEOJSON: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature",
         "properties": {"AGS": "01001", "GEN": "Flensburg"},
         "geometry": {"type": "Polygon", "coordinates": [[[9.0,54.0],[10.0,54.0],[10.0,55.0],[9.0,55.0],[9.0,54.0]]]}},
        {"type": "Feature",
         "properties": {"AGS": 1002, "GEN": "Kiel"},
         "geometry": {"type": "MultiPolygon", "coordinates": [[[[10.0,54.0],[11.0,54.0],[11.0,55.0],[10.0,54.0]]]]}},
        {"type": "Feature",
         "properties": {"GEN": "No code"},
         "geometry": {"type": "Polygon", "coordinates": [[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]}},
        {"type": "Feature",
         "properties": {"AGS": "01003", "GEN": "Point"},
         "geometry": {"type": "Point", "coordinates": [9.5, 54.5]}}
      ]
    }"#;

    #[test]
    fn codes_are_padded_to_five() {
        assert_eq!(normalize_ags("1001"), "01001");
        assert_eq!(normalize_ags(" 7 "), "00007");
        assert_eq!(normalize_ags("09162"), "09162");
        assert_eq!(normalize_ags("123456"), "123456");
    }

    #[test]
    fn csv_rows_are_keyed_by_normalised_code() {
        let set = parse_records(CSV.as_bytes(), &input(PathBuf::new(), PathBuf::new())).unwrap();

        assert_eq!(set.rows().len(), 3);
        for row in set.rows().iter().filter(|r| r.name != "Long") {
            assert_eq!(row.ags.len(), 5);
            assert!(row.ags.starts_with('0'));
        }

        let flensburg = set.get("01001").unwrap();
        assert_eq!(flensburg.name, "Flensburg");
        assert_eq!(flensburg.value("question_01"), Some(10.0));
        assert!(!flensburg.values.contains_key("AGS"));
        assert_eq!(set.get("01002").unwrap().value("question_02"), None);
    }

    #[test]
    fn csv_without_join_column_is_rejected() {
        let err = parse_records("ID,GEN\n1,X\n".as_bytes(), &input(PathBuf::new(), PathBuf::new()));
        assert!(err.is_err());
    }

    #[test]
    fn geojson_keeps_polygon_features_with_codes() {
        let features = parse_features(GEOJSON.as_bytes(), &input(PathBuf::new(), PathBuf::new())).unwrap();
        let codes: Vec<&str> = features.iter().map(|f| f.ags.as_str()).collect();
        assert_eq!(codes, vec!["01001", "01002"]);
        assert_eq!(features[1].name, "Kiel");
    }

    #[test]
    fn geojson_must_be_a_collection() {
        let single = r#"{"type": "Feature", "properties": {}, "geometry": null}"#;
        assert!(parse_features(single.as_bytes(), &input(PathBuf::new(), PathBuf::new())).is_err());
    }

    #[tokio::test]
    async fn a_missing_asset_leaves_only_that_half_unset() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("gemeinde_data.csv");
        File::create(&csv_path).unwrap().write_all(CSV.as_bytes()).unwrap();

        let config = AppConfig {
            input: input(dir.path().join("missing.geo.json"), csv_path),
            datasets: Vec::new(),
            style: Default::default(),
            output: Default::default(),
            server: Default::default(),
        };

        let sources = load_sources(&config).await;
        assert!(sources.features.is_none());
        assert_eq!(sources.records.map(|r| r.len()), Some(3));
    }
}
