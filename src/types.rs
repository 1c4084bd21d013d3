use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One CSV row, keyed by its normalised AGS.
#[derive(Debug, Clone, PartialEq)]
pub struct Municipality {
    pub ags: String,
    pub name: String,
    // Statistic column -> raw cell text
    pub values: HashMap<String, String>,
}

impl Municipality {
    pub fn raw(&self, statistic: &str) -> Option<&str> {
        self.values.get(statistic).map(String::as_str)
    }

    /// Numeric value of a statistic. Empty or unparsable cells count as absent.
    pub fn value(&self, statistic: &str) -> Option<f64> {
        let raw = self.raw(statistic)?.trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    rows: Vec<Municipality>,
    by_ags: HashMap<String, usize>,
}

impl RecordSet {
    pub fn new(rows: Vec<Municipality>) -> Self {
        // A repeated code points at its last row
        let by_ags = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.ags.clone(), i))
            .collect();
        Self { rows, by_ags }
    }

    pub fn get(&self, ags: &str) -> Option<&Municipality> {
        self.by_ags.get(ags).and_then(|&i| self.rows.get(i))
    }

    pub fn rows(&self) -> &[Municipality] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.by_ags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GemeindeFeature {
    pub ags: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub feature: geojson::Feature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub ags: String,
    pub gen: String,
}
