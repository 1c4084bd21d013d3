use crate::config::StyleConfig;
use crate::data::SourceData;
use crate::index::SpatialIndex;
use crate::scale::{ColorScale, Rgb};
use crate::selection::{SelectionStore, Toggle};
use crate::types::{GemeindeFeature, RecordSet, Selection};
use anyhow::{Context, Result};
use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::HashMap;

/// Leaflet path options for one polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub color: String,
    pub weight: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

/// The styled polygon layer for one statistic.
///
/// `key` changes with the statistic so the client throws the old layer away
/// instead of restyling it.
#[derive(Debug, Clone, Serialize)]
pub struct MapLayer {
    pub key: String,
    pub range: Option<ScaleRange>,
    pub collection: FeatureCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClickOutcome {
    Selected { selection: Selection, popup: String },
    Cleared,
}

#[derive(Debug, Clone)]
struct Palette {
    light: Rgb,
    dark: Rgb,
    neutral: Rgb,
    border: Rgb,
    selected_border: Rgb,
}

pub struct MapView {
    data: SourceData,
    style: StyleConfig,
    palette: Palette,
    by_ags: HashMap<String, usize>,
    index: Option<SpatialIndex>,
}

impl MapView {
    pub fn new(data: SourceData, style: StyleConfig) -> Result<Self> {
        let palette = Palette {
            light: Rgb::from_hex(&style.light).context("style.light")?,
            dark: Rgb::from_hex(&style.dark).context("style.dark")?,
            neutral: Rgb::from_hex(&style.neutral).context("style.neutral")?,
            border: Rgb::from_hex(&style.border).context("style.border")?,
            selected_border: Rgb::from_hex(&style.selected_border).context("style.selected_border")?,
        };
        let features = data.features.as_deref().unwrap_or_default();
        let by_ags = features.iter().enumerate()
            .map(|(i, f)| (f.ags.clone(), i))
            .collect();
        let index = data.features.as_deref().map(SpatialIndex::build);

        Ok(Self { data, style, palette, by_ags, index })
    }

    pub fn features(&self) -> &[GemeindeFeature] {
        self.data.features.as_deref().unwrap_or_default()
    }

    pub fn records(&self) -> Option<&RecordSet> {
        self.data.records.as_ref()
    }

    pub fn feature(&self, ags: &str) -> Option<&GemeindeFeature> {
        self.by_ags.get(ags).and_then(|&i| self.features().get(i))
    }

    pub fn feature_at(&self, lon: f64, lat: f64) -> Option<&GemeindeFeature> {
        let i = self.index.as_ref()?.locate(self.features(), lon, lat)?;
        self.features().get(i)
    }

    pub fn scale(&self, statistic: &str) -> Option<ColorScale> {
        let records = self.records()?;
        ColorScale::for_statistic(self.features(), records, statistic, self.palette.light, self.palette.dark)
    }

    /// Fill for one feature; neutral whenever there is nothing to colour by.
    pub fn fill(&self, feature: &GemeindeFeature, statistic: &str, scale: Option<&ColorScale>) -> Rgb {
        let value = self.records()
            .and_then(|r| r.get(&feature.ags))
            .and_then(|r| r.value(statistic));
        match (scale, value) {
            (Some(scale), Some(v)) => scale.color_for(v),
            _ => self.palette.neutral,
        }
    }

    pub fn style(
        &self,
        feature: &GemeindeFeature,
        statistic: &str,
        scale: Option<&ColorScale>,
        selection: Option<&Selection>,
    ) -> FeatureStyle {
        let selected = selection.is_some_and(|s| s.ags == feature.ags);
        FeatureStyle {
            color: (if selected { self.palette.selected_border } else { self.palette.border }).to_hex(),
            weight: if selected { self.style.selected_weight } else { self.style.weight },
            fill_color: self.fill(feature, statistic, scale).to_string(),
            fill_opacity: self.style.fill_opacity,
        }
    }

    pub fn tooltip(&self, feature: &GemeindeFeature, statistic: &str) -> String {
        match self.records().and_then(|r| r.get(&feature.ags)) {
            Some(record) => format!("{} ({}: {})", feature.name, statistic, record.raw(statistic).unwrap_or("No data")),
            None => feature.name.clone(),
        }
    }

    fn value_text(&self, ags: &str, statistic: &str) -> String {
        self.records()
            .and_then(|r| r.get(ags))
            .and_then(|r| r.raw(statistic))
            .map(|raw| format!("{}: {}", statistic, raw))
            .unwrap_or_else(|| "No data".to_string())
    }

    /// `None` until the geometry has loaded.
    pub fn layer(&self, statistic: &str, selection: Option<&Selection>) -> Option<MapLayer> {
        let features = self.data.features.as_ref()?;
        let scale = self.scale(statistic);

        let mut styled: Vec<(bool, geojson::Feature)> = features.iter()
            .map(|f| {
                let selected = selection.is_some_and(|s| s.ags == f.ags);
                let style = self.style(f, statistic, scale.as_ref(), selection);
                let mut out = f.feature.clone();
                out.set_property("AGS", f.ags.clone());
                out.set_property("style", serde_json::to_value(&style).unwrap_or_default());
                out.set_property("tooltip", self.tooltip(f, statistic));
                out.set_property("selected", selected);
                (selected, out)
            })
            .collect();

        // Selected polygon drawn last so its border sits on top
        styled.sort_by_key(|(selected, _)| *selected);

        Some(MapLayer {
            key: statistic.to_string(),
            range: scale.map(|s| ScaleRange { min: s.min, max: s.max }),
            collection: FeatureCollection {
                bbox: None,
                features: styled.into_iter().map(|(_, f)| f).collect(),
                foreign_members: None,
            },
        })
    }

    /// Toggles `ags` in the store. `None` for a code with no polygon.
    pub fn click(&self, store: &SelectionStore, ags: &str, statistic: &str) -> Option<ClickOutcome> {
        let feature = self.feature(ags)?;
        let outcome = match store.toggle(&feature.ags, &feature.name) {
            Toggle::Cleared => ClickOutcome::Cleared,
            Toggle::Selected(selection) => {
                let popup = format!(
                    "<strong>{}</strong><br>{}",
                    html_escape::encode_text(&feature.name),
                    html_escape::encode_text(&self.value_text(&feature.ags, statistic)),
                );
                ClickOutcome::Selected { selection, popup }
            }
        };
        Some(outcome)
    }
}
