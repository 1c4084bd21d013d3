use crate::types::{GemeindeFeature, RecordSet};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#rgb` or `#rrggbb`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(anyhow!("Invalid hex colour: {:?}", hex)),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map_err(|_| anyhow!("Invalid hex colour: {:?}", hex))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.0, self.1, self.2)
    }
}

/// Min/max of one statistic over the joined records, mapped onto a light..dark ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub light: Rgb,
    pub dark: Rgb,
}

impl ColorScale {
    /// `None` when no value is numeric.
    pub fn from_values<I>(values: I, light: Rgb, dark: Rgb) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((min, max)) => Some((f64::min(min, v), f64::max(max, v))),
        })
        .map(|(min, max)| ColorScale { min, max, light, dark })
    }

    /// Scale over every feature that joins to a record with a numeric `statistic`.
    pub fn for_statistic(
        features: &[GemeindeFeature],
        records: &RecordSet,
        statistic: &str,
        light: Rgb,
        dark: Rgb,
    ) -> Option<Self> {
        let values = features.iter()
            .filter_map(|f| records.get(&f.ags))
            .filter_map(|r| r.value(statistic));
        Self::from_values(values, light, dark)
    }

    pub fn position(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn color_for(&self, value: f64) -> Rgb {
        let t = self.position(value);
        let mix = |l: u8, d: u8| (l as f64 + (d as f64 - l as f64) * t).round() as u8;
        Rgb(
            mix(self.light.0, self.dark.0),
            mix(self.light.1, self.dark.1),
            mix(self.light.2, self.dark.2),
        )
    }
}
