use crate::types::{RecordSet, Selection};
use serde::Serialize;

const STATE_PREFIX_LEN: usize = 4;

const PALETTE: [&str; 8] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#845EC2", "#FF6F91", "#2C73D2", "#FFC75F",
];

pub const NO_SELECTION: &str = "No region selected";
pub const NO_DATA: &str = "No data available";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub name: String,
    pub value: f64,
    pub share: f64,
    pub color: &'static str,
}

/// What the detail sidebar shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartView {
    NoSelection { message: &'static str },
    NoData { selected: Selection, message: &'static str },
    Pie { selected: Selection, slices: Vec<Slice> },
}

/// Bundesland key: the first four characters of the AGS.
pub fn state_code(ags: &str) -> String {
    ags.chars().take(STATE_PREFIX_LEN).collect()
}

/// Pie of every municipality in the selected one's state, positive values only.
pub fn breakdown(records: Option<&RecordSet>, selection: Option<&Selection>, statistic: &str) -> ChartView {
    let Some(selected) = selection else {
        return ChartView::NoSelection { message: NO_SELECTION };
    };
    let no_data = || ChartView::NoData { selected: selected.clone(), message: NO_DATA };
    let Some(records) = records else {
        return no_data();
    };

    let prefix = state_code(&selected.ags);
    let values: Vec<(&str, f64)> = records.rows().iter()
        .filter(|r| state_code(&r.ags) == prefix)
        .map(|r| (r.name.as_str(), r.value(statistic).unwrap_or(0.0)))
        .filter(|(_, v)| *v > 0.0)
        .collect();

    if values.is_empty() {
        return no_data();
    }

    let total: f64 = values.iter().map(|(_, v)| v).sum();
    let slices = values.into_iter().enumerate()
        .map(|(i, (name, value))| Slice {
            name: name.to_string(),
            value,
            share: value / total,
            color: PALETTE[i % PALETTE.len()],
        })
        .collect();

    ChartView::Pie { selected: selected.clone(), slices }
}
