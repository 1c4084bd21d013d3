use crate::config::DatasetOption;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorEntry {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// The fixed list of statistics a user can colour the map by.
#[derive(Debug, Clone)]
pub struct Selector {
    options: Vec<DatasetOption>,
}

impl Selector {
    pub fn new(options: Vec<DatasetOption>) -> Self {
        Self { options }
    }

    pub fn entries(&self, active: &str) -> Vec<SelectorEntry> {
        self.options.iter()
            .map(|o| SelectorEntry {
                value: o.value.clone(),
                label: o.label.clone(),
                selected: o.value == active,
            })
            .collect()
    }

    /// The statistic to switch to, if `value` is one of the options.
    pub fn choose(&self, value: &str) -> Option<String> {
        self.options.iter()
            .find(|o| o.value == value)
            .map(|o| o.value.clone())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.value.as_str())
    }
}
