use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetOption>,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub geojson: PathBuf,
    pub data_csv: PathBuf,
    #[serde(default = "default_join_column")]
    pub join_column_shape: String,
    #[serde(default = "default_name_column")]
    pub name_column_shape: String,
    #[serde(default = "default_join_column")]
    pub join_column_csv: String,
    #[serde(default = "default_name_column")]
    pub name_column_csv: String,
}

/// One entry of the statistic selector.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatasetOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub light: String,
    pub dark: String,
    pub neutral: String,
    pub border: String,
    pub selected_border: String,
    pub weight: f64,
    pub selected_weight: f64,
    pub fill_opacity: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            light: "#dbeafe".to_string(),
            dark: "#1e40af".to_string(),
            neutral: "#eeeeee".to_string(),
            border: "#ffffff".to_string(),
            selected_border: "#1e40af".to_string(),
            weight: 1.0,
            selected_weight: 3.0,
            fill_opacity: 0.6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub tile_dir: PathBuf,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tile_dir: PathBuf::from("output/tiles"),
            min_zoom: 5,
            max_zoom: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("web"),
        }
    }
}

fn default_join_column() -> String {
    "AGS".to_string()
}

fn default_name_column() -> String {
    "GEN".to_string()
}

fn default_datasets() -> Vec<DatasetOption> {
    vec![
        DatasetOption { value: "question_01".to_string(), label: "Question 01".to_string() },
        DatasetOption { value: "question_02".to_string(), label: "Question 02".to_string() },
    ]
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Statistic shown before the user picks one.
    pub fn default_statistic(&self) -> String {
        self.datasets.first().map(|d| d.value.clone()).unwrap_or_default()
    }
}
