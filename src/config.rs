use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SENTINEL: &str = "Otra";

/// Date formats tried in order when parsing trip dates.
pub fn default_date_formats() -> Vec<String> {
    ["%Y-%m-%d", "%Y/%m/%d", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y"]
        .iter()
        .map(|f| f.to_string())
        .collect()
}

/// Names the report sources and the few knobs of the pipeline.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "data_dir": "data",
///   "passenger_files": ["pasajeros2016.csv", "pasajeros2017.csv"],
///   "flight_files": ["vuelos2016.csv", "vuelos2017.csv"],
///   "airline_file": "LineasAereas.csv",
///   "sentinel": "Otra",
///   "date_formats": ["%Y-%m-%d"]
/// }
/// ```
/// Relative file names resolve against `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub data_dir: PathBuf,
    pub passenger_files: Vec<String>,
    pub flight_files: Vec<String>,
    pub airline_file: String,
    pub sentinel: String,
    pub date_formats: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            passenger_files: vec!["pasajeros2016.csv".into(), "pasajeros2017.csv".into()],
            flight_files: vec!["vuelos2016.csv".into(), "vuelos2017.csv".into()],
            airline_file: "LineasAereas.csv".into(),
            sentinel: DEFAULT_SENTINEL.into(),
            date_formats: default_date_formats(),
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path` and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::SourceOpen {
            path: path.display().to_string(),
            source,
        })?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.passenger_files.is_empty() {
            return Err(PipelineError::Config("no passenger files configured".into()));
        }
        if self.flight_files.is_empty() {
            return Err(PipelineError::Config("no flight files configured".into()));
        }
        if self.sentinel.is_empty() {
            return Err(PipelineError::Config("sentinel airline name is empty".into()));
        }
        if self.date_formats.is_empty() {
            return Err(PipelineError::Config("no date formats configured".into()));
        }
        Ok(())
    }

    pub fn passenger_paths(&self) -> Vec<PathBuf> {
        self.passenger_files.iter().map(|f| self.data_dir.join(f)).collect()
    }

    pub fn flight_paths(&self) -> Vec<PathBuf> {
        self.flight_files.iter().map(|f| self.data_dir.join(f)).collect()
    }

    pub fn airline_path(&self) -> PathBuf {
        self.data_dir.join(&self.airline_file)
    }
}
