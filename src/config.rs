//! TOML configuration for the geocode and ledger binaries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::boundary::{DatasetSource, LabelProperties};
use crate::classify::DEFAULT_THRESHOLD;
use crate::error::Error;
use crate::sheets::{column_index, DEFAULT_BATCH_SIZE, DEFAULT_WORKERS};

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG: &str = "territorio.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub sheet: SheetConfig,
    pub boundaries: BoundaryConfig,
    pub classify: ClassifyConfig,
    pub writer: WriterConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// Name of the environment variable holding the OAuth access token
    pub token_env: String,
    pub latitude_column: String,
    pub longitude_column: String,
    /// First of the three output columns
    pub output_column: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            worksheet: "Datos".to_string(),
            token_env: "GOOGLE_ACCESS_TOKEN".to_string(),
            latitude_column: "Latitud campo".to_string(),
            longitude_column: "Longitud Campo".to_string(),
            output_column: "H".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Local path or http(s) URL of the GeoJSON dataset
    pub source: String,
    pub cache_dir: PathBuf,
    pub properties: LabelProperties,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            cache_dir: PathBuf::from(".cache/territorio"),
            properties: LabelProperties::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifyConfig {
    pub threshold: f64,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WriterConfig {
    pub batch_size: usize,
    pub workers: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    /// Bookkeeping worksheet, keyed by date in column A
    pub worksheet: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            worksheet: "Datos".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load `path` if given, otherwise `territorio.toml` when present, otherwise defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None if Path::new(DEFAULT_CONFIG).exists() => Self::load_from_file(DEFAULT_CONFIG),
            None => Ok(Self::default()),
        }
    }

    /// Check the values a geocode run depends on
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.sheet.spreadsheet_id.is_empty() {
            return Err(invalid("sheet.spreadsheet_id is required"));
        }
        if self.boundaries.source.is_empty() {
            return Err(invalid("boundaries.source is required"));
        }
        if column_index(&self.sheet.output_column).is_none() {
            return Err(invalid(&format!(
                "sheet.output_column '{}' is not a column letter",
                self.sheet.output_column
            )));
        }
        if !self.classify.threshold.is_finite() || self.classify.threshold < 0.0 {
            return Err(invalid("classify.threshold must be a non-negative number"));
        }
        Ok(())
    }

    pub fn output_column_index(&self) -> std::result::Result<usize, Error> {
        column_index(&self.sheet.output_column)
            .ok_or_else(|| invalid("sheet.output_column is not a column letter"))
    }

    pub fn boundary_source(&self) -> DatasetSource {
        DatasetSource::parse(&self.boundaries.source)
    }

    /// Read the access token from the configured environment variable
    pub fn access_token(&self) -> std::result::Result<String, Error> {
        std::env::var(&self.sheet.token_env).map_err(|_| Error::Config {
            reason: format!("environment variable {} is not set", self.sheet.token_env),
        })
    }
}

fn invalid(reason: &str) -> Error {
    Error::Config {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sheet.worksheet, "Datos");
        assert_eq!(config.sheet.latitude_column, "Latitud campo");
        assert_eq!(config.sheet.longitude_column, "Longitud Campo");
        assert_eq!(config.output_column_index().unwrap(), 8);
        assert_eq!(config.classify.threshold, 1.0);
        assert_eq!(config.writer.batch_size, 1000);
        assert_eq!(config.writer.workers, 4);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sheet]
            spreadsheet_id = "abc"

            [boundaries]
            source = "https://example.org/comunas.geojson"

            [boundaries.properties]
            commune = "NOM_COM"

            [writer]
            workers = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.sheet.spreadsheet_id, "abc");
        assert_eq!(config.sheet.worksheet, "Datos");
        assert_eq!(config.boundaries.properties.commune, "NOM_COM");
        assert_eq!(config.boundaries.properties.region, "Region");
        assert_eq!(config.writer.workers, 2);
        assert_eq!(config.writer.batch_size, 1000);
        assert!(matches!(config.boundary_source(), DatasetSource::Remote(_)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.sheet.spreadsheet_id = "abc".to_string();
        config.boundaries.source = "comunas.geojson".to_string();
        assert!(config.validate().is_ok());

        config.sheet.output_column = "H1".to_string();
        assert!(config.validate().is_err());

        config.sheet.output_column = "H".to_string();
        config.classify.threshold = f64::NAN;
        assert!(config.validate().is_err());
    }
}
