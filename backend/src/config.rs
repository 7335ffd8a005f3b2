use std::env;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

pub const DEFAULT_CONFIG_PATH: &str = "config/service.yaml";
pub const CONFIG_PATH_VAR: &str = "PLANTDOC_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub max_upload_bytes: usize,
    pub image: ImageConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub width: u32,
    pub height: u32,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub output: OutputKind,
}

/// Resampling filter used when resizing to the model resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl Interpolation {
    pub fn filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
        }
    }
}

/// What the model's final layer emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Probabilities,
    Logits,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from("models/plant_disease.pt"),
            max_upload_bytes: 10 * 1024 * 1024,
            image: ImageConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            interpolation: Interpolation::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads the YAML file, applies environment overrides and validates.
    pub fn load() -> Result<Self, InferenceError> {
        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => {
                log::warn!(
                    "No config file at {}, using built-in defaults",
                    DEFAULT_CONFIG_PATH
                );
                Self::default()
            }
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, InferenceError> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::Configuration(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, InferenceError> {
        serde_yaml::from_str(config_str)
            .map_err(|e| InferenceError::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), InferenceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .map_err(|_| InferenceError::Configuration(format!("Invalid PORT: {}", port)))?;
        }
        if let Some(limit) = lookup("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit.parse().map_err(|_| {
                InferenceError::Configuration(format!("Invalid MAX_UPLOAD_BYTES: {}", limit))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.image.width == 0 || self.image.height == 0 {
            return Err(InferenceError::Configuration(format!(
                "Image size must be non-zero, got {}x{}",
                self.image.width, self.image.height
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(InferenceError::Configuration(
                "max_upload_bytes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
