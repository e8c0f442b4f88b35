//! Configuration module for FaceAuth Core.
//!
//! Loads configuration from YAML files and environment variables.

use std::path::PathBuf;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::engine::DistanceMetric;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Verification engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Path to the SeetaFace frontal detector model.
    pub detector_model: String,
    /// Path to the ArcFace ONNX embedding model.
    pub embedding_model: String,
    /// Distance metric used to compare embeddings.
    #[serde(default)]
    pub distance_metric: DistanceMetric,
    /// Decision threshold for the configured model/metric. Distances at or
    /// below this value count as the same person.
    #[serde(default = "default_verify_threshold")]
    pub verify_threshold: f64,
    /// Directory for per-request temporary images. Defaults to the OS
    /// temporary directory.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_verify_threshold() -> f64 {
    0.68
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (FACEAUTH_*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with FACEAUTH_ prefix
            .add_source(
                Environment::with_prefix("FACEAUTH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detector_model: "models/seeta_fd_frontal_v1.0.bin".to_string(),
            embedding_model: "models/w600k_r50.onnx".to_string(),
            distance_metric: DistanceMetric::Cosine,
            verify_threshold: default_verify_threshold(),
            temp_dir: None,
        }
    }
}
