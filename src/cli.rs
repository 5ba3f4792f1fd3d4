//! CLI argument types and layered configuration for the `tumorcam` binary.
//! Loads from CLI args, environment (prefix `TUMORCAM_`), and optional
//! config files.

use std::{net::SocketAddr, path::PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use ortho_config::{OrthoMergeExt, OrthoResult};
use serde::Deserialize;

use crate::config::{DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH, InputSize, OverlayConfig};

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_DATABASE: &str = "results.sqlite3";
const DEFAULT_MODEL_PATH: &str = "models/tumor_cam.onnx";
const DEFAULT_WEIGHTS_PATH: &str = "models/tumor_cam_dense.json";
const DEFAULT_INPUT_NAME: &str = "input_1";
const DEFAULT_FEATURE_OUTPUT: &str = "block5_conv3";
const DEFAULT_PROBABILITY_OUTPUT: &str = "predictions";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_IMAGE_WEIGHT: f32 = 0.7;
const DEFAULT_HEAT_WEIGHT: f32 = 0.3;

/// Command-line arguments for the `tumorcam` server.
///
/// Values are layered from command-line flags, environment variables
/// (prefixed with `TUMORCAM_`), an optional TOML configuration file, and
/// built-in defaults, in that order of precedence.
///
/// # Examples
///
/// Parse flags directly:
/// ```
/// use tumor_cam::cli::TumorcamArgs;
/// use ortho_config::OrthoConfig;
///
/// let args = TumorcamArgs::load_from_iter(["tumorcam", "--dry-run", "--bind", "0.0.0.0:8080"])
///     .expect("load args from CLI iterator");
/// assert!(args.dry_run);
/// assert_eq!(args.bind, "0.0.0.0:8080");
/// ```
///
/// Load from a configuration file:
/// ```
/// use tumor_cam::cli::TumorcamArgs;
/// use ortho_config::OrthoConfig;
/// use std::io::Write;
/// use tempfile::NamedTempFile;
///
/// let mut file = NamedTempFile::new().expect("create temp file");
/// writeln!(file, "input_width = 224").expect("write config");
/// let path = file.path().to_str().expect("path str");
/// let args = TumorcamArgs::load_from_iter(["tumorcam", "--config-path", path])
///     .expect("load args from config path");
/// assert_eq!(args.input_width, 224);
/// ```
#[derive(Debug, Clone, Deserialize, ortho_config::OrthoConfig)]
#[ortho_config(prefix = "TUMORCAM")]
#[serde(default)]
pub struct TumorcamArgs {
    /// Socket address the HTTP server listens on.
    #[ortho_config(default = String::from(DEFAULT_BIND))]
    pub bind: String,

    /// SQLite database holding saved results.
    #[ortho_config(default = PathBuf::from(DEFAULT_DATABASE))]
    pub database: PathBuf,

    /// ONNX graph exposing the feature map and class scores.
    #[ortho_config(default = PathBuf::from(DEFAULT_MODEL_PATH))]
    pub model_path: PathBuf,

    /// Expected SHA-256 of the ONNX graph.
    pub model_sha256: Option<String>,

    /// JSON dense-layer kernel of the classifier.
    #[ortho_config(default = PathBuf::from(DEFAULT_WEIGHTS_PATH))]
    pub weights_path: PathBuf,

    /// Expected SHA-256 of the kernel file.
    pub weights_sha256: Option<String>,

    /// Name of the image input in the ONNX graph.
    #[ortho_config(default = String::from(DEFAULT_INPUT_NAME))]
    pub input_name: String,

    /// Graph output carrying the last convolutional feature map.
    #[ortho_config(default = String::from(DEFAULT_FEATURE_OUTPUT))]
    pub feature_output: String,

    /// Graph output carrying the class scores.
    #[ortho_config(default = String::from(DEFAULT_PROBABILITY_OUTPUT))]
    pub probability_output: String,

    #[ortho_config(default = DEFAULT_INPUT_WIDTH)]
    pub input_width: u32,

    #[ortho_config(default = DEFAULT_INPUT_HEIGHT)]
    pub input_height: u32,

    /// Apply softmax to the class output when the graph emits logits.
    #[ortho_config(default = false)]
    pub apply_softmax: bool,

    /// Weight of the scan in the overlay blend.
    #[ortho_config(default = DEFAULT_IMAGE_WEIGHT)]
    pub image_weight: f32,

    /// Weight of the heat map in the overlay blend.
    #[ortho_config(default = DEFAULT_HEAT_WEIGHT)]
    pub heat_weight: f32,

    /// Origin allowed to call the API from a browser.
    #[ortho_config(default = String::from(DEFAULT_ALLOWED_ORIGIN))]
    pub allowed_origin: String,

    /// Emit logs as JSON lines.
    #[ortho_config(default = false)]
    pub log_json: bool,

    /// Validate configuration and exit without loading the model or binding.
    #[ortho_config(default = false)]
    pub dry_run: bool,

    /// Optional path to a configuration file.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for TumorcamArgs {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            database: DEFAULT_DATABASE.into(),
            model_path: DEFAULT_MODEL_PATH.into(),
            model_sha256: None,
            weights_path: DEFAULT_WEIGHTS_PATH.into(),
            weights_sha256: None,
            input_name: DEFAULT_INPUT_NAME.into(),
            feature_output: DEFAULT_FEATURE_OUTPUT.into(),
            probability_output: DEFAULT_PROBABILITY_OUTPUT.into(),
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            apply_softmax: false,
            image_weight: DEFAULT_IMAGE_WEIGHT,
            heat_weight: DEFAULT_HEAT_WEIGHT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.into(),
            log_json: false,
            dry_run: false,
            config_path: None,
        }
    }
}

impl TumorcamArgs {
    /// Load configuration solely from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed.
    pub fn load_from_env() -> OrthoResult<Self> {
        Figment::new()
            .merge(Env::prefixed("TUMORCAM_"))
            .extract()
            .into_ortho_merge()
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_config(path: &str) -> OrthoResult<Self> {
        Figment::new()
            .merge(Toml::file(path))
            .extract()
            .into_ortho_merge()
    }

    /// Load configuration from environment variables and a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if either source contains invalid values.
    pub fn load_from_env_and_config(path: &str) -> OrthoResult<Self> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("TUMORCAM_"))
            .extract()
            .into_ortho_merge()
    }

    #[must_use]
    pub fn input_size(&self) -> InputSize {
        InputSize::new(self.input_width, self.input_height)
    }

    #[must_use]
    pub fn overlay(&self) -> OverlayConfig {
        OverlayConfig {
            image_weight: self.image_weight,
            heat_weight: self.heat_weight,
        }
    }

    /// Parse the bind address.
    ///
    /// # Errors
    ///
    /// Returns a message when `bind` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind
            .parse()
            .map_err(|err| format!("invalid bind address {:?}: {err}", self.bind))
    }

    /// Check every value that can be checked without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid setting.
    #[must_use = "Validation should not be ignored"]
    pub fn validate(self) -> Result<Self, String> {
        self.socket_addr()?;
        self.input_size().validate()?;
        self.overlay().validate()?;
        if self.allowed_origin.trim().is_empty() {
            return Err("allowed_origin must not be empty".into());
        }
        for (field, value) in [
            ("input_name", &self.input_name),
            ("feature_output", &self.feature_output),
            ("probability_output", &self.probability_output),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        Ok(self)
    }

    /// Extractor configuration for the ONNX backend.
    #[cfg(feature = "onnx")]
    #[must_use]
    pub fn extractor_config(&self) -> crate::providers::onnx::OnnxExtractorConfig {
        use crate::providers::onnx::{OnnxArtefact, OnnxExtractorConfig};

        OnnxExtractorConfig {
            model: OnnxArtefact {
                path: self.model_path.clone(),
                sha256: self.model_sha256.clone(),
            },
            weights: OnnxArtefact {
                path: self.weights_path.clone(),
                sha256: self.weights_sha256.clone(),
            },
            input_name: self.input_name.clone(),
            feature_output: self.feature_output.clone(),
            probability_output: self.probability_output.clone(),
            input_size: self.input_size(),
            apply_softmax: self.apply_softmax,
        }
    }
}
