use serde::Deserialize;
use validator::Validate;

use crate::error::{NativeError, Result};

/// Which members the image `w`/`h` keys bind to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSizeBinding {
    /// `w -> w`, `h -> h`, as published.
    #[default]
    Standard,
    /// `w -> wmin`, `h -> hmin`, matching older RTBkit-based exchanges.
    Legacy,
}

/// What happens to the residual document on encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidualOutput {
    /// Emitted under the `unparseable` key.
    #[default]
    Field,
    /// Merged back into the document at its original paths.
    Merge,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(default)]
pub struct CodecConfig {
    /// JSON key of the request's version string.
    #[validate(length(min = 1))]
    pub version_key: String,
    pub image_size_binding: ImageSizeBinding,
    pub residual_output: ResidualOutput,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            version_key: "ver".to_string(),
            image_size_binding: ImageSizeBinding::Standard,
            residual_output: ResidualOutput::Field,
        }
    }
}

impl CodecConfig {
    /// Key bindings of the RTBkit native parser: version under `id`, image
    /// sizes bound to the minimum-size members.
    pub fn legacy() -> Self {
        CodecConfig {
            version_key: "id".to_string(),
            image_size_binding: ImageSizeBinding::Legacy,
            residual_output: ResidualOutput::Field,
        }
    }

    pub fn is_default_binding(&self) -> bool {
        self.version_key == "ver" && self.image_size_binding == ImageSizeBinding::Standard
    }

    /// Rejects a version key that is blank or shadows another request key.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| NativeError::Config(e.to_string()))?;
        let key = self.version_key.trim();
        if key.is_empty() {
            return Err(NativeError::Config(
                "validation error: codec.version_key must not be blank".to_string(),
            ));
        }
        if RESERVED_REQUEST_KEYS.contains(&key) {
            return Err(NativeError::Config(format!(
                "validation error: codec.version_key `{}` collides with a request field",
                key
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: log::LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: log::LevelFilter::Info,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(default)]
pub struct NativeConfig {
    #[validate(nested)]
    pub codec: CodecConfig,
    pub logging: LoggingConfig,
}

/// Request keys the version key may not shadow.
const RESERVED_REQUEST_KEYS: &[&str] = &[
    "context",
    "contextsubtype",
    "plcmttype",
    "plcmtcnt",
    "seq",
    "assets",
    "ext",
    "unparseable",
];

impl NativeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: NativeConfig = toml::from_str(s)
            .map_err(|e| NativeError::Config(format!("toml parse error: {}", e)))?;
        cfg.validate()
            .map_err(|e| NativeError::Config(e.to_string()))?;
        cfg.codec.check()?;
        Ok(cfg)
    }
}
