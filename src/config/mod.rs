//! Application Configuration
//!
//! Segmentation, normalization and dataset settings stored in TOML format.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest label accepted into a packed dataset, in characters
pub const MAX_TEXT_LENGTH: usize = 32;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page segmentation settings
    pub segmentation: SegmentationConfig,
    /// Sample normalization settings
    pub normalize: NormalizeConfig,
    /// Dataset packing settings
    pub dataset: DatasetConfig,
}

/// Page segmentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Boxes must be strictly wider than this to be kept
    pub min_width: u32,
    /// Boxes must be strictly taller than this to be kept
    pub min_height: u32,
    /// Width of the dilation rectangle (merges letters of one word)
    pub kernel_width: u32,
    /// Height of the dilation rectangle
    pub kernel_height: u32,
    /// Image format extension for written crops
    pub output_extension: String,
    /// Extensions recognized as page images when a directory is given
    pub page_extensions: Vec<String>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_width: 20,
            min_height: 15,
            kernel_width: 30,
            kernel_height: 10,
            output_extension: "png".to_string(),
            page_extensions: default_image_extensions(),
        }
    }
}

/// Sample normalization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Sample width in pixels
    pub target_width: u32,
    /// Sample height in pixels
    pub target_height: u32,
    /// Min-max stretch normalized samples back to 0-255 before packing.
    /// When off, values are cast to bytes as-is.
    pub rescale_to_u8: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            target_width: 128,
            target_height: 32,
            rescale_to_u8: true,
        }
    }
}

/// Dataset packing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Longest accepted label, in characters
    pub max_text_length: usize,
    /// Extensions recognized as word images (case-insensitive)
    pub image_extensions: Vec<String>,
    /// Extension of the same-stem label files
    pub label_extension: String,
    /// Normalize images on a thread pool (output is identical either way)
    pub parallel: bool,
    /// Font metadata written into every index line
    pub font: FontPlaceholder,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_text_length: MAX_TEXT_LENGTH,
            image_extensions: default_image_extensions(),
            label_extension: "txt".to_string(),
            parallel: true,
            font: FontPlaceholder::default(),
        }
    }
}

/// Constant font fields carried in the index for the downstream reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontPlaceholder {
    pub name: String,
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontPlaceholder {
    fn default() -> Self {
        Self {
            name: "Custom".to_string(),
            size: 26,
            bold: false,
            italic: false,
        }
    }
}

impl NormalizeConfig {
    /// Reject target sizes no sample can be built at
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 || self.target_height == 0 {
            bail!(
                "Invalid target size {}x{}",
                self.target_width,
                self.target_height
            );
        }
        Ok(())
    }
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg"].iter().map(|s| s.to_string()).collect()
}

/// Check whether `path` has one of `extensions` (case-insensitive)
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.segmentation.min_width, 20);
        assert_eq!(config.segmentation.min_height, 15);
        assert_eq!(config.segmentation.kernel_width, 30);
        assert_eq!(config.segmentation.kernel_height, 10);
        assert_eq!(config.segmentation.output_extension, "png");

        assert_eq!(config.normalize.target_width, 128);
        assert_eq!(config.normalize.target_height, 32);
        assert!(config.normalize.rescale_to_u8);

        assert_eq!(config.dataset.max_text_length, 32);
        assert_eq!(config.dataset.label_extension, "txt");
        assert_eq!(config.dataset.font.name, "Custom");
        assert_eq!(config.dataset.font.size, 26);
        assert!(!config.dataset.font.bold);
        assert!(!config.dataset.font.italic);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.normalize.target_width = 256;
        config.normalize.rescale_to_u8 = false;
        config.dataset.font.name = "Amiri".to_string();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.normalize.target_width, 256);
        assert!(!parsed.normalize.rescale_to_u8);
        assert_eq!(parsed.dataset.font.name, "Amiri");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[normalize]\ntarget_height = 64\n").unwrap();

        assert_eq!(parsed.normalize.target_height, 64);
        assert_eq!(parsed.normalize.target_width, 128);
        assert_eq!(parsed.segmentation.min_width, 20);
        assert_eq!(parsed.dataset.max_text_length, MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_normalize_validate_rejects_zero_sides() {
        assert!(NormalizeConfig::default().validate().is_ok());

        let mut config = NormalizeConfig::default();
        config.target_width = 0;
        assert!(config.validate().is_err());

        let mut config = NormalizeConfig::default();
        config.target_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.segmentation.kernel_width, loaded.segmentation.kernel_width);
        assert_eq!(config.dataset.font, loaded.dataset.font);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_has_extension_case_insensitive() {
        let exts = default_image_extensions();
        assert!(has_extension(Path::new("a/word_0001.PNG"), &exts));
        assert!(has_extension(Path::new("scan.jpeg"), &exts));
        assert!(!has_extension(Path::new("word_0001.txt"), &exts));
        assert!(!has_extension(Path::new("README"), &exts));
    }
}
