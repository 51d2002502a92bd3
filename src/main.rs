//! WordPack - word-level OCR dataset builder
//!
//! Segments scanned pages into right-to-left ordered word crops, and packs
//! labeled word images into a fixed-size binary dataset with a text index.

mod config;
mod dataset;
mod error;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{has_extension, AppConfig};
use crate::dataset::DatasetPacker;
use crate::vision::Segmenter;

/// WordPack - OCR training data preparation
#[derive(Parser, Debug)]
#[command(name = "wordpack")]
#[command(about = "Segment scanned pages into words and pack labeled words into a binary dataset")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut pages into word crops named word_<index>.<ext>
    Segment {
        /// Page images, or directories of page images
        #[arg(required = true)]
        pages: Vec<PathBuf>,

        /// Directory receiving the crops
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Pack labeled word images into a blob and index file
    Pack {
        /// Directory of word images
        #[arg(long)]
        images: PathBuf,

        /// Directory of same-stem label files
        #[arg(long)]
        labels: PathBuf,

        /// Output blob
        #[arg(long)]
        bin: PathBuf,

        /// Output index
        #[arg(long)]
        index: PathBuf,

        /// Override the sample width
        #[arg(long)]
        target_width: Option<u32>,

        /// Override the sample height
        #[arg(long)]
        target_height: Option<u32>,

        /// Write normalized values as-is instead of stretching to 0-255
        #[arg(long)]
        no_rescale: bool,

        /// Normalize on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Check that an index matches its blob
    Verify {
        #[arg(long)]
        bin: PathBuf,

        #[arg(long)]
        index: PathBuf,
    },

    /// Normalize one image and save the sample for inspection
    Preview {
        /// Word image to normalize
        input: PathBuf,

        /// Where to save the 8-bit sample
        #[arg(short, long)]
        output: PathBuf,

        /// Apply random width stretching
        #[arg(long)]
        augment: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination (defaults to the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_or_default_config(args.config.as_deref())?;

    match args.command {
        Command::Segment { pages, output } => {
            let pages = expand_pages(&pages, &config.segmentation.page_extensions)?;
            let segmenter = Segmenter::new(config.segmentation);
            let crops = match pages.as_slice() {
                [page] => segmenter.segment(page, &output)?,
                _ => segmenter.segment_pages(&pages, &output)?,
            };
            for crop in &crops {
                debug!(
                    "word {} at {:?} ({}x{}) -> {:?}",
                    crop.index,
                    crop.bounds,
                    crop.image.width(),
                    crop.image.height(),
                    crop.path
                );
            }
        }
        Command::Pack {
            images,
            labels,
            bin,
            index,
            target_width,
            target_height,
            no_rescale,
            sequential,
        } => {
            let mut normalize = config.normalize;
            if let Some(width) = target_width {
                normalize.target_width = width;
            }
            if let Some(height) = target_height {
                normalize.target_height = height;
            }
            if no_rescale {
                normalize.rescale_to_u8 = false;
            }
            let mut dataset = config.dataset;
            if sequential {
                dataset.parallel = false;
            }

            let packer = DatasetPacker::new(normalize, dataset);
            packer.pack(&images, &labels, &bin, &index)?;
        }
        Command::Verify { bin, index } => {
            let report = dataset::verify(&bin, &index)?;
            info!("{:?} is consistent: {} records, {} bytes", bin, report.records, report.bytes);
        }
        Command::Preview { input, output, augment } => {
            let gray = image::open(&input)
                .with_context(|| format!("Failed to load image {:?}", input))?
                .to_luma8();
            let settings = &config.normalize;
            settings.validate()?;
            let sample = vision::normalize(&gray, settings.target_width, settings.target_height, augment);
            sample
                .to_gray_image(settings.rescale_to_u8)
                .save(&output)
                .with_context(|| format!("Failed to save preview {:?}", output))?;
            info!("Saved {}x{} preview to {:?}", sample.width(), sample.height(), output);
        }
        Command::InitConfig { path } => {
            let path = match path {
                Some(path) => path,
                None => storage::default_config_path()?,
            };
            config::save_config(&AppConfig::default(), &path)?;
            info!("Wrote default configuration to {:?}", path);
        }
    }

    Ok(())
}

/// Load the explicit config, else the user config file, else defaults
fn load_or_default_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return config::load_config(path);
    }

    if let Ok(config_path) = storage::default_config_path() {
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return Ok(config);
                }
                Err(e) => warn!("Ignoring configuration {:?}: {:#}", config_path, e),
            }
        }
    }
    info!("Using default configuration");
    Ok(AppConfig::default())
}

/// Replace directory arguments by their page images in sorted order
fn expand_pages(inputs: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("Failed to read page directory {:?}", input))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_extension(p, extensions))
                .collect();
            found.sort();
            pages.extend(found);
        } else {
            pages.push(input.clone());
        }
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_expand_pages_sorts_directory_contents() {
        let dir = tempdir().unwrap();
        for name in ["p2.png", "p1.JPG", "readme.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let single = dir.path().join("p9.png");

        let exts = AppConfig::default().segmentation.page_extensions;
        let pages = expand_pages(&[dir.path().to_path_buf(), single.clone()], &exts).unwrap();

        assert_eq!(
            pages,
            vec![dir.path().join("p1.JPG"), dir.path().join("p2.png"), single]
        );
    }

    #[test]
    fn test_cli_parses_pack_overrides() {
        let args = Args::try_parse_from([
            "wordpack", "pack", "--images", "i", "--labels", "l", "--bin", "d.bin", "--index",
            "d.txt", "--target-width", "256", "--no-rescale",
        ])
        .unwrap();

        match args.command {
            Command::Pack { target_width, target_height, no_rescale, sequential, .. } => {
                assert_eq!(target_width, Some(256));
                assert_eq!(target_height, None);
                assert!(no_rescale);
                assert!(!sequential);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_init_config_path_flag() {
        let args = Args::try_parse_from(["wordpack", "init-config", "--path", "cfg.toml"]).unwrap();
        match args.command {
            Command::InitConfig { path } => assert_eq!(path, Some(PathBuf::from("cfg.toml"))),
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Args::try_parse_from(["wordpack", "init-config", "cfg.toml"]).is_err());
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        assert!(load_or_default_config(Some(Path::new("/nonexistent/wordpack.toml"))).is_err());
    }
}
