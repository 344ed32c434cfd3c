use crate::preprocessing::{Pipeline, Preset, Stage, StageList};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ocr-prep")]
#[command(about = "Binarize and blur images ahead of OCR, then recognize their text")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Preprocessing preset (none, default, smooth)
    #[arg(long, global = true, env = "OCR_PRESET", default_value = "default")]
    pub preset: Preset,

    /// Explicit stage list, overrides the preset (e.g. "blur:0.5,threshold:0.6")
    #[arg(long, global = true, env = "OCR_STAGES")]
    pub stages: Option<StageList>,

    /// Default language for OCR (e.g., "eng", "deu", "fra")
    #[arg(long, global = true, env = "OCR_DEFAULT_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// OCR engine to use (defaults to the first one compiled in)
    #[arg(long, global = true, env = "OCR_ENGINE")]
    pub engine: Option<String>,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, global = true, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Host address to bind to
        #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "OCR_PORT", default_value = "9292")]
        port: u16,

        /// Maximum file size in bytes (default: 50MB)
        #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
        max_file_size: usize,

        /// Serve preprocessing only, without loading any OCR engine
        #[arg(long)]
        disable_recognition: bool,
    },

    /// Preprocess one image file and recognize its text
    Process {
        /// Image to read
        input: PathBuf,

        /// Where to write the preprocessed image (PNG)
        #[arg(short, long)]
        output: PathBuf,

        /// Only preprocess, skip recognition
        #[arg(long)]
        no_recognize: bool,
    },
}

/// Pipeline and engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub default_language: String,
    pub engine: Option<String>,
    pub tessdata_path: Option<String>,
    pub preset: Preset,
    /// Explicit stages; `None` means use the preset
    pub stages: Option<Vec<Stage>>,
}

impl Config {
    pub fn pipeline(&self) -> Pipeline {
        match &self.stages {
            Some(stages) => Pipeline::new(stages.clone()),
            None => Pipeline::from_preset(self.preset),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_language: "eng".to_string(),
            engine: None,
            tessdata_path: None,
            preset: Preset::Default,
            stages: None,
        }
    }
}

impl From<CommonArgs> for Config {
    fn from(args: CommonArgs) -> Self {
        Self {
            default_language: args.language,
            engine: args.engine,
            tessdata_path: args.tessdata_path,
            preset: args.preset,
            stages: args.stages.map(|list| list.0),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub recognition_enabled: bool,
}
