// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::PoseConfig;
use crate::model::DEFAULT_MODEL;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    paf-pose run --model pose.onnx --input videos/
    paf-pose run -m pose.onnx -i videos/ --output labeled/ --copy-to /mnt/share/labeled
    paf-pose run -m pose.onnx -i videos/ --max-frames 100 --scales 1.0
    paf-pose frame --model pose.onnx --image person.jpg --output person_pose.png
    paf-pose frame -m pose.onnx --image person.jpg --json person.json --thre1 0.2"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Label every video in a directory and write per-frame records
    Run(RunArgs),
    /// Estimate poses in a single image
    Frame(FrameArgs),
}

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to ONNX model file
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: PathBuf,

    /// Directory of input videos
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for labeled videos and record files [default: the input directory]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Copy finished outputs into this directory
    #[arg(long)]
    pub copy_to: Option<PathBuf>,

    /// Process at most this many frames per video
    #[arg(long)]
    pub max_frames: Option<usize>,

    #[command(flatten)]
    pub pose: PoseArgs,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the frame command.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Path to ONNX model file
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: PathBuf,

    /// Input image
    #[arg(long)]
    pub image: PathBuf,

    /// Save the annotated image here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the result as JSON here instead of printing it
    #[arg(long)]
    pub json: Option<PathBuf>,

    #[command(flatten)]
    pub pose: PoseArgs,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Pose estimation parameters shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct PoseArgs {
    /// Heatmap peak threshold
    #[arg(long = "thre1", default_value_t = 0.1)]
    pub peak_threshold: f32,

    /// PAF alignment threshold
    #[arg(long = "thre2", default_value_t = 0.05)]
    pub paf_threshold: f32,

    /// Gaussian smoothing sigma applied before peak search
    #[arg(long, default_value_t = 3.0)]
    pub sigma: f32,

    /// Samples taken along each candidate limb
    #[arg(long, default_value_t = 10)]
    pub mid_num: usize,

    /// Input scales relative to the box size, comma separated
    #[arg(long, value_delimiter = ',', default_value = "0.5,1.0,1.5,2.0")]
    pub scales: Vec<f32>,

    /// Network box size in pixels
    #[arg(long, default_value_t = 368)]
    pub box_size: u32,

    /// Network output stride
    #[arg(long, default_value_t = 8)]
    pub stride: u32,

    /// Padding value for network input
    #[arg(long, default_value_t = 128)]
    pub pad_value: u8,

    /// Minimum joints per retained skeleton
    #[arg(long, default_value_t = 4)]
    pub min_parts: usize,

    /// Minimum mean score per retained skeleton
    #[arg(long, default_value_t = 0.4)]
    pub min_mean_score: f32,

    /// ONNX Runtime intra-op threads (0 = runtime default)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

impl PoseArgs {
    /// Build the engine configuration.
    #[must_use]
    pub fn to_config(&self) -> PoseConfig {
        PoseConfig::new()
            .with_peak_threshold(self.peak_threshold)
            .with_paf_threshold(self.paf_threshold)
            .with_sigma(self.sigma)
            .with_mid_num(self.mid_num)
            .with_scale_search(self.scales.clone())
            .with_network_geometry(self.box_size, self.stride, self.pad_value)
            .with_pruning(self.min_parts, self.min_mean_score)
            .with_threads(self.threads)
    }
}
