//! pjpeg CLI - perceptual JPEG optimizer
//!
//! Reads a JPEG or PNG, searches for the smallest JPEG within the
//! distortion budget for the requested quality, and writes it out.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use perceptual_jpeg::{read_file, Optimizer, OptimizeOptions, Subsampling, DEFAULT_QUALITY};

/// Shrink JPEG and PNG images into perceptually equivalent JPEGs.
#[derive(Parser, Debug)]
#[command(name = "pjpeg")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image file (JPEG or PNG)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (defaults to INPUT with a .optimized.jpg extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Quality (0-100, higher = less tolerated distortion)
    #[arg(short, long, default_value_t = DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: u8,

    /// Maximum number of candidates to evaluate
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    max_iterations: Option<u32>,

    /// Search preset
    #[arg(long, value_enum, default_value = "balanced")]
    preset: PresetArg,

    /// Chroma subsampling (overrides the preset)
    #[arg(long, value_enum)]
    subsampling: Option<SubsamplingArg>,

    /// Fail instead of writing a result that misses the distortion target
    #[arg(long)]
    strict: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Few trials, standard Huffman tables
    Fast,
    /// Default search
    Balanced,
    /// Exhaustive search with 4:2:0 chroma
    Max,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SubsamplingArg {
    /// 4:4:4 - No subsampling (best quality)
    S444,
    /// 4:2:0 - 2x2 chroma downsample (smaller file)
    S420,
}

impl PresetArg {
    fn index(self) -> u8 {
        match self {
            PresetArg::Fast => 0,
            PresetArg::Balanced => 1,
            PresetArg::Max => 2,
        }
    }
}

impl From<SubsamplingArg> for Subsampling {
    fn from(arg: SubsamplingArg) -> Self {
        match arg {
            SubsamplingArg::S444 => Subsampling::S444,
            SubsamplingArg::S420 => Subsampling::S420,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut options =
        OptimizeOptions::from_preset(args.quality, args.preset.index()).strict(args.strict);
    if let Some(max_iterations) = args.max_iterations {
        options = options.max_iterations(max_iterations);
    }
    if let Some(subsampling) = args.subsampling {
        options = options.subsampling(subsampling.into());
    }

    let input = read_file(&args.input)?;
    let start = Instant::now();
    let optimized = Optimizer::new(options).optimize_encoded(&input)?;
    let elapsed = start.elapsed();

    let output_path = args.output.clone().unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.set_extension("optimized.jpg");
        path
    });
    optimized.image.save(&output_path)?;

    let input_size = input.len() as u64;
    let output_size = optimized.image.len() as u64;
    let ratio = (output_size as f64 / input_size as f64) * 100.0;
    let report = &optimized.report;

    if args.verbose {
        eprintln!("Input: {:?} ({:?})", args.input, input.kind());
        eprintln!("Output: {:?}", output_path);
        eprintln!("  Quality: {} (threshold {:.6})", report.quality, report.threshold);
        eprintln!("  Level: {}", report.level);
        eprintln!("  Distortion: {:.6}", report.distortion);
        eprintln!(
            "  Trials: {}{}",
            report.iterations,
            if report.converged { "" } else { " (budget exhausted)" }
        );
        if optimized.kept_input {
            eprintln!("  Input kept: no smaller candidate found");
        }
        eprintln!("  Time: {:.2?}", elapsed);
    }
    if !report.target_met {
        eprintln!("warning: distortion target not met, wrote best effort");
    }
    println!(
        "{} -> {} ({:.1}%)",
        format_size(input_size),
        format_size(output_size),
        ratio
    );

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
