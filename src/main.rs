use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use rpalette::{ColorPalette, ExtractOptions, PaletteExtractor, ResizeQuality};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Primary, secondary and tertiary colors on one line
    Text,
    /// One hex color per line
    Hex,
}

/// Extract the primary, secondary and tertiary colors of images
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image paths
    #[arg(required = true)]
    imgs: Vec<PathBuf>,

    /// Downsample quality, trades accuracy for speed
    #[arg(short, long, value_enum, default_value_t = ResizeQuality::Standard)]
    quality: ResizeQuality,

    /// Number of clusters to compute
    #[arg(short = 'k', long, default_value_t = 3)]
    clusters: usize,

    /// Maximum centroid movement considered converged
    #[arg(short, long, default_value_t = 0.01)]
    tolerance: f64,

    /// Iteration ceiling for the clustering loop
    #[arg(long, default_value_t = rpalette::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn print_palette(palette: &ColorPalette, format: Format) {
    match format {
        Format::Text => println!("{palette}"),
        Format::Hex => palette
            .to_hex()
            .into_iter()
            .flatten()
            .for_each(|hex| println!("{hex}")),
    }
}

fn open(path: &Path, options: ExtractOptions) -> Result<PaletteExtractor> {
    let extractor = PaletteExtractor::open(path)
        .with_context(|| format!("unable to open {}", path.display()))?;
    Ok(extractor.with_options(options))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let options = ExtractOptions {
        cluster_count: args.clusters,
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
    };
    let quality = args.quality;

    let tasks: Vec<_> = args
        .imgs
        .iter()
        .map(|path| open(path, options).map(|extractor| extractor.spawn(quality)))
        .collect();

    let mut status = ExitCode::SUCCESS;
    for (path, task) in args.imgs.iter().zip(tasks) {
        let result = task.and_then(|task| task.join().context("palette extraction failed"));
        match result {
            Ok(palette) => {
                if args.imgs.len() > 1 {
                    println!("{}:", path.display());
                }
                print_palette(&palette, args.format);
            }
            Err(e) => {
                eprintln!("{}: {e:#}", path.to_string_lossy());
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}
