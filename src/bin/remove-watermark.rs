use std::process;

use clap::Parser;

use threshold_watermark_removal::{JobPaths, Progress, RemovalOptions, WatermarkRemover};

#[derive(Parser)]
#[command(
    name = "remove-watermark",
    about = "Remove grey watermark stars from the tiled glass texture",
    version,
    after_help = "Reads workers/assets/glass_tiled.png and writes\n\
                  workers/assets/glass_tiled.webp (lossy, q=90) and\n\
                  workers/assets/glass_tiled_clean.png (lossless).\n\n\
                  The luminance range and dilation are tuned for that image only."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logger(&cli);

    let remover = match WatermarkRemover::new(RemovalOptions::default()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    };

    let paths = JobPaths::default();
    let quiet = cli.quiet;
    let result = remover.run(&paths, |step| {
        if !quiet {
            print_progress(step);
        }
    });

    match result {
        Ok(report) => {
            if !quiet {
                println!();
                println!("{report}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_logger(cli: &Cli) {
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_progress(step: Progress<'_>) {
    match step {
        Progress::Loading => println!("Loading image..."),
        Progress::Loaded { width, height } => {
            println!("Image loaded: {width}x{height} pixels");
        }
        Progress::MaskCreated { pixels } => println!("Mask created: {pixels} pixels to inpaint"),
        Progress::Inpainted => println!("Inpainting complete"),
        Progress::SavedLossy { path } => println!("Saved to {}", path.display()),
        Progress::SavedLossless { path } => {
            println!("Saved clean PNG version to {}", path.display());
        }
    }
}
