use clap::Parser;
use std::path::PathBuf;
use vergence::io_utils::simple_cli_error;
use vergence::{compare, load_image, TARGET_DIFF};

/// Diff two images and print the difference percentage.
#[derive(Parser)]
struct Args {
    /// Reference image
    reference: PathBuf,
    /// Image to judge against the reference
    candidate: PathBuf,
    /// Write the contrast-stretched difference heatmap here
    #[arg(long)]
    heatmap: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(10);
        }
    }
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let reference = load_image(&args.reference)?;
    let candidate = load_image(&args.candidate)?;
    let cmp = compare(&reference, &candidate)?;
    if let Some(path) = &args.heatmap {
        cmp.heatmap
            .save(path)
            .map_err(|e| simple_cli_error(&format!("writing heatmap: {e}")))?;
    }
    println!("diff={:.2} note={}", cmp.diff_percent, cmp.note);
    Ok(cmp.diff_percent <= TARGET_DIFF)
}
