use clap::Parser;
use std::path::PathBuf;
use std::process;

use vergence::io_utils::vergence_cli_error;
use vergence::{compare, decide, load_image, PassRecorder, PassReport, PassStatus, MAX_PASSES};

/// Judge one convergence pass: diff a rendered candidate against the
/// reference, persist the audit artifacts and report the outcome.
///
/// Prints a single-line JSON result on stdout. The exit code encodes the
/// outcome: 0 success, 1 needs-fix, 2 good-enough, 5 max-passes,
/// 6 no-improvement, 10 error.
#[derive(Parser)]
struct Args {
    /// Reference image the candidate is judged against
    reference: PathBuf,
    /// Rendered output of the current candidate state
    rendered: PathBuf,
    /// Session identifier, namespaces the audit trail
    #[arg(long)]
    session_id: String,
    /// Root directory for session artifacts (default: <tmp>/vergence)
    #[arg(long)]
    session_root: Option<PathBuf>,
    /// Diff percent recorded by the previous pass, if any
    #[arg(long)]
    previous_diff: Option<f64>,
}

fn main() {
    match run() {
        Ok(status) => process::exit(exit_code(status)),
        Err(e) => {
            eprintln!("{e}");
            process::exit(10);
        }
    }
}

fn exit_code(status: PassStatus) -> i32 {
    match status {
        PassStatus::Success => 0,
        PassStatus::NeedsFix => 1,
        PassStatus::GoodEnough => 2,
        PassStatus::MaxPassesReached => 5,
        PassStatus::NoImprovement => 6,
    }
}

fn run() -> Result<PassStatus, Box<dyn std::error::Error>> {
    let args = Args::parse();
    validate(&args).map_err(|e| vergence_cli_error("invalid invocation", e))?;

    let root = args
        .session_root
        .unwrap_or_else(|| std::env::temp_dir().join("vergence"));
    let session_dir = root.join(&args.session_id);
    let recorder = PassRecorder::new(&session_dir)
        .map_err(|e| vergence_cli_error("preparing session directory", e))?;

    let done = recorder.recorded_passes()?;
    if done >= MAX_PASSES {
        let report = PassReport::max_passes(done, args.previous_diff);
        eprintln!("pass budget of {MAX_PASSES} exhausted for session '{}'", args.session_id);
        println!("{}", serde_json::to_string(&report)?);
        return Ok(PassStatus::MaxPassesReached);
    }
    let pass_index = done + 1;

    let reference =
        load_image(&args.reference).map_err(|e| vergence_cli_error("loading reference", e))?;
    let rendered =
        load_image(&args.rendered).map_err(|e| vergence_cli_error("loading rendered image", e))?;

    recorder.record_reference(&reference)?;
    let comparison = compare(&reference, &rendered)
        .map_err(|e| vergence_cli_error("comparing images", e))?;
    let artifacts = recorder.record_pass(pass_index, &rendered, &comparison.heatmap)?;

    let status = decide(comparison.diff_percent, args.previous_diff);
    eprintln!(
        "pass {pass_index}: diff {:.2}% ({}) -> {status}",
        comparison.diff_percent, comparison.note
    );

    let report = PassReport {
        status,
        pass_index,
        diff_percent: Some(comparison.diff_percent),
        prior_diff_percent: args.previous_diff,
        dimension_note: Some(comparison.note),
        rendered_path: Some(artifacts.rendered_path),
        heatmap_path: Some(artifacts.heatmap_path),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(status)
}

fn validate(args: &Args) -> Result<(), vergence::VergenceError> {
    use vergence::VergenceError::Usage;
    if args.session_id.is_empty() {
        return Err(Usage("session id must not be empty".to_string()));
    }
    if args.session_id.contains(['/', '\\']) {
        return Err(Usage(format!(
            "session id '{}' must not contain path separators",
            args.session_id
        )));
    }
    if let Some(prev) = args.previous_diff {
        if !prev.is_finite() || !(0.0..=100.0).contains(&prev) {
            return Err(Usage(format!(
                "previous diff {prev} must be a percentage in [0, 100]"
            )));
        }
    }
    Ok(())
}
