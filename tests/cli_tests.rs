use image::{Rgb, RgbImage};
use std::path::Path;
use std::process::{Command, Output};

fn write_solid(path: &Path, w: u32, h: u32, rgb: [u8; 3]) {
    RgbImage::from_pixel(w, h, Rgb(rgb)).save(path).unwrap();
}

fn run_pass(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vergence"))
        .args(args)
        .output()
        .expect("vergence failed to start")
}

fn json_line(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout is not a JSON line")
}

#[test]
fn identical_images_exit_good_enough() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("reference.png");
    let rendered = dir.path().join("rendered.png");
    write_solid(&reference, 100, 100, [0, 0, 255]);
    write_solid(&rendered, 100, 100, [0, 0, 255]);
    let root = dir.path().join("sessions");

    let out = run_pass(&[
        reference.to_str().unwrap(),
        rendered.to_str().unwrap(),
        "--session-id",
        "s1",
        "--session-root",
        root.to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(2));

    let report = json_line(&out);
    assert_eq!(report["status"], "good-enough");
    assert_eq!(report["pass"], 1);
    assert_eq!(report["diff"], 0.0);
    assert_eq!(report["note"], "match");

    assert!(root.join("s1/reference.png").is_file());
    assert!(root.join("s1/pass-1/rendered.png").is_file());
    assert!(root.join("s1/pass-1/diff.png").is_file());
}

#[test]
fn first_pass_large_diff_needs_fix() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("reference.png");
    let rendered = dir.path().join("rendered.png");
    write_solid(&reference, 100, 100, [0, 0, 255]);
    write_solid(&rendered, 100, 100, [255, 0, 0]);
    let root = dir.path().join("sessions");

    let out = run_pass(&[
        reference.to_str().unwrap(),
        rendered.to_str().unwrap(),
        "--session-id",
        "s1",
        "--session-root",
        root.to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(1));

    let report = json_line(&out);
    assert_eq!(report["status"], "needs-fix");
    assert!(report["diff"].as_f64().unwrap() > 50.0);
    assert!(report["prior_diff"].is_null());
}

#[test]
fn previous_diff_drives_the_improvement_check() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("reference.png");
    let rendered = dir.path().join("rendered.png");
    write_solid(&reference, 50, 50, [0, 0, 255]);
    write_solid(&rendered, 50, 50, [255, 0, 0]);
    let root = dir.path().join("sessions");

    // diff is ~81.65; previous 10.0 -> regression
    let out = run_pass(&[
        reference.to_str().unwrap(),
        rendered.to_str().unwrap(),
        "--session-id",
        "worse",
        "--session-root",
        root.to_str().unwrap(),
        "--previous-diff",
        "10.0",
    ]);
    assert_eq!(out.status.code(), Some(6));
    assert_eq!(json_line(&out)["status"], "no-improvement");

    // previous 90.0 -> improvement
    let out = run_pass(&[
        reference.to_str().unwrap(),
        rendered.to_str().unwrap(),
        "--session-id",
        "better",
        "--session-root",
        root.to_str().unwrap(),
        "--previous-diff",
        "90.0",
    ]);
    assert_eq!(out.status.code(), Some(1));
    let report = json_line(&out);
    assert_eq!(report["status"], "needs-fix");
    assert_eq!(report["prior_diff"], 90.0);
}

#[test]
fn pass_index_advances_per_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("reference.png");
    let rendered = dir.path().join("rendered.png");
    write_solid(&reference, 20, 20, [0, 0, 255]);
    write_solid(&rendered, 20, 20, [255, 0, 0]);
    let root = dir.path().join("sessions");

    let args = [
        reference.to_str().unwrap(),
        rendered.to_str().unwrap(),
        "--session-id",
        "s1",
        "--session-root",
        root.to_str().unwrap(),
    ];
    let first = run_pass(&args);
    let second = run_pass(&args);
    assert_eq!(json_line(&first)["pass"], 1);
    assert_eq!(json_line(&second)["pass"], 2);
    assert!(root.join("s1/pass-2/diff.png").is_file());
}

#[test]
fn exhausted_budget_exits_before_comparing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sessions");
    let session = root.join("full");
    for n in 1..=10 {
        std::fs::create_dir_all(session.join(format!("pass-{n}"))).unwrap();
    }

    // image paths do not even exist: the guard must fire first
    let out = run_pass(&[
        "no-such-reference.png",
        "no-such-rendered.png",
        "--session-id",
        "full",
        "--session-root",
        root.to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(5));
    assert_eq!(json_line(&out)["status"], "max-passes");
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sessions");
    let out = run_pass(&[
        "no-such-reference.png",
        "no-such-rendered.png",
        "--session-id",
        "s1",
        "--session-root",
        root.to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(10));
    assert!(out.stdout.is_empty());
}

#[test]
fn malformed_invocation_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("reference.png");
    write_solid(&reference, 10, 10, [0, 0, 255]);

    let out = run_pass(&[
        reference.to_str().unwrap(),
        reference.to_str().unwrap(),
        "--session-id",
        "bad/id",
        "--session-root",
        dir.path().to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(10));

    let out = run_pass(&[
        reference.to_str().unwrap(),
        reference.to_str().unwrap(),
        "--session-id",
        "s1",
        "--session-root",
        dir.path().to_str().unwrap(),
        "--previous-diff",
        "250",
    ]);
    assert_eq!(out.status.code(), Some(10));
}

#[test]
fn imgdiff_reports_and_exits_by_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let blue = dir.path().join("blue.png");
    let red = dir.path().join("red.png");
    write_solid(&blue, 10, 10, [0, 0, 255]);
    write_solid(&red, 10, 10, [255, 0, 0]);

    let out = Command::new(env!("CARGO_BIN_EXE_imgdiff"))
        .args([blue.to_str().unwrap(), blue.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("diff=0.00"), "got {stdout}");

    let heatmap = dir.path().join("heat.png");
    let out = Command::new(env!("CARGO_BIN_EXE_imgdiff"))
        .args([
            blue.to_str().unwrap(),
            red.to_str().unwrap(),
            "--heatmap",
            heatmap.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(heatmap.is_file());
}
