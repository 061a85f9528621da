use image::{DynamicImage, Rgb, RgbImage};
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use vergence::{
    compare, decide, ConvergenceSession, PassRecorder, PassStatus, Renderer, VergenceError,
    GOOD_ENOUGH_DIFF, MAX_PASSES, TARGET_DIFF,
};

fn solid(level: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([level, level, level])))
}

/// Renders a scripted sequence of gray levels, holding the last one once
/// the script runs out. Ignores the candidate contents.
struct ScriptedRenderer {
    levels: Vec<u8>,
    next: usize,
}

impl Renderer for ScriptedRenderer {
    fn render(&mut self, _candidate: &Path) -> Result<DynamicImage, VergenceError> {
        let idx = self.next.min(self.levels.len() - 1);
        self.next += 1;
        Ok(solid(self.levels[idx]))
    }
}

proptest! {
    #[test]
    fn solid_gray_diff_matches_the_rmse_formula(a in any::<u8>(), b in any::<u8>()) {
        let cmp = compare(&solid(a), &solid(b)).unwrap();
        let expected = (f64::from(a.abs_diff(b)) / 255.0 * 100.0 * 100.0).round() / 100.0;
        prop_assert!((cmp.diff_percent - expected).abs() < 1e-9,
            "a={a} b={b} got {} want {expected}", cmp.diff_percent);
    }

    #[test]
    fn policy_is_total_and_never_max_passes(
        diff in 0.0f64..=100.0,
        prior in proptest::option::of(0.0f64..=100.0),
    ) {
        let status = decide(diff, prior);
        prop_assert_ne!(status, PassStatus::MaxPassesReached);
        if diff <= GOOD_ENOUGH_DIFF {
            prop_assert_eq!(status, PassStatus::GoodEnough);
        } else if diff <= TARGET_DIFF {
            prop_assert_eq!(status, PassStatus::Success);
        } else if prior.map_or(true, |p| diff < p) {
            prop_assert_eq!(status, PassStatus::NeedsFix);
        } else {
            prop_assert_eq!(status, PassStatus::NoImprovement);
        }
    }

    #[test]
    fn every_edit_sequence_terminates_within_budget(
        levels in proptest::collection::vec(any::<u8>(), 1..20),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let candidate = dir.path().join("candidate.bin");
        fs::write(&candidate, b"state").unwrap();
        let recorder = PassRecorder::new(dir.path().join("session")).unwrap();
        let mut session = ConvergenceSession::new(solid(0), &candidate, recorder).unwrap();
        let mut renderer = ScriptedRenderer { levels, next: 0 };

        let mut calls = 0u32;
        loop {
            let before = session.pass_count();
            let report = session.run_pass(&mut renderer).unwrap();
            calls += 1;
            if report.status.is_terminal() {
                break;
            }
            // each non-terminal call consumes exactly one pass
            prop_assert_eq!(session.pass_count(), before + 1);
            prop_assert!(calls <= MAX_PASSES, "still running after {calls} calls");
        }
        prop_assert!(session.pass_count() <= MAX_PASSES);
        prop_assert!(calls <= MAX_PASSES + 1);
    }
}
