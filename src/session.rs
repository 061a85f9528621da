//! The convergence state machine: one render, diff, decide step at a time.
//!
//! A session owns the pass sequence for one candidate against one
//! reference. The external repair actor mutates the candidate between
//! passes; the session judges each result, keeps the known-good snapshot
//! current, and rolls the candidate back whenever an edit did not improve
//! the diff.

use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::compare::{self, Comparison, DimensionNote};
use crate::error::VergenceError;
use crate::recorder::PassRecorder;
use crate::snapshot::{self, SnapshotHandle};

/// Hard ceiling on the number of passes. Bounds worst-case cost; hitting
/// it is a graceful termination, not an error.
pub const MAX_PASSES: u32 = 10;
/// Diff percentage at or below which the candidate is accepted.
pub const TARGET_DIFF: f64 = 5.0;
/// Diff percentage at or below which the match is essentially pixel-perfect.
pub const GOOD_ENOUGH_DIFF: f64 = 1.0;

/// Caller-supplied rendering of the current candidate state.
///
/// Rendering an unchanged candidate must produce materially identical
/// pixels; the no-improvement check relies on it. Failures, including
/// caller-imposed timeouts, surface as [`VergenceError::Render`] and are
/// never retried here.
pub trait Renderer {
    fn render(&mut self, candidate: &Path) -> Result<DynamicImage, VergenceError>;
}

impl<F> Renderer for F
where
    F: FnMut(&Path) -> Result<DynamicImage, VergenceError>,
{
    fn render(&mut self, candidate: &Path) -> Result<DynamicImage, VergenceError> {
        self(candidate)
    }
}

/// Outcome of one pass. Terminal states end the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassStatus {
    /// Diff is at or below [`TARGET_DIFF`]. Terminal.
    #[serde(rename = "success")]
    Success,
    /// Diff is at or below [`GOOD_ENOUGH_DIFF`]. Terminal.
    #[serde(rename = "good-enough")]
    GoodEnough,
    /// Above target but the baseline was established or improved; the
    /// repair actor should make another edit.
    #[serde(rename = "needs-fix")]
    NeedsFix,
    /// The last edit did not improve the diff and has been rolled back;
    /// the repair actor must try a materially different edit.
    #[serde(rename = "no-improvement")]
    NoImprovement,
    /// Pass budget exhausted. Terminal; the current state is accepted.
    #[serde(rename = "max-passes")]
    MaxPassesReached,
}

impl PassStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PassStatus::Success | PassStatus::GoodEnough | PassStatus::MaxPassesReached
        )
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PassStatus::Success => "success",
            PassStatus::GoodEnough => "good-enough",
            PassStatus::NeedsFix => "needs-fix",
            PassStatus::NoImprovement => "no-improvement",
            PassStatus::MaxPassesReached => "max-passes",
        };
        f.write_str(s)
    }
}

/// Tolerance policy for a single measured diff.
///
/// `prior` is the diff recorded by the previous pass, absent on the first
/// pass. Never returns [`PassStatus::MaxPassesReached`]; the pass budget
/// is guarded before any comparison happens.
pub fn decide(diff: f64, prior: Option<f64>) -> PassStatus {
    if diff <= GOOD_ENOUGH_DIFF {
        PassStatus::GoodEnough
    } else if diff <= TARGET_DIFF {
        PassStatus::Success
    } else {
        match prior {
            None => PassStatus::NeedsFix,
            Some(p) if diff < p => PassStatus::NeedsFix,
            Some(_) => PassStatus::NoImprovement,
        }
    }
}

/// Structured result of one `run_pass` call, also the CLI's JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub status: PassStatus,
    #[serde(rename = "pass")]
    pub pass_index: u32,
    #[serde(rename = "diff")]
    pub diff_percent: Option<f64>,
    #[serde(rename = "prior_diff")]
    pub prior_diff_percent: Option<f64>,
    #[serde(rename = "note")]
    pub dimension_note: Option<DimensionNote>,
    #[serde(rename = "rendered")]
    pub rendered_path: Option<PathBuf>,
    #[serde(rename = "heatmap")]
    pub heatmap_path: Option<PathBuf>,
}

impl PassReport {
    /// Report for the pass-budget guard: nothing was rendered or compared.
    pub fn max_passes(pass_count: u32, last_diff: Option<f64>) -> Self {
        Self {
            status: PassStatus::MaxPassesReached,
            pass_index: pass_count,
            diff_percent: last_diff,
            prior_diff_percent: last_diff,
            dimension_note: None,
            rendered_path: None,
            heatmap_path: None,
        }
    }
}

/// One candidate's pass sequence against one reference image.
pub struct ConvergenceSession {
    reference: DynamicImage,
    candidate: PathBuf,
    recorder: PassRecorder,
    pass_count: u32,
    last_diff: Option<f64>,
    known_good: Option<SnapshotHandle>,
    finished: Option<PassReport>,
}

impl ConvergenceSession {
    /// Start a session. Persists the reference image into the session
    /// directory; no snapshot is taken until the first pass is judged.
    pub fn new(
        reference: DynamicImage,
        candidate: impl Into<PathBuf>,
        recorder: PassRecorder,
    ) -> Result<Self, VergenceError> {
        recorder.record_reference(&reference)?;
        Ok(Self {
            reference,
            candidate: candidate.into(),
            recorder,
            pass_count: 0,
            last_diff: None,
            known_good: None,
            finished: None,
        })
    }

    pub fn pass_count(&self) -> u32 {
        self.pass_count
    }

    pub fn last_diff(&self) -> Option<f64> {
        self.last_diff
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Digest of the current known-good candidate state, if one exists.
    pub fn known_good_digest(&self) -> Option<String> {
        self.known_good.as_ref().map(|h| h.digest_hex())
    }

    /// Perform one render, diff, decide step.
    ///
    /// After a terminal status has been returned, further calls are no-ops
    /// that return the same final report without invoking the renderer.
    pub fn run_pass(
        &mut self,
        renderer: &mut dyn Renderer,
    ) -> Result<PassReport, VergenceError> {
        if let Some(report) = &self.finished {
            return Ok(report.clone());
        }
        if self.pass_count >= MAX_PASSES {
            let report = PassReport::max_passes(self.pass_count, self.last_diff);
            self.finished = Some(report.clone());
            return Ok(report);
        }

        let pass_index = self.pass_count + 1;
        let rendered = renderer.render(&self.candidate)?;
        let Comparison {
            diff_percent,
            heatmap,
            note,
        } = compare::compare(&self.reference, &rendered)?;
        let artifacts = self.recorder.record_pass(pass_index, &rendered, &heatmap)?;

        let prior = self.last_diff;
        let status = decide(diff_percent, prior);
        if status == PassStatus::NoImprovement {
            // Undo the edit that produced this pass; the rejected diff is
            // still recorded below so the next improvement check compares
            // against it.
            let handle = self.known_good.as_ref().ok_or_else(|| {
                VergenceError::Snapshot("no known-good snapshot to restore".to_string())
            })?;
            snapshot::restore(&self.candidate, handle)?;
        } else {
            self.known_good = Some(snapshot::capture(&self.candidate)?);
        }

        self.pass_count = pass_index;
        self.last_diff = Some(diff_percent);

        let report = PassReport {
            status,
            pass_index,
            diff_percent: Some(diff_percent),
            prior_diff_percent: prior,
            dimension_note: Some(note),
            rendered_path: Some(artifacts.rendered_path),
            heatmap_path: Some(artifacts.heatmap_path),
        };
        if status.is_terminal() {
            self.finished = Some(report.clone());
        }
        Ok(report)
    }
}
