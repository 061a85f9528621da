//! Core logic for the vergence visual-reconciliation engine.
//!
//! A rendered candidate is diffed against a reference image pass by pass
//! until the difference falls within tolerance, the pass budget runs out,
//! or the caller gives up. Non-improving edits are rolled back to the
//! known-good snapshot so they never pollute the next pass's baseline.

pub mod compare;
pub mod error;
pub mod io_utils;
pub mod recorder;
pub mod session;
pub mod snapshot;

pub use compare::{compare, load_image, Comparison, DimensionNote};
pub use error::VergenceError;
pub use recorder::{PassArtifacts, PassRecorder};
pub use session::{
    decide, ConvergenceSession, PassReport, PassStatus, Renderer, GOOD_ENOUGH_DIFF, MAX_PASSES,
    TARGET_DIFF,
};
pub use snapshot::{capture, restore, SnapshotHandle};
