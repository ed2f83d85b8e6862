//! Session state for one page lifecycle
//!
//! One instance per page load, owned exclusively by the reconciliation
//! loop. Everything else in the crate is a pure function of the document
//! and its arguments.

use crate::settings::{Mode, Settings};
use url::Url;

/// Stage within the staged initialization wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    /// Waiting for the media container to appear
    WaitingForContainer,
    /// Container found; waiting for a video element
    WaitingForVideo,
    /// Video found; letting asynchronous DOM replacement finish
    Settling,
}

/// Lifecycle phase of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No toggle control or render exists for this page instance
    Uninitialized,
    /// Staged waits in progress
    Initializing(InitStage),
    /// Toggle control and initial render are in place
    Ready,
}

/// Mutable state of the reconciliation loop
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Current presentation mode, persisted externally
    pub mode: Mode,
    /// Lifecycle phase
    pub phase: Phase,
    /// Last observed location, for SPA navigation detection
    pub last_url: Url,
    /// Per-platform overlay info preferences
    pub settings: Settings,
    /// Whether a toggle control was created for this page instance;
    /// the vanish heuristic only applies when one existed
    pub toggle_built: bool,
}

impl SessionState {
    /// Fresh state for a page at the given location
    pub fn new(mode: Mode, settings: Settings, url: Url) -> Self {
        Self {
            mode,
            phase: Phase::Uninitialized,
            last_url: url,
            settings,
            toggle_built: false,
        }
    }

    /// Whether initialization has completed for this page instance
    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }
}
