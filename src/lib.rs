//! # Avswitch - Audio-Only Presentation Switcher
//!
//! An engine that toggles YouTube and YouTube Music pages between their
//! native video presentation and an audio-only one: the video element is
//! hidden and a thumbnail overlay with track metadata is shown in its
//! place. The engine reacts to DOM mutations and single-page-app
//! navigation, persists the user's mode preference, and speaks a small
//! message protocol with a companion settings surface.
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - **dom**: host page model - arena document, selectors, mutation log
//! - **page**: stateless page inspection (platform, containers, metadata)
//! - **overlay**: thumbnail overlay and toggle control rendering
//! - **settings**: persisted preferences behind a key-value store trait
//! - **bridge**: message protocol with the settings surface
//! - **engine**: the reconciliation loop and its async driver
//! - **utils**: shared utilities and error types

pub mod bridge;
pub mod dom;
pub mod engine;
pub mod overlay;
pub mod page;
pub mod settings;
pub mod utils;

// Re-export main types for convenience
pub use engine::{Driver, Engine, EngineConfig, HostEvent};
pub use utils::error::{AvswitchError, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "Avswitch";

/// Reconciliation timing constants, in milliseconds
pub mod timing {
    /// Bounded wait for the media container / video element to appear
    pub const ELEMENT_WAIT_MS: u64 = 5000;
    /// Settle delay between video detection and the first render
    pub const INIT_SETTLE_MS: u64 = 500;
    /// Back-off before reinitializing after the toggle control vanished
    pub const REINIT_BACKOFF_MS: u64 = 1000;
    /// Quiet period before a debounced title refresh runs
    pub const REFRESH_DEBOUNCE_MS: u64 = 800;
    /// Wait for new page content to mount after a navigation
    pub const NAVIGATION_SETTLE_MS: u64 = 300;
    /// Delay before revealing a freshly inserted overlay
    pub const FADE_IN_DELAY_MS: u64 = 50;
    /// Overlay fade-out before a refresh rebuild
    pub const REFRESH_FADE_MS: u64 = 200;
    /// Overlay fade-out on navigation
    pub const NAVIGATION_FADE_MS: u64 = 100;
}
