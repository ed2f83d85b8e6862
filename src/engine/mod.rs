//! Reconciliation loop
//!
//! The stateful core of the switcher. It owns the session state and
//! decides, on every mutation batch, navigation event, timer firing, or
//! inbound message, whether to reinitialize, refresh, or do nothing:
//!
//! 1. Staged initialization waits for the media container, then a video
//!    element, then a settle delay, before building the toggle control and
//!    rendering for the first time
//! 2. Mutation batches are filtered - a vanished toggle control means the
//!    page navigated and everything rebuilds after a back-off; a touched
//!    title node arms the debounced refresh
//! 3. Navigation is detected by polling the location on every batch and by
//!    explicit navigation events from the host
//!
//! Everything degrades to "no toggle, no overlay" instead of failing:
//! absent elements and expired waits are ordinary states the next event
//! retries.

mod driver;
mod session;
mod timers;

pub use driver::{Driver, HostEvent};
pub use session::{InitStage, Phase, SessionState};
pub use timers::{AfterFade, TimerAction, TimerId, TimerQueue};

use crate::bridge::{Request, Response};
use crate::dom::{Document, MutationKind, MutationRecord, NodeId};
use crate::overlay;
use crate::page::{self, Platform};
use crate::settings::{Mode, Settings, SettingsStore};
use crate::timing;

/// Timing knobs for the loop, in milliseconds
///
/// Defaults mirror the production constants in [`crate::timing`]; tests
/// shrink them to keep simulated clocks short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bounded wait for the container / video element to appear
    pub element_wait_ms: u64,
    /// Settle delay between video detection and the first render
    pub init_settle_ms: u64,
    /// Back-off before reinitializing after the toggle control vanished
    pub reinit_backoff_ms: u64,
    /// Quiet period before a title refresh runs
    pub refresh_debounce_ms: u64,
    /// Wait for new page content to mount after a navigation
    pub navigation_settle_ms: u64,
    /// Delay before revealing a freshly inserted overlay
    pub fade_in_delay_ms: u64,
    /// Overlay fade-out before a refresh rebuild
    pub refresh_fade_ms: u64,
    /// Overlay fade-out on navigation
    pub navigation_fade_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            element_wait_ms: timing::ELEMENT_WAIT_MS,
            init_settle_ms: timing::INIT_SETTLE_MS,
            reinit_backoff_ms: timing::REINIT_BACKOFF_MS,
            refresh_debounce_ms: timing::REFRESH_DEBOUNCE_MS,
            navigation_settle_ms: timing::NAVIGATION_SETTLE_MS,
            fade_in_delay_ms: timing::FADE_IN_DELAY_MS,
            refresh_fade_ms: timing::REFRESH_FADE_MS,
            navigation_fade_ms: timing::NAVIGATION_FADE_MS,
        }
    }
}

/// The reconciliation engine for one page session
///
/// All entry points take the document and a millisecond clock value; the
/// engine never reads wall time itself. On unrecognized hosts every entry
/// point is a no-op and no timers are ever scheduled.
pub struct Engine<S: SettingsStore> {
    platform: Option<Platform>,
    state: SessionState,
    config: EngineConfig,
    timers: TimerQueue,
    store: S,
    /// Pending debounced refresh; rescheduling replaces it
    refresh_timer: Option<TimerId>,
    /// Pending reinitialization back-off
    reinit_timer: Option<TimerId>,
    /// Bounded-wait deadline for the current init stage
    init_deadline: Option<TimerId>,
    /// Container carrying the loading class during initialization
    loading_container: Option<NodeId>,
}

impl<S: SettingsStore> Engine<S> {
    /// Create an engine for the document's location, loading persisted
    /// preferences from the store
    pub fn new(doc: &Document, store: S) -> Engine<S> {
        Self::with_config(doc, store, EngineConfig::default())
    }

    /// Create an engine with explicit timing knobs
    pub fn with_config(doc: &Document, store: S, config: EngineConfig) -> Engine<S> {
        let platform = Platform::from_url(doc.url());
        let mode = Mode::load(&store);
        let settings = Settings::load(&store);
        Engine {
            platform,
            state: SessionState::new(mode, settings, doc.url().clone()),
            config,
            timers: TimerQueue::new(),
            store,
            refresh_timer: None,
            reinit_timer: None,
            init_deadline: None,
            loading_container: None,
        }
    }

    /// Current presentation mode
    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Current overlay info preferences
    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Detected platform, if the host was recognized
    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    /// The settings store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Earliest pending timer deadline, for the driver
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Begin the session: inject base styles and start initialization
    pub fn start(&mut self, doc: &mut Document, now: u64) {
        if self.platform.is_none() {
            return;
        }
        log::info!("starting on {}", doc.url());
        overlay::inject_base_styles(doc);
        self.begin_initialization(doc, now);
    }

    /// Feed one batch of DOM mutations into the loop
    pub fn on_mutations(&mut self, doc: &mut Document, batch: &[MutationRecord], now: u64) {
        let Some(platform) = self.platform else { return };
        self.check_url_change(doc, now);

        match self.state.phase {
            Phase::Initializing(_) => self.advance_initialization(doc, now),
            Phase::Uninitialized => {}
            Phase::Ready => {
                if self.state.toggle_built && overlay::toggle_control(doc).is_none() {
                    log::debug!("toggle control vanished, scheduling reinitialization");
                    self.state.phase = Phase::Uninitialized;
                    self.state.toggle_built = false;
                    self.timers.schedule_replacing(
                        now,
                        self.config.reinit_backoff_ms,
                        TimerAction::Reinitialize,
                        &mut self.reinit_timer,
                    );
                } else if batch.iter().any(|r| page::is_title_mutation(doc, r, platform)) {
                    self.timers.schedule_replacing(
                        now,
                        self.config.refresh_debounce_ms,
                        TimerAction::Refresh,
                        &mut self.refresh_timer,
                    );
                } else if !self.state.toggle_built
                    && batch.iter().any(|r| {
                        matches!(r.kind, MutationKind::Media | MutationKind::ChildrenAdded)
                    })
                    && page::has_genuine_video(doc, platform)
                {
                    // A video that previously looked like an audio track now
                    // reports real content; pick it up without a full reinit
                    self.try_build_toggle(doc);
                    self.apply_presentation(doc, now);
                }
            }
        }
    }

    /// A host navigation event (history push/replace or back/forward)
    pub fn on_navigation(&mut self, doc: &mut Document, now: u64) {
        if self.platform.is_none() {
            return;
        }
        self.check_url_change(doc, now);
    }

    /// A settings message from the companion surface; always acknowledged
    pub fn on_message(&mut self, doc: &mut Document, request: Request, now: u64) -> Response {
        let Request::UpdateSettings { platform, show_info } = request;
        self.state.settings.set_show_info(platform, show_info);
        log::debug!("settings update: {platform:?} show_info={show_info}");

        if self.platform == Some(platform)
            && self.state.mode.is_audio_only()
            && overlay::overlay(doc).is_some()
        {
            overlay::detach_overlay(doc);
            self.apply_presentation(doc, now);
        }
        Response::ack()
    }

    /// A click on the page, dispatched by node
    pub fn on_click(&mut self, doc: &mut Document, target: NodeId, now: u64) {
        let Some(platform) = self.platform else { return };

        if let Some(toggle) = overlay::toggle_control(doc) {
            if doc.contains(toggle, target) {
                self.toggle_mode(doc, now);
                return;
            }
        }

        let Some(node) = overlay::overlay(doc) else { return };
        if doc.contains(node, target) && overlay::overlay_controls_playback(platform) {
            if let Some(video) = page::find_video(doc, None) {
                if let Some(media) = doc.media_state(video) {
                    let mut next = media.clone();
                    next.paused = !next.paused;
                    log::debug!("overlay click: paused={}", next.paused);
                    doc.set_media_state(video, next);
                }
            }
        }
    }

    /// Flip the mode, persist it, and re-render synchronously
    pub fn toggle_mode(&mut self, doc: &mut Document, now: u64) {
        if self.platform.is_none() {
            return;
        }
        self.state.mode = self.state.mode.toggled();
        self.state.mode.persist(&mut self.store);
        log::info!("mode toggled to {:?}", self.state.mode);
        overlay::update_toggle(doc, self.state.mode);
        self.apply_presentation(doc, now);
    }

    /// Run every timer action due at `now`
    pub fn tick(&mut self, doc: &mut Document, now: u64) {
        if self.platform.is_none() {
            return;
        }
        for (id, action) in self.timers.pop_due(now) {
            self.clear_handle(id);
            self.handle_action(doc, action, now);
        }
    }

    fn clear_handle(&mut self, id: TimerId) {
        for handle in [
            &mut self.refresh_timer,
            &mut self.reinit_timer,
            &mut self.init_deadline,
        ] {
            if *handle == Some(id) {
                *handle = None;
            }
        }
    }

    fn handle_action(&mut self, doc: &mut Document, action: TimerAction, now: u64) {
        match action {
            TimerAction::InitDeadline => match self.state.phase {
                Phase::Initializing(InitStage::WaitingForContainer) => {
                    log::debug!("media container wait timed out");
                    self.complete_initialization(doc, now);
                }
                Phase::Initializing(InitStage::WaitingForVideo) => {
                    log::debug!("video element wait timed out");
                    self.state.phase = Phase::Initializing(InitStage::Settling);
                    self.timers
                        .schedule(now, self.config.init_settle_ms, TimerAction::InitSettled);
                }
                _ => {}
            },
            TimerAction::InitSettled => {
                if self.state.phase == Phase::Initializing(InitStage::Settling) {
                    self.complete_initialization(doc, now);
                }
            }
            TimerAction::Reinitialize => {
                if self.state.phase == Phase::Uninitialized {
                    self.begin_initialization(doc, now);
                }
            }
            TimerAction::Refresh => self.refresh_overlay(doc, now),
            TimerAction::FadeIn => overlay::fade_in_overlay(doc),
            TimerAction::FadeOutDone(AfterFade::Rebuild) => {
                overlay::detach_overlay(doc);
                self.apply_presentation(doc, now);
            }
            TimerAction::FadeOutDone(AfterFade::SettleNavigation) => {
                overlay::detach_overlay(doc);
                self.timers.schedule(
                    now,
                    self.config.navigation_settle_ms,
                    TimerAction::NavigationSettled,
                );
            }
            TimerAction::NavigationSettled => self.apply_presentation(doc, now),
        }
    }

    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    fn begin_initialization(&mut self, doc: &mut Document, now: u64) {
        self.state.phase = Phase::Initializing(InitStage::WaitingForContainer);
        self.loading_container = None;
        self.arm_init_deadline(now);
        self.advance_initialization(doc, now);
    }

    fn arm_init_deadline(&mut self, now: u64) {
        self.timers.schedule_replacing(
            now,
            self.config.element_wait_ms,
            TimerAction::InitDeadline,
            &mut self.init_deadline,
        );
    }

    fn clear_init_deadline(&mut self) {
        if let Some(id) = self.init_deadline.take() {
            self.timers.cancel(id);
        }
    }

    /// Probe the awaited element for the current init stage and advance
    fn advance_initialization(&mut self, doc: &mut Document, now: u64) {
        let Some(platform) = self.platform else { return };
        loop {
            match self.state.phase {
                Phase::Initializing(InitStage::WaitingForContainer) => {
                    let Some(container) = page::find_media_container(doc, platform) else {
                        break;
                    };
                    doc.add_class(container, overlay::LOADING_CLASS);
                    self.loading_container = Some(container);
                    self.state.phase = Phase::Initializing(InitStage::WaitingForVideo);
                    self.arm_init_deadline(now);
                }
                Phase::Initializing(InitStage::WaitingForVideo) => {
                    if page::find_video(doc, None).is_none() {
                        break;
                    }
                    self.clear_init_deadline();
                    self.state.phase = Phase::Initializing(InitStage::Settling);
                    self.timers
                        .schedule(now, self.config.init_settle_ms, TimerAction::InitSettled);
                    break;
                }
                _ => break,
            }
        }
    }

    fn complete_initialization(&mut self, doc: &mut Document, now: u64) {
        self.clear_init_deadline();
        if let Some(container) = self.loading_container.take() {
            doc.remove_class(container, overlay::LOADING_CLASS);
        }
        self.try_build_toggle(doc);
        self.apply_presentation(doc, now);
        self.state.phase = Phase::Ready;
        log::info!("initialized on {}", self.state.last_url);
    }

    /// Build the toggle control if the page qualifies
    fn try_build_toggle(&mut self, doc: &mut Document) -> bool {
        let Some(platform) = self.platform else { return false };
        if overlay::toggle_control(doc).is_some() {
            self.state.toggle_built = true;
            return true;
        }
        if !page::has_genuine_video(doc, platform) {
            log::debug!("no genuine video detected, skipping toggle control");
            return false;
        }
        let Some(container) = page::find_media_container(doc, platform) else {
            return false;
        };
        let compact = page::is_compact_layout(doc, container);
        overlay::build_toggle(doc, container, self.state.mode, compact);
        self.state.toggle_built = true;
        true
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Reconcile the page presentation with the current mode
    ///
    /// Idempotent: an existing overlay is left alone, and hide/show only
    /// re-set styles.
    fn apply_presentation(&mut self, doc: &mut Document, now: u64) {
        let Some(platform) = self.platform else { return };
        let Some(container) = page::find_media_container(doc, platform) else {
            return;
        };
        if !page::has_genuine_video(doc, platform) {
            log::debug!("no genuine video detected, leaving presentation untouched");
            return;
        }

        if self.state.mode.is_audio_only() {
            overlay::hide_video(doc, platform, container);
            if overlay::overlay(doc).is_none() {
                let video_id = page::extract_video_id(doc.url());
                let track = page::extract_track_info(doc, platform);
                let show_info = self.state.settings.show_info_for(platform);
                overlay::build_overlay(doc, container, video_id.as_deref(), &track, show_info);
                self.timers
                    .schedule(now, self.config.fade_in_delay_ms, TimerAction::FadeIn);
            }
        } else {
            overlay::detach_overlay(doc);
            overlay::show_video(doc, platform, container);
        }
    }

    /// Debounced refresh: rebuild the overlay only for a settled new title
    fn refresh_overlay(&mut self, doc: &mut Document, now: u64) {
        let Some(platform) = self.platform else { return };
        if !self.state.mode.is_audio_only() || overlay::overlay(doc).is_none() {
            return;
        }
        let track = page::extract_track_info(doc, platform);
        if !track.is_ready() {
            return;
        }
        if overlay::displayed_title(doc).as_deref() == Some(track.title.as_str()) {
            return;
        }
        overlay::begin_overlay_fade(doc, self.config.refresh_fade_ms);
        self.timers.schedule(
            now,
            self.config.refresh_fade_ms,
            TimerAction::FadeOutDone(AfterFade::Rebuild),
        );
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Compare the location against the last seen one
    fn check_url_change(&mut self, doc: &mut Document, now: u64) {
        if doc.url() == &self.state.last_url {
            return;
        }
        let from = self.state.last_url.clone();
        self.state.last_url = doc.url().clone();
        log::info!("url changed from {from} to {}", self.state.last_url);

        if self.state.mode.is_audio_only() && overlay::overlay(doc).is_some() {
            overlay::begin_overlay_fade(doc, self.config.navigation_fade_ms);
            self.timers.schedule(
                now,
                self.config.navigation_fade_ms,
                TimerAction::FadeOutDone(AfterFade::SettleNavigation),
            );
        }
    }
}
