//! Overlay renderer
//!
//! Owns the two ephemeral nodes the switcher puts on the page: the
//! thumbnail overlay (audio-only presentation) and the toggle control.
//! Overlays are destroyed and rebuilt, never mutated in place; hide/show
//! of the native video is idempotent style twiddling. Fades and settle
//! waits are scheduled by the reconciliation loop - this module only
//! applies the styles.

use crate::dom::{Document, NodeId, SelectorList};
use crate::page::{self, Platform, TrackInfo};
use crate::settings::Mode;

/// Element id of the thumbnail overlay
pub const OVERLAY_ID: &str = "avswitch-overlay";
/// Element id of the toggle control
pub const TOGGLE_ID: &str = "avswitch-toggle";
/// Element id of the injected base stylesheet
pub const STYLE_ID: &str = "avswitch-style";
/// Class applied to the container while initialization settles
pub const LOADING_CLASS: &str = "avswitch-loading";

/// Border colors reflecting the current mode
const AUDIO_BORDER: &str = "#ff6b6b";
const VIDEO_BORDER: &str = "#4ecdc4";

/// Deterministic thumbnail URL for a video id
pub fn thumbnail_url(video_id: &str) -> String {
    thumbnail_url_with_quality(video_id, "maxresdefault")
}

/// Thumbnail URL with an explicit quality variant
pub fn thumbnail_url_with_quality(video_id: &str, quality: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/{quality}.jpg")
}

/// Inject the anti-flicker stylesheet once per page instance
pub fn inject_base_styles(doc: &mut Document) {
    if doc.get_element_by_id(STYLE_ID).is_some() {
        return;
    }
    let style = doc.create_element("style");
    doc.set_attribute(style, "id", STYLE_ID);
    doc.set_text(
        style,
        format!(
            "#song-video, #movie_player, #player, .html5-video-player {{ transition: opacity 0.3s ease !important; }} \
             .{LOADING_CLASS} {{ opacity: 0 !important; }}"
        ),
    );
    let parent = doc.head().unwrap_or_else(|| doc.root());
    doc.append_child(parent, style);
}

/// The existing overlay node, if any
pub fn overlay(doc: &Document) -> Option<NodeId> {
    doc.get_element_by_id(OVERLAY_ID)
}

/// The existing toggle control, if any
pub fn toggle_control(doc: &Document) -> Option<NodeId> {
    doc.get_element_by_id(TOGGLE_ID)
}

/// Title currently shown in the overlay info panel
pub fn displayed_title(doc: &Document) -> Option<String> {
    let list = SelectorList::parse("#avswitch-overlay .avswitch-title").ok()?;
    doc.query(&list).map(|id| doc.text_content(id).trim().to_string())
}

/// Build the thumbnail overlay inside the media container
///
/// Inserted at opacity zero; the caller schedules the fade-in. Info panel
/// is gated by `show_info`. Without a video id there is no artwork to
/// show, only the badge.
pub fn build_overlay(
    doc: &mut Document,
    container: NodeId,
    video_id: Option<&str>,
    track: &TrackInfo,
    show_info: bool,
) -> NodeId {
    let root = doc.create_element("div");
    doc.set_attribute(root, "id", OVERLAY_ID);
    doc.set_style_text(
        root,
        "position: absolute; top: 0; left: 0; right: 0; bottom: 0; \
         width: 100%; height: 100%; opacity: 0; transition: opacity 0.3s ease; z-index: 10",
    );

    let clickable = doc.create_element("div");
    doc.add_class(clickable, "avswitch-clickable");
    doc.set_style_text(clickable, "position: relative; width: 100%; height: 100%; cursor: pointer");
    doc.append_child(root, clickable);

    if let Some(id) = video_id {
        let img = doc.create_element("img");
        doc.add_class(img, "avswitch-thumbnail");
        doc.set_attribute(img, "src", thumbnail_url(id));
        doc.set_attribute(img, "alt", "Thumbnail");
        doc.set_style_text(img, "width: 100%; height: 100%; object-fit: cover; border-radius: 15px");
        doc.append_child(clickable, img);
    }

    let badge = doc.create_element("div");
    doc.add_class(badge, "avswitch-badge");
    doc.set_style_text(
        badge,
        "position: absolute; top: 15px; right: 15px; background: rgba(0, 0, 0, 0.8); \
         color: white; padding: 8px 12px; border-radius: 20px; font-size: 12px",
    );
    doc.set_text(badge, "🎵 Audio Only Mode Enabled");
    doc.append_child(clickable, badge);

    if show_info {
        let info = doc.create_element("div");
        doc.add_class(info, "avswitch-info");
        doc.set_style_text(
            info,
            "position: absolute; bottom: 0; left: 0; right: 0; \
             background: linear-gradient(transparent, rgba(0, 0, 0, 0.8)); padding: 30px 20px 20px",
        );

        let title = doc.create_element("div");
        doc.add_class(title, "avswitch-title");
        doc.set_style_text(title, "font-size: 22px; font-weight: bold; color: white");
        doc.set_text(title, track.title.clone());
        doc.append_child(info, title);

        let artist = doc.create_element("div");
        doc.add_class(artist, "avswitch-artist");
        doc.set_style_text(artist, "font-size: 16px; opacity: 0.9; color: white");
        doc.set_text(artist, track.artist.clone());
        doc.append_child(info, artist);

        let saver = doc.create_element("div");
        doc.add_class(saver, "avswitch-saver");
        doc.set_style_text(
            saver,
            "font-size: 13px; opacity: 0.9; background: rgba(255, 255, 255, 0.2); \
             padding: 6px 12px; border-radius: 20px; display: inline-block",
        );
        doc.set_text(saver, "💾 Data Saver Mode Active");
        doc.append_child(info, saver);

        doc.append_child(clickable, info);
    }

    doc.append_child(container, root);
    log::debug!("overlay built (video_id={video_id:?}, show_info={show_info})");
    root
}

/// Make the overlay visible (end of the fade-in)
pub fn fade_in_overlay(doc: &mut Document) {
    if let Some(id) = overlay(doc) {
        doc.set_style(id, "opacity", "1");
    }
}

/// Start fading the overlay out over the given duration
pub fn begin_overlay_fade(doc: &mut Document, duration_ms: u64) {
    if let Some(id) = overlay(doc) {
        doc.set_style(id, "transition", format!("opacity {}s ease", duration_ms as f64 / 1000.0));
        doc.set_style(id, "opacity", "0");
    }
}

/// Detach the overlay node
pub fn detach_overlay(doc: &mut Document) {
    if let Some(id) = overlay(doc) {
        doc.detach(id);
    }
}

/// Whether the overlay click should control playback on this platform
pub fn overlay_controls_playback(platform: Platform) -> bool {
    matches!(platform, Platform::Youtube)
}

/// Hide the native video presentation
///
/// Idempotent: re-hiding an already hidden element re-sets the same styles.
pub fn hide_video(doc: &mut Document, platform: Platform, container: NodeId) {
    if let Some(video) = page::find_video(doc, Some(container)) {
        doc.set_style(video, "display", "none");
    }
    if platform == Platform::Ytmusic {
        if let Some(chrome) = chrome_bottom(doc, container) {
            doc.set_style(chrome, "display", "none");
        }
    }
    doc.set_style(container, "background", "#000");
}

/// Restore the native video presentation
pub fn show_video(doc: &mut Document, platform: Platform, container: NodeId) {
    if let Some(video) = page::find_video(doc, Some(container)) {
        doc.remove_style(video, "display");
    }
    if platform == Platform::Ytmusic {
        if let Some(chrome) = chrome_bottom(doc, container) {
            doc.remove_style(chrome, "display");
        }
    }
    doc.remove_style(container, "background");
}

fn chrome_bottom(doc: &Document, container: NodeId) -> Option<NodeId> {
    let list = SelectorList::parse(".ytp-chrome-bottom").ok()?;
    doc.query_within(container, &list)
}

fn toggle_label(mode: Mode) -> &'static str {
    match mode {
        Mode::AudioOnly => "🎵 Audio Only",
        Mode::Video => "🎵 Video Mode",
    }
}

fn toggle_border(mode: Mode) -> &'static str {
    match mode {
        Mode::AudioOnly => AUDIO_BORDER,
        Mode::Video => VIDEO_BORDER,
    }
}

/// Create the toggle control inside the media container
///
/// Position shifts right in theater/miniplayer layouts so the control does
/// not cover the player's own chrome.
pub fn build_toggle(doc: &mut Document, container: NodeId, mode: Mode, compact: bool) -> NodeId {
    if let Some(existing) = toggle_control(doc) {
        return existing;
    }

    let toggle = doc.create_element("div");
    doc.set_attribute(toggle, "id", TOGGLE_ID);
    doc.set_attribute(toggle, "title", "Audio only switcher - saves bandwidth on YouTube and YouTube Music");
    doc.set_text(toggle, toggle_label(mode));

    let left = if compact { "80px" } else { "10px" };
    doc.set_style_text(
        toggle,
        &format!(
            "position: absolute; top: 10px; left: {left}; z-index: 99999; \
             background: rgba(0, 0, 0, 0.8); color: white; border-radius: 20px; \
             padding: 6px 12px; cursor: pointer; font-size: 11px"
        ),
    );
    doc.set_style(toggle, "border", format!("2px solid {}", toggle_border(mode)));

    // The overlay and control position against the container
    if doc.style(container, "position").is_none() {
        doc.set_style(container, "position", "relative");
    }

    doc.append_child(container, toggle);
    toggle
}

/// Refresh the toggle control's label and border for the mode
pub fn update_toggle(doc: &mut Document, mode: Mode) {
    if let Some(toggle) = toggle_control(doc) {
        doc.set_text(toggle, toggle_label(mode));
        doc.set_style(toggle, "border", format!("2px solid {}", toggle_border(mode)));
    }
}
