//! Page inspection
//!
//! Stateless queries against the live document: which site variant is
//! hosting us, where the media container and video element live, whether
//! the page carries a genuine video stream or an audio track behind a
//! static thumbnail, and what is currently playing. Every probe is an
//! ordered fallback chain - the host page markup is an unversioned
//! contract, and the chains are the resilience mechanism against it.

use crate::dom::{Document, MutationKind, MutationRecord, NodeId};
use serde::{Deserialize, Serialize};
use url::Url;

/// Hosting site variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// www.youtube.com watch pages
    Youtube,
    /// music.youtube.com player pages
    Ytmusic,
}

impl Platform {
    /// Classify a location by hostname; unrecognized hosts yield None
    pub fn from_url(url: &Url) -> Option<Platform> {
        let host = url.host_str()?;
        if host.contains("music.youtube.com") {
            Some(Platform::Ytmusic)
        } else if host.contains("youtube.com") {
            Some(Platform::Youtube)
        } else {
            None
        }
    }
}

/// Title shown while the page has not produced one yet
pub const PLACEHOLDER_TITLE: &str = "Initializing Extension, Loading titles please wait...";

/// Extracted track metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
}

impl TrackInfo {
    /// Whether the title is a real, settled value worth rendering
    pub fn is_ready(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty()
            && !title.contains("Initializing Extension")
            && !title.contains("Now Playing")
    }
}

/// Media container probes, first match wins
const YOUTUBE_CONTAINER_CHAIN: &[&str] = &["#movie_player", "#player", ".html5-video-player"];
const YTMUSIC_CONTAINER_CHAIN: &[&str] = &["#song-video", ".ytmusic-player-page #player"];

/// Video element probes inside a container
const VIDEO_CHAIN: &[&str] = &["video", ".video-stream", ".html5-main-video"];

const YOUTUBE_TITLE_CHAIN: &[&str] = &[
    "yt-formatted-string.style-scope.ytd-watch-metadata",
    "h1.ytd-watch-metadata yt-formatted-string",
    "#title h1 yt-formatted-string",
    "ytd-watch-metadata h1 yt-formatted-string",
];

const YOUTUBE_ARTIST_CHAIN: &[&str] = &[
    "#owner #channel-name #container #text-container yt-formatted-string a",
    "#owner-text a",
    ".ytd-channel-name a",
    "#upload-info #owner-name a",
];

const YTMUSIC_TITLE_CHAIN: &[&str] = &[
    "yt-formatted-string.title.style-scope.ytmusic-player-bar",
    ".content-info-wrapper yt-formatted-string.title",
    ".title.style-scope.ytmusic-player-bar",
    "ytmusic-player-bar .title",
];

const YTMUSIC_ARTIST_CHAIN: &[&str] = &[
    "yt-formatted-string.byline.style-scope.ytmusic-player-bar a",
    ".byline.style-scope.ytmusic-player-bar a",
    ".content-info-wrapper .byline a",
    "ytmusic-player-bar .byline a",
];

/// First text produced by an ordered selector chain
fn probe_text(doc: &Document, chain: &[&str]) -> Option<String> {
    for selector in chain {
        if let Some(id) = doc.query_selector(selector) {
            let text = doc.text_content(id).trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First element produced by an ordered selector chain
fn probe_element(doc: &Document, chain: &[&str]) -> Option<NodeId> {
    chain.iter().find_map(|selector| doc.query_selector(selector))
}

/// Locate the media container for the platform
pub fn find_media_container(doc: &Document, platform: Platform) -> Option<NodeId> {
    match platform {
        Platform::Youtube => probe_element(doc, YOUTUBE_CONTAINER_CHAIN),
        Platform::Ytmusic => probe_element(doc, YTMUSIC_CONTAINER_CHAIN),
    }
}

/// Locate the video element, scoped to a container when one is known
pub fn find_video(doc: &Document, container: Option<NodeId>) -> Option<NodeId> {
    for selector in VIDEO_CHAIN {
        let list = crate::dom::SelectorList::parse(selector).ok()?;
        let found = match container {
            Some(scope) => doc.query_within(scope, &list),
            None => doc.query(&list),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Whether the page carries a genuine video stream
///
/// YouTube pages always do once a video element exists. YouTube Music only
/// when the element reports intrinsic dimensions or a resolved source -
/// otherwise it is an audio track behind a static thumbnail. Dimensions may
/// simply not have loaded yet; callers treat a false here as retryable.
pub fn has_genuine_video(doc: &Document, platform: Platform) -> bool {
    if doc.query_selector("video").is_none() {
        return false;
    }
    match platform {
        Platform::Youtube => true,
        Platform::Ytmusic => {
            let Some(song_video) = doc.get_element_by_id("song-video") else {
                log::debug!("no #song-video container, treating as audio-only");
                return false;
            };
            let Some(video) = find_video(doc, Some(song_video)) else {
                return false;
            };
            match doc.media_state(video) {
                Some(media) => media.has_dimensions() || media.current_src.is_some(),
                None => false,
            }
        }
    }
}

/// Extract the current track title and artist
///
/// A missing title yields the placeholder (signals "not loaded yet"), a
/// missing artist an empty string. The YouTube artist chain doubles as the
/// shared fallback when the platform chain produces nothing.
pub fn extract_track_info(doc: &Document, platform: Platform) -> TrackInfo {
    let (title_chain, artist_chain) = match platform {
        Platform::Youtube => (YOUTUBE_TITLE_CHAIN, YOUTUBE_ARTIST_CHAIN),
        Platform::Ytmusic => (YTMUSIC_TITLE_CHAIN, YTMUSIC_ARTIST_CHAIN),
    };

    let title = probe_text(doc, title_chain).unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());
    let artist = probe_text(doc, artist_chain)
        .or_else(|| probe_text(doc, YOUTUBE_ARTIST_CHAIN))
        .unwrap_or_default();

    log::debug!("detected title: {title:?}, artist: {artist:?}");
    TrackInfo { title, artist }
}

/// Parse the `v` query parameter from the current location
pub fn extract_video_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
}

/// Whether a mutation touched a title-bearing node for the platform
pub fn is_title_mutation(doc: &Document, record: &MutationRecord, platform: Platform) -> bool {
    if !matches!(record.kind, MutationKind::ChildrenAdded | MutationKind::Text) {
        return false;
    }
    match platform {
        Platform::Youtube => {
            let Ok(title) = crate::dom::SelectorList::parse("#title") else {
                return false;
            };
            doc.closest(record.target, &title).is_some()
        }
        Platform::Ytmusic => {
            let Ok(title) = crate::dom::SelectorList::parse(".title.style-scope.ytmusic-player-bar")
            else {
                return false;
            };
            let Ok(bar) = crate::dom::SelectorList::parse("ytmusic-player-bar") else {
                return false;
            };
            doc.matches(record.target, &title) || doc.closest(record.target, &bar).is_some()
        }
    }
}

/// Whether the page is in a theater or miniplayer layout
pub fn is_compact_layout(doc: &Document, container: NodeId) -> bool {
    doc.has_class(container, "ytp-player-minimized")
        || doc.has_class(container, "ytp-miniplayer-active")
        || doc.query_selector(".ytp-player-minimized").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MediaState, parse_document};

    fn yt_url() -> Url {
        Url::parse("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap()
    }

    fn ytm_url() -> Url {
        Url::parse("https://music.youtube.com/watch?v=abc123&list=RDAMVM").unwrap()
    }

    #[test]
    fn test_platform_detection_is_total() {
        assert_eq!(Platform::from_url(&yt_url()), Some(Platform::Youtube));
        assert_eq!(Platform::from_url(&ytm_url()), Some(Platform::Ytmusic));
        let other = Url::parse("https://example.com/watch?v=x").unwrap();
        assert_eq!(Platform::from_url(&other), None);
        let file = Url::parse("file:///tmp/page.html").unwrap();
        assert_eq!(Platform::from_url(&file), None);
    }

    #[test]
    fn test_video_id_extraction() {
        assert_eq!(extract_video_id(&yt_url()).as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(extract_video_id(&ytm_url()).as_deref(), Some("abc123"));
        let none = Url::parse("https://www.youtube.com/feed/subscriptions").unwrap();
        assert_eq!(extract_video_id(&none), None);
    }

    #[test]
    fn test_container_fallback_chain() {
        let doc = parse_document(r#"<div class="html5-video-player"></div>"#, yt_url()).unwrap();
        let container = find_media_container(&doc, Platform::Youtube).unwrap();
        assert!(doc.has_class(container, "html5-video-player"));

        let doc = parse_document(r#"<div id="movie_player"></div><div id="player"></div>"#, yt_url()).unwrap();
        let container = find_media_container(&doc, Platform::Youtube).unwrap();
        assert_eq!(doc.attribute(container, "id"), Some("movie_player"));
    }

    #[test]
    fn test_genuine_video_on_youtube() {
        let doc = parse_document(r#"<div id="movie_player"><video src="blob:x"></video></div>"#, yt_url()).unwrap();
        assert!(has_genuine_video(&doc, Platform::Youtube));

        let empty = parse_document(r#"<div id="movie_player"></div>"#, yt_url()).unwrap();
        assert!(!has_genuine_video(&empty, Platform::Youtube));
    }

    #[test]
    fn test_genuine_video_on_ytmusic_requires_dimensions_or_src() {
        let audio = parse_document(r#"<div id="song-video"><video></video></div>"#, ytm_url()).unwrap();
        assert!(!has_genuine_video(&audio, Platform::Ytmusic));

        let with_src = parse_document(r#"<div id="song-video"><video src="blob:media"></video></div>"#, ytm_url()).unwrap();
        assert!(has_genuine_video(&with_src, Platform::Ytmusic));

        let with_dims = parse_document(
            r#"<div id="song-video"><video data-video-width="1920" data-video-height="1080"></video></div>"#,
            ytm_url(),
        )
        .unwrap();
        assert!(has_genuine_video(&with_dims, Platform::Ytmusic));
    }

    #[test]
    fn test_dimensions_arriving_later_flip_detection() {
        let mut doc = parse_document(r#"<div id="song-video"><video></video></div>"#, ytm_url()).unwrap();
        assert!(!has_genuine_video(&doc, Platform::Ytmusic));

        let video = doc.query_selector("video").unwrap();
        doc.set_media_state(
            video,
            MediaState { intrinsic_width: 640, intrinsic_height: 360, current_src: None, paused: true },
        );
        assert!(has_genuine_video(&doc, Platform::Ytmusic));
    }

    #[test]
    fn test_track_info_youtube() {
        let doc = parse_document(
            r#"
            <ytd-watch-metadata>
              <h1 class="ytd-watch-metadata"><yt-formatted-string>Song A</yt-formatted-string></h1>
            </ytd-watch-metadata>
            <div id="owner-text"><a>Artist A</a></div>
            "#,
            yt_url(),
        )
        .unwrap();
        let info = extract_track_info(&doc, Platform::Youtube);
        assert_eq!(info.title, "Song A");
        assert_eq!(info.artist, "Artist A");
        assert!(info.is_ready());
    }

    #[test]
    fn test_track_info_placeholder_when_missing() {
        let doc = parse_document("<div></div>", yt_url()).unwrap();
        let info = extract_track_info(&doc, Platform::Youtube);
        assert_eq!(info.title, PLACEHOLDER_TITLE);
        assert_eq!(info.artist, "");
        assert!(!info.is_ready());
    }

    #[test]
    fn test_track_info_ytmusic_player_bar() {
        let doc = parse_document(
            r#"
            <ytmusic-player-bar>
              <yt-formatted-string class="title style-scope ytmusic-player-bar">Track B</yt-formatted-string>
              <yt-formatted-string class="byline style-scope ytmusic-player-bar"><a>Band B</a></yt-formatted-string>
            </ytmusic-player-bar>
            "#,
            ytm_url(),
        )
        .unwrap();
        let info = extract_track_info(&doc, Platform::Ytmusic);
        assert_eq!(info.title, "Track B");
        assert_eq!(info.artist, "Band B");
    }

    #[test]
    fn test_transient_titles_not_ready() {
        let now_playing = TrackInfo { title: "Now Playing - loading".into(), artist: String::new() };
        assert!(!now_playing.is_ready());
        let blank = TrackInfo { title: "   ".into(), artist: String::new() };
        assert!(!blank.is_ready());
    }

    #[test]
    fn test_title_mutation_matching() {
        let mut doc = parse_document(
            r#"
            <div id="title"></div>
            <ytmusic-player-bar><yt-formatted-string class="title style-scope ytmusic-player-bar"></yt-formatted-string></ytmusic-player-bar>
            <div id="unrelated"></div>
            "#,
            ytm_url(),
        )
        .unwrap();

        let bar_title = doc.query_selector(".title.style-scope.ytmusic-player-bar").unwrap();
        doc.set_text(bar_title, "Track C");
        let records = doc.take_mutations();
        assert!(records.iter().any(|r| is_title_mutation(&doc, r, Platform::Ytmusic)));

        let yt_title = doc.get_element_by_id("title").unwrap();
        doc.set_text(yt_title, "Song C");
        let records = doc.take_mutations();
        assert!(records.iter().any(|r| is_title_mutation(&doc, r, Platform::Youtube)));

        let unrelated = doc.get_element_by_id("unrelated").unwrap();
        doc.set_text(unrelated, "noise");
        let records = doc.take_mutations();
        assert!(!records.iter().any(|r| is_title_mutation(&doc, r, Platform::Youtube)));
    }

    #[test]
    fn test_compact_layout_detection() {
        let doc = parse_document(r#"<div id="movie_player" class="ytp-miniplayer-active"></div>"#, yt_url()).unwrap();
        let container = doc.get_element_by_id("movie_player").unwrap();
        assert!(is_compact_layout(&doc, container));

        let normal = parse_document(r#"<div id="movie_player"></div>"#, yt_url()).unwrap();
        let container = normal.get_element_by_id("movie_player").unwrap();
        assert!(!is_compact_layout(&normal, container));
    }
}
