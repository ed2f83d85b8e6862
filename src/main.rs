//! Avswitch - Audio-Only Presentation Switcher
//!
//! Demo binary: runs a scripted session against a small YouTube watch
//! page snapshot and prints the resulting presentation state.

use avswitch::dom::parse_document;
use avswitch::settings::MemoryStore;
use avswitch::{Engine, NAME, VERSION, overlay, timing};
use url::Url;

const DEMO_SNAPSHOT: &str = r#"
<html><head></head><body>
  <div id="movie_player">
    <video src="blob:demo" data-video-width="1920" data-video-height="1080"></video>
  </div>
  <div id="title"><h1><yt-formatted-string>Demo Song</yt-formatted-string></h1></div>
  <div id="owner-text"><a>Demo Artist</a></div>
</body></html>
"#;

fn main() {
    env_logger::init();

    println!("🎵 {} v{} - Audio-Only Presentation Switcher", NAME, VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let url = match Url::parse("https://www.youtube.com/watch?v=demo12345") {
        Ok(url) => url,
        Err(e) => {
            eprintln!("❌ Bad demo URL: {}", e);
            std::process::exit(1);
        }
    };
    let mut doc = match parse_document(DEMO_SNAPSHOT, url) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("❌ Failed to parse demo snapshot: {}", e);
            std::process::exit(1);
        }
    };

    let mut engine = Engine::new(&doc, MemoryStore::new());
    engine.start(&mut doc, 0);

    // Play the staged initialization out on a simulated clock
    let mut now = 0;
    while let Some(deadline) = engine.next_deadline() {
        now = deadline;
        engine.tick(&mut doc, now);
    }

    println!("✅ Session initialized ({:?})", engine.phase());
    report(&doc, &engine);

    println!("\n🔁 Toggling to video mode...");
    engine.toggle_mode(&mut doc, now + 1);
    report(&doc, &engine);
}

fn report(doc: &avswitch::dom::Document, engine: &Engine<MemoryStore>) {
    println!("📊 Presentation state:");
    println!("   • Mode: {:?}", engine.mode());
    println!("   • Toggle control: {}", present(overlay::toggle_control(doc).is_some()));
    println!("   • Overlay: {}", present(overlay::overlay(doc).is_some()));
    if let Some(title) = overlay::displayed_title(doc) {
        println!("   • Now showing: {}", title);
    }
    println!("   • Debounce window: {}ms", timing::REFRESH_DEBOUNCE_MS);
}

fn present(yes: bool) -> &'static str {
    if yes { "present" } else { "absent" }
}
