//! Async shell around the reconciliation core
//!
//! Turns host events and wall-clock time into calls on the synchronous
//! [`Engine`]: one task owns the document and the engine, pulls events
//! from an unbounded channel, and sleeps until the earliest timer
//! deadline in between. After every event the document's mutation log is
//! drained and delivered in batches, exactly like an observer callback.

use super::Engine;
use crate::bridge::{Request, Response};
use crate::dom::{Document, NodeId};
use crate::settings::SettingsStore;
use futures::channel::oneshot;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

/// Events the host environment feeds into the loop
pub enum HostEvent {
    /// Apply a host-side change to the document
    Mutate(Box<dyn FnOnce(&mut Document) + Send>),
    /// Replace the location (history push/replace or back/forward)
    Navigate(Url),
    /// A click landing on the given node
    Click(NodeId),
    /// A settings message with its acknowledgement channel
    Message(Request, oneshot::Sender<Response>),
    /// Stop the loop
    Shutdown,
}

impl HostEvent {
    /// Convenience constructor for document mutations
    pub fn mutate(f: impl FnOnce(&mut Document) + Send + 'static) -> HostEvent {
        HostEvent::Mutate(Box::new(f))
    }
}

/// Event loop owning the document and engine for one page session
pub struct Driver<S: SettingsStore> {
    doc: Document,
    engine: Engine<S>,
    events: mpsc::UnboundedReceiver<HostEvent>,
    epoch: Instant,
}

impl<S: SettingsStore> Driver<S> {
    /// Create a driver and the sender half of its event channel
    pub fn new(doc: Document, engine: Engine<S>) -> (Driver<S>, mpsc::UnboundedSender<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver {
            doc,
            engine,
            events: rx,
            epoch: Instant::now(),
        };
        (driver, tx)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Deliver pending mutation batches until the document is quiet
    fn pump_mutations(&mut self, now: u64) {
        loop {
            let batch = self.doc.take_mutations();
            if batch.is_empty() {
                break;
            }
            self.engine.on_mutations(&mut self.doc, &batch, now);
        }
    }

    fn dispatch(&mut self, event: HostEvent, now: u64) {
        match event {
            HostEvent::Mutate(apply) => apply(&mut self.doc),
            HostEvent::Navigate(url) => {
                self.doc.set_url(url);
                self.engine.on_navigation(&mut self.doc, now);
            }
            HostEvent::Click(target) => self.engine.on_click(&mut self.doc, target, now),
            HostEvent::Message(request, ack) => {
                let response = self.engine.on_message(&mut self.doc, request, now);
                let _ = ack.send(response);
            }
            HostEvent::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    async fn sleep_until_deadline(epoch: Instant, deadline: Option<u64>) {
        match deadline {
            Some(ms) => tokio::time::sleep_until(epoch + Duration::from_millis(ms)).await,
            None => std::future::pending().await,
        }
    }

    /// Run until shutdown or the sender is dropped; returns the final
    /// document and engine for inspection
    pub async fn run(mut self) -> (Document, Engine<S>) {
        let now = self.now_ms();
        self.engine.start(&mut self.doc, now);
        self.pump_mutations(now);

        loop {
            let deadline = self.engine.next_deadline();
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        None | Some(HostEvent::Shutdown) => break,
                        Some(event) => {
                            let now = self.now_ms();
                            self.dispatch(event, now);
                            self.pump_mutations(now);
                        }
                    }
                }
                _ = Self::sleep_until_deadline(self.epoch, deadline) => {
                    let now = self.now_ms();
                    self.engine.tick(&mut self.doc, now);
                    self.pump_mutations(now);
                }
            }
        }

        (self.doc, self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;
    use crate::overlay;
    use crate::page::Platform;
    use crate::settings::MemoryStore;
    use tokio_test::assert_ok;

    const SNAPSHOT: &str = r#"
        <html><head></head><body>
          <div id="movie_player">
            <video src="blob:video" data-video-width="1920" data-video-height="1080"></video>
          </div>
          <div id="title"><h1><yt-formatted-string>Song A</yt-formatted-string></h1></div>
        </body></html>
    "#;

    fn setup() -> (Driver<MemoryStore>, mpsc::UnboundedSender<HostEvent>) {
        let url = Url::parse("https://www.youtube.com/watch?v=ABC").unwrap();
        let doc = parse_document(SNAPSHOT, url).unwrap();
        let engine = Engine::new(&doc, MemoryStore::new());
        Driver::new(doc, engine)
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_initializes_and_renders() {
        let (driver, tx) = setup();
        let handle = tokio::spawn(driver.run());

        // Paused time auto-advances through the settle and fade timers
        tokio::time::sleep(Duration::from_secs(10)).await;
        tx.send(HostEvent::Shutdown).unwrap();

        let (doc, engine) = assert_ok!(handle.await);
        assert!(engine.phase() == crate::engine::Phase::Ready);
        assert!(overlay::toggle_control(&doc).is_some());
        let node = overlay::overlay(&doc).unwrap();
        assert_eq!(doc.style(node, "opacity"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_acknowledges_messages() {
        let (driver, tx) = setup();
        let handle = tokio::spawn(driver.run());
        tokio::time::sleep(Duration::from_secs(10)).await;

        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(HostEvent::Message(
            Request::UpdateSettings { platform: Platform::Youtube, show_info: false },
            ack_tx,
        ))
        .unwrap();

        let response = ack_rx.await.unwrap();
        assert_eq!(response, Response::ack());

        tx.send(HostEvent::Shutdown).unwrap();
        let (doc, _engine) = handle.await.unwrap();
        assert!(doc.query_selector("#avswitch-overlay .avswitch-info").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_handles_title_mutation_and_refresh() {
        let (driver, tx) = setup();
        let handle = tokio::spawn(driver.run());
        tokio::time::sleep(Duration::from_secs(10)).await;

        tx.send(HostEvent::mutate(|doc| {
            let node = doc.query_selector("#title h1 yt-formatted-string").unwrap();
            doc.set_text(node, "Song B");
        }))
        .unwrap();

        // Debounce window plus fade-out and rebuild
        tokio::time::sleep(Duration::from_secs(10)).await;
        tx.send(HostEvent::Shutdown).unwrap();

        let (doc, _engine) = handle.await.unwrap();
        assert_eq!(overlay::displayed_title(&doc).as_deref(), Some("Song B"));
    }
}
