//! Host page model
//!
//! An in-process stand-in for the live document the switcher operates on:
//!
//! - **Arena document**: nodes addressed by id, with parent/child links,
//!   attributes, class lists, inline styles, and media element state
//! - **Mutation log**: every write appends a record, drained in batches by
//!   the driver (the MutationObserver analog)
//! - **html**: html5ever-based snapshot parser
//! - **selector**: compound selectors, descendant combinators, comma lists
//! - **style**: inline declaration parsing for `set_style_text`

pub mod html;
pub mod selector;
pub mod style;

pub use html::parse_document;
pub use selector::{Selector, SelectorList};

use std::collections::HashMap;
use url::Url;

/// Identifier for a node in the document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Node types in the document
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Document root
    Document,
    /// Element node (e.g., <div>)
    Element(ElementData),
    /// Text node
    Text(String),
    /// Comment node
    Comment(String),
}

/// Data for element nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    /// Tag name (e.g., "div", "video")
    pub tag_name: String,
    /// Element attributes
    pub attributes: HashMap<String, String>,
    /// Inline styles (property -> value)
    pub styles: HashMap<String, String>,
}

impl ElementData {
    /// Create a new element
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: HashMap::new(),
            styles: HashMap::new(),
        }
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Get the ID attribute
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Get class names
    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Check for a single class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }
}

/// Playback state of a media element
///
/// Intrinsic dimensions stay zero until the stream reports them, which is
/// the window where audio-only tracks and not-yet-loaded videos look alike.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaState {
    /// Intrinsic video width in pixels (0 until known)
    pub intrinsic_width: u32,
    /// Intrinsic video height in pixels (0 until known)
    pub intrinsic_height: u32,
    /// Resolved source URI, if any
    pub current_src: Option<String>,
    /// Whether playback is paused
    pub paused: bool,
}

impl MediaState {
    /// Whether the element carries a real video stream signal
    pub fn has_dimensions(&self) -> bool {
        self.intrinsic_width > 0 && self.intrinsic_height > 0
    }
}

/// What changed in a single mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    /// Child nodes were appended (target is the parent)
    ChildrenAdded,
    /// Child nodes were removed (target is the parent)
    ChildrenRemoved,
    /// Text content changed
    Text,
    /// A named attribute changed
    Attribute(String),
    /// Inline style changed
    Style,
    /// Media element state changed
    Media,
}

/// One entry in the mutation log
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    /// Node the change applies to (parent node for child-list changes)
    pub target: NodeId,
    /// Kind of change
    pub kind: MutationKind,
}

/// A node in the document arena
#[derive(Debug, Clone)]
struct NodeData {
    node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    media: Option<MediaState>,
}

/// The host page document
///
/// Writes append to a pending mutation log; the driver drains it with
/// [`Document::take_mutations`] and hands batches to the reconciliation
/// loop. Engine-originated writes are logged too - the loop sees its own
/// echo, exactly as with a real mutation observer.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    url: Url,
    pending: Vec<MutationRecord>,
}

impl Document {
    /// Create an empty document at the given location
    pub fn new(url: Url) -> Self {
        Self {
            nodes: vec![NodeData {
                node_type: NodeType::Document,
                parent: None,
                children: Vec::new(),
                media: None,
            }],
            url,
            pending: Vec::new(),
        }
    }

    /// Root node id
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Current location
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace the location (single-page-app navigation)
    ///
    /// Does not touch the tree; full navigations are modeled by callers
    /// replacing subtrees as well.
    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0)
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.pending.push(MutationRecord { target, kind });
    }

    /// Drain the pending mutation log
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached element node
    pub fn create_element(&mut self, tag_name: impl Into<String>) -> NodeId {
        let data = ElementData::new(tag_name);
        let media = (data.tag_name == "video").then(MediaState::default);
        self.push_node(NodeType::Element(data), media)
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(NodeType::Text(content.into()), None)
    }

    fn push_node(&mut self, node_type: NodeType, media: Option<MediaState>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            node_type,
            parent: None,
            children: Vec::new(),
            media,
        });
        id
    }

    /// Append a child, detaching it from any previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        if self.node(child).and_then(|n| n.parent).is_some() {
            self.detach(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        self.record(parent, MutationKind::ChildrenAdded);
    }

    /// Remove a node from its parent, leaving the subtree intact but
    /// unreachable from the root
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
        self.record(parent, MutationKind::ChildrenRemoved);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Tag name for element nodes
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.node_type {
            NodeType::Element(data) => Some(data.tag_name.as_str()),
            _ => None,
        }
    }

    /// Element data for element nodes
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id)?.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Child node ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Parent node id
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` contains `id` (inclusive)
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        if let NodeType::Text(text) = &node.node_type {
            out.push_str(text);
        }
        for child in node.children.clone() {
            self.collect_text(child, out);
        }
    }

    /// Replace the node's children with a single text node
    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
        let text = self.create_text(content);
        if let Some(node) = self.node_mut(text) {
            node.parent = Some(id);
        }
        if let Some(node) = self.node_mut(id) {
            node.children.push(text);
        }
        self.record(id, MutationKind::Text);
    }

    // ------------------------------------------------------------------
    // Attributes, classes, styles
    // ------------------------------------------------------------------

    /// Get an attribute value
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(data) = self.element_mut(id) {
            data.attributes.insert(name.to_string(), value.into());
            self.record(id, MutationKind::Attribute(name.to_string()));
        }
    }

    /// Add a class to the element's class list
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let Some(data) = self.element_mut(id) else { return };
        if data.has_class(class) {
            return;
        }
        let entry = data.attributes.entry("class".to_string()).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(class);
        self.record(id, MutationKind::Attribute("class".to_string()));
    }

    /// Remove a class from the element's class list
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(data) = self.element_mut(id) else { return };
        if !data.has_class(class) {
            return;
        }
        let remaining = data
            .classes()
            .into_iter()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        data.attributes.insert("class".to_string(), remaining);
        self.record(id, MutationKind::Attribute("class".to_string()));
    }

    /// Check for a class on the element
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|d| d.has_class(class))
    }

    /// Get an inline style property
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)?.styles.get(property).map(String::as_str)
    }

    /// Set an inline style property
    pub fn set_style(&mut self, id: NodeId, property: &str, value: impl Into<String>) {
        if let Some(data) = self.element_mut(id) {
            data.styles.insert(property.to_string(), value.into());
            self.record(id, MutationKind::Style);
        }
    }

    /// Remove an inline style property
    pub fn remove_style(&mut self, id: NodeId, property: &str) {
        if let Some(data) = self.element_mut(id) {
            if data.styles.remove(property).is_some() {
                self.record(id, MutationKind::Style);
            }
        }
    }

    /// Apply a whole inline declaration block (cssText assignment)
    pub fn set_style_text(&mut self, id: NodeId, css: &str) {
        let declarations = style::parse_inline_style(css);
        if let Some(data) = self.element_mut(id) {
            data.styles.clear();
            for (property, value) in declarations {
                data.styles.insert(property, value);
            }
            self.record(id, MutationKind::Style);
        }
    }

    // ------------------------------------------------------------------
    // Media elements
    // ------------------------------------------------------------------

    /// Media state for video elements
    pub fn media_state(&self, id: NodeId) -> Option<&MediaState> {
        self.node(id)?.media.as_ref()
    }

    /// Replace the media state, emitting a Media mutation record
    pub fn set_media_state(&mut self, id: NodeId, state: MediaState) {
        let Some(node) = self.node_mut(id) else { return };
        if node.media.is_none() {
            return;
        }
        node.media = Some(state);
        self.record(id, MutationKind::Media);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Preorder traversal of connected element ids
    fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                if matches!(node.node_type, NodeType::Element(_)) {
                    out.push(id);
                }
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// First element with the given id attribute
    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| self.attribute(*id, "id") == Some(element_id))
    }

    /// Whether the element matches the selector list
    pub fn matches(&self, id: NodeId, selectors: &SelectorList) -> bool {
        selectors.matches(self, id)
    }

    /// Closest ancestor (inclusive) matching the selector list
    pub fn closest(&self, id: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.element(node).is_some() && selectors.matches(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// First connected element matching the selector list
    pub fn query(&self, selectors: &SelectorList) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| selectors.matches(self, *id))
    }

    /// All connected elements matching the selector list
    pub fn query_all(&self, selectors: &SelectorList) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| selectors.matches(self, *id))
            .collect()
    }

    /// querySelector over a selector string; invalid input matches nothing
    pub fn query_selector(&self, selectors: &str) -> Option<NodeId> {
        self.query(&SelectorList::parse(selectors).ok()?)
    }

    /// querySelectorAll over a selector string; invalid input matches nothing
    pub fn query_selector_all(&self, selectors: &str) -> Vec<NodeId> {
        SelectorList::parse(selectors)
            .map(|list| self.query_all(&list))
            .unwrap_or_default()
    }

    /// First element scanning a subtree rooted at `scope` (inclusive)
    pub fn query_within(&self, scope: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        self.query_all(selectors)
            .into_iter()
            .find(|id| self.contains(scope, *id))
    }

    /// The document's head element, if present
    pub fn head(&self) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| self.tag_name(*id) == Some("head"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(Url::parse("https://www.youtube.com/watch?v=abc").unwrap())
    }

    #[test]
    fn test_append_and_query_by_id() {
        let mut d = doc();
        let div = d.create_element("div");
        d.set_attribute(div, "id", "player");
        d.append_child(d.root(), div);

        assert_eq!(d.get_element_by_id("player"), Some(div));
        assert_eq!(d.query_selector("#player"), Some(div));
    }

    #[test]
    fn test_detach_makes_node_unreachable() {
        let mut d = doc();
        let div = d.create_element("div");
        d.set_attribute(div, "id", "x");
        d.append_child(d.root(), div);
        assert!(d.is_connected(div));

        d.detach(div);
        assert!(!d.is_connected(div));
        assert_eq!(d.get_element_by_id("x"), None);
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let mut d = doc();
        let outer = d.create_element("div");
        let inner = d.create_element("span");
        let t1 = d.create_text("Song ");
        let t2 = d.create_text("Title");
        d.append_child(outer, t1);
        d.append_child(outer, inner);
        d.append_child(inner, t2);
        d.append_child(d.root(), outer);

        assert_eq!(d.text_content(outer), "Song Title");
    }

    #[test]
    fn test_set_text_replaces_children() {
        let mut d = doc();
        let div = d.create_element("div");
        d.append_child(d.root(), div);
        d.set_text(div, "first");
        d.set_text(div, "second");
        assert_eq!(d.text_content(div), "second");
    }

    #[test]
    fn test_class_list_operations() {
        let mut d = doc();
        let div = d.create_element("div");
        d.append_child(d.root(), div);

        d.add_class(div, "loading");
        d.add_class(div, "active");
        assert!(d.has_class(div, "loading"));
        assert!(d.has_class(div, "active"));

        d.remove_class(div, "loading");
        assert!(!d.has_class(div, "loading"));
        assert!(d.has_class(div, "active"));
    }

    #[test]
    fn test_add_class_is_idempotent() {
        let mut d = doc();
        let div = d.create_element("div");
        d.append_child(d.root(), div);
        d.add_class(div, "active");
        d.add_class(div, "active");
        assert_eq!(d.attribute(div, "class"), Some("active"));
    }

    #[test]
    fn test_style_set_and_remove() {
        let mut d = doc();
        let video = d.create_element("video");
        d.append_child(d.root(), video);

        d.set_style(video, "display", "none");
        assert_eq!(d.style(video, "display"), Some("none"));

        d.remove_style(video, "display");
        assert_eq!(d.style(video, "display"), None);
    }

    #[test]
    fn test_video_elements_carry_media_state() {
        let mut d = doc();
        let video = d.create_element("video");
        let div = d.create_element("div");
        assert!(d.media_state(video).is_some());
        assert!(d.media_state(div).is_none());
    }

    #[test]
    fn test_mutation_log_records_writes() {
        let mut d = doc();
        let div = d.create_element("div");
        d.append_child(d.root(), div);
        d.set_attribute(div, "id", "x");
        d.set_style(div, "background", "#000");

        let batch = d.take_mutations();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].kind, MutationKind::ChildrenAdded);
        assert_eq!(batch[0].target, d.root());
        assert_eq!(batch[1].kind, MutationKind::Attribute("id".to_string()));
        assert_eq!(batch[2].kind, MutationKind::Style);
        assert!(d.take_mutations().is_empty());
    }

    #[test]
    fn test_media_state_change_emits_record() {
        let mut d = doc();
        let video = d.create_element("video");
        d.append_child(d.root(), video);
        d.take_mutations();

        d.set_media_state(
            video,
            MediaState {
                intrinsic_width: 1280,
                intrinsic_height: 720,
                current_src: None,
                paused: true,
            },
        );
        let batch = d.take_mutations();
        assert_eq!(batch, vec![MutationRecord { target: video, kind: MutationKind::Media }]);
        assert!(d.media_state(video).unwrap().has_dimensions());
    }

    #[test]
    fn test_closest_walks_ancestors() {
        let mut d = doc();
        let bar = d.create_element("ytmusic-player-bar");
        let title = d.create_element("yt-formatted-string");
        d.append_child(d.root(), bar);
        d.append_child(bar, title);

        let list = SelectorList::parse("ytmusic-player-bar").unwrap();
        assert_eq!(d.closest(title, &list), Some(bar));
        assert_eq!(d.closest(d.root(), &list), None);
    }

    #[test]
    fn test_query_within_scopes_to_subtree() {
        let mut d = doc();
        let a = d.create_element("div");
        let b = d.create_element("div");
        let va = d.create_element("video");
        let vb = d.create_element("video");
        d.append_child(d.root(), a);
        d.append_child(d.root(), b);
        d.append_child(a, va);
        d.append_child(b, vb);

        let list = SelectorList::parse("video").unwrap();
        assert_eq!(d.query_within(b, &list), Some(vb));
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let mut d = doc();
        let div = d.create_element("div");
        d.append_child(d.root(), div);
        assert_eq!(d.query_selector("div[role=main]"), None);
        assert!(d.query_selector_all(":hover").is_empty());
    }
}
