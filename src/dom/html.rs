//! HTML5 snapshot parser using html5ever
//!
//! Builds page snapshots into the arena [`Document`]. Video elements are
//! seeded with media state from their markup: `src` becomes the resolved
//! source, and `data-video-width`/`data-video-height` carry intrinsic
//! dimensions (snapshots have no running pipeline to report them).

use super::{Document, MediaState, NodeId};
use crate::utils::{AvswitchError, Result};
use html5ever::parse_document as html5_parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, QualName, local_name, namespace_url, ns};
use markup5ever::Attribute;
use markup5ever::interface::tree_builder::{NodeOrText, TreeSink};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use url::Url;

/// Handle type for sink nodes (index into the arena)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handle(usize);

/// Sink that accumulates the parse tree before conversion
struct DomSink {
    /// Arena of nodes
    nodes: RefCell<Vec<SinkNode>>,
    /// QualNames for elements (stored separately to allow returning references)
    qual_names: RefCell<Vec<QualName>>,
    /// Document handle
    document_handle: Handle,
}

/// Internal node representation during parsing
struct SinkNode {
    node_type: SinkNodeType,
    children: Vec<Handle>,
    /// Index into qual_names for elements
    qual_name_idx: Option<usize>,
}

enum SinkNodeType {
    Document,
    Element {
        name: String,
        attrs: HashMap<String, String>,
    },
    Text(String),
    Comment(String),
    Doctype,
    ProcessingInstruction,
}

impl DomSink {
    fn new() -> Self {
        let nodes = vec![SinkNode {
            node_type: SinkNodeType::Document,
            children: Vec::new(),
            qual_name_idx: None,
        }];
        Self {
            nodes: RefCell::new(nodes),
            qual_names: RefCell::new(Vec::new()),
            document_handle: Handle(0),
        }
    }

    fn new_handle(&self, node: SinkNode) -> Handle {
        let mut nodes = self.nodes.borrow_mut();
        let handle = Handle(nodes.len());
        nodes.push(node);
        handle
    }

    fn add_qual_name(&self, qn: QualName) -> usize {
        let mut qual_names = self.qual_names.borrow_mut();
        let idx = qual_names.len();
        qual_names.push(qn);
        idx
    }

    /// Convert the accumulated tree into an arena document
    fn into_document(self, url: Url) -> Document {
        let nodes = self.nodes.into_inner();
        let mut document = Document::new(url);

        if let Some(doc_node) = nodes.first() {
            for child_handle in doc_node.children.clone() {
                let root = document.root();
                Self::convert_node(&nodes, child_handle, &mut document, root);
            }
        }

        // A snapshot load is not a mutation stream
        document.take_mutations();
        document
    }

    fn convert_node(nodes: &[SinkNode], handle: Handle, document: &mut Document, parent: NodeId) {
        let Some(sink_node) = nodes.get(handle.0) else {
            return;
        };

        match &sink_node.node_type {
            SinkNodeType::Document | SinkNodeType::Doctype | SinkNodeType::ProcessingInstruction => {}
            SinkNodeType::Element { name, attrs } => {
                let id = document.create_element(name.clone());
                for (k, v) in attrs {
                    document.set_attribute(id, k, v.clone());
                }
                if name == "video" {
                    document.set_media_state(id, media_from_attrs(attrs));
                }
                document.append_child(parent, id);
                for child_handle in &sink_node.children {
                    Self::convert_node(nodes, *child_handle, document, id);
                }
            }
            SinkNodeType::Text(text) => {
                if !text.trim().is_empty() {
                    let id = document.create_text(text.clone());
                    document.append_child(parent, id);
                }
            }
            SinkNodeType::Comment(_) => {}
        }
    }
}

/// Seed media state from snapshot markup
fn media_from_attrs(attrs: &HashMap<String, String>) -> MediaState {
    let dim = |key: &str| {
        attrs
            .get(key)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
    };
    MediaState {
        intrinsic_width: dim("data-video-width"),
        intrinsic_height: dim("data-video-height"),
        current_src: attrs.get("src").cloned(),
        paused: true,
    }
}

impl TreeSink for DomSink {
    type Handle = Handle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {}

    fn get_document(&self) -> Handle {
        self.document_handle
    }

    fn elem_name<'a>(&'a self, target: &'a Handle) -> Self::ElemName<'a> {
        let nodes = self.nodes.borrow();
        if let Some(node) = nodes.get(target.0) {
            if let Some(idx) = node.qual_name_idx {
                let qual_names = self.qual_names.borrow();
                // Safety: qual_names is append-only while the sink is alive,
                // so the entry never moves or drops before the sink does
                let qn_ptr = &qual_names[idx] as *const QualName;
                return unsafe { &*qn_ptr };
            }
        }
        // Return a static reference for non-elements
        static DEFAULT_QNAME: std::sync::OnceLock<QualName> = std::sync::OnceLock::new();
        DEFAULT_QNAME.get_or_init(|| QualName::new(None, ns!(html), local_name!("")))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: html5ever::tree_builder::ElementFlags,
    ) -> Handle {
        let mut attr_map = HashMap::new();
        for attr in attrs {
            attr_map.insert(attr.name.local.to_string(), attr.value.to_string());
        }
        let qual_name_idx = Some(self.add_qual_name(name.clone()));
        self.new_handle(SinkNode {
            node_type: SinkNodeType::Element {
                name: name.local.to_string(),
                attrs: attr_map,
            },
            children: Vec::new(),
            qual_name_idx,
        })
    }

    fn create_comment(&self, text: StrTendril) -> Handle {
        self.new_handle(SinkNode {
            node_type: SinkNodeType::Comment(text.to_string()),
            children: Vec::new(),
            qual_name_idx: None,
        })
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Handle {
        self.new_handle(SinkNode {
            node_type: SinkNodeType::ProcessingInstruction,
            qual_name_idx: None,
            children: Vec::new(),
        })
    }

    fn append(&self, parent: &Handle, child: NodeOrText<Handle>) {
        let child_handle = match child {
            NodeOrText::AppendNode(h) => h,
            NodeOrText::AppendText(text) => self.new_handle(SinkNode {
                node_type: SinkNodeType::Text(text.to_string()),
                children: Vec::new(),
                qual_name_idx: None,
            }),
        };
        self.nodes.borrow_mut()[parent.0].children.push(child_handle);
    }

    fn append_based_on_parent_node(
        &self,
        _element: &Handle,
        prev: &Handle,
        child: NodeOrText<Handle>,
    ) {
        self.append(prev, child);
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public: StrTendril,
        _system: StrTendril,
    ) {
        let doctype = self.new_handle(SinkNode {
            node_type: SinkNodeType::Doctype,
            children: Vec::new(),
            qual_name_idx: None,
        });
        self.nodes.borrow_mut()[0].children.push(doctype);
    }

    fn get_template_contents(&self, target: &Handle) -> Handle {
        *target
    }

    fn same_node(&self, x: &Handle, y: &Handle) -> bool {
        x.0 == y.0
    }

    fn set_quirks_mode(&self, _mode: html5ever::tree_builder::QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Handle, new_node: NodeOrText<Handle>) {
        let nodes = self.nodes.borrow();
        for (idx, node) in nodes.iter().enumerate() {
            if let Some(pos) = node.children.iter().position(|h| h.0 == sibling.0) {
                drop(nodes);
                let child_handle = match new_node {
                    NodeOrText::AppendNode(h) => h,
                    NodeOrText::AppendText(text) => self.new_handle(SinkNode {
                        node_type: SinkNodeType::Text(text.to_string()),
                        children: Vec::new(),
                        qual_name_idx: None,
                    }),
                };
                self.nodes.borrow_mut()[idx].children.insert(pos, child_handle);
                return;
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Handle, attrs: Vec<Attribute>) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(node) = nodes.get_mut(target.0) {
            if let SinkNodeType::Element { attrs: existing, .. } = &mut node.node_type {
                for attr in attrs {
                    existing
                        .entry(attr.name.local.to_string())
                        .or_insert_with(|| attr.value.to_string());
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Handle) {
        let mut nodes = self.nodes.borrow_mut();
        for node in nodes.iter_mut() {
            node.children.retain(|h| h.0 != target.0);
        }
    }

    fn reparent_children(&self, node: &Handle, new_parent: &Handle) {
        let mut nodes = self.nodes.borrow_mut();
        let children: Vec<Handle> = nodes[node.0].children.drain(..).collect();
        nodes[new_parent.0].children.extend(children);
    }
}

/// Parse a page snapshot into a document at the given location
pub fn parse_document(content: &str, url: Url) -> Result<Document> {
    if content.trim().is_empty() {
        return Ok(Document::new(url));
    }

    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let sink = DomSink::new();
    let dom = html5_parse_document(sink, opts)
        .from_utf8()
        .read_from(&mut content.as_bytes())
        .map_err(|e| AvswitchError::HtmlParse(e.to_string()))?;

    Ok(dom.into_document(url))
}
