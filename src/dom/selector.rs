//! Selector parsing and matching
//!
//! Covers exactly the grammar the probing chains use: tag names, `#id`,
//! `.class`, compounds thereof, descendant combinators (whitespace), and
//! comma-separated lists. Anything else is a parse error, which query
//! callers treat as "matches nothing".

use super::{Document, NodeId};
use crate::utils::{AvswitchError, Result};

/// A compound selector (tag, id, and classes that must all hold on one node)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    pub tag_name: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag_name.is_none() && self.id.is_none() && self.classes.is_empty()
    }

    /// Whether the element satisfies every part of the compound
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(data) = doc.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag_name {
            if data.tag_name != *tag {
                return false;
            }
        }
        if let Some(element_id) = &self.id {
            if data.id() != Some(element_id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| data.has_class(c))
    }
}

/// A descendant chain of compounds, leftmost ancestor first
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub compounds: Vec<Compound>,
}

impl Selector {
    /// Calculate specificity (a, b, c)
    pub fn specificity(&self) -> (u32, u32, u32) {
        let a = self.compounds.iter().filter(|c| c.id.is_some()).count() as u32;
        let b = self.compounds.iter().map(|c| c.classes.len() as u32).sum();
        let c = self.compounds.iter().filter(|c| c.tag_name.is_some()).count() as u32;
        (a, b, c)
    }

    /// Match right-to-left: the last compound against the element itself,
    /// earlier compounds against successively higher ancestors
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(doc, id) {
            return false;
        }
        let mut ancestor = doc.parent(id);
        for compound in rest.iter().rev() {
            loop {
                let Some(node) = ancestor else {
                    return false;
                };
                ancestor = doc.parent(node);
                if compound.matches(doc, node) {
                    break;
                }
            }
        }
        true
    }
}

/// A comma-separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
}

impl SelectorList {
    /// Parse a selector list; unsupported syntax is an error
    pub fn parse(input: &str) -> Result<SelectorList> {
        let mut selectors = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            selectors.push(parse_selector(part)?);
        }
        if selectors.is_empty() {
            return Err(AvswitchError::Selector(format!("empty selector: {input:?}")));
        }
        Ok(SelectorList { selectors })
    }

    /// Whether any selector in the list matches the element
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, id))
    }
}

/// Parse one descendant chain
fn parse_selector(input: &str) -> Result<Selector> {
    let mut compounds = Vec::new();
    for part in input.split_whitespace() {
        compounds.push(parse_compound(part)?);
    }
    if compounds.is_empty() {
        return Err(AvswitchError::Selector(format!("empty selector: {input:?}")));
    }
    Ok(Selector { compounds })
}

/// Parse a single compound with a char scan (tag, then #id / .class runs)
fn parse_compound(input: &str) -> Result<Compound> {
    let mut compound = Compound::default();
    let mut current = String::new();
    let mut mode = 'T'; // T=tag, I=id, C=class

    let mut flush = |compound: &mut Compound, current: &mut String, mode: char| -> Result<()> {
        if current.is_empty() {
            return if mode == 'T' {
                Ok(())
            } else {
                Err(AvswitchError::Selector(format!("dangling '{}' in {input:?}", if mode == 'I' { '#' } else { '.' })))
            };
        }
        match mode {
            'T' => compound.tag_name = Some(std::mem::take(current)),
            'I' => compound.id = Some(std::mem::take(current)),
            _ => compound.classes.push(std::mem::take(current)),
        }
        Ok(())
    };

    for c in input.chars() {
        match c {
            '#' => {
                flush(&mut compound, &mut current, mode)?;
                mode = 'I';
            }
            '.' => {
                flush(&mut compound, &mut current, mode)?;
                mode = 'C';
            }
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => current.push(c),
            c => {
                return Err(AvswitchError::Selector(format!(
                    "unsupported character {c:?} in {input:?}"
                )));
            }
        }
    }
    flush(&mut compound, &mut current, mode)?;

    if compound.is_empty() {
        return Err(AvswitchError::Selector(format!("empty compound in {input:?}")));
    }
    Ok(compound)
}
