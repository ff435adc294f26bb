//! In-process document model the widget renders into.
//!
//! A small element arena with the handful of operations the components need:
//! lookup by id/class, text, attributes, classes, inline styles and child
//! order. Page-wide state (ready state, visibility, media features, paint
//! timing) lives here too, and [`PageEvent`] carries the signals a host feeds
//! in.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintEntry {
    pub name: String,
    /// Time since the page started loading
    pub start_time: Duration,
}

impl PaintEntry {
    pub fn first_paint(start_time: Duration) -> Self {
        Self {
            name: "first-paint".to_string(),
            start_time,
        }
    }
}

/// Signals a host delivers to the page
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    DomContentLoaded,
    VisibilityChange { hidden: bool },
    ReducedMotionChange { matches: bool },
    Click(NodeId),
    KeyDown(Key),
    Focus(NodeId),
    Blur(NodeId),
    Paint(PaintEntry),
    Error(String),
    UnhandledRejection(String),
}

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
    pub title: Option<String>,
    /// Text preceding any child elements
    pub text: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Number of times a named animation was (re)applied
    pub animation_runs: u32,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn style(&self, prop: &str) -> Option<&str> {
        self.style.get(prop).map(String::as_str)
    }
}

#[derive(Debug)]
pub struct Page {
    elements: Vec<Element>,
    root: NodeId,
    body: NodeId,
    pub ready_state: ReadyState,
    pub hidden: bool,
    pub prefers_reduced_motion: bool,
    pub paint_timing_supported: bool,
    pub paint_entries: Vec<PaintEntry>,
    pub focused: Option<NodeId>,
    reflows: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        let mut elements = vec![Element::new("html"), Element::new("body")];
        elements[0].children.push(NodeId(1));
        elements[1].parent = Some(NodeId(0));

        Self {
            elements,
            root: NodeId(0),
            body: NodeId(1),
            ready_state: ReadyState::Loading,
            hidden: false,
            prefers_reduced_motion: false,
            paint_timing_supported: true,
            paint_entries: Vec::new(),
            focused: None,
            reflows: 0,
        }
    }

    pub fn document_element(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn element(&self, node: NodeId) -> &Element {
        &self.elements[node.0]
    }

    pub fn element_mut(&mut self, node: NodeId) -> &mut Element {
        &mut self.elements[node.0]
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.elements.push(Element::new(tag));
        NodeId(self.elements.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.elements[parent.0].children.push(child);
        self.elements[child.0].parent = Some(parent);
    }

    pub fn insert_first(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.elements[parent.0].children.insert(0, child);
        self.elements[child.0].parent = Some(parent);
    }

    /// Returns false when `child` was not a child of `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.elements[parent.0].children;
        match children.iter().position(|c| *c == child) {
            Some(pos) => {
                children.remove(pos);
                self.elements[child.0].parent = None;
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.elements[child.0].parent {
            self.remove_child(parent, child);
        }
    }

    /// Whether `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.elements[n.0].parent;
        }
        false
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Document-order traversal of connected elements
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.elements.len());
        let mut stack = vec![self.root];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.elements[n.0].children.iter().rev().copied());
        }
        out
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants()
            .into_iter()
            .find(|n| self.elements[n.0].id.as_deref() == Some(id))
    }

    /// First connected element carrying `class`
    pub fn query_class(&self, class: &str) -> Option<NodeId> {
        self.descendants()
            .into_iter()
            .find(|n| self.elements[n.0].has_class(class))
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) {
        self.elements[node.0].id = Some(id.to_string());
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        self.elements[node.0].classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.elements[node.0].classes.remove(class);
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.elements[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_style(&mut self, node: NodeId, prop: &str, value: &str) {
        self.elements[node.0]
            .style
            .insert(prop.to_string(), value.to_string());
    }

    pub fn set_title(&mut self, node: NodeId, title: &str) {
        self.elements[node.0].title = Some(title.to_string());
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let el = &mut self.elements[node.0];
        el.text.clear();
        el.text.push_str(text);
    }

    /// Own text followed by every descendant's text
    pub fn text_content(&self, node: NodeId) -> String {
        let el = &self.elements[node.0];
        let mut out = el.text.clone();
        for child in &el.children {
            out.push_str(&self.text_content(*child));
        }
        out
    }

    pub fn force_reflow(&mut self) {
        self.reflows += 1;
    }

    pub fn reflow_count(&self) -> u64 {
        self.reflows
    }

    /// Clear the `animation` style, reflow, then reapply it so the animation
    /// replays even if the same value was already set.
    pub fn replay_animation(&mut self, node: NodeId, animation: &str) {
        self.set_style(node, "animation", "none");
        self.force_reflow();
        self.set_style(node, "animation", animation);
        self.elements[node.0].animation_runs += 1;
    }
}
