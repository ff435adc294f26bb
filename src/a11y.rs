use tracing::debug;

use crate::page::{NodeId, Page};
use crate::typing::TypingComplete;

pub const REDUCED_MOTION_CLASS: &str = "reduced-motion";
pub const SKIP_LINK_CLASS: &str = "skip-link";
pub const MAIN_ID: &str = "main";
const MAIN_CLASS: &str = "main";
const LIVE_REGION_ID: &str = "typedText";

const SKIP_LINK_HIDDEN_TOP: &str = "-40px";
const SKIP_LINK_FOCUSED_TOP: &str = "6px";

/// One-shot accessibility setup: reduced-motion class, skip link, live region
#[derive(Debug, Default)]
pub struct AccessibilityEnhancer {
    skip_link: Option<NodeId>,
    live_region: Option<NodeId>,
}

impl AccessibilityEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, page: &mut Page) {
        self.setup_reduced_motion(page);
        self.setup_skip_link(page);
        self.setup_live_region(page);
    }

    pub fn skip_link(&self) -> Option<NodeId> {
        self.skip_link
    }

    pub fn live_region(&self) -> Option<NodeId> {
        self.live_region
    }

    fn setup_reduced_motion(&self, page: &mut Page) {
        let matches = page.prefers_reduced_motion;
        self.on_reduced_motion_change(matches, page);
    }

    /// Track the media query for the page's whole lifetime
    pub fn on_reduced_motion_change(&self, matches: bool, page: &mut Page) {
        let root = page.document_element();
        if matches {
            page.add_class(root, REDUCED_MOTION_CLASS);
        } else {
            page.remove_class(root, REDUCED_MOTION_CLASS);
        }
        debug!(matches, "reduced motion preference applied");
    }

    fn setup_skip_link(&mut self, page: &mut Page) {
        let link = page.create_element("a");
        page.set_attribute(link, "href", &format!("#{MAIN_ID}"));
        page.add_class(link, SKIP_LINK_CLASS);
        page.set_text(link, "Skip to main content");
        for (prop, value) in [
            ("position", "absolute"),
            ("top", SKIP_LINK_HIDDEN_TOP),
            ("left", "6px"),
            ("padding", "8px"),
            ("z-index", "1000"),
            ("transition", "top 0.3s"),
        ] {
            page.set_style(link, prop, value);
        }
        page.insert_first(page.body(), link);
        self.skip_link = Some(link);

        if let Some(main) = page.query_class(MAIN_CLASS) {
            page.set_id(main, MAIN_ID);
            page.set_attribute(main, "role", "main");
        }
    }

    /// Bring the skip link on-screen while it has focus
    pub fn on_focus(&self, node: NodeId, page: &mut Page) {
        if self.skip_link == Some(node) {
            page.set_style(node, "top", SKIP_LINK_FOCUSED_TOP);
        }
    }

    pub fn on_blur(&self, node: NodeId, page: &mut Page) {
        if self.skip_link == Some(node) {
            page.set_style(node, "top", SKIP_LINK_HIDDEN_TOP);
        }
    }

    fn setup_live_region(&mut self, page: &mut Page) {
        let Some(region) = page.get_element_by_id(LIVE_REGION_ID) else {
            return;
        };
        page.set_attribute(region, "aria-live", "polite");
        page.set_attribute(region, "aria-label", "Typing animation in progress");
        self.live_region = Some(region);
    }

    pub fn on_typing_complete(&self, event: &TypingComplete, page: &mut Page) {
        if let Some(region) = self.live_region {
            page.set_attribute(
                region,
                "aria-label",
                &format!("Completed text: {}", event.text),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_landmarks() -> (Page, NodeId, NodeId) {
        let mut page = Page::new();
        let main = page.create_element("main");
        page.add_class(main, "main");
        let text = page.create_element("span");
        page.set_id(text, "typedText");
        page.append_child(page.body(), main);
        page.append_child(main, text);
        (page, main, text)
    }

    #[test]
    fn test_reduced_motion_class_follows_query() {
        let (mut page, _, _) = page_with_landmarks();
        page.prefers_reduced_motion = true;
        let mut a11y = AccessibilityEnhancer::new();
        a11y.init(&mut page);
        let root = page.document_element();
        assert!(page.element(root).has_class(REDUCED_MOTION_CLASS));

        a11y.on_reduced_motion_change(false, &mut page);
        assert!(!page.element(root).has_class(REDUCED_MOTION_CLASS));
        a11y.on_reduced_motion_change(true, &mut page);
        assert!(page.element(root).has_class(REDUCED_MOTION_CLASS));
    }

    #[test]
    fn test_skip_link_is_first_and_targets_main() {
        let (mut page, main, _) = page_with_landmarks();
        let mut a11y = AccessibilityEnhancer::new();
        a11y.init(&mut page);

        let link = a11y.skip_link().unwrap();
        assert_eq!(page.element(page.body()).children[0], link);
        let el = page.element(link);
        assert_eq!(el.attribute("href"), Some("#main"));
        assert_eq!(el.text, "Skip to main content");
        assert_eq!(el.style("top"), Some("-40px"));

        assert_eq!(page.get_element_by_id(MAIN_ID), Some(main));
        assert_eq!(page.element(main).attribute("role"), Some("main"));
    }

    #[test]
    fn test_skip_link_moves_on_focus_and_blur() {
        let (mut page, main, _) = page_with_landmarks();
        let mut a11y = AccessibilityEnhancer::new();
        a11y.init(&mut page);
        let link = a11y.skip_link().unwrap();

        a11y.on_focus(link, &mut page);
        assert_eq!(page.element(link).style("top"), Some("6px"));
        a11y.on_blur(link, &mut page);
        assert_eq!(page.element(link).style("top"), Some("-40px"));

        // focus elsewhere is ignored
        a11y.on_focus(main, &mut page);
        assert_eq!(page.element(main).style("top"), None);
    }

    #[test]
    fn test_live_region_announces_completion() {
        let (mut page, _, text) = page_with_landmarks();
        let mut a11y = AccessibilityEnhancer::new();
        a11y.init(&mut page);
        assert_eq!(page.element(text).attribute("aria-live"), Some("polite"));
        assert_eq!(
            page.element(text).attribute("aria-label"),
            Some("Typing animation in progress")
        );

        a11y.on_typing_complete(
            &TypingComplete {
                text: "hi".to_string(),
            },
            &mut page,
        );
        assert_eq!(
            page.element(text).attribute("aria-label"),
            Some("Completed text: hi")
        );
    }

    #[test]
    fn test_missing_landmarks_are_tolerated() {
        let mut page = Page::new();
        let mut a11y = AccessibilityEnhancer::new();
        a11y.init(&mut page);
        assert!(a11y.skip_link().is_some());
        assert!(a11y.live_region().is_none());
        assert_eq!(page.get_element_by_id(MAIN_ID), None);
        a11y.on_typing_complete(
            &TypingComplete {
                text: "x".to_string(),
            },
            &mut page,
        );
    }
}
