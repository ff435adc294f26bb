//! Terminal stand-in for the browser: builds the host page and translates
//! crossterm input into page events.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{CONTAINER_CLASS, CURSOR_ID, DISPLAY_ID};
use crate::page::{Key, NodeId, Page};

/// Element handles of the page the terminal host serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPage {
    pub main: NodeId,
    pub container: NodeId,
    pub display: NodeId,
    pub cursor: NodeId,
}

#[derive(Debug, Clone, Copy)]
pub struct HostOptions {
    pub cursor_char: char,
    pub reduced_motion: bool,
    pub paint_timing: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            cursor_char: '|',
            reduced_motion: false,
            paint_timing: true,
        }
    }
}

/// `body > main.main > div.typing-container > span#typedText > span#cursor`,
/// still in the loading state.
pub fn build_host_page(opts: HostOptions) -> (Page, HostPage) {
    let mut page = Page::new();
    page.prefers_reduced_motion = opts.reduced_motion;
    page.paint_timing_supported = opts.paint_timing;

    let main = page.create_element("main");
    page.add_class(main, "main");
    let container = page.create_element("div");
    page.add_class(container, CONTAINER_CLASS);
    let display = page.create_element("span");
    page.set_id(display, DISPLAY_ID);
    page.add_class(display, "typed-text");
    let cursor = page.create_element("span");
    page.set_id(cursor, CURSOR_ID);
    page.add_class(cursor, "cursor");
    page.set_text(cursor, &opts.cursor_char.to_string());

    let body = page.body();
    page.append_child(body, main);
    page.append_child(main, container);
    page.append_child(container, display);
    page.append_child(display, cursor);

    (
        page,
        HostPage {
            main,
            container,
            display,
            cursor,
        },
    )
}

/// Things the host itself reacts to, outside the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Quit,
    TogglePause,
    /// Move keyboard focus onto or off the skip link
    CycleFocus,
    None,
}

pub fn host_action(key: &KeyEvent) -> HostAction {
    if key.kind == KeyEventKind::Release {
        return HostAction::None;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => HostAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => HostAction::Quit,
        KeyCode::Char('p') => HostAction::TogglePause,
        KeyCode::Tab | KeyCode::BackTab => HostAction::CycleFocus,
        _ => HostAction::None,
    }
}

/// Keydown as the page sees it; key releases produce nothing
pub fn page_key(key: &KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    Some(match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Esc => Key::Escape,
        _ => Key::Other,
    })
}
