use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::host::HostPage;
use crate::page::{NodeId, Page};
use crate::transition::EntranceTransition;

const HORIZONTAL_MARGIN: u16 = 5;
const CONTAINER_HEIGHT: u16 = 3;

/// Split the screen into skip-link row, typing container and footer
pub fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(CONTAINER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(area);
    (chunks[0], chunks[2], chunks[4])
}

/// Whether a click at (`column`, `row`) lands in the typing container
pub fn hits_container(area: Rect, column: u16, row: u16) -> bool {
    let (_, container, _) = layout(area);
    column >= container.x
        && column < container.x + container.width
        && row >= container.y
        && row < container.y + container.height
}

/// Renders the host page into the terminal
pub struct PageView<'a> {
    pub page: &'a Page,
    pub host: &'a HostPage,
    pub skip_link: Option<NodeId>,
    pub transition: &'a EntranceTransition,
    pub now: Duration,
    pub paused: bool,
}

impl PageView<'_> {
    fn cursor_span(&self) -> Option<Span<'static>> {
        let cursor = self.page.element(self.host.cursor);
        if !self.page.contains(self.host.display, self.host.cursor)
            || cursor.style("display") == Some("none")
        {
            return None;
        }
        let glyph = cursor.text.clone();
        if cursor.style("opacity") == Some("0") {
            // keep the width so the text doesn't shift
            return Some(Span::raw(" ".repeat(glyph.width())));
        }
        Some(Span::styled(
            glyph,
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ))
    }

    fn skip_link_focused(&self) -> Option<&str> {
        let link = self.skip_link?;
        let el = self.page.element(link);
        (el.style("top") == Some("6px")).then_some(el.text.as_str())
    }
}

impl Widget for PageView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (top, container, footer) = layout(area);

        if let Some(label) = self.skip_link_focused() {
            Paragraph::new(Span::styled(
                label.to_string(),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .render(top, buf);
        }

        let text = &self.page.element(self.host.display).text;
        let mut text_style = Style::default().add_modifier(Modifier::BOLD);
        if self.transition.is_active(self.now) {
            text_style = text_style.add_modifier(Modifier::DIM);
        }

        let mut spans = vec![Span::styled(text.clone(), text_style)];
        if let Some(cursor) = self.cursor_span() {
            spans.push(cursor);
        }

        let fits = text.width() < container.width as usize;
        let offset = self.transition.row_offset(self.now);
        let text_row = Rect {
            y: container.y + 1 + offset,
            height: container.height.saturating_sub(1 + offset),
            ..container
        };
        Paragraph::new(Line::from(spans))
            .alignment(if fits {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false })
            .render(text_row, buf);

        let title = self
            .page
            .element(self.host.container)
            .title
            .as_deref()
            .unwrap_or_default();
        let status = if self.paused { "paused | " } else { "" };
        let footer_style = Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC);
        Paragraph::new(vec![
            Line::from(Span::styled(format!("{status}{title}"), footer_style)),
            Line::from(Span::styled(
                "(space/enter) restart / (p)ause / (tab) skip link / (esc)ape",
                footer_style,
            )),
        ])
        .alignment(Alignment::Center)
        .render(footer, buf);
    }
}
