use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use kairos_core::markup::{Fragment, MarkupNode, Tag};
use kairos_core::session::{Entry, CLEAR_CONFIRMATION};
use kairos_core::ChatRole;

use crate::app::{App, InputMode, QUICK_QUESTIONS};

/// Accumulates styled lines while walking a markup tree
#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
}

impl LineBuilder {
    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    fn break_line(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.current)));
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|line| line.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn walk(&mut self, node: &MarkupNode, style: Style) {
        match node {
            MarkupNode::Text(text) => {
                if !text.is_empty() {
                    self.current.push(Span::styled(text.clone(), style));
                }
            }
            MarkupNode::Element { tag, children, .. } => match tag {
                Tag::Br => self.break_line(),
                Tag::Strong => self.walk_all(children, style.add_modifier(Modifier::BOLD)),
                Tag::Em => self.walk_all(children, style.add_modifier(Modifier::ITALIC)),
                Tag::P => {
                    self.flush();
                    self.walk_all(children, style);
                    self.blank();
                }
                Tag::Ul => {
                    self.flush();
                    self.walk_all(children, style);
                    self.blank();
                }
                Tag::Li => {
                    self.flush();
                    self.current.push(Span::styled("  • ", Style::default().fg(Color::Cyan)));
                    self.walk_all(children, style);
                    self.flush();
                }
            },
        }
    }

    fn walk_all(&mut self, nodes: &[MarkupNode], style: Style) {
        for node in nodes {
            self.walk(node, style);
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Convert a markup tree into terminal lines: bold and italic spans, bullets
/// for list items, a blank line after each paragraph or list.
pub fn document_lines(fragment: &Fragment) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::default();
    builder.walk_all(&fragment.children, Style::default());
    builder.finish()
}

/// Rows `lines` take up when wrapped at `width` columns
pub fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    rows.min(usize::from(u16::MAX)) as u16
}

fn role_label(role: ChatRole) -> (&'static str, Color) {
    match role {
        ChatRole::User => ("Tú", Color::Cyan),
        ChatRole::System => ("Kairos", Color::Yellow),
        ChatRole::Error => ("Error", Color::Red),
    }
}

fn entry_lines(entry: &Entry) -> Vec<Line<'static>> {
    let message = entry.message();
    let (label, color) = role_label(message.role);

    let mut lines = vec![Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", message.timestamp), Style::default().fg(Color::DarkGray)),
    ])];

    let body = document_lines(entry.document().root());
    if message.role == ChatRole::Error {
        lines.extend(body.into_iter().map(|line| line.fg(Color::Red)));
    } else {
        lines.extend(body);
    }
    if entry.is_animating() {
        lines.push(Line::from(Span::styled("▌", Style::default().fg(Color::Yellow))));
    }
    lines.push(Line::default());
    lines
}

pub fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = app.session.entries().iter().flat_map(entry_lines).collect();

    if app.is_waiting() {
        let (label, color) = role_label(ChatRole::System);
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Escribiendo{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Popups, notice first
    if let Some(notice) = app.session.surface().notice.clone() {
        render_popup(frame, area, " Aviso ", &notice, Color::Yellow);
    } else if app.show_clear_confirm {
        let text = format!("{}\n\n[s] sí   [n] no", CLEAR_CONFIRMATION);
        render_popup(frame, area, " Limpiar chat ", &text, Color::Red);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let logo = if app.session.logo().is_some() { " ◆" } else { "" };

    let title = Line::from(vec![
        Span::styled(format!("{} Kairos ", logo), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" Mensajes: {} ", app.session.surface().user_messages),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(" Sesión: {} ", app.session.elapsed_label()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let lines = chat_lines(app);
    let total = wrapped_height(&lines, app.chat_width);
    app.fit_scroll(total);

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Asistente de escaneo 3D ");

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if !app.session.surface().send_enabled {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let mut title = vec![Span::raw(" Mensaje ")];
    if app.session.image().is_some() {
        title.push(Span::styled("[📸 imagen adjunta] ", Style::default().fg(Color::Green)));
    }
    if app.session.is_listening() {
        title.push(Span::styled("[🎤 escuchando] ", Style::default().fg(Color::Red)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(title));

    let input = app.session.input();
    let inner_width = area.width.saturating_sub(2) as usize;
    // Keep the cursor visible on long input
    let start = app.input_cursor.saturating_sub(inner_width.saturating_sub(1));
    let visible: String = input.chars().skip(start).take(inner_width).collect();

    let paragraph = if input.is_empty() && !editing {
        Paragraph::new(Span::styled(
            "Pulsa i para escribir...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(visible)
    };
    frame.render_widget(paragraph.block(block), area);

    if editing {
        let cursor_x = (app.input_cursor - start) as u16;
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" ESCRIBIR ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints = match app.input_mode {
        InputMode::Normal => format!(
            " i escribir  1-{} preguntas  v voz  s saltar  c limpiar  q salir ",
            QUICK_QUESTIONS.len()
        ),
        InputMode::Editing => " Enter enviar  Esc normal  /imagen <ruta>  /logo <ruta>  /limpiar ".to_string(),
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::Gray)),
        Span::styled(app.relay_url.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn render_popup(frame: &mut Frame, area: Rect, title: &str, text: &str, color: Color) {
    let popup_width = 50.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(2);
    let lines: Vec<Line> = text.lines().map(Line::from).collect();
    let popup_height = (wrapped_height(&lines, inner_width) + 2).min(area.height.saturating_sub(2));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);
    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::markup::compile;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_paragraphs_are_separated_by_blank_lines() {
        let lines = document_lines(&compile("uno\ndos\n\ntres"));
        assert_eq!(plain(&lines), vec!["uno", "dos", "", "tres"]);
    }

    #[test]
    fn test_list_items_get_bullets() {
        let lines = document_lines(&compile("Pasos:\n\n- calibrar\n- escanear"));
        assert_eq!(plain(&lines), vec!["Pasos:", "", "  • calibrar", "  • escanear"]);
    }

    #[test]
    fn test_bold_and_italic_styles() {
        let lines = document_lines(&compile("**Hola** y *adiós*"));
        assert_eq!(lines.len(), 1);
        let spans = &lines[0].spans;
        assert_eq!(spans[0].content, "Hola");
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[1].content, " y ");
        assert_eq!(spans[2].content, "adiós");
        assert!(spans[2].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_escaped_text_is_shown_literally() {
        let lines = document_lines(&compile("a < b & \"c\""));
        assert_eq!(plain(&lines), vec!["a < b & \"c\""]);
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdefghij"), Line::default(), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
        assert_eq!(wrapped_height(&lines, 0), 10 + 1 + 3);
    }
}
