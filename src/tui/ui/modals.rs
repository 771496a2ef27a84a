//! Modal popups: status picker and blocking alert.

use super::layout::{fit_lines_to_area, popup_rect};
use crate::tui::App;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Draw the status picker for the selected row.
pub fn draw_status_picker(f: &mut Frame, app: &App, selected: usize) {
    let options = app.picker_options();
    let height = options.len() as u16 + 4;
    let area = popup_rect(40, 30, 36, height, f.area());

    f.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    for (idx, label) in options.iter().enumerate() {
        let is_selected = idx == selected;
        let style = if is_selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {} ", idx + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(format!(" {} ", label), style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Enter: confirmar | Esc: cancelar",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(" Cambiar estado ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    let lines = fit_lines_to_area(lines, inner, 1);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draw a blocking alert; only Enter/Esc get past it.
pub fn draw_alert(f: &mut Frame, message: &str) {
    let area = popup_rect(50, 25, 40, 7, f.area());

    f.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: aceptar",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(ratatui::layout::Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
