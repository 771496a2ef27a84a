//! Login form rendering.

use super::layout::popup_rect;
use crate::tui::login::{LoginField, LoginForm};
use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

fn field_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let marker = if focused { "▶ " } else { "  " };
    let cursor = if focused { "█" } else { "" };
    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(format!("{:<12}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, style),
        Span::styled(cursor, Style::default().fg(Color::Cyan)),
    ])
}

pub fn draw_login(f: &mut Frame, form: &LoginForm, spinner: char) {
    let area = popup_rect(50, 40, 48, 12, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(""),
        field_line(
            "Email",
            form.email.clone(),
            form.focus == LoginField::Email,
        ),
        Line::from(""),
        field_line(
            "Contraseña",
            form.masked_password(),
            form.focus == LoginField::Password,
        ),
        Line::from(""),
    ];

    if form.submitting {
        lines.push(Line::from(Span::styled(
            format!("{} Ingresando...", spinner),
            Style::default().fg(Color::Cyan),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Enter: ingresar",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let block = Block::default()
        .title(" Acceso Backoffice ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}
