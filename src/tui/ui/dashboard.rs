//! Dashboard: summary cards and the two distribution charts.

use super::icons;
use super::status::chart_color;
use super::table::{draw_load_error, draw_loading};
use crate::data::{Bucket, DashboardStats, Histogram};
use crate::tui::app::DashboardScreen;
use crate::view::LoadStatus;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

struct Card {
    icon: &'static str,
    title: &'static str,
    value: usize,
    caption: &'static str,
    color: Color,
}

fn cards(stats: &DashboardStats) -> [Card; 4] {
    [
        Card {
            icon: icons::CARD_TICKETS,
            title: "Tickets Totales",
            value: stats.total_tickets,
            caption: "Gestionados",
            color: Color::Blue,
        },
        Card {
            icon: icons::CARD_PENDING,
            title: "Tickets Pendientes",
            value: stats.pending_tickets,
            caption: "Requieren atención",
            color: Color::Yellow,
        },
        Card {
            icon: icons::CARD_PROGRAMS,
            title: "Solicitudes Programas",
            value: stats.total_programs,
            caption: "Acumulado",
            color: Color::Green,
        },
        Card {
            icon: icons::CARD_CONTACT,
            title: "Programas Pendientes",
            value: stats.pending_programs,
            caption: "Por contactar",
            color: Color::Magenta,
        },
    ]
}

pub fn draw_dashboard(f: &mut Frame, screen: &DashboardScreen, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title + last update
            Constraint::Length(5), // Cards
            Constraint::Min(0),    // Charts
        ])
        .split(area);

    draw_title(f, screen, chunks[0]);

    match screen.state.status() {
        LoadStatus::Error(message) => {
            let rest = Rect {
                height: chunks[1].height + chunks[2].height,
                ..chunks[1]
            };
            return draw_load_error(f, message, rest);
        }
        LoadStatus::Loading | LoadStatus::Idle if screen.state.last_updated().is_none() => {
            return draw_loading(f, chunks[1]);
        }
        _ => {}
    }

    draw_cards(f, &screen.summary.stats, chunks[1]);

    let direction = if chunks[2].width >= 100 {
        Direction::Horizontal
    } else {
        Direction::Vertical
    };
    let charts = Layout::default()
        .direction(direction)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    draw_histogram(
        f,
        "Estado de Tickets",
        &screen.summary.ticket_statuses,
        false,
        charts[0],
    );
    draw_histogram(
        f,
        "Programas Solicitados",
        &screen.summary.program_types,
        true,
        charts[1],
    );
}

fn draw_title(f: &mut Frame, screen: &DashboardScreen, area: Rect) {
    let mut spans = vec![Span::styled(
        " Panel General",
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(at) = screen.state.last_updated() {
        spans.push(Span::styled(
            format!("   Actualizado: {}", at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_cards(f: &mut Frame, stats: &DashboardStats, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for (card, rect) in cards(stats).iter().zip(columns.iter()) {
        let block = Block::default()
            .title(format!(" {} {} ", card.icon, card.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(card.color));
        let lines = vec![
            Line::from(Span::styled(
                card.value.to_string(),
                Style::default().fg(card.color).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                card.caption,
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(paragraph, *rect);
    }
}

/// Bar text: the count, plus its share of the total when `with_share`.
fn bar_text(bucket: &Bucket, total: usize, with_share: bool) -> String {
    if with_share && total > 0 {
        format!("{} ({}%)", bucket.count, bucket.count * 100 / total)
    } else {
        bucket.count.to_string()
    }
}

fn draw_histogram(f: &mut Frame, title: &str, histogram: &Histogram, with_share: bool, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL);

    if histogram.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "Sin datos",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block)
        .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
        return;
    }

    let total = histogram.total();
    let bars: Vec<Bar> = histogram
        .buckets()
        .iter()
        .enumerate()
        .map(|(idx, bucket)| {
            let color = chart_color(idx);
            Bar::default()
                .label(Line::from(bucket.label.clone()))
                .value(bucket.count as u64)
                .text_value(bar_text(bucket, total, with_share))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .max(histogram.max_count() as u64)
        .data(BarGroup::default().bars(&bars));
    f.render_widget(chart, area);
}
