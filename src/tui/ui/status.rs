//! Status configuration, tab bar and status bar rendering.

use super::icons;
use super::layout::{fit_lines_to_area, popup_rect};
use crate::data::{ProgramStatus, TicketStatus};
use crate::session::Route;
use crate::tui::app::Screen;
use crate::tui::App;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Unified status configuration - single source of truth for icon and style.
pub struct StatusConfig {
    pub icon: &'static str,
    pub style: Style,
}

/// Trait for types that can provide their display configuration (icon + style).
pub trait StatusConfigurable {
    fn status_config(&self) -> StatusConfig;
}

impl StatusConfigurable for TicketStatus {
    fn status_config(&self) -> StatusConfig {
        match self {
            TicketStatus::Pending => StatusConfig {
                icon: icons::TICKET_PENDING,
                style: Style::default().fg(Color::Cyan),
            },
            TicketStatus::PendingImageValidation => StatusConfig {
                icon: icons::TICKET_IMAGE_CHECK,
                style: Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            },
            TicketStatus::PendingGpsVerification => StatusConfig {
                icon: icons::TICKET_GPS_CHECK,
                style: Style::default().fg(Color::Rgb(255, 165, 0)), // Orange
            },
            TicketStatus::InProgress => StatusConfig {
                icon: icons::TICKET_IN_PROGRESS,
                style: Style::default().fg(Color::Blue),
            },
            TicketStatus::Resolved => StatusConfig {
                icon: icons::TICKET_RESOLVED,
                style: Style::default().fg(Color::Green),
            },
            TicketStatus::Rejected => StatusConfig {
                icon: icons::TICKET_REJECTED,
                style: Style::default().fg(Color::Red),
            },
        }
    }
}

impl StatusConfigurable for ProgramStatus {
    fn status_config(&self) -> StatusConfig {
        match self {
            ProgramStatus::Pending => StatusConfig {
                icon: icons::PROGRAM_PENDING,
                style: Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            },
            ProgramStatus::Contacted => StatusConfig {
                icon: icons::PROGRAM_CONTACTED,
                style: Style::default().fg(Color::Blue),
            },
            ProgramStatus::Scheduled => StatusConfig {
                icon: icons::PROGRAM_SCHEDULED,
                style: Style::default().fg(Color::Magenta),
            },
            ProgramStatus::Closed => StatusConfig {
                icon: icons::PROGRAM_CLOSED,
                style: Style::default().fg(Color::DarkGray),
            },
        }
    }
}

/// Config for a possibly missing status.
pub fn optional_status_config<S: StatusConfigurable>(status: Option<S>) -> StatusConfig {
    match status {
        Some(status) => status.status_config(),
        None => StatusConfig {
            icon: icons::STATUS_NONE,
            style: Style::default().fg(Color::DarkGray),
        },
    }
}

/// Chart palette, cycled per bucket.
pub const CHART_COLORS: [Color; 5] = [
    Color::Rgb(0x00, 0x88, 0xFE),
    Color::Rgb(0x00, 0xC4, 0x9F),
    Color::Rgb(0xFF, 0xBB, 0x28),
    Color::Rgb(0xFF, 0x80, 0x42),
    Color::Rgb(0x88, 0x84, 0xD8),
];

pub fn chart_color(idx: usize) -> Color {
    CHART_COLORS[idx % CHART_COLORS.len()]
}

/// Colour of a program type as stored (`separa`, `educa`, ...).
pub fn program_type_color(program_type: Option<&str>) -> Color {
    match program_type.map(str::to_lowercase).as_deref() {
        Some("separa") => Color::Green,
        Some("educa") => Color::Blue,
        Some("transforma") => Color::Magenta,
        _ => Color::Gray,
    }
}

/// Draw the status bar at the bottom of the screen.
pub fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width as usize;

    let status = if let Some(flash) = app.flash() {
        Span::styled(format!(" {} ", flash), Style::default().fg(Color::Yellow))
    } else {
        let text = match &app.screen {
            Screen::Checking => " Verificando sesión... | q: salir ",
            Screen::Login(_) => " Tab: cambiar campo | Enter: ingresar | Esc: salir ",
            Screen::Dashboard(_) => {
                if width >= 70 {
                    " 1/2/3: pantallas | r: recargar | L: cerrar sesión | ?: ayuda | q: salir "
                } else {
                    " 1/2/3 r L ? q "
                }
            }
            Screen::Tickets(_) | Screen::Programs(_) => {
                if width >= 100 {
                    " j/k: mover | Enter: detalle | s: estado | o: chat | p: foto | r: recargar | ?: ayuda "
                } else if width >= 60 {
                    " j/k Enter:detalle s:estado o:chat p:foto ?:ayuda "
                } else {
                    " ? ayuda "
                }
            }
        };
        Span::styled(text, Style::default().fg(Color::DarkGray))
    };

    let mut spans = vec![status];
    if app.is_busy() {
        spans.insert(
            0,
            Span::styled(
                format!(" {}", app.spinner_char()),
                Style::default().fg(Color::Cyan),
            ),
        );
    }

    let paragraph = Paragraph::new(Line::from(spans));
    f.render_widget(paragraph, area);
}

/// Draw the navigation tab bar.
pub fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];

    for (i, route) in Route::MAIN.iter().enumerate() {
        let style = if *route == app.route {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, route.title()), style));
        spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(" L Cerrar Sesión ", Style::default().fg(Color::DarkGray)));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn help_lines() -> Vec<&'static str> {
    vec![
        "",
        "  GENERAL",
        "  ───────",
        "  1 / 2 / 3    Dashboard / Tickets / Programas",
        "  Tab          Siguiente pantalla",
        "  r            Recargar",
        "  L            Cerrar sesión",
        "  ?            Ayuda",
        "  q / Ctrl+C   Salir",
        "",
        "  TABLAS",
        "  ──────",
        "  j / k        Mover selección",
        "  gg / G       Primera / última fila",
        "  Enter        Ver detalle",
        "  s            Cambiar estado",
        "  o            Abrir chat en vivo",
        "  p            Ver foto adjunta",
        "",
        "  SELECTOR DE ESTADO",
        "  ──────────────────",
        "  j / k, 1-9   Elegir estado",
        "  Enter        Confirmar",
        "  Esc          Cancelar",
        "",
    ]
}

/// Draw the help popup.
pub fn draw_help_popup(f: &mut Frame) {
    let area = popup_rect(65, 80, 40, 12, f.area());

    f.render_widget(Clear, area);

    let mut lines: Vec<Line> = help_lines().into_iter().map(Line::from).collect();
    lines.push(Line::from(Span::styled(
        "  Esc: cerrar",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(" Ayuda ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    let lines = fit_lines_to_area(lines, inner, 1);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().fg(Color::White));

    f.render_widget(paragraph, area);
}
