//! Header, ticket/program tables and shared loading/error panes.

use super::icons;
use super::layout::{compute_column_layout, pad_to_width, ColumnLayout, ColumnSpec, PREFIX, SEP};
use super::status::{optional_status_config, program_type_color, StatusConfigurable};
use crate::data::aggregate::UNKNOWN_STATUS_LABEL;
use crate::data::{ProgramRequest, StatusRecord, StatusValue, Ticket, TicketKind};
use crate::tui::App;
use crate::util::{full_date, short_date};
use crate::view::{ListView, LoadStatus};
use chrono::Local;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

const DEPARTMENT: &str = "Secretaría de Ambiente y Desarrollo Sustentable";
const ANONYMOUS: &str = "Anónimo";
const NOT_REGISTERED: &str = "No registrado";
const DETAIL_INDENT: &str = "      ";

/// Selected row background
const SELECTED_BG: Color = Color::Rgb(30, 40, 60);

pub fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.is_busy() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Green)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut spans = vec![
        Span::styled("♻ ", Style::default().fg(Color::Green)),
        Span::styled(
            DEPARTMENT,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(user) = app.guard.user() {
        spans.push(Span::styled(
            format!("  Operador: {}", user.display_name()),
            Style::default().fg(Color::Gray),
        ));
    }
    if let Some(total) = app.total_rows() {
        spans.push(Span::styled(
            format!("  [Total: {}]", total),
            Style::default().fg(Color::Cyan),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    f.render_widget(paragraph, inner);
}

/// How a record renders as a table row.
pub trait TableRow: StatusRecord {
    const COLUMNS: &'static [ColumnSpec];
    /// Shown instead of rows when the collection is empty.
    const EMPTY: &'static str;

    /// One `(text, style)` per entry of `COLUMNS`, except the expand marker.
    fn cells(&self) -> Vec<(String, Style)>;

    fn detail_lines(&self) -> Vec<Line<'static>>;
}

const LIST_COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec::fixed("Fecha", 12, 12),
    ColumnSpec::fixed("Tipo", 10, 22).fills(),
    ColumnSpec::fixed("Usuario", 8, 18).hides(1),
    ColumnSpec::fixed("Chat ID", 6, 14).hides(0),
    ColumnSpec::fixed("Estado", 12, 30),
    ColumnSpec::fixed("", 1, 1),
];

const PROGRAM_COLUMNS: [ColumnSpec; 6] = [
    LIST_COLUMNS[0],
    ColumnSpec::fixed("Programa", 10, 22).fills(),
    LIST_COLUMNS[2],
    LIST_COLUMNS[3],
    LIST_COLUMNS[4],
    LIST_COLUMNS[5],
];

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn status_cell<S: StatusValue + StatusConfigurable>(status: Option<S>) -> (String, Style) {
    let cfg = optional_status_config(status);
    let label = status.map(|s| s.as_str()).unwrap_or(UNKNOWN_STATUS_LABEL);
    (format!("{} {}", cfg.icon, label), cfg.style)
}

fn user_cell(user_name: Option<&str>, chat_id: Option<&str>) -> [(String, Style); 2] {
    [
        (
            user_name.unwrap_or(ANONYMOUS).to_string(),
            Style::default().fg(Color::White),
        ),
        (chat_id.unwrap_or("-").to_string(), dim()),
    ]
}

fn detail(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::raw(DETAIL_INDENT),
        Span::styled(format!("{}: ", label), dim()),
        Span::styled(value.into(), Style::default().fg(Color::Gray)),
    ])
}

impl TableRow for Ticket {
    const COLUMNS: &'static [ColumnSpec] = &LIST_COLUMNS;
    const EMPTY: &'static str = "No hay tickets registrados.";

    fn cells(&self) -> Vec<(String, Style)> {
        let [user, chat] = user_cell(self.user_name.as_deref(), self.chat_id.as_deref());
        vec![
            (short_date(&self.created_at.with_timezone(&Local)), dim()),
            (
                self.kind.label().to_string(),
                Style::default().fg(Color::White),
            ),
            user,
            chat,
            status_cell(self.status),
        ]
    }

    fn detail_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![detail(
            "Dirección",
            self.address.clone().unwrap_or_else(|| "-".to_string()),
        )];
        match self.kind {
            TicketKind::SpecialPickup => {
                lines.push(detail(
                    "Tipo de Residuo",
                    self.waste_type.clone().unwrap_or_else(|| "-".to_string()),
                ));
                lines.push(detail(
                    "Cantidad",
                    self.quantity.clone().unwrap_or_else(|| "-".to_string()),
                ));
            }
            TicketKind::CollectionComplaint => {
                let days = self
                    .days_without_service
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                lines.push(detail("Días sin servicio", days));
            }
            TicketKind::Other(_) => {}
        }
        lines.push(detail(
            "Nombre",
            self.user_name.as_deref().unwrap_or(NOT_REGISTERED),
        ));
        lines.push(detail("WhatsApp ID", self.chat_id.as_deref().unwrap_or("-")));
        lines.push(detail(
            "Creado el",
            full_date(&self.created_at.with_timezone(&Local)),
        ));
        if let Some(deadline) = self.sla_deadline {
            lines.push(detail("Vence SLA", full_date(&deadline.with_timezone(&Local))));
        }
        if self.photo_url.is_some() {
            lines.push(Line::from(vec![
                Span::raw(DETAIL_INDENT),
                Span::styled("p: Ver Foto Adjunta", Style::default().fg(Color::Cyan)),
            ]));
        }
        lines
    }
}

impl TableRow for ProgramRequest {
    const COLUMNS: &'static [ColumnSpec] = &PROGRAM_COLUMNS;
    const EMPTY: &'static str = "No hay solicitudes recientes.";

    fn cells(&self) -> Vec<(String, Style)> {
        let [user, chat] = user_cell(self.user_name.as_deref(), self.chat_id.as_deref());
        let program = self
            .program_type
            .as_deref()
            .unwrap_or("-")
            .to_uppercase();
        vec![
            (short_date(&self.created_at.with_timezone(&Local)), dim()),
            (
                program,
                Style::default()
                    .fg(program_type_color(self.program_type.as_deref()))
                    .add_modifier(Modifier::BOLD),
            ),
            user,
            chat,
            status_cell(self.status),
        ]
    }

    fn detail_lines(&self) -> Vec<Line<'static>> {
        let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        vec![
            detail("Institución", text(&self.institution_name)),
            detail("Responsable", text(&self.responsible_person)),
            detail("Alumnos", self.student_count.unwrap_or(0).to_string()),
            detail("Dirección", text(&self.address)),
            detail(
                "Información Adicional",
                self.additional_info
                    .clone()
                    .unwrap_or_else(|| "Sin información adicional.".to_string()),
            ),
        ]
    }
}

/// Draw a ticket or program table, or the loading/error pane in its place.
pub fn draw_list<R: TableRow>(f: &mut Frame, view: &ListView<R>, title: &str, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    match view.state().status() {
        LoadStatus::Error(message) => return draw_load_error(f, message, inner),
        LoadStatus::Loading | LoadStatus::Idle if view.rows().is_empty() => {
            return draw_loading(f, inner)
        }
        _ => {}
    }

    let layout = compute_column_layout(R::COLUMNS, inner.width);
    let mut items: Vec<ListItem> = vec![
        ListItem::new(header_line::<R>(&layout)),
        ListItem::new(Line::from(vec![
            Span::raw(PREFIX),
            Span::styled(
                "─".repeat((inner.width as usize).saturating_sub(PREFIX.len())),
                dim(),
            ),
        ])),
    ];

    if view.rows().is_empty() {
        items.push(ListItem::new(Line::from(vec![
            Span::raw(PREFIX),
            Span::styled(R::EMPTY, dim().add_modifier(Modifier::ITALIC)),
        ])));
        f.render_widget(List::new(items), inner);
        return;
    }

    for (idx, row) in view.rows().iter().enumerate() {
        let selected = idx == view.selected_index();
        items.push(build_row(
            row,
            &layout,
            selected,
            view.is_expanded(row.id()),
            view.is_updating(row.id()),
        ));
    }

    let mut list_state = ListState::default().with_selected(Some(view.selected_index() + 2));
    f.render_stateful_widget(List::new(items), inner, &mut list_state);
}

fn header_line<R: TableRow>(layout: &ColumnLayout) -> Line<'static> {
    let mut spans = vec![Span::raw(PREFIX)];
    let mut first = true;
    for (idx, column) in R::COLUMNS.iter().enumerate() {
        if !layout.is_visible(idx) {
            continue;
        }
        if !first {
            spans.push(Span::styled(SEP, dim()));
        }
        first = false;
        spans.push(Span::styled(
            pad_to_width(column.title, layout.widths[idx], Alignment::Left),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn build_row<R: TableRow>(
    row: &R,
    layout: &ColumnLayout,
    selected: bool,
    expanded: bool,
    updating: bool,
) -> ListItem<'static> {
    let mut cells = row.cells();
    if updating {
        if let Some((text, _)) = cells.last_mut() {
            text.push(' ');
            text.push_str(icons::UPDATING);
        }
    }
    let marker = if expanded {
        icons::EXPANDED
    } else {
        icons::COLLAPSED
    };
    cells.push((marker.to_string(), dim()));

    let mut spans = vec![Span::raw(if selected {
        icons::SELECTED.to_string() + " "
    } else {
        PREFIX.to_string()
    })];
    let mut first = true;
    for (idx, (text, style)) in cells.into_iter().enumerate() {
        if !layout.is_visible(idx) {
            continue;
        }
        if !first {
            spans.push(Span::styled(SEP, dim()));
        }
        first = false;
        spans.push(Span::styled(
            pad_to_width(&text, layout.widths[idx], Alignment::Left),
            style,
        ));
    }

    let mut lines = vec![Line::from(spans)];
    if expanded {
        lines.extend(row.detail_lines());
    }

    let style = if selected {
        Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    ListItem::new(lines).style(style)
}

pub fn draw_loading(f: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(Line::from(Span::styled("Cargando...", dim())))
        .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

/// Full-pane error shown after a visible load failed.
pub fn draw_load_error(f: &mut Frame, message: &str, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Error cargando datos: {}", message),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Presioná r para reintentar", dim())),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{FetchTicket, PollEvent};
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    fn loaded<R: StatusRecord>(rows: Vec<R>) -> ListView<R> {
        let mut view = ListView::new();
        let ticket = FetchTicket {
            generation: 1,
            show_loading: true,
        };
        view.apply(PollEvent::Started(ticket));
        view.apply(PollEvent::Finished {
            ticket,
            result: Ok(rows),
        });
        view
    }

    fn render<R: TableRow>(view: &ListView<R>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal
            .draw(|f| draw_list(f, view, "Tickets", f.area()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_empty_collection_renders_placeholder_row() {
        assert!(render(&loaded::<Ticket>(vec![])).contains("No hay tickets registrados."));
        assert!(
            render(&loaded::<ProgramRequest>(vec![])).contains("No hay solicitudes recientes.")
        );
    }

    #[test]
    fn test_anonymous_ticket_cells() {
        let ticket = Ticket::try_from(&json!({
            "id": "t1",
            "ticket_type": "Reclamo Recolección",
            "status": null,
            "days_without_service": 4,
            "created_at": "2024-03-05T17:30:00Z"
        }))
        .unwrap();

        let cells = ticket.cells();
        assert_eq!(cells[2].0, "Anónimo");
        assert_eq!(cells[3].0, "-");
        assert!(cells[4].0.ends_with(UNKNOWN_STATUS_LABEL));

        let details: Vec<String> = ticket.detail_lines().iter().map(text).collect();
        assert!(details.iter().any(|l| l.contains("Días sin servicio: 4")));
        assert!(details.iter().any(|l| l.contains("Nombre: No registrado")));
        assert!(!details.iter().any(|l| l.contains("Ver Foto")));
    }

    #[test]
    fn test_program_details_defaults() {
        let program = ProgramRequest::try_from(&json!({
            "id": "p1",
            "program_type": "separa",
            "status": "Pendiente",
            "created_at": "2024-03-04T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(program.cells()[1].0, "SEPARA");
        let details: Vec<String> = program.detail_lines().iter().map(text).collect();
        assert!(details.contains(&format!("{}Alumnos: 0", DETAIL_INDENT)));
        assert!(details
            .iter()
            .any(|l| l.ends_with("Sin información adicional.")));
    }
}
