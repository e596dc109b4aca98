use ratatui::{
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Padding, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::core::{AppState, VolumeRecord};

// Design tokens for consistent styling
const COLOR_PRIMARY: Color = Color::Rgb(99, 179, 237);    // Soft blue
const COLOR_SUCCESS: Color = Color::Rgb(104, 211, 145);   // Soft green
const COLOR_WARNING: Color = Color::Rgb(246, 173, 85);    // Soft orange
const COLOR_DANGER: Color = Color::Rgb(252, 129, 129);    // Soft red
const COLOR_MUTED: Color = Color::Rgb(113, 128, 150);     // Gray
const COLOR_BORDER: Color = Color::Rgb(74, 85, 104);      // Dark gray

/// Draw the main dashboard with the volume list
pub fn draw_dashboard(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let inner_area = area.inner(Margin::new(2, 1));

    let chunks = Layout::vertical([
        Constraint::Length(5),  // Header
        Constraint::Min(8),     // Volume table
        Constraint::Length(3),  // Help bar
    ])
    .split(inner_area);

    draw_header(frame, chunks[0], app);
    draw_volume_table(frame, chunks[1], app);
    draw_help_bar(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let (badge_text, badge_style) = if app.privileged {
        (
            " ● ROOT ",
            Style::default()
                .fg(Color::Black)
                .bg(COLOR_SUCCESS)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (
            " ○ USER ",
            Style::default()
                .fg(Color::Black)
                .bg(COLOR_WARNING)
                .add_modifier(Modifier::BOLD),
        )
    };

    let title_line = Line::from(vec![
        Span::styled(
            "Drivedeck",
            Style::default()
                .fg(COLOR_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(badge_text, badge_style),
    ]);

    let store = &app.store;
    let mut status = format!(
        "{} volumes  ·  {} to mount  ·  {} to unmount",
        app.visible().len(),
        store.pending_mount().len(),
        store.pending_unmount().len(),
    );
    if !store.show_efi() {
        status.push_str("  ·  EFI hidden");
    }
    if store.is_refreshing() {
        status.push_str("  ·  scanning…");
    }
    let subtitle = Line::from(vec![Span::styled(status, Style::default().fg(COLOR_MUTED))]);

    let header = Paragraph::new(vec![Line::default(), title_line, Line::default(), subtitle])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(COLOR_BORDER))
                .padding(Padding::horizontal(2)),
        );

    frame.render_widget(header, area);
}

/// Selection marker: `[M]` pending mount, `[U]` pending unmount.
fn selection_mark(app: &App, volume: &VolumeRecord) -> &'static str {
    if app.store.pending_mount().contains(&volume.identifier) {
        "[M]"
    } else if app.store.pending_unmount().contains(&volume.identifier) {
        "[U]"
    } else {
        "   "
    }
}

fn status_of(volume: &VolumeRecord) -> (&'static str, &'static str) {
    if volume.is_system_volume() {
        ("🔒", "System")
    } else if volume.is_mounted() {
        ("●", "Mounted")
    } else if volume.is_efi {
        ("○", "EFI")
    } else {
        ("○", "Unmounted")
    }
}

fn draw_volume_table(frame: &mut Frame, area: Rect, app: &App) {
    let header_cells = ["", "NAME", "ID", "SIZE", "TYPE", "MOUNT POINT", "STATUS"]
        .iter()
        .map(|h| {
            Cell::from(format!(" {} ", h)).style(
                Style::default()
                    .fg(COLOR_MUTED)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows: Vec<Row> = app
        .visible()
        .into_iter()
        .enumerate()
        .map(|(i, volume)| {
            let is_selected = i == app.cursor;

            let base_color = if volume.is_system_volume() {
                COLOR_DANGER
            } else if !volume.is_internal {
                COLOR_SUCCESS
            } else if volume.is_efi {
                COLOR_WARNING
            } else {
                Color::White
            };

            let style = if is_selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(base_color)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(base_color)
            };

            let (status_icon, status_text) = status_of(volume);
            let mount = if volume.is_mounted() {
                volume.mount_point.as_str()
            } else {
                "—"
            };

            Row::new(vec![
                Cell::from(selection_mark(app, volume)),
                Cell::from(format!(" {} ", volume.display_name)),
                Cell::from(format!(" {} ", volume.identifier)),
                Cell::from(format!(" {} ", volume.size_text)),
                Cell::from(format!(" {} ", volume.volume_type)),
                Cell::from(format!(" {} ", mount)),
                Cell::from(format!(" {} {} ", status_icon, status_text)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(18),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Percentage(28),
        Constraint::Length(13),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(COLOR_BORDER))
                .title(" Volumes ")
                .title_style(Style::default().fg(Color::White).bold())
                .padding(Padding::horizontal(1)),
        )
        .column_spacing(1)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(table, area);
}

fn draw_help_bar(frame: &mut Frame, area: Rect, app: &App) {
    let bindings = match &app.state {
        AppState::Idle => vec![
            ("↑↓", "Navigate"),
            ("m/u", "Select"),
            ("M/U", "Apply"),
            ("a", "All ext."),
            ("c", "Clear"),
            ("e/x", "Mount/Eject ext."),
            ("E", "Eject"),
            ("f", "EFI"),
            ("v", "Show EFI"),
            ("r", "Refresh"),
            ("q", "Quit"),
        ],
        AppState::InProgress(_) => vec![("q", "Quit")],
        _ => vec![("Esc", "Back"), ("q", "Quit")],
    };

    let mut spans = Vec::new();
    for (i, (key, action)) in bindings.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(COLOR_BORDER)));
        }
        spans.push(Span::styled(
            format!(" {} ", key),
            Style::default()
                .fg(Color::White)
                .bg(COLOR_BORDER)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!(" {}", action),
            Style::default().fg(COLOR_MUTED),
        ));
    }

    let help = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(COLOR_BORDER)),
        );

    frame.render_widget(help, area);
}
