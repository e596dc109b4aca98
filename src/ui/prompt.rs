use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::App;
use crate::core::{OperationReport, Outcome, Verdict};

pub enum MessageType {
    Info,
    Error,
}

/// Draw the per-volume result of the last operation
pub fn draw_report(frame: &mut Frame, report: &OperationReport) {
    let area = centered_rect(60, 50, frame.area());

    frame.render_widget(Clear, area);

    let (title, color) = match report.verdict {
        Verdict::AllSucceeded => (" Done ", Color::Green),
        Verdict::Partial => (" Partially done ", Color::Yellow),
        Verdict::AllFailed => (" Failed ", Color::Red),
        Verdict::NothingToDo => (" Nothing to do ", Color::Cyan),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().fg(color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .split(inner);

    let summary = Paragraph::new(report.summary())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
    frame.render_widget(summary, chunks[0]);

    let items: Vec<ListItem> = report
        .outcomes
        .iter()
        .map(|o| {
            let (mark, detail, style) = match &o.outcome {
                Outcome::Success => ("✓", String::new(), Style::default().fg(Color::Green)),
                Outcome::Failed(reason) => ("✗", reason.clone(), Style::default().fg(Color::Red)),
                Outcome::Skipped(reason) => ("–", reason.clone(), Style::default().fg(Color::DarkGray)),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} {:<10}", mark, o.identifier), style),
                Span::raw(format!(" {}", detail)),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), chunks[1]);

    let footer = Paragraph::new("Press Esc/Enter to dismiss")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);
}

/// Draw status/info messages
pub fn draw_status_message(frame: &mut Frame, app: &App, message: &str, msg_type: MessageType) {
    let area = centered_rect(60, 40, frame.area());

    frame.render_widget(Clear, area);

    let (title, color) = match msg_type {
        MessageType::Info => (" Progress ", Color::Cyan),
        MessageType::Error => (" Error ", Color::Red),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().fg(color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

    if matches!(msg_type, MessageType::Info) {
        let spinner_frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        let frame_idx = app.tick as usize % spinner_frames.len();
        let spinner = spinner_frames[frame_idx];

        let text = Paragraph::new(format!("{} {}", spinner, message))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(color));
        frame.render_widget(text, chunks[0]);
    } else {
        let text = Paragraph::new(message)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(color));
        frame.render_widget(text, chunks[0]);

        let footer = Paragraph::new("Press Esc/Enter to dismiss")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(footer, chunks[1]);
    }
}

/// Helper to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(r);
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    area
}
