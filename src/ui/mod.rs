pub mod dashboard;
pub mod prompt;

use ratatui::Frame;

use crate::app::App;
use crate::core::AppState;

/// Main draw function that dispatches to appropriate view
pub fn draw(frame: &mut Frame, app: &App) {
    dashboard::draw_dashboard(frame, app);
    match &app.state {
        AppState::Idle => {}
        AppState::InProgress(msg) => {
            prompt::draw_status_message(frame, app, msg, prompt::MessageType::Info);
        }
        AppState::Report(report) => {
            prompt::draw_report(frame, report);
        }
        AppState::Error(msg) => {
            prompt::draw_status_message(frame, app, msg, prompt::MessageType::Error);
        }
    }
}
