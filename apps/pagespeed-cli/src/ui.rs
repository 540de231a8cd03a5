use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pagespeed_analysis::render_iteration;
use pagespeed_types::events::{ProgressEvent, ProgressStage};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Terminal,
};

const MAX_LOG_ENTRIES: usize = 120;

/// Dashboard state folded from progress events.
#[derive(Debug, Default)]
pub struct Dashboard {
    completed: u32,
    total: u32,
    ratio: f64,
    status: String,
    entries: VecDeque<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            status: "Starting...".into(),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: &ProgressEvent) {
        self.completed = event.completed_count;
        self.total = event.total_count;
        self.ratio = event.ratio();
        self.status = event.message.clone();

        match (&event.stage, &event.iteration) {
            // Countdown ticks only refresh the status line.
            (ProgressStage::Waiting { .. }, _) => {}
            (
                ProgressStage::IterationCompleted { .. } | ProgressStage::IterationFailed { .. },
                Some(iteration),
            ) => {
                for line in render_iteration(iteration).lines() {
                    self.push(line.to_string());
                }
            }
            _ => self.push(format!(
                "[{}] {}",
                event.timestamp.format("%H:%M:%S"),
                event.message
            )),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress_label(&self) -> String {
        format!("{} / {} tests", self.completed, self.total)
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &String> {
        self.entries.iter()
    }

    fn push(&mut self, entry: String) {
        if self.entries.len() == MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

pub fn run(receiver: Receiver<ProgressEvent>, summary: String) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, summary.as_str());

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<ProgressEvent>,
    summary: &str,
) -> Result<()> {
    let mut dashboard = Dashboard::new();

    loop {
        let mut receiver_closed = false;
        loop {
            match receiver.try_recv() {
                Ok(event) => dashboard.apply(&event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    receiver_closed = true;
                    break;
                }
            }
        }

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(0),
                    ]
                    .as_ref(),
                )
                .split(f.size());

            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "PageSpeed Batch",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::raw(dashboard.status().to_string()),
                Span::raw("  "),
                Span::styled("Target:", Style::default().fg(Color::Magenta)),
                Span::raw(" "),
                Span::raw(summary),
                Span::raw("  "),
                Span::styled("q", Style::default().fg(Color::Yellow)),
                Span::raw(" to close"),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Status"));
            f.render_widget(header, chunks[0]);

            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Progress"))
                .gauge_style(Style::default().fg(Color::Green))
                .ratio(dashboard.ratio)
                .label(dashboard.progress_label());
            f.render_widget(gauge, chunks[1]);

            let items: Vec<ListItem> = dashboard
                .entries()
                .rev()
                .map(|entry| ListItem::new(entry.clone()))
                .collect();

            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Recent results"))
                .highlight_style(Style::default().fg(Color::Yellow));

            f.render_widget(list, chunks[2]);
        })?;

        if receiver_closed {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pagespeed_types::{metrics::MetricSet, run::IterationResult};

    use super::*;

    #[test]
    fn completed_iteration_is_rendered_into_entries() {
        let mut dashboard = Dashboard::new();
        dashboard.apply(&ProgressEvent::new(
            0,
            2,
            ProgressStage::IterationStarted { index: 1 },
            "Running test 1 of 2...",
        ));
        let metrics = MetricSet {
            performance_score: Some(91.0),
            ..MetricSet::default()
        };
        let iteration = IterationResult::success(1, chrono::Utc::now(), metrics, metrics);
        dashboard.apply(
            &ProgressEvent::new(
                1,
                2,
                ProgressStage::IterationCompleted { index: 1 },
                "Completed test 1 of 2",
            )
            .with_iteration(iteration),
        );

        assert_eq!(dashboard.status(), "Completed test 1 of 2");
        assert_eq!(dashboard.progress_label(), "1 / 2 tests");
        let entries: Vec<&String> = dashboard.entries().collect();
        assert!(entries[0].ends_with("Running test 1 of 2..."));
        assert!(entries.iter().any(|e| e.starts_with("Test 1 - ")));
        assert!(entries.iter().any(|e| e.contains("Performance Score: 91")));
    }

    #[test]
    fn countdown_ticks_only_update_status() {
        let mut dashboard = Dashboard::new();
        dashboard.apply(&ProgressEvent::new(
            1,
            3,
            ProgressStage::Waiting { remaining_secs: 12 },
            "Waiting 12 seconds for cache to clear...",
        ));
        assert_eq!(dashboard.status(), "Waiting 12 seconds for cache to clear...");
        assert_eq!(dashboard.entries().count(), 0);
    }

    #[test]
    fn entries_are_bounded() {
        let mut dashboard = Dashboard::new();
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            dashboard.apply(&ProgressEvent::new(0, 1, ProgressStage::Averaging, format!("{i}")));
        }
        assert_eq!(dashboard.entries().count(), MAX_LOG_ENTRIES);
        assert!(dashboard.entries().next().unwrap().ends_with(" 10"));
    }

    #[test]
    fn entries_can_be_listed_newest_first() {
        let mut dashboard = Dashboard::new();
        for message in ["first", "second", "third"] {
            dashboard.apply(&ProgressEvent::new(0, 1, ProgressStage::Averaging, message));
        }
        let newest_first: Vec<&String> = dashboard.entries().rev().collect();
        assert!(newest_first[0].ends_with(" third"));
        assert!(newest_first[2].ends_with(" first"));
    }
}
