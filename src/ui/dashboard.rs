use crate::config::clamp_threshold;
use crate::error::WatchError;
use crate::market::indicators::Trend;
use crate::ui::{
    format_change, format_optional, format_price, Command, DisplaySink, Snapshot, SymbolView,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Sparkline, Table},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

const THRESHOLD_STEP: f64 = 0.1;
const KEY_POLL: Duration = Duration::from_millis(100);

type DashFrame<'a> = Frame<'a, CrosstermBackend<Stdout>>;

/// Full-screen terminal view: price table, a sparkline for the selected pair,
/// and a footer with this tick's alerts and warnings.
pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    last: Option<Snapshot>,
    selected: usize,
}

impl Dashboard {
    pub fn new() -> Result<Self, WatchError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            last: None,
            selected: 0,
        })
    }

    fn redraw(&mut self) -> Result<(), WatchError> {
        let Some(snapshot) = &self.last else {
            return Ok(());
        };
        let selected = self.selected.min(snapshot.symbols.len().saturating_sub(1));

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(5),
                    Constraint::Length(10),
                    Constraint::Length(5),
                ])
                .split(f.size());

            render_header(f, chunks[0], snapshot);
            render_prices_view(f, chunks[1], snapshot, selected);
            render_chart_view(f, chunks[2], snapshot.symbols.get(selected));
            render_footer(f, chunks[3], snapshot);
        })?;
        Ok(())
    }

    fn handle_key_input(&mut self, key: KeyEvent) -> Option<Command> {
        map_key(key, &mut self.last, &mut self.selected)
    }
}

/// Returns a command for the poller, if the key maps to one. Selection moves
/// and threshold edits show up in `last` straight away.
fn map_key(key: KeyEvent, last: &mut Option<Snapshot>, selected: &mut usize) -> Option<Command> {
    match key.code {
        // Raw mode delivers Ctrl-C as a key, not a signal
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('+') | KeyCode::Char('=') => nudge(last, THRESHOLD_STEP),
        KeyCode::Char('-') => nudge(last, -THRESHOLD_STEP),
        KeyCode::Up | KeyCode::Left => {
            *selected = selected.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Right => {
            let count = last.as_ref().map_or(0, |s| s.symbols.len());
            if *selected + 1 < count {
                *selected += 1;
            }
            None
        }
        _ => None,
    }
}

fn nudge(last: &mut Option<Snapshot>, delta: f64) -> Option<Command> {
    // The poller applies the edit after the wait
    if let Some(snapshot) = last.as_mut() {
        snapshot.percent_threshold = clamp_threshold(snapshot.percent_threshold + delta);
    }
    Some(Command::NudgeThreshold(delta))
}

impl DisplaySink for Dashboard {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), WatchError> {
        self.last = Some(snapshot.clone());
        self.redraw()
    }

    async fn idle(&mut self, interval: Duration) -> Result<Vec<Command>, WatchError> {
        let deadline = Instant::now() + interval;
        let mut commands = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(commands);
            }

            if event::poll(remaining.min(KEY_POLL))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match self.handle_key_input(key) {
                        Some(Command::Quit) => {
                            commands.push(Command::Quit);
                            return Ok(commands);
                        }
                        Some(command) => commands.push(command),
                        None => {}
                    }
                    self.redraw()?;
                }
            }
            tokio::task::yield_now().await;
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn trend_style(trend: Trend) -> (&'static str, Style) {
    match trend {
        Trend::Up => ("▲ up", Style::default().fg(Color::Green)),
        Trend::Down => ("▼ down", Style::default().fg(Color::Red)),
        Trend::Flat => ("■ flat", Style::default().fg(Color::Gray)),
    }
}

fn alert_cell(view: &SymbolView) -> Cell<'static> {
    let targets = view
        .alert_states
        .iter()
        .filter(|(kind, _)| kind.is_latched())
        .count();
    match (targets, view.latched_count()) {
        (0, _) => Cell::from("--"),
        (_, 0) => Cell::from(Span::styled(
            format!("{} armed", targets),
            Style::default().fg(Color::Yellow),
        )),
        (_, fired) => Cell::from(Span::styled(
            format!("{}/{} hit", fired, targets),
            Style::default().fg(Color::Green),
        )),
    }
}

fn render_header(f: &mut DashFrame, area: Rect, snapshot: &Snapshot) {
    let status = if snapshot.has_prices() {
        Span::styled("LIVE", Style::default().fg(Color::Green))
    } else {
        Span::styled("NO DATA", Style::default().fg(Color::Red))
    };

    let header = Paragraph::new(Text::from(vec![
        Line::from(vec![
            Span::styled(
                "PRICEWATCH ",
                Style::default()
                    .fg(Color::LightCyan)
                    .add_modifier(Modifier::BOLD),
            ),
            status,
        ]),
        Line::from(Span::styled(
            format!(
                "Last update: {} | Tick: {} | Move alert: {:.1}%",
                snapshot.taken_at.format("%H:%M:%S"),
                snapshot.tick,
                snapshot.percent_threshold
            ),
            Style::default().fg(Color::Gray),
        )),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));

    f.render_widget(header, area);
}

fn render_prices_view(f: &mut DashFrame, area: Rect, snapshot: &Snapshot, selected: usize) {
    let block = Block::default().borders(Borders::ALL).title("Live Prices");
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    if inner_area.height < 2 || inner_area.width < 30 {
        return;
    }

    let rows = snapshot.symbols.iter().enumerate().map(|(i, view)| {
        let change_color = match view.change_pct {
            Some(c) if c < 0.0 => Color::Red,
            Some(c) if c > 0.0 => Color::Green,
            _ => Color::Gray,
        };
        let (trend_text, trend_style) = trend_style(view.trend);
        let price = view
            .price
            .map_or_else(|| "--".to_string(), |p| format!("${}", format_price(p)));

        let row = Row::new(vec![
            Cell::from(view.symbol.clone()),
            Cell::from(price),
            Cell::from(Span::styled(
                format_change(view.change_pct),
                Style::default().fg(change_color),
            )),
            Cell::from(Span::styled(trend_text, trend_style)),
            Cell::from(format_optional(view.indicators.sma, 2)),
            Cell::from(format_optional(view.indicators.rsi, 1)),
            alert_cell(view),
        ]);

        if i == selected {
            row.style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else if !view.fresh {
            row.style(Style::default().add_modifier(Modifier::DIM))
        } else {
            row
        }
    });

    let table = Table::new(rows)
        .header(
            Row::new(vec!["Pair", "Price (USDT)", "Change", "Trend", "SMA", "RSI", "Targets"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .widths(&[
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(12),
        ]);

    f.render_widget(table, inner_area);
}

/// Rescales prices onto 1..=100 so the sparkline shows movement rather than magnitude.
fn sparkline_points(view: &SymbolView) -> Vec<u64> {
    let prices: Vec<f64> = view.history.iter().map(|s| s.price).collect();
    let (min, max) = prices
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let range = max - min;

    prices
        .iter()
        .map(|&p| {
            if range > 0.0 {
                ((p - min) / range * 99.0).round() as u64 + 1
            } else {
                50
            }
        })
        .collect()
}

fn render_chart_view(f: &mut DashFrame, area: Rect, view: Option<&SymbolView>) {
    let Some(view) = view else {
        f.render_widget(Block::default().borders(Borders::ALL).title("Trend"), area);
        return;
    };

    let title = format!("{} trend ({} samples)", view.symbol, view.history.len());
    let block = Block::default().borders(Borders::ALL).title(title);

    if view.history.len() <= 2 {
        let waiting = Paragraph::new(format!("Collecting data for {}...", view.symbol))
            .style(Style::default().fg(Color::Gray))
            .block(block);
        f.render_widget(waiting, area);
        return;
    }

    let points = sparkline_points(view);
    let color = match view.trend {
        Trend::Down => Color::Red,
        _ => Color::Green,
    };
    let sparkline = Sparkline::default()
        .block(block)
        .data(&points)
        .style(Style::default().fg(color));
    f.render_widget(sparkline, area);
}

fn render_footer(f: &mut DashFrame, area: Rect, snapshot: &Snapshot) {
    let mut lines: Vec<Line> = snapshot
        .alerts
        .iter()
        .map(|event| {
            Line::from(Span::styled(
                format!("ALERT {}", event.body()),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
        })
        .collect();

    lines.extend(snapshot.warnings.iter().map(|warning| {
        Line::from(Span::styled(warning.clone(), Style::default().fg(Color::Red)))
    }));

    if !snapshot.has_prices() {
        lines.push(Line::from(Span::styled(
            "No prices available. Check the network or the mirror list.",
            Style::default().fg(Color::Red),
        )));
    }

    lines.push(Line::from(Span::styled(
        "q: quit | ↑/↓: select pair | +/-: move alert threshold",
        Style::default().fg(Color::DarkGray),
    )));

    let footer = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}
