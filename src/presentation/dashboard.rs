//! Terminal dashboard: header, balance, positions and trade history panels.
//!
//! One task owns the session. Timer ticks, key presses and redraws are
//! multiplexed with `tokio::select!` and every fetch is awaited inline, so a
//! refresh never overlaps another one.

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Gauge, Paragraph, Row, Table, Wrap};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

use super::format::{format_timestamp, short_wallet};
use super::theme::{Panel, PanelStyle, Theme};
use super::view_model::*;
use crate::config::{LookbackDays, Network};
use crate::infrastructure::ExchangeGateway;
use crate::services::{DashboardSession, RefreshScheduler, RefreshTrigger, BALANCE_WARNING};

const REDRAW_PERIOD: Duration = Duration::from_secs(1);
const KEY_HINTS: &str =
    "r refresh | +/- lookback days | s symbol | b side | d position details | t trade stats | q quit";

type Term = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Refresh,
}

pub struct Dashboard<G> {
    session: DashboardSession<G>,
    scheduler: RefreshScheduler,
    wallet_address: String,
    network: Network,
    theme: Theme,
    refreshing: bool,
}

impl<G: ExchangeGateway> Dashboard<G> {
    pub fn new(
        session: DashboardSession<G>,
        scheduler: RefreshScheduler,
        wallet_address: impl Into<String>,
        network: Network,
    ) -> Self {
        Self {
            session,
            scheduler,
            wallet_address: wallet_address.into(),
            network,
            theme: Theme::default(),
            refreshing: false,
        }
    }

    /// Take over the terminal until the user quits. The terminal is restored
    /// even when the loop fails.
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let result = self.event_loop(&mut terminal).await;

        restore_terminal();
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(&mut self, terminal: &mut Term) -> Result<()> {
        let mut events = EventStream::new();
        let mut redraw = tokio::time::interval(REDRAW_PERIOD);
        info!(period_secs = self.scheduler.period().as_secs(), "Dashboard started");

        loop {
            if self.scheduler.is_due(Instant::now()) {
                self.refresh(terminal, RefreshTrigger::Timer).await?;
            }
            terminal.draw(|f| self.draw(f))?;

            let action = tokio::select! {
                _ = sleep_until(self.scheduler.next_due()) => Action::None,
                _ = redraw.tick() => Action::None,
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Some(Ok(_)) => Action::None,
                    Some(Err(e)) => return Err(e.into()),
                    None => Action::Quit,
                },
            };

            match action {
                Action::None => {}
                Action::Quit => break,
                Action::Refresh => self.refresh(terminal, RefreshTrigger::Manual).await?,
            }
        }

        info!("Dashboard stopped");
        Ok(())
    }

    async fn refresh(&mut self, terminal: &mut Term, trigger: RefreshTrigger) -> Result<()> {
        self.refreshing = true;
        terminal.draw(|f| self.draw(f))?;

        self.session.refresh(trigger).await;
        self.scheduler.mark_refreshed(Instant::now());
        self.refreshing = false;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let days = self.session.lookback().increment();
                self.lookback_action(days)
            }
            KeyCode::Char('-') | KeyCode::Char('_') => {
                let days = self.session.lookback().decrement();
                self.lookback_action(days)
            }
            KeyCode::Char('s') => {
                self.session.cycle_symbol_filter();
                Action::None
            }
            KeyCode::Char('b') => {
                self.session.cycle_side_filter();
                Action::None
            }
            KeyCode::Char('d') => {
                self.session.toggle_position_details();
                Action::None
            }
            KeyCode::Char('t') => {
                self.session.toggle_trade_statistics();
                Action::None
            }
            _ => Action::None,
        }
    }

    fn lookback_action(&mut self, days: LookbackDays) -> Action {
        if self.session.set_lookback(days) {
            info!(days = days.get(), "Lookback changed");
            Action::Refresh
        } else {
            Action::None
        }
    }

    fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(5),
                Constraint::Percentage(35),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .split(f.size());

        self.draw_header(f, chunks[0]);
        self.draw_balance(f, chunks[1]);
        self.draw_positions(f, chunks[2]);
        self.draw_trades(f, chunks[3]);
        self.draw_footer(f, chunks[4]);
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let last_update = self
            .session
            .last_update()
            .map(|t| format_timestamp(&t))
            .unwrap_or_else(|| "never".to_string());

        let label = Style::default().fg(theme.text_muted);
        let value = Style::default().fg(theme.text_primary);
        let mut lines = vec![Line::from(vec![
            Span::styled("Wallet: ", label),
            Span::styled(short_wallet(&self.wallet_address), value),
            Span::styled("  Network: ", label),
            Span::styled(self.network.to_string(), Style::default().fg(theme.accent)),
            Span::styled("  Auto refresh: ", label),
            Span::styled(format!("{}s", self.scheduler.period().as_secs()), value),
            Span::styled("  Last update: ", label),
            Span::styled(last_update, value),
            Span::styled("  Lookback: ", label),
            Span::styled(format!("{} days", self.session.lookback()), value),
        ])];
        if let Some(reason) = self.session.client().unavailable_reason() {
            lines.push(Line::styled(reason.to_string(), Style::default().fg(theme.warning)));
        }

        let block = Panel::new(theme)
            .title("Perps Risk Dashboard")
            .style(PanelStyle::Accent)
            .block();
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_balance(&self, f: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let snapshot = self.session.snapshot();

        let Some(balance) = &snapshot.balance else {
            let warning = snapshot.balance_warning.as_deref().unwrap_or(BALANCE_WARNING);
            let block = Panel::new(theme)
                .title("Account Balance")
                .style(PanelStyle::Warning)
                .block();
            f.render_widget(
                Paragraph::new(warning.to_string())
                    .style(Style::default().fg(theme.warning))
                    .block(block),
                area,
            );
            return;
        };

        let cards = BalanceCards::build(balance);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);

        for (i, (title, value)) in [
            ("Total Balance", &cards.total),
            ("Free Balance", &cards.free),
            ("Used Margin", &cards.used),
        ]
        .into_iter()
        .enumerate()
        {
            let block = Panel::new(theme).title(title).block();
            f.render_widget(
                Paragraph::new(value.clone())
                    .style(Style::default().fg(theme.text_primary).bold())
                    .block(block),
                columns[i],
            );
        }

        let block = Panel::new(theme).title("Margin Usage").block();
        match cards.usage {
            Some(usage) => {
                let color = if usage.ratio >= 0.8 {
                    theme.error
                } else if usage.ratio >= 0.5 {
                    theme.warning
                } else {
                    theme.success
                };
                let gauge = Gauge::default()
                    .block(block)
                    .gauge_style(Style::default().fg(color))
                    .ratio(usage.ratio)
                    .label(usage.label);
                f.render_widget(gauge, columns[3]);
            }
            None => {
                f.render_widget(
                    Paragraph::new("N/A")
                        .style(Style::default().fg(theme.text_muted))
                        .block(block),
                    columns[3],
                );
            }
        }
    }

    fn draw_positions(&self, f: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let snapshot = self.session.snapshot();
        let block = Panel::new(theme).title("Open Positions").block();
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut header_lines = Vec::new();
        if let Some(warning) = &snapshot.positions_warning {
            header_lines.push(Line::styled(warning.clone(), Style::default().fg(theme.warning)));
        }

        if snapshot.positions.is_empty() {
            header_lines.push(Line::styled(
                "No open positions",
                Style::default().fg(theme.text_muted),
            ));
            f.render_widget(Paragraph::new(header_lines), inner);
            return;
        }

        let summary = PositionSummaryView::build(&self.session.position_summary());
        let label = Style::default().fg(theme.text_muted);
        header_lines.push(Line::from(vec![
            Span::styled("Open Positions: ", label),
            Span::styled(summary.count, Style::default().fg(theme.text_primary)),
            Span::styled("  Total Unrealized PnL: ", label),
            Span::styled(
                summary.total_unrealized_pnl,
                Style::default().fg(theme.pnl(summary.profitable)),
            ),
            Span::styled("  Total Notional: ", label),
            Span::styled(summary.total_notional, Style::default().fg(theme.text_primary)),
        ]));

        let [top, body] = split_top(inner, header_lines.len() as u16 + 1);
        f.render_widget(Paragraph::new(header_lines), top);

        if self.session.show_position_details {
            let lines: Vec<Line> = snapshot
                .positions
                .iter()
                .flat_map(|position| {
                    let color = theme.pnl(position.is_profitable());
                    position_detail_lines(position)
                        .into_iter()
                        .enumerate()
                        .map(move |(i, text)| match i {
                            0 => Line::styled(text, Style::default().fg(theme.accent).bold()),
                            4 => Line::styled(text, Style::default().fg(color)),
                            _ => Line::raw(text),
                        })
                })
                .collect();
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), body);
            return;
        }

        let rows = snapshot.positions.iter().map(|position| {
            let row = PositionRow::build(position);
            let pnl = Style::default().fg(theme.pnl(row.profitable));
            let side = Style::default().fg(theme.pnl(position.side == crate::domain::PositionSide::Long));
            Row::new(row.cells.into_iter().enumerate().map(|(i, cell)| match i {
                1 => Cell::from(cell).style(side),
                6 | 7 => Cell::from(cell).style(pnl),
                _ => Cell::from(cell),
            }))
        });
        let widths = [
            Constraint::Length(16),
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(15),
            Constraint::Length(9),
        ];
        let table = Table::new(rows, widths).header(header_row(&POSITION_HEADERS, theme));
        f.render_widget(table, body);
    }

    fn draw_trades(&self, f: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let snapshot = self.session.snapshot();
        let lookback = self.session.lookback();
        let title = format!("Trade History (last {} days)", lookback);
        let block = Panel::new(theme).title(&title).block();
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut header_lines = Vec::new();
        if let Some(warning) = &snapshot.trades_warning {
            header_lines.push(Line::styled(warning.clone(), Style::default().fg(theme.warning)));
        }

        if snapshot.trades.is_empty() {
            header_lines.push(Line::styled(
                format!("No trades in the last {} days", lookback),
                Style::default().fg(theme.text_muted),
            ));
            f.render_widget(Paragraph::new(header_lines), inner);
            return;
        }

        let trades = self.session.filtered_trades();
        let label = Style::default().fg(theme.text_muted);
        let value = Style::default().fg(theme.text_primary);
        header_lines.push(Line::from(vec![
            Span::styled("Trades: ", label),
            Span::styled(trades.len().to_string(), value),
            Span::styled("  Symbol: ", label),
            Span::styled(self.session.filter.symbol.label().to_string(), value),
            Span::styled("  Side: ", label),
            Span::styled(self.session.filter.side.label(), value),
        ]));

        let [top, mut body] = split_top(inner, header_lines.len() as u16 + 1);
        f.render_widget(Paragraph::new(header_lines), top);

        if self.session.show_trade_statistics {
            let stats_height = 3.min(body.height);
            let stats_area = Rect {
                y: body.bottom() - stats_height,
                height: stats_height,
                ..body
            };
            body.height -= stats_height;
            self.draw_statistics(f, stats_area);
        }

        let rows = trades.iter().map(|trade| {
            let row = TradeRow::build(trade);
            let side = Style::default().fg(theme.pnl(row.side_is_buy));
            Row::new(row.cells.into_iter().enumerate().map(|(i, cell)| match i {
                2 => Cell::from(cell).style(side),
                _ => Cell::from(cell),
            }))
        });
        let widths = [
            Constraint::Length(20),
            Constraint::Length(16),
            Constraint::Length(5),
            Constraint::Length(12),
            Constraint::Length(13),
            Constraint::Length(13),
            Constraint::Length(13),
            Constraint::Length(10),
            Constraint::Length(12),
        ];
        let table = Table::new(rows, widths).header(header_row(&TRADE_HEADERS, theme));
        f.render_widget(table, body);
    }

    fn draw_statistics(&self, f: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let stats = StatisticsView::build(&self.session.trade_statistics());
        let label = Style::default().fg(theme.text_muted);
        let line = Line::from(vec![
            Span::styled("Total Closed PnL: ", label),
            Span::styled(stats.total_closed_pnl, Style::default().fg(theme.text_primary)),
            Span::styled("  Total Fees: ", label),
            Span::styled(stats.total_fees, Style::default().fg(theme.text_primary)),
            Span::styled("  Net PnL: ", label),
            Span::styled(stats.net_pnl, Style::default().fg(theme.pnl(stats.net_profitable)).bold()),
        ]);
        let block = Panel::new(theme).title("Statistics").block();
        f.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let status = if self.refreshing {
            "Refreshing...".to_string()
        } else {
            let remaining = self.scheduler.time_until_due(Instant::now());
            format!("Next refresh in {}s", remaining.as_secs())
        };
        let line = Line::from(vec![
            Span::styled(KEY_HINTS, Style::default().fg(theme.text_muted)),
            Span::raw("  "),
            Span::styled(status, Style::default().fg(theme.accent)),
        ]);
        f.render_widget(Paragraph::new(line), area);
    }
}

fn header_row(headers: &[&'static str], theme: &Theme) -> Row<'static> {
    Row::new(headers.iter().copied()).style(Style::default().fg(theme.text_primary).bold())
}

/// Split off `height` rows at the top of `area`.
fn split_top(area: Rect, height: u16) -> [Rect; 2] {
    let height = height.min(area.height);
    [
        Rect { height, ..area },
        Rect {
            y: area.y + height,
            height: area.height - height,
            ..area
        },
    ]
}

/// Best effort; failures are only logged.
fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!("Failed to disable raw mode: {}", e);
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
        warn!("Failed to leave alternate screen: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top() {
        let area = Rect::new(0, 0, 80, 10);
        let [top, body] = split_top(area, 3);
        assert_eq!(top, Rect::new(0, 0, 80, 3));
        assert_eq!(body, Rect::new(0, 3, 80, 7));

        let [top, body] = split_top(area, 20);
        assert_eq!(top.height, 10);
        assert_eq!(body.height, 0);
    }
}
