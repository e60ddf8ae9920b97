//! Plain-text rendering of one dashboard snapshot, for `--once`.

use std::fmt::Write;

use super::format::{format_timestamp, short_wallet};
use super::view_model::*;
use crate::config::Network;
use crate::infrastructure::ExchangeGateway;
use crate::services::DashboardSession;

/// Header context that does not live in the session.
pub struct Header<'a> {
    pub wallet_address: &'a str,
    pub network: Network,
    pub refresh_secs: u64,
}

pub fn render_snapshot<G: ExchangeGateway>(header: &Header<'_>, session: &DashboardSession<G>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_snapshot(&mut out, header, session);
    out
}

fn write_snapshot<G: ExchangeGateway>(
    out: &mut String,
    header: &Header<'_>,
    session: &DashboardSession<G>,
) -> std::fmt::Result {
    let snapshot = session.snapshot();
    let last_update = session
        .last_update()
        .map(|t| format_timestamp(&t))
        .unwrap_or_else(|| "never".to_string());

    writeln!(out, "=== Perps Risk Dashboard ===")?;
    writeln!(
        out,
        "Wallet: {} | Network: {} | Auto refresh: {}s | Last update: {} | Lookback: {} days",
        short_wallet(header.wallet_address),
        header.network,
        header.refresh_secs,
        last_update,
        session.lookback(),
    )?;
    if let Some(reason) = session.client().unavailable_reason() {
        writeln!(out, "WARNING: {}", reason)?;
    }

    writeln!(out)?;
    writeln!(out, "--- Account Balance ---")?;
    match &snapshot.balance {
        Some(balance) => {
            let cards = BalanceCards::build(balance);
            writeln!(out, "Total Balance: {}", cards.total)?;
            writeln!(out, "Free Balance:  {}", cards.free)?;
            writeln!(out, "Used Margin:   {}", cards.used)?;
            if let Some(usage) = cards.usage {
                writeln!(out, "{}", usage.label)?;
            }
        }
        None => {
            let warning = snapshot
                .balance_warning
                .as_deref()
                .unwrap_or(crate::services::BALANCE_WARNING);
            writeln!(out, "WARNING: {}", warning)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "--- Open Positions ---")?;
    if let Some(warning) = &snapshot.positions_warning {
        writeln!(out, "WARNING: {}", warning)?;
    }
    if snapshot.positions.is_empty() {
        writeln!(out, "No open positions")?;
    } else {
        let summary = PositionSummaryView::build(&session.position_summary());
        writeln!(
            out,
            "Open Positions: {} | Total Unrealized PnL: {} | Total Notional: {}",
            summary.count, summary.total_unrealized_pnl, summary.total_notional
        )?;
        if session.show_position_details {
            for position in &snapshot.positions {
                for line in position_detail_lines(position) {
                    writeln!(out, "{}", line)?;
                }
            }
        } else {
            let rows: Vec<_> = snapshot
                .positions
                .iter()
                .map(|p| PositionRow::build(p).cells.to_vec())
                .collect();
            write_table(out, &POSITION_HEADERS, &rows)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "--- Trade History ---")?;
    if let Some(warning) = &snapshot.trades_warning {
        writeln!(out, "WARNING: {}", warning)?;
    }
    if snapshot.trades.is_empty() {
        writeln!(out, "No trades in the last {} days", session.lookback())?;
        return Ok(());
    }

    let filtered = session.filtered_trades();
    writeln!(
        out,
        "Trades: {} | Symbol: {} | Side: {}",
        filtered.len(),
        session.filter.symbol.label(),
        session.filter.side.label()
    )?;
    let rows: Vec<_> = filtered
        .iter()
        .map(|t| TradeRow::build(t).cells.to_vec())
        .collect();
    write_table(out, &TRADE_HEADERS, &rows)?;

    if session.show_trade_statistics {
        let stats = StatisticsView::build(&session.trade_statistics());
        writeln!(
            out,
            "Total Closed PnL: {} | Total Fees: {} | Net PnL: {}",
            stats.total_closed_pnl, stats.total_fees, stats.net_pnl
        )?;
    }
    Ok(())
}

/// Left-aligned columns sized to the widest cell.
fn write_table(out: &mut String, headers: &[&str], rows: &[Vec<String>]) -> std::fmt::Result {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    writeln!(out, "{}", header_line.join("  ").trim_end())?;
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    writeln!(out, "{}", "-".repeat(total))?;

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(())
}
