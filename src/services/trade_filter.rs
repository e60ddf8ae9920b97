//! Symbol/side filters applied to already-fetched trade rows.

use crate::domain::{TradeRecord, TradeSide};

pub const ALL_LABEL: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SymbolFilter {
    #[default]
    All,
    Only(String),
}

impl SymbolFilter {
    pub fn matches(&self, trade: &TradeRecord) -> bool {
        match self {
            Self::All => true,
            Self::Only(symbol) => trade.symbol == *symbol,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => ALL_LABEL,
            Self::Only(symbol) => symbol.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideFilter {
    #[default]
    All,
    Buy,
    Sell,
}

impl SideFilter {
    pub fn matches(self, trade: &TradeRecord) -> bool {
        match self {
            Self::All => true,
            Self::Buy => trade.side == TradeSide::Buy,
            Self::Sell => trade.side == TradeSide::Sell,
        }
    }

    /// Cycle All -> BUY -> SELL -> All
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Buy,
            Self::Buy => Self::Sell,
            Self::Sell => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => ALL_LABEL,
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradeFilter {
    pub symbol: SymbolFilter,
    pub side: SideFilter,
}

impl TradeFilter {
    pub fn apply<'a>(&self, trades: &'a [TradeRecord]) -> Vec<&'a TradeRecord> {
        trades
            .iter()
            .filter(|trade| self.symbol.matches(trade) && self.side.matches(trade))
            .collect()
    }

    /// Step to the next symbol offered by `symbol_options`.
    pub fn cycle_symbol(&mut self, trades: &[TradeRecord]) {
        let options = symbol_options(trades);
        let current = options
            .iter()
            .position(|option| option == &self.symbol)
            .unwrap_or(0);
        self.symbol = options
            .get(current + 1)
            .cloned()
            .unwrap_or(SymbolFilter::All);
    }

    pub fn cycle_side(&mut self) {
        self.side = self.side.next();
    }

    /// Drop a symbol selection that no longer has rows after a refresh.
    pub fn retain_valid(&mut self, trades: &[TradeRecord]) {
        if let SymbolFilter::Only(symbol) = &self.symbol {
            if !trades.iter().any(|t| &t.symbol == symbol) {
                self.symbol = SymbolFilter::All;
            }
        }
    }
}

/// `All` followed by each distinct symbol in row order.
pub fn symbol_options(trades: &[TradeRecord]) -> Vec<SymbolFilter> {
    let mut options = vec![SymbolFilter::All];
    for trade in trades {
        let option = SymbolFilter::Only(trade.symbol.clone());
        if !options.contains(&option) {
            options.push(option);
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderId;
    use chrono::Local;
    use rust_decimal::Decimal;

    fn trade(symbol: &str, side: TradeSide) -> TradeRecord {
        TradeRecord {
            symbol: symbol.to_string(),
            side,
            timestamp: Local::now(),
            timestamp_estimated: false,
            amount: Decimal::ONE,
            price: Decimal::ONE,
            cost: Decimal::ONE,
            fee: Decimal::ZERO,
            closed_pnl: Decimal::ZERO,
            order_id: OrderId::NotAvailable,
        }
    }

    fn sample() -> Vec<TradeRecord> {
        vec![
            trade("ETH/USDC:USDC", TradeSide::Buy),
            trade("BTC/USDC:USDC", TradeSide::Sell),
            trade("ETH/USDC:USDC", TradeSide::Sell),
        ]
    }

    #[test]
    fn test_all_returns_everything() {
        let trades = sample();
        assert_eq!(TradeFilter::default().apply(&trades).len(), 3);
    }

    #[test]
    fn test_symbol_and_side_filters() {
        let trades = sample();
        let filter = TradeFilter {
            symbol: SymbolFilter::Only("ETH/USDC:USDC".to_string()),
            side: SideFilter::All,
        };
        let rows = filter.apply(&trades);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|t| t.symbol == "ETH/USDC:USDC"));

        let filter = TradeFilter {
            symbol: SymbolFilter::Only("ETH/USDC:USDC".to_string()),
            side: SideFilter::Sell,
        };
        assert_eq!(filter.apply(&trades).len(), 1);

        let filter = TradeFilter {
            symbol: SymbolFilter::Only("XRP/USDC:USDC".to_string()),
            side: SideFilter::All,
        };
        assert!(filter.apply(&trades).is_empty());
    }

    #[test]
    fn test_symbol_options_keep_row_order() {
        let options = symbol_options(&sample());
        let labels: Vec<_> = options.iter().map(|o| o.label()).collect();
        assert_eq!(labels, vec!["All", "ETH/USDC:USDC", "BTC/USDC:USDC"]);
    }

    #[test]
    fn test_cycle_symbol_wraps_to_all() {
        let trades = sample();
        let mut filter = TradeFilter::default();
        filter.cycle_symbol(&trades);
        assert_eq!(filter.symbol.label(), "ETH/USDC:USDC");
        filter.cycle_symbol(&trades);
        assert_eq!(filter.symbol.label(), "BTC/USDC:USDC");
        filter.cycle_symbol(&trades);
        assert_eq!(filter.symbol, SymbolFilter::All);
    }

    #[test]
    fn test_cycle_side() {
        let mut filter = TradeFilter::default();
        filter.cycle_side();
        assert_eq!(filter.side, SideFilter::Buy);
        filter.cycle_side();
        assert_eq!(filter.side, SideFilter::Sell);
        filter.cycle_side();
        assert_eq!(filter.side, SideFilter::All);
    }

    #[test]
    fn test_retain_valid_resets_missing_symbol() {
        let trades = sample();
        let mut filter = TradeFilter {
            symbol: SymbolFilter::Only("AVAX/USDC:USDC".to_string()),
            side: SideFilter::Buy,
        };
        filter.retain_valid(&trades);
        assert_eq!(filter.symbol, SymbolFilter::All);
        assert_eq!(filter.side, SideFilter::Buy);
    }
}
