//! Backtest analytics and reporting

use crate::analytics::{mean, std_dev};
use serde::{Deserialize, Serialize};

/// Direction of a spread position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    /// Long the spread: entered below -entry, profits when it rises
    Long,
    /// Short the spread: entered above +entry, profits when it falls
    Short,
}

/// One round-trip trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestTrade {
    pub side: PositionSide,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_spread: f64,
    pub exit_spread: f64,
    pub pnl: f64,
    pub z_score_at_entry: f64,
    pub z_score_at_exit: f64,
}

/// Complete backtest results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Trades with pnl <= 0
    pub losing_trades: usize,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    /// mean(pnl) / population std(pnl); 0 with fewer than two distinct outcomes
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough drop of cumulative trade PnL, peak starting at 0
    pub max_drawdown: f64,
    pub trades: Vec<BacktestTrade>,
}

impl BacktestResult {
    /// Aggregate statistics over closed trades in sequence order
    pub fn from_trades(trades: Vec<BacktestTrade>) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let winning_trades = pnls.iter().filter(|p| **p > 0.0).count();

        let sd = std_dev(&pnls);
        let sharpe_ratio = if sd > 0.0 { mean(&pnls) / sd } else { 0.0 };

        let mut peak = 0.0_f64;
        let mut cumulative = 0.0_f64;
        let mut max_drawdown = 0.0_f64;
        for pnl in &pnls {
            cumulative += pnl;
            peak = peak.max(cumulative);
            max_drawdown = max_drawdown.max(peak - cumulative);
        }

        Self {
            total_trades: trades.len(),
            winning_trades,
            losing_trades: trades.len() - winning_trades,
            total_pnl: pnls.iter().sum(),
            sharpe_ratio,
            max_drawdown,
            trades,
        }
    }

    /// Fraction of trades with positive pnl
    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.winning_trades as f64 / self.total_trades as f64
        }
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut out = format!(
            r#"
══════════════════════════════════════════════════════
               BACKTEST RESULTS
══════════════════════════════════════════════════════

PERFORMANCE
───────────────────────────────────────────────────────
Total P&L:        {:+.4}
Sharpe Ratio:     {:.2}
Max Drawdown:     {:.4}
Win Rate:         {:.1}%

ACTIVITY
───────────────────────────────────────────────────────
Total Trades:     {}
Winning:          {}
Losing:           {}
══════════════════════════════════════════════════════
"#,
            self.total_pnl,
            self.sharpe_ratio,
            self.max_drawdown,
            self.win_rate() * 100.0,
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
        );

        if !self.trades.is_empty() {
            out.push_str("\nSIDE   ENTRY   EXIT   Z@ENTRY   Z@EXIT        PNL\n");
            for t in &self.trades {
                let side = match t.side {
                    PositionSide::Long => "long",
                    PositionSide::Short => "short",
                };
                out.push_str(&format!(
                    "{:<5} {:>6} {:>6} {:>9.2} {:>8.2} {:>+10.4}\n",
                    side, t.entry_index, t.exit_index, t.z_score_at_entry, t.z_score_at_exit, t.pnl
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: f64) -> BacktestTrade {
        BacktestTrade {
            side: PositionSide::Short,
            entry_index: 0,
            exit_index: 1,
            entry_spread: pnl,
            exit_spread: 0.0,
            pnl,
            z_score_at_entry: 2.5,
            z_score_at_exit: -0.1,
        }
    }

    #[test]
    fn test_empty_result() {
        let r = BacktestResult::from_trades(vec![]);
        assert_eq!(r.total_trades, 0);
        assert_eq!(r.sharpe_ratio, 0.0);
        assert_eq!(r.max_drawdown, 0.0);
        assert_eq!(r.win_rate(), 0.0);
    }

    #[test]
    fn test_stats_over_trade_curve() {
        // Cumulative: 2, 1, -2, 0 -> peak 2, trough -2
        let r = BacktestResult::from_trades(vec![trade(2.0), trade(-1.0), trade(-3.0), trade(2.0)]);
        assert_eq!(r.total_trades, 4);
        assert_eq!(r.winning_trades, 2);
        assert_eq!(r.losing_trades, 2);
        assert!((r.total_pnl - 0.0).abs() < 1e-12);
        assert!((r.max_drawdown - 4.0).abs() < 1e-12);
        assert_eq!(r.sharpe_ratio, 0.0);
        assert_eq!(r.win_rate(), 0.5);
    }

    #[test]
    fn test_first_loss_counts_as_drawdown() {
        let r = BacktestResult::from_trades(vec![trade(-1.5)]);
        assert!((r.max_drawdown - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_pnl_counts_as_losing() {
        let r = BacktestResult::from_trades(vec![trade(0.0)]);
        assert_eq!(r.losing_trades, 1);
        assert_eq!(r.winning_trades, 0);
    }

    #[test]
    fn test_sharpe_uses_population_std() {
        // mean 2, population std 1
        let r = BacktestResult::from_trades(vec![trade(1.0), trade(3.0)]);
        assert!((r.sharpe_ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_format_table_lists_trades() {
        let table = BacktestResult::from_trades(vec![trade(1.0)]).format_table();
        assert!(table.contains("BACKTEST RESULTS"));
        assert!(table.contains("Total Trades:     1"));
        assert!(table.contains("short"));
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(BacktestResult::from_trades(vec![trade(1.0)])).unwrap();
        assert!(json.get("totalPnL").is_some());
        assert!(json.get("sharpeRatio").is_some());
        assert_eq!(json["trades"][0]["side"], "short");
    }
}
