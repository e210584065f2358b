//! Buy/sell pressure heuristics over a batch of bonding-curve trades.
//!
//! Deterministic and side-effect free: the same trade batch always yields
//! the same analysis, so results are recomputed on every call and never
//! cached.

use std::collections::HashSet;

use crate::agent::types::{Trade, TradeAnalysis};

/// A single trade more than ten times the mean trade size counts as
/// whale activity.
const WHALE_MULTIPLIER: f64 = 10.0;

/// Aggregate a trade batch into flow metrics.
///
/// Empty batches produce all-zero counts with a neutral 50% buy pressure.
/// Division guards substitute 1 for empty-side divisors so per-side
/// averages degrade to 0 instead of NaN.
pub fn analyze_trade_flow(trades: &[Trade]) -> TradeAnalysis {
    let buys: Vec<&Trade> = trades.iter().filter(|t| t.is_buy).collect();
    let sells: Vec<&Trade> = trades.iter().filter(|t| !t.is_buy).collect();

    let buy_volume: f64 = buys.iter().map(|t| t.sol_amount).sum();
    let sell_volume: f64 = sells.iter().map(|t| t.sol_amount).sum();

    let unique_buyers = buys
        .iter()
        .map(|t| t.user.as_str())
        .collect::<HashSet<_>>()
        .len();
    let unique_sellers = sells
        .iter()
        .map(|t| t.user.as_str())
        .collect::<HashSet<_>>()
        .len();

    let avg_buy_size = buy_volume / buys.len().max(1) as f64;
    let avg_sell_size = sell_volume / sells.len().max(1) as f64;

    let buy_pressure = if trades.is_empty() {
        50.0
    } else {
        buys.len() as f64 / trades.len() as f64 * 100.0
    };

    let largest_trade = trades
        .iter()
        .map(|t| t.sol_amount)
        .fold(0.0_f64, f64::max);

    let avg_trade_size = (buy_volume + sell_volume) / trades.len().max(1) as f64;
    let is_whale_activity =
        !trades.is_empty() && largest_trade > WHALE_MULTIPLIER * avg_trade_size;

    TradeAnalysis {
        total_buys: buys.len(),
        total_sells: sells.len(),
        buy_volume,
        sell_volume,
        net_flow: buy_volume - sell_volume,
        unique_buyers,
        unique_sellers,
        avg_buy_size,
        avg_sell_size,
        buy_pressure,
        is_whale_activity,
        largest_trade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(is_buy: bool, sol: f64, user: &str) -> Trade {
        Trade {
            signature: format!("sig-{}-{}", user, sol),
            mint: "So11111111111111111111111111111111111111112".to_string(),
            is_buy,
            sol_amount: sol,
            user: user.to_string(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn empty_batch_is_neutral() {
        let analysis = analyze_trade_flow(&[]);
        assert_eq!(analysis.total_buys, 0);
        assert_eq!(analysis.total_sells, 0);
        assert_eq!(analysis.buy_volume, 0.0);
        assert_eq!(analysis.sell_volume, 0.0);
        assert_eq!(analysis.net_flow, 0.0);
        assert_eq!(analysis.unique_buyers, 0);
        assert_eq!(analysis.unique_sellers, 0);
        assert_eq!(analysis.avg_buy_size, 0.0);
        assert_eq!(analysis.avg_sell_size, 0.0);
        assert_eq!(analysis.buy_pressure, 50.0);
        assert_eq!(analysis.largest_trade, 0.0);
        assert!(!analysis.is_whale_activity);
    }

    #[test]
    fn partition_is_exhaustive() {
        let trades = vec![
            trade(true, 1.0, "a"),
            trade(true, 2.0, "b"),
            trade(false, 0.5, "c"),
            trade(true, 0.25, "a"),
            trade(false, 3.0, "d"),
        ];
        let analysis = analyze_trade_flow(&trades);
        assert_eq!(analysis.total_buys + analysis.total_sells, trades.len());
        assert!(analysis.buy_volume >= 0.0);
        assert!(analysis.sell_volume >= 0.0);
        assert_eq!(analysis.buy_volume, 3.25);
        assert_eq!(analysis.sell_volume, 3.5);
        assert_eq!(analysis.net_flow, -0.25);
        assert_eq!(analysis.unique_buyers, 2);
        assert_eq!(analysis.unique_sellers, 2);
        assert_eq!(analysis.buy_pressure, 60.0);
    }

    #[test]
    fn one_sided_batch_keeps_other_average_at_zero() {
        let analysis = analyze_trade_flow(&[trade(true, 2.0, "a"), trade(true, 4.0, "b")]);
        assert_eq!(analysis.avg_buy_size, 3.0);
        assert_eq!(analysis.avg_sell_size, 0.0);
        assert_eq!(analysis.buy_pressure, 100.0);
    }

    #[test]
    fn whale_detection_uses_mean_trade_size() {
        // 9 trades of 0.1 SOL plus one 50 SOL outlier: mean = 5.09,
        // largest 50 < 10x mean fails; push the outlier higher.
        let mut trades: Vec<Trade> = (0..9).map(|i| trade(true, 0.1, &format!("u{i}"))).collect();
        trades.push(trade(false, 100.0, "whale"));
        let analysis = analyze_trade_flow(&trades);
        // mean = 100.9 / 10 = 10.09, threshold 100.9 > largest 100: not whale
        assert!(!analysis.is_whale_activity);

        trades.push(trade(true, 0.1, "u9"));
        trades[9].sol_amount = 500.0;
        let analysis = analyze_trade_flow(&trades);
        assert!(analysis.is_whale_activity);
        assert_eq!(analysis.largest_trade, 500.0);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let trades = vec![
            trade(true, 1.5, "a"),
            trade(false, 0.7, "b"),
            trade(true, 2.2, "c"),
        ];
        assert_eq!(analyze_trade_flow(&trades), analyze_trade_flow(&trades));
    }
}
