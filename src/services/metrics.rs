//! Derived metrics: pure functions over prices and PnL rates.
//!
//! Everything here is side-effect free and recomputed on every relevant
//! state change; nothing is cached across mutations. The store calls these
//! after each trade/ticker mutation; they are also usable standalone.

use crate::types::Direction;

/// Fractional distance from `reference` to `base`, signed by direction.
///
/// Long: `(reference - base) / reference`. Short: `(base - reference) /
/// reference`. A flat/unknown direction, a zero reference, or a non-finite
/// input yields 0.
pub fn price_distance_pct(reference: f64, base: f64, direction: Direction) -> f64 {
    if !reference.is_finite() || !base.is_finite() || reference == 0.0 {
        return 0.0;
    }
    match direction {
        Direction::Long => (reference - base) / reference,
        Direction::Short => (base - reference) / reference,
        Direction::Flat => 0.0,
    }
}

/// Signed percentage move from `entry` to `target` in the trade's favor.
///
/// For a long, a target above entry is positive; for a short, a target below
/// entry is positive. Used to express stop-loss/take-profit levels as rates.
pub fn signed_move_pct(entry: f64, target: f64, direction: Direction) -> f64 {
    if !entry.is_finite() || !target.is_finite() || entry == 0.0 {
        return 0.0;
    }
    match direction {
        Direction::Long => (target - entry) / entry * 100.0,
        Direction::Short => (entry - target) / entry * 100.0,
        Direction::Flat => 0.0,
    }
}

/// Map a PnL rate onto [-1, 1] against its stop-loss/take-profit rates.
///
/// 0 at exact breakeven; +1 at/above the take-profit rate; -1 at/beyond the
/// stop-loss rate. `take_profit_rate_pct` is a positive rate, and
/// `stop_loss_rate_pct` a negative one; a degenerate threshold (tp ≤ 0 or
/// sl ≥ 0) makes its branch yield 0.
pub fn normalize_pnl_rate(
    pnl_rate_pct: f64,
    stop_loss_rate_pct: f64,
    take_profit_rate_pct: f64,
) -> f64 {
    if !pnl_rate_pct.is_finite() || pnl_rate_pct == 0.0 {
        return 0.0;
    }
    if pnl_rate_pct > 0.0 {
        if !(take_profit_rate_pct > 0.0) || !take_profit_rate_pct.is_finite() {
            return 0.0;
        }
        (1.0 - (take_profit_rate_pct - pnl_rate_pct) / take_profit_rate_pct).min(1.0)
    } else {
        if !(stop_loss_rate_pct < 0.0) || !stop_loss_rate_pct.is_finite() {
            return 0.0;
        }
        ((stop_loss_rate_pct - pnl_rate_pct) / stop_loss_rate_pct - 1.0).max(-1.0)
    }
}

/// Normalized PnL distance from entry/current prices and target rates.
pub fn normalized_pnl_distance(
    entry: f64,
    current: f64,
    stop_loss_rate_pct: f64,
    take_profit_rate_pct: f64,
    direction: Direction,
) -> f64 {
    let pnl_rate = signed_move_pct(entry, current, direction);
    normalize_pnl_rate(pnl_rate, stop_loss_rate_pct, take_profit_rate_pct)
}

/// Sum of fee entries, ignoring non-finite garbage.
pub fn total_fees(entries: &[f64]) -> f64 {
    entries.iter().filter(|f| f.is_finite()).sum()
}

/// Format a price at the market's display precision (limit tuple's 4th
/// element; callers default to 2 when the market is unknown).
pub fn format_quote(price: f64, decimals: u32) -> String {
    format!("{:.*}", decimals as usize, price)
}
