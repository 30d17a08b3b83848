//! Validation, currency normalization and derived risk metrics

use crate::fx::{FxRateSource, conversion_rate};
use crate::models::{ExtractedTrade, NormalizedTrade, TradeDirection, TradeMetrics, TradeStatus};
use crate::{JournalError, Result};
use chrono::NaiveDate;
use tracing::warn;

fn positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(JournalError::validation(format!("{name} must be greater than 0, got {value}")))
    }
}

fn optional_positive(name: &str, value: Option<f64>) -> Result<Option<f64>> {
    value.map(|v| positive(name, v)).transpose()
}

fn currency_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_uppercase)
}

/// Parse `YYYY-MM-DD`, also accepting a datetime with that prefix
fn parse_date(field: &str, value: Option<&str>) -> Option<NaiveDate> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    let date = raw
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok());
    if date.is_none() {
        warn!(field, value = raw, "Ignoring unparseable date");
    }
    date
}

/// Check an extracted trade before any conversion
///
/// Symbol must be non-empty, quantity and entry price positive. Optional
/// prices must be positive when present and fees non-negative.
pub fn validate(trade: &ExtractedTrade) -> Result<()> {
    if trade.symbol.trim().is_empty() {
        return Err(JournalError::validation("symbol is empty"));
    }
    positive("quantity", trade.quantity)?;
    positive("entry_price", trade.entry_price)?;
    optional_positive("exit_price", trade.exit_price)?;
    optional_positive("stop_loss", trade.stop_loss)?;
    optional_positive("take_profit", trade.take_profit)?;
    if let Some(fees) = trade.fees {
        if !(fees.is_finite() && fees >= 0.0) {
            return Err(JournalError::validation(format!("fees must not be negative, got {fees}")));
        }
    }
    if let Some(pnl) = trade.reported_pnl {
        if !pnl.is_finite() {
            return Err(JournalError::validation("reported_pnl is not a number"));
        }
    }
    Ok(())
}

/// Convert a validated trade into `base` currency and resolve its PnL
///
/// A reported PnL is converted from its own currency. Otherwise a closed
/// trade gets `(exit - entry) * qty * sign - fees`; an open trade has none.
pub async fn normalize(
    trade: &ExtractedTrade,
    base: &str,
    fx: &dyn FxRateSource,
) -> Result<NormalizedTrade> {
    validate(trade)?;

    let base = base.to_ascii_uppercase();
    let original_currency = currency_code(trade.currency.as_deref()).unwrap_or_else(|| base.clone());
    let fx_rate = conversion_rate(fx, &original_currency, &base).await?;
    let convert = |v: f64| v * fx_rate;

    let entry_price = convert(trade.entry_price);
    let exit_price = trade.exit_price.map(convert);
    let fees = convert(trade.fees.unwrap_or(0.0));
    let status = if exit_price.is_some() {
        TradeStatus::Closed
    } else {
        TradeStatus::Open
    };

    let (pnl, pnl_reported) = match trade.reported_pnl {
        Some(reported) => {
            let pnl_currency =
                currency_code(trade.pnl_currency.as_deref()).unwrap_or_else(|| original_currency.clone());
            let rate = if pnl_currency == original_currency {
                fx_rate
            } else {
                conversion_rate(fx, &pnl_currency, &base).await?
            };
            (Some(reported * rate), true)
        }
        None => {
            let computed = exit_price
                .map(|exit| (exit - entry_price) * trade.quantity * trade.direction.sign() - fees);
            (computed, false)
        }
    };

    Ok(NormalizedTrade {
        symbol: trade.symbol.trim().to_ascii_uppercase(),
        direction: trade.direction,
        status,
        quantity: trade.quantity,
        entry_price,
        exit_price,
        stop_loss: trade.stop_loss.map(convert),
        take_profit: trade.take_profit.map(convert),
        fees,
        currency: base,
        original_currency,
        fx_rate,
        pnl,
        pnl_reported,
        entry_date: parse_date("entry_date", trade.entry_date.as_deref()),
        exit_date: parse_date("exit_date", trade.exit_date.as_deref()),
        strategy: trade.strategy.clone().filter(|s| !s.trim().is_empty()),
        notes: trade.notes.clone().filter(|s| !s.trim().is_empty()),
    })
}

/// Risk and return metrics of a normalized trade
pub fn compute_metrics(trade: &NormalizedTrade) -> TradeMetrics {
    let entry = trade.entry_price;

    let stop_valid = trade.stop_loss.map(|stop| match trade.direction {
        TradeDirection::Long => stop < entry,
        TradeDirection::Short => stop > entry,
    });
    let risk_per_unit = trade.stop_loss.map(|stop| (entry - stop).abs());
    let total_risk = risk_per_unit.map(|r| r * trade.quantity);

    // Only a protective stop defines 1R
    let one_r = total_risk.filter(|r| *r > 0.0 && stop_valid == Some(true));
    let r_multiple = trade.pnl.zip(one_r).map(|(pnl, risk)| pnl / risk);

    let planned_reward = trade.take_profit.map(|target| (target - entry).abs());
    let planned_rr = planned_reward
        .zip(risk_per_unit.filter(|r| *r > 0.0 && stop_valid == Some(true)))
        .map(|(reward, risk)| reward / risk);

    let notional = entry * trade.quantity;
    let return_pct = trade
        .pnl
        .filter(|_| notional > 0.0)
        .map(|pnl| pnl / notional * 100.0);

    let holding_days = trade
        .entry_date
        .zip(trade.exit_date)
        .map(|(entry_date, exit_date)| (exit_date - entry_date).num_days())
        .filter(|days| *days >= 0);

    TradeMetrics {
        risk_per_unit,
        total_risk,
        r_multiple,
        planned_reward,
        planned_rr,
        return_pct,
        holding_days,
        stop_valid,
    }
}
