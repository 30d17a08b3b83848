//! Prompt templates for trade-log processing

use fin_prompt::{JinjaTemplate, PromptRegistry, Result};

pub const PRECHECK_SYSTEM: &str = "journal.precheck.system";
pub const PRECHECK_USER: &str = "journal.precheck.user";
pub const EXTRACT_SYSTEM: &str = "journal.extract.system";
pub const EXTRACT_USER: &str = "journal.extract.user";

const PRECHECK_SYSTEM_TEMPLATE: &str = r#"You screen text submitted to a trading journal.
Decide whether the text describes one or more executed or planned trades in a
financial instrument (stocks, ETFs, futures, forex, crypto, options): a
symbol together with a buy/sell action, quantity or price.

Reply with JSON only:
{"is_trade_log": true|false, "reason": "<one short sentence>"}"#;

const PRECHECK_USER_TEMPLATE: &str = r#"Text:
"""
{{ text }}
"""
"#;

const EXTRACT_SYSTEM_TEMPLATE: &str = r#"You extract structured trades from free-text trading journal notes.
Today is {{ today }}. Resolve relative dates ("yesterday", "last Monday")
against today and write dates as YYYY-MM-DD.

Rules:
- One object per distinct position. A buy and a later sell of the same
  position is ONE trade with entry and exit.
- "direction" is "long" for positions opened with a buy and "short" for
  positions opened with a sell.
- "quantity" is always positive.
- Use null for anything the text does not state; never guess prices.
- "currency" is the ISO code of the prices ({{ base_currency }} if unstated
  and no symbol or market hint implies otherwise).
- "reported_pnl" only when the text states a profit or loss amount; losses
  are negative. "pnl_currency" is its ISO code when different from
  "currency".
- "fees" is the total commission and fees of the trade.

Reply with JSON only:
{"trades": [{
  "symbol": "AAPL",
  "direction": "long",
  "quantity": 100,
  "entry_price": 182.5,
  "exit_price": 190.1,
  "stop_loss": 178.0,
  "take_profit": 195.0,
  "fees": 2.0,
  "currency": "USD",
  "reported_pnl": null,
  "pnl_currency": null,
  "entry_date": "2024-05-02",
  "exit_date": "2024-05-09",
  "strategy": "breakout",
  "notes": "short free-text remark"
}]}"#;

const EXTRACT_USER_TEMPLATE: &str = r#"Journal text:
"""
{{ text }}
"""
"#;

/// Register the journal templates
pub fn register(registry: &PromptRegistry) -> Result<()> {
    for (name, source) in [
        (PRECHECK_SYSTEM, PRECHECK_SYSTEM_TEMPLATE),
        (PRECHECK_USER, PRECHECK_USER_TEMPLATE),
        (EXTRACT_SYSTEM, EXTRACT_SYSTEM_TEMPLATE),
        (EXTRACT_USER, EXTRACT_USER_TEMPLATE),
    ] {
        registry.register(JinjaTemplate::new(name, source)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_templates_render() {
        let registry = PromptRegistry::new();
        register(&registry).unwrap();
        assert_eq!(registry.len(), 4);

        let system = registry
            .render(EXTRACT_SYSTEM, &json!({"today": "2024-06-01", "base_currency": "USD"}))
            .unwrap();
        assert!(system.contains("Today is 2024-06-01"));

        let user = registry.render(PRECHECK_USER, &json!({"text": "bought 10 AAPL"})).unwrap();
        assert!(user.contains("bought 10 AAPL"));
    }
}
