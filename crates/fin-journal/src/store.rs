//! SQLite persistence for journal entries

use crate::models::{
    JournalEntry, JournalSummary, NormalizedTrade, Page, TradeMetrics, TradeStatus,
};
use crate::{JournalError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

pub const MAX_PAGE_SIZE: u32 = 100;

const SELECT_COLUMNS: &str = "SELECT id, symbol, direction, status, quantity, entry_price, \
     exit_price, stop_loss, take_profit, fees, currency, original_currency, fx_rate, pnl, \
     pnl_reported, risk_per_unit, total_risk, r_multiple, planned_reward, planned_rr, \
     return_pct, holding_days, stop_valid, entry_date, exit_date, strategy, notes, raw_text, \
     created_at FROM trade_journal";

/// Journal entry ready to insert
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub trade: NormalizedTrade,
    pub metrics: TradeMetrics,
    pub raw_text: String,
}

#[derive(sqlx::FromRow)]
struct JournalRow {
    id: i64,
    symbol: String,
    direction: String,
    status: String,
    quantity: f64,
    entry_price: f64,
    exit_price: Option<f64>,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    fees: f64,
    currency: String,
    original_currency: String,
    fx_rate: f64,
    pnl: Option<f64>,
    pnl_reported: bool,
    risk_per_unit: Option<f64>,
    total_risk: Option<f64>,
    r_multiple: Option<f64>,
    planned_reward: Option<f64>,
    planned_rr: Option<f64>,
    return_pct: Option<f64>,
    holding_days: Option<i64>,
    stop_valid: Option<bool>,
    entry_date: Option<NaiveDate>,
    exit_date: Option<NaiveDate>,
    strategy: Option<String>,
    notes: Option<String>,
    raw_text: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<JournalRow> for JournalEntry {
    type Error = JournalError;

    fn try_from(row: JournalRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            trade: NormalizedTrade {
                symbol: row.symbol,
                direction: row.direction.parse().map_err(JournalError::InvalidRecord)?,
                status: row.status.parse().map_err(JournalError::InvalidRecord)?,
                quantity: row.quantity,
                entry_price: row.entry_price,
                exit_price: row.exit_price,
                stop_loss: row.stop_loss,
                take_profit: row.take_profit,
                fees: row.fees,
                currency: row.currency,
                original_currency: row.original_currency,
                fx_rate: row.fx_rate,
                pnl: row.pnl,
                pnl_reported: row.pnl_reported,
                entry_date: row.entry_date,
                exit_date: row.exit_date,
                strategy: row.strategy,
                notes: row.notes,
            },
            metrics: TradeMetrics {
                risk_per_unit: row.risk_per_unit,
                total_risk: row.total_risk,
                r_multiple: row.r_multiple,
                planned_reward: row.planned_reward,
                planned_rr: row.planned_rr,
                return_pct: row.return_pct,
                holding_days: row.holding_days,
                stop_valid: row.stop_valid,
            },
            raw_text: row.raw_text,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct JournalStore {
    pool: SqlitePool,
}

impl JournalStore {
    /// Open (creating if missing) the database and ensure the schema
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database exists per connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("Journal store ready");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let schema = include_str!("../schema.sql");

        // sqlx runs one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert one entry, returning its id
    pub async fn insert(&self, entry: &NewEntry) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        insert_row(&mut conn, entry, Utc::now()).await
    }

    /// Insert entries atomically, returning ids in order
    pub async fn insert_all(&self, entries: &[NewEntry]) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            ids.push(insert_row(&mut tx, entry, now).await?);
        }
        tx.commit().await?;
        debug!(count = ids.len(), "Inserted journal entries");
        Ok(ids)
    }

    pub async fn get(&self, id: i64) -> Result<JournalEntry> {
        let row = sqlx::query_as::<_, JournalRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(JournalError::NotFound(id))?;
        row.try_into()
    }

    /// Delete an entry; missing ids are `NotFound`
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM trade_journal WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(JournalError::NotFound(id));
        }
        Ok(())
    }

    /// Newest-first page of entries, optionally for one symbol
    ///
    /// `page` starts at 1; `page_size` is clamped to `1..=100`.
    pub async fn list(&self, page: u32, page_size: u32, symbol: Option<&str>) -> Result<Page<JournalEntry>> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let symbol = symbol
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_uppercase);

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trade_journal WHERE (? IS NULL OR symbol = ?)")
                .bind(symbol.as_deref())
                .bind(symbol.as_deref())
                .fetch_one(&self.pool)
                .await?;

        let offset = i64::from(page - 1) * i64::from(page_size);
        let rows = sqlx::query_as::<_, JournalRow>(&format!(
            "{SELECT_COLUMNS} WHERE (? IS NULL OR symbol = ?) \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(symbol.as_deref())
        .bind(symbol.as_deref())
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(JournalEntry::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(items, page, page_size, total.max(0) as u64))
    }

    /// Aggregate statistics over all entries
    pub async fn summary(&self) -> Result<JournalSummary> {
        let rows: Vec<(String, Option<f64>, Option<f64>)> =
            sqlx::query_as("SELECT status, pnl, r_multiple FROM trade_journal")
                .fetch_all(&self.pool)
                .await?;

        let mut summary = JournalSummary {
            trades: rows.len() as u64,
            ..JournalSummary::default()
        };
        let (mut gross_profit, mut gross_loss) = (0.0, 0.0);
        let (mut win_r, mut loss_r) = (Vec::new(), Vec::new());
        let mut scratch_r = 0usize;

        for (status, pnl, r) in rows {
            let status: TradeStatus = status.parse().map_err(JournalError::InvalidRecord)?;
            if status == TradeStatus::Open {
                summary.open += 1;
                continue;
            }
            summary.closed += 1;

            let Some(pnl) = pnl else { continue };
            summary.total_pnl += pnl;
            if pnl > 0.0 {
                summary.wins += 1;
                gross_profit += pnl;
            } else if pnl < 0.0 {
                summary.losses += 1;
                gross_loss -= pnl;
            }

            match r {
                Some(r) if r > 0.0 => win_r.push(r),
                Some(r) if r < 0.0 => loss_r.push(r),
                // breakeven: counts towards the sample, adds nothing
                Some(_) => scratch_r += 1,
                None => {}
            }
        }

        let decided = summary.wins + summary.losses;
        summary.win_rate = (decided > 0).then(|| summary.wins as f64 / decided as f64);
        summary.profit_factor = (gross_loss > 0.0).then(|| gross_profit / gross_loss);

        let r_count = win_r.len() + loss_r.len() + scratch_r;
        if r_count > 0 {
            let mean = |v: &[f64]| if v.is_empty() { 0.0 } else { v.iter().sum::<f64>() / v.len() as f64 };
            let n = r_count as f64;
            let p_win = win_r.len() as f64 / n;
            let p_loss = loss_r.len() as f64 / n;
            summary.average_r = Some((win_r.iter().sum::<f64>() + loss_r.iter().sum::<f64>()) / n);
            summary.expectancy_r = Some(p_win * mean(&win_r) - p_loss * mean(&loss_r).abs());
        }

        Ok(summary)
    }
}

async fn insert_row(
    conn: &mut sqlx::SqliteConnection,
    entry: &NewEntry,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let t = &entry.trade;
    let m = &entry.metrics;
    let result = sqlx::query(
        "INSERT INTO trade_journal (
            symbol, direction, status, quantity, entry_price, exit_price, stop_loss,
            take_profit, fees, currency, original_currency, fx_rate, pnl, pnl_reported,
            risk_per_unit, total_risk, r_multiple, planned_reward, planned_rr, return_pct,
            holding_days, stop_valid, entry_date, exit_date, strategy, notes, raw_text, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&t.symbol)
    .bind(t.direction.as_str())
    .bind(t.status.as_str())
    .bind(t.quantity)
    .bind(t.entry_price)
    .bind(t.exit_price)
    .bind(t.stop_loss)
    .bind(t.take_profit)
    .bind(t.fees)
    .bind(&t.currency)
    .bind(&t.original_currency)
    .bind(t.fx_rate)
    .bind(t.pnl)
    .bind(t.pnl_reported)
    .bind(m.risk_per_unit)
    .bind(m.total_risk)
    .bind(m.r_multiple)
    .bind(m.planned_reward)
    .bind(m.planned_rr)
    .bind(m.return_pct)
    .bind(m.holding_days)
    .bind(m.stop_valid)
    .bind(t.entry_date)
    .bind(t.exit_date)
    .bind(&t.strategy)
    .bind(&t.notes)
    .bind(&entry.raw_text)
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeDirection;

    fn entry(symbol: &str, pnl: Option<f64>, r: Option<f64>) -> NewEntry {
        NewEntry {
            trade: NormalizedTrade {
                symbol: symbol.to_string(),
                direction: TradeDirection::Long,
                status: if pnl.is_some() { TradeStatus::Closed } else { TradeStatus::Open },
                quantity: 10.0,
                entry_price: 100.0,
                exit_price: pnl.map(|p| 100.0 + p / 10.0),
                stop_loss: Some(95.0),
                take_profit: None,
                fees: 0.0,
                currency: "USD".to_string(),
                original_currency: "USD".to_string(),
                fx_rate: 1.0,
                pnl,
                pnl_reported: false,
                entry_date: NaiveDate::from_ymd_opt(2024, 5, 1),
                exit_date: None,
                strategy: Some("breakout".to_string()),
                notes: None,
            },
            metrics: TradeMetrics {
                risk_per_unit: Some(5.0),
                total_risk: Some(50.0),
                r_multiple: r,
                stop_valid: Some(true),
                ..TradeMetrics::default()
            },
            raw_text: format!("trade in {symbol}"),
        }
    }

    async fn store() -> JournalStore {
        JournalStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = store().await;
        let id = store.insert(&entry("AAPL", Some(100.0), Some(2.0))).await.unwrap();

        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.trade.symbol, "AAPL");
        assert_eq!(fetched.trade.direction, TradeDirection::Long);
        assert_eq!(fetched.trade.entry_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(fetched.metrics.r_multiple, Some(2.0));
        assert_eq!(fetched.metrics.stop_valid, Some(true));
        assert_eq!(fetched.raw_text, "trade in AAPL");
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let store = store().await;
        assert!(matches!(store.get(42).await, Err(JournalError::NotFound(42))));
        assert!(matches!(store.delete(42).await, Err(JournalError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store().await;
        let id = store.insert(&entry("MSFT", None, None)).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_pagination_newest_first() {
        let store = store().await;
        for symbol in ["A", "B", "C", "D", "E"] {
            store.insert(&entry(symbol, None, None)).await.unwrap();
        }

        let first = store.list(1, 2, None).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages, 3);
        let symbols: Vec<&str> = first.items.iter().map(|e| e.trade.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["E", "D"]);

        let last = store.list(3, 2, None).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].trade.symbol, "A");

        let beyond = store.list(9, 2, None).await.unwrap();
        assert!(beyond.items.is_empty());
    }

    #[tokio::test]
    async fn test_list_clamps_and_filters() {
        let store = store().await;
        store
            .insert_all(&[entry("AAPL", None, None), entry("MSFT", None, None), entry("AAPL", None, None)])
            .await
            .unwrap();

        let page = store.list(0, 0, Some("aapl")).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.total, 2);

        let page = store.list(1, 1000, None).await.unwrap();
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
        assert_eq!(page.items.len(), 3);
    }

    #[tokio::test]
    async fn test_summary() {
        let store = store().await;
        store
            .insert_all(&[
                entry("A", Some(100.0), Some(2.0)),
                entry("B", Some(-50.0), Some(-1.0)),
                entry("C", Some(50.0), Some(1.0)),
                entry("D", None, None),
            ])
            .await
            .unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.trades, 4);
        assert_eq!(summary.open, 1);
        assert_eq!(summary.closed, 3);
        assert_eq!(summary.wins, 2);
        assert_eq!(summary.losses, 1);
        assert!((summary.win_rate.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((summary.total_pnl - 100.0).abs() < 1e-9);
        assert!((summary.profit_factor.unwrap() - 3.0).abs() < 1e-9);
        assert!((summary.average_r.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        // 2/3 * 1.5 - 1/3 * 1.0
        assert!((summary.expectancy_r.unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summary_breakeven_is_neither_win_nor_loss() {
        let store = store().await;
        store
            .insert_all(&[
                entry("A", Some(100.0), Some(2.0)),
                entry("B", Some(-50.0), Some(-1.0)),
                entry("C", Some(0.0), Some(0.0)),
                entry("D", Some(0.0), Some(0.0)),
            ])
            .await
            .unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.closed, 4);
        assert_eq!((summary.wins, summary.losses), (1, 1));
        assert!((summary.win_rate.unwrap() - 0.5).abs() < 1e-9);
        // 1/4 * 2.0 - 1/4 * 1.0
        assert!((summary.expectancy_r.unwrap() - 0.25).abs() < 1e-9);
        assert!((summary.average_r.unwrap() - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let summary = store().await.summary().await.unwrap();
        assert_eq!(summary.trades, 0);
        assert!(summary.win_rate.is_none());
        assert!(summary.average_r.is_none());
    }
}
