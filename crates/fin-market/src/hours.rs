//! Exchange trading hours and holiday calendars

use crate::error::StockError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Days searched ahead for the next session boundary
const LOOKAHEAD_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Nyse,
    Nasdaq,
    Lse,
    Xetra,
    Tse,
    Hkex,
}

/// Local session times of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub lunch: Option<(NaiveTime, NaiveTime)>,
    pub pre_market: Option<NaiveTime>,
    pub after_hours: Option<NaiveTime>,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Exchange {
    pub const ALL: [Exchange; 6] = [
        Self::Nyse,
        Self::Nasdaq,
        Self::Lse,
        Self::Xetra,
        Self::Tse,
        Self::Hkex,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Nyse => "NYSE",
            Self::Nasdaq => "NASDAQ",
            Self::Lse => "LSE",
            Self::Xetra => "XETRA",
            Self::Tse => "TSE",
            Self::Hkex => "HKEX",
        }
    }

    pub fn timezone(&self) -> Tz {
        match self {
            Self::Nyse | Self::Nasdaq => chrono_tz::America::New_York,
            Self::Lse => chrono_tz::Europe::London,
            Self::Xetra => chrono_tz::Europe::Berlin,
            Self::Tse => chrono_tz::Asia::Tokyo,
            Self::Hkex => chrono_tz::Asia::Hong_Kong,
        }
    }

    pub fn schedule(&self) -> Schedule {
        match self {
            Self::Nyse | Self::Nasdaq => Schedule {
                open: hm(9, 30),
                close: hm(16, 0),
                lunch: None,
                pre_market: Some(hm(4, 0)),
                after_hours: Some(hm(20, 0)),
            },
            Self::Lse => Schedule {
                open: hm(8, 0),
                close: hm(16, 30),
                lunch: None,
                pre_market: None,
                after_hours: None,
            },
            Self::Xetra => Schedule {
                open: hm(9, 0),
                close: hm(17, 30),
                lunch: None,
                pre_market: None,
                after_hours: None,
            },
            Self::Tse => Schedule {
                open: hm(9, 0),
                close: hm(15, 30),
                lunch: Some((hm(11, 30), hm(12, 30))),
                pre_market: None,
                after_hours: None,
            },
            Self::Hkex => Schedule {
                open: hm(9, 30),
                close: hm(16, 0),
                lunch: Some((hm(12, 0), hm(13, 0))),
                pre_market: None,
                after_hours: None,
            },
        }
    }

    /// Exchange implied by a ticker suffix; unsuffixed tickers trade on the
    /// US calendar
    pub fn for_symbol(symbol: &str) -> Self {
        let upper = symbol.to_ascii_uppercase();
        match upper.rsplit_once('.').map(|(_, suffix)| suffix) {
            Some("L") => Self::Lse,
            Some("DE" | "F") => Self::Xetra,
            Some("T") => Self::Tse,
            Some("HK") => Self::Hkex,
            _ => Self::Nyse,
        }
    }

    /// Holiday name when `date` is an exchange holiday (weekends excluded)
    pub fn holiday(&self, date: NaiveDate) -> Option<&'static str> {
        match self {
            Self::Nyse | Self::Nasdaq => us_holidays(date.year())
                .into_iter()
                .find(|(day, _)| *day == date)
                .map(|(_, name)| name),
            _ => match (date.month(), date.day()) {
                (1, 1) => Some("New Year's Day"),
                (12, 25) => Some("Christmas Day"),
                _ => None,
            },
        }
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && self.holiday(date).is_none()
    }

    /// Regular-session segments of `date` in local time (split by lunch)
    fn segments(&self, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
        if !self.is_trading_day(date) {
            return Vec::new();
        }
        let s = self.schedule();
        match s.lunch {
            Some((start, end)) => vec![(s.open, start), (end, s.close)],
            None => vec![(s.open, s.close)],
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Exchange {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StockError::InvalidParameter(format!("unknown exchange '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    PreMarket,
    Regular,
    Lunch,
    AfterHours,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatus {
    pub exchange: Exchange,
    pub timezone: String,
    pub is_open: bool,
    pub session: Session,
    /// Exchange-local time, RFC 3339 with offset
    pub local_time: String,
    pub next_open: Option<DateTime<Utc>>,
    pub next_close: Option<DateTime<Utc>>,
    pub holiday: Option<String>,
}

/// Session state of `exchange` at `now`
pub fn market_status(exchange: Exchange, now: DateTime<Utc>) -> MarketStatus {
    let tz = exchange.timezone();
    let local = now.with_timezone(&tz);
    let date = local.date_naive();
    let time = local.time();
    let schedule = exchange.schedule();
    let holiday = exchange.holiday(date);

    let session = if !exchange.is_trading_day(date) {
        Session::Closed
    } else if exchange.segments(date).iter().any(|(s, e)| *s <= time && time < *e) {
        Session::Regular
    } else if schedule.lunch.is_some_and(|(s, e)| s <= time && time < e) {
        Session::Lunch
    } else if schedule.pre_market.is_some_and(|p| p <= time && time < schedule.open) {
        Session::PreMarket
    } else if schedule.after_hours.is_some_and(|a| schedule.close <= time && time < a) {
        Session::AfterHours
    } else {
        Session::Closed
    };

    let (next_open, next_close) = next_boundaries(exchange, tz, date, now);

    MarketStatus {
        exchange,
        timezone: tz.name().to_string(),
        is_open: session == Session::Regular,
        session,
        local_time: local.to_rfc3339(),
        next_open,
        next_close,
        holiday: holiday.map(str::to_string),
    }
}

/// First regular-segment start and end strictly after `now`
fn next_boundaries(
    exchange: Exchange,
    tz: Tz,
    from: NaiveDate,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let to_utc = |date: NaiveDate, time: NaiveTime| {
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    };

    let mut next_open = None;
    let mut next_close = None;
    for offset in 0..LOOKAHEAD_DAYS {
        let date = from + Duration::days(offset);
        for (start, end) in exchange.segments(date) {
            if next_open.is_none() {
                next_open = to_utc(date, start).filter(|t| *t > now);
            }
            if next_close.is_none() {
                next_close = to_utc(date, end).filter(|t| *t > now);
            }
        }
        if next_open.is_some() && next_close.is_some() {
            break;
        }
    }
    (next_open, next_close)
}

/// Gregorian Easter Sunday (anonymous algorithm)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Saturday holidays move to Friday, Sunday holidays to Monday
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    (1..=5)
        .rev()
        .find_map(|n| NaiveDate::from_weekday_of_month_opt(year, month, weekday, n))
}

/// NYSE full-day holidays for `year`
pub fn us_holidays(year: i32) -> Vec<(NaiveDate, &'static str)> {
    let nth = |month, weekday, n| NaiveDate::from_weekday_of_month_opt(year, month, weekday, n);
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day).map(observed);

    // A Saturday New Year's Day is not observed on the preceding Friday
    let new_year = NaiveDate::from_ymd_opt(year, 1, 1)
        .filter(|d| d.weekday() != Weekday::Sat)
        .map(observed);

    let mut days = vec![
        (new_year, "New Year's Day"),
        (nth(1, Weekday::Mon, 3), "Martin Luther King Jr. Day"),
        (nth(2, Weekday::Mon, 3), "Presidents' Day"),
        (easter_sunday(year).map(|e| e - Duration::days(2)), "Good Friday"),
        (last_weekday_of_month(year, 5, Weekday::Mon), "Memorial Day"),
        (fixed(7, 4), "Independence Day"),
        (nth(9, Weekday::Mon, 1), "Labor Day"),
        (nth(11, Weekday::Thu, 4), "Thanksgiving Day"),
        (fixed(12, 25), "Christmas Day"),
    ];
    if year >= 2022 {
        days.push((fixed(6, 19), "Juneteenth"));
    }

    let mut days: Vec<(NaiveDate, &'static str)> = days
        .into_iter()
        .filter_map(|(date, name)| date.map(|d| (d, name)))
        .collect();
    days.sort_by_key(|(date, _)| *date);
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2019), Some(date(2019, 4, 21)));
        assert_eq!(easter_sunday(2024), Some(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(date(2025, 4, 20)));
    }

    #[test]
    fn test_us_holidays_2024() {
        let days: Vec<NaiveDate> = us_holidays(2024).into_iter().map(|(d, _)| d).collect();
        for expected in [
            date(2024, 1, 1),
            date(2024, 1, 15),
            date(2024, 2, 19),
            date(2024, 3, 29),
            date(2024, 5, 27),
            date(2024, 6, 19),
            date(2024, 7, 4),
            date(2024, 9, 2),
            date(2024, 11, 28),
            date(2024, 12, 25),
        ] {
            assert!(days.contains(&expected), "missing {expected}");
        }
        assert_eq!(days.len(), 10);
    }

    #[test]
    fn test_observed_rules() {
        // 2026-07-04 is a Saturday
        assert_eq!(Exchange::Nyse.holiday(date(2026, 7, 3)), Some("Independence Day"));
        // 2022-06-19 is a Sunday
        assert_eq!(Exchange::Nyse.holiday(date(2022, 6, 20)), Some("Juneteenth"));
        // Saturday New Year's Day: the Friday before stays a trading day
        assert!(Exchange::Nyse.is_trading_day(date(2021, 12, 31)));
        // Juneteenth only from 2022
        assert!(Exchange::Nyse.holiday(date(2021, 6, 18)).is_none());
    }

    #[test]
    fn test_nyse_regular_session() {
        let status = market_status(Exchange::Nyse, utc(2024, 6, 12, 14, 0));
        assert_eq!(status.session, Session::Regular);
        assert!(status.is_open);
        assert_eq!(status.next_close, Some(utc(2024, 6, 12, 20, 0)));
        assert_eq!(status.next_open, Some(utc(2024, 6, 13, 13, 30)));
        assert_eq!(status.timezone, "America/New_York");
    }

    #[test]
    fn test_nyse_extended_sessions() {
        let pre = market_status(Exchange::Nasdaq, utc(2024, 6, 12, 12, 0));
        assert_eq!(pre.session, Session::PreMarket);
        assert!(!pre.is_open);
        assert_eq!(pre.next_open, Some(utc(2024, 6, 12, 13, 30)));

        let post = market_status(Exchange::Nyse, utc(2024, 6, 12, 21, 0));
        assert_eq!(post.session, Session::AfterHours);
    }

    #[test]
    fn test_weekend_closed() {
        let status = market_status(Exchange::Nyse, utc(2024, 6, 15, 15, 0));
        assert_eq!(status.session, Session::Closed);
        assert!(status.holiday.is_none());
        assert_eq!(status.next_open, Some(utc(2024, 6, 17, 13, 30)));
    }

    #[test]
    fn test_holiday_closed() {
        let status = market_status(Exchange::Nyse, utc(2024, 3, 29, 15, 0));
        assert_eq!(status.session, Session::Closed);
        assert_eq!(status.holiday.as_deref(), Some("Good Friday"));
        assert_eq!(status.next_open, Some(utc(2024, 4, 1, 13, 30)));
    }

    #[test]
    fn test_hkex_lunch_break() {
        // 12:30 HKT
        let status = market_status(Exchange::Hkex, utc(2024, 6, 12, 4, 30));
        assert_eq!(status.session, Session::Lunch);
        assert!(!status.is_open);
        assert_eq!(status.next_open, Some(utc(2024, 6, 12, 5, 0)));
        assert_eq!(status.next_close, Some(utc(2024, 6, 12, 8, 0)));
    }

    #[test]
    fn test_lse_summer_time() {
        // 08:30 BST
        let status = market_status(Exchange::Lse, utc(2024, 6, 12, 7, 30));
        assert_eq!(status.session, Session::Regular);
        assert!(status.local_time.ends_with("+01:00"));
    }

    #[test]
    fn test_non_us_holidays() {
        assert_eq!(Exchange::Xetra.holiday(date(2024, 12, 25)), Some("Christmas Day"));
        assert!(Exchange::Tse.holiday(date(2024, 3, 29)).is_none());
    }

    #[test]
    fn test_for_symbol_and_parse() {
        assert_eq!(Exchange::for_symbol("VOD.L"), Exchange::Lse);
        assert_eq!(Exchange::for_symbol("SAP.DE"), Exchange::Xetra);
        assert_eq!(Exchange::for_symbol("7203.T"), Exchange::Tse);
        assert_eq!(Exchange::for_symbol("0700.hk"), Exchange::Hkex);
        assert_eq!(Exchange::for_symbol("BRK.B"), Exchange::Nyse);
        assert_eq!(Exchange::for_symbol("AAPL"), Exchange::Nyse);

        assert_eq!("nasdaq".parse::<Exchange>().unwrap(), Exchange::Nasdaq);
        assert!("CME".parse::<Exchange>().is_err());
    }
}
