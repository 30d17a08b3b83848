//! Multi-panel chart assembly
//!
//! A [`Chart`] is a stack of panels sharing one time axis: price on top
//! (candlesticks plus overlays), then volume, then one panel per oscillator.
//! [`Chart::to_plotly`] turns it into a Plotly figure.

use crate::data::Bar;
use crate::error::{Result, StockError};
use crate::indicators::{self, IndicatorKind, Series};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

const UP_COLOR: &str = "#26a69a";
const DOWN_COLOR: &str = "#ef5350";
const PANEL_GAP: f64 = 0.02;

/// Relative weight of the price panel against every other panel
const PRICE_WEIGHT: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trace {
    Candlestick {
        name: String,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    },
    Line {
        name: String,
        values: Series,
        /// Fill the area between this line and the previous trace
        fill_to_previous: bool,
    },
    Bar {
        name: String,
        values: Vec<f64>,
        colors: Vec<&'static str>,
    },
}

impl Trace {
    fn line(name: impl Into<String>, values: Series) -> Self {
        Self::Line {
            name: name.into(),
            values,
            fill_to_previous: false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Candlestick { name, .. } | Self::Line { name, .. } | Self::Bar { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Price,
    Volume,
    Oscillator,
}

/// Horizontal reference line, e.g. RSI 30/70
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub kind: PanelKind,
    pub title: String,
    /// Share of the figure height; all panels sum to 1
    pub height: f64,
    pub traces: Vec<Trace>,
    pub reference_lines: Vec<ReferenceLine>,
}

impl Panel {
    fn new(kind: PanelKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            height: 0.0,
            traces: Vec::new(),
            reference_lines: Vec::new(),
        }
    }
}

/// Assembled chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub symbol: String,
    /// Bar timestamps followed by projected ones for forward-shifted series
    pub timestamps: Vec<DateTime<Utc>>,
    pub bar_count: usize,
    pub panels: Vec<Panel>,
}

/// Builds a [`Chart`] from bars and requested indicators
pub struct ChartBuilder {
    symbol: String,
    bars: Vec<Bar>,
    indicators: Vec<IndicatorKind>,
}

impl ChartBuilder {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
            indicators: Vec::new(),
        }
    }

    /// Add an indicator; duplicates are ignored
    pub fn with(mut self, indicator: IndicatorKind) -> Self {
        if !self.indicators.contains(&indicator) {
            self.indicators.push(indicator);
        }
        self
    }

    pub fn with_all(self, indicators: impl IntoIterator<Item = IndicatorKind>) -> Self {
        indicators.into_iter().fold(self, Self::with)
    }

    pub fn build(self) -> Result<Chart> {
        if self.bars.is_empty() {
            return Err(StockError::DataUnavailable {
                symbol: self.symbol,
                reason: "no bars to chart".to_string(),
            });
        }

        let bars = &self.bars;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let mut price = Panel::new(PanelKind::Price, self.symbol.clone());
        price.traces.push(Trace::Candlestick {
            name: self.symbol.clone(),
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: closes.clone(),
        });

        let mut volume = Panel::new(PanelKind::Volume, "Volume");
        volume.traces.push(Trace::Bar {
            name: "Volume".to_string(),
            values: bars.iter().map(|b| b.volume as f64).collect(),
            colors: bars
                .iter()
                .map(|b| if b.close >= b.open { UP_COLOR } else { DOWN_COLOR })
                .collect(),
        });

        let mut oscillators = Vec::new();
        let mut projection = 0usize;

        for indicator in &self.indicators {
            let label = indicator.to_string();
            match *indicator {
                IndicatorKind::Sma { period } => {
                    price.traces.push(Trace::line(label, indicators::sma(&closes, period)?));
                }
                IndicatorKind::Ema { period } => {
                    price.traces.push(Trace::line(label, indicators::ema(&closes, period)?));
                }
                IndicatorKind::Bollinger { period, k } => {
                    let bands = indicators::bollinger(&closes, period, k)?;
                    price.traces.push(Trace::line("BB upper", bands.upper));
                    price.traces.push(Trace::line("BB middle", bands.middle));
                    price.traces.push(Trace::line("BB lower", bands.lower));
                }
                IndicatorKind::Ichimoku => {
                    let cloud = indicators::ichimoku(bars, 9, 26, 52)?;
                    projection = projection.max(cloud.displacement);
                    price.traces.push(Trace::line("Tenkan-sen", cloud.tenkan));
                    price.traces.push(Trace::line("Kijun-sen", cloud.kijun));
                    price.traces.push(Trace::line("Senkou span A", cloud.senkou_a));
                    price.traces.push(Trace::Line {
                        name: "Senkou span B".to_string(),
                        values: cloud.senkou_b,
                        fill_to_previous: true,
                    });
                    price.traces.push(Trace::line("Chikou span", cloud.chikou));
                }
                IndicatorKind::Vwap => {
                    price.traces.push(Trace::line(label, indicators::vwap(bars)));
                }
                IndicatorKind::Rsi { period } => {
                    let mut panel = Panel::new(PanelKind::Oscillator, label.clone());
                    panel.traces.push(Trace::line(label, indicators::rsi(&closes, period)?));
                    panel.reference_lines = vec![
                        ReferenceLine { value: 70.0, label: "Overbought" },
                        ReferenceLine { value: 30.0, label: "Oversold" },
                    ];
                    oscillators.push(panel);
                }
                IndicatorKind::Macd { fast, slow, signal } => {
                    let out = indicators::macd(&closes, fast, slow, signal)?;
                    let mut panel = Panel::new(PanelKind::Oscillator, label);
                    panel.traces.push(Trace::Bar {
                        name: "Histogram".to_string(),
                        colors: out
                            .histogram
                            .iter()
                            .map(|h| if h.unwrap_or(0.0) >= 0.0 { UP_COLOR } else { DOWN_COLOR })
                            .collect(),
                        values: out.histogram.iter().map(|h| h.unwrap_or(0.0)).collect(),
                    });
                    panel.traces.push(Trace::line("MACD", out.macd));
                    panel.traces.push(Trace::line("Signal", out.signal));
                    panel.reference_lines.push(ReferenceLine { value: 0.0, label: "Zero" });
                    oscillators.push(panel);
                }
                IndicatorKind::Stochastic { k, d } => {
                    let out = indicators::stochastic(bars, k, d)?;
                    let mut panel = Panel::new(PanelKind::Oscillator, label);
                    panel.traces.push(Trace::line("%K", out.k));
                    panel.traces.push(Trace::line("%D", out.d));
                    panel.reference_lines = vec![
                        ReferenceLine { value: 80.0, label: "Overbought" },
                        ReferenceLine { value: 20.0, label: "Oversold" },
                    ];
                    oscillators.push(panel);
                }
                IndicatorKind::Atr { period } => {
                    let mut panel = Panel::new(PanelKind::Oscillator, label.clone());
                    panel.traces.push(Trace::line(label, indicators::atr(bars, period)?));
                    oscillators.push(panel);
                }
                IndicatorKind::Obv => {
                    let mut panel = Panel::new(PanelKind::Oscillator, label.clone());
                    panel.traces.push(Trace::line(label, indicators::obv(bars)?));
                    oscillators.push(panel);
                }
            }
        }

        let mut panels = vec![price, volume];
        panels.extend(oscillators);
        assign_heights(&mut panels);

        Ok(Chart {
            symbol: self.symbol,
            timestamps: timeline(bars, projection),
            bar_count: bars.len(),
            panels,
        })
    }
}

fn assign_heights(panels: &mut [Panel]) {
    let weight = |p: &Panel| if p.kind == PanelKind::Price { PRICE_WEIGHT } else { 1.0 };
    let total: f64 = panels.iter().map(weight).sum();
    for panel in panels.iter_mut() {
        panel.height = weight(panel) / total;
    }
}

/// Bar timestamps extended by `projection` steps of the last bar spacing
fn timeline(bars: &[Bar], projection: usize) -> Vec<DateTime<Utc>> {
    let mut timestamps: Vec<DateTime<Utc>> = bars.iter().map(|b| b.timestamp).collect();
    let step = match bars {
        [.., prev, last] => last.timestamp - prev.timestamp,
        _ => chrono::Duration::days(1),
    };
    if let Some(&last) = timestamps.last() {
        timestamps.extend((1..=projection).map(|i| last + step * i as i32));
    }
    timestamps
}

impl Chart {
    /// Plotly figure JSON (`data` + `layout`)
    ///
    /// Panels are stacked top to bottom on y-axes `y`, `y2`, ... sharing the
    /// x-axis; `None` values become `null` gaps.
    pub fn to_plotly(&self) -> Value {
        let x: Vec<String> = self.timestamps.iter().map(DateTime::to_rfc3339).collect();
        let mut data = Vec::new();
        let mut shapes = Vec::new();
        let mut layout = serde_json::Map::new();

        let mut top = 1.0;
        let last_index = self.panels.len().saturating_sub(1);

        for (i, panel) in self.panels.iter().enumerate() {
            let axis_ref = if i == 0 { "y".to_string() } else { format!("y{}", i + 1) };
            let axis_key = if i == 0 { "yaxis".to_string() } else { format!("yaxis{}", i + 1) };

            let bottom = if i == last_index { 0.0 } else { (top - panel.height).max(0.0) };
            let lower = if i == last_index { bottom } else { (bottom + PANEL_GAP).min(top) };
            layout.insert(
                axis_key,
                json!({ "domain": [lower, top], "title": { "text": panel.title } }),
            );
            top = bottom;

            for trace in &panel.traces {
                data.push(plotly_trace(trace, &x, self.bar_count, &axis_ref));
            }
            for line in &panel.reference_lines {
                shapes.push(json!({
                    "type": "line",
                    "xref": "paper",
                    "x0": 0,
                    "x1": 1,
                    "yref": axis_ref,
                    "y0": line.value,
                    "y1": line.value,
                    "line": { "dash": "dash", "width": 1, "color": "#888888" },
                    "name": line.label,
                }));
            }
        }

        let anchor = if last_index == 0 { "y".to_string() } else { format!("y{}", last_index + 1) };
        layout.insert(
            "xaxis".to_string(),
            json!({ "anchor": anchor, "rangeslider": { "visible": false }, "type": "date" }),
        );
        layout.insert("title".to_string(), json!({ "text": self.symbol }));
        layout.insert("shapes".to_string(), Value::Array(shapes));
        layout.insert("showlegend".to_string(), json!(true));
        layout.insert("hovermode".to_string(), json!("x unified"));

        json!({ "data": data, "layout": Value::Object(layout) })
    }
}

fn plotly_trace(trace: &Trace, x: &[String], bar_count: usize, axis: &str) -> Value {
    match trace {
        Trace::Candlestick {
            name,
            open,
            high,
            low,
            close,
        } => json!({
            "type": "candlestick",
            "name": name,
            "x": &x[..bar_count],
            "open": open,
            "high": high,
            "low": low,
            "close": close,
            "xaxis": "x",
            "yaxis": axis,
        }),
        Trace::Line {
            name,
            values,
            fill_to_previous,
        } => {
            let mut trace = json!({
                "type": "scatter",
                "mode": "lines",
                "name": name,
                "x": &x[..values.len().min(x.len())],
                "y": values,
                "xaxis": "x",
                "yaxis": axis,
            });
            if *fill_to_previous {
                trace["fill"] = json!("tonexty");
            }
            trace
        }
        Trace::Bar { name, values, colors } => json!({
            "type": "bar",
            "name": name,
            "x": &x[..values.len().min(x.len())],
            "y": values,
            "marker": { "color": colors },
            "xaxis": "x",
            "yaxis": axis,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::bars_from_closes;

    fn sample_bars(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        bars_from_closes(&closes)
    }

    #[test]
    fn test_panel_order_and_heights() {
        let chart = ChartBuilder::new("AAPL", sample_bars(60))
            .with(IndicatorKind::Sma { period: 20 })
            .with(IndicatorKind::Rsi { period: 14 })
            .with(IndicatorKind::Macd { fast: 12, slow: 26, signal: 9 })
            .build()
            .unwrap();

        let kinds: Vec<PanelKind> = chart.panels.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PanelKind::Price, PanelKind::Volume, PanelKind::Oscillator, PanelKind::Oscillator]
        );
        let total: f64 = chart.panels.iter().map(|p| p.height).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(chart.panels[0].height > chart.panels[1].height);

        // SMA overlays the price panel
        assert_eq!(chart.panels[0].traces.len(), 2);
        assert_eq!(chart.panels[0].traces[1].name(), "SMA 20");
    }

    #[test]
    fn test_rsi_reference_lines() {
        let chart = ChartBuilder::new("AAPL", sample_bars(30))
            .with(IndicatorKind::Rsi { period: 14 })
            .build()
            .unwrap();
        let levels: Vec<f64> = chart.panels[2].reference_lines.iter().map(|l| l.value).collect();
        assert_eq!(levels, vec![70.0, 30.0]);
    }

    #[test]
    fn test_volume_colors() {
        let bars = bars_from_closes(&[10.0, 11.0, 9.0]);
        let chart = ChartBuilder::new("X", bars).build().unwrap();
        match &chart.panels[1].traces[0] {
            Trace::Bar { colors, .. } => assert_eq!(colors, &vec![UP_COLOR, UP_COLOR, DOWN_COLOR]),
            other => panic!("unexpected trace {other:?}"),
        }
    }

    #[test]
    fn test_ichimoku_extends_timeline() {
        let chart = ChartBuilder::new("AAPL", sample_bars(80))
            .with(IndicatorKind::Ichimoku)
            .build()
            .unwrap();
        assert_eq!(chart.bar_count, 80);
        assert_eq!(chart.timestamps.len(), 80 + 26);
        assert!(chart.timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_duplicate_indicators_ignored() {
        let chart = ChartBuilder::new("AAPL", sample_bars(30))
            .with_all([IndicatorKind::Obv, IndicatorKind::Obv])
            .build()
            .unwrap();
        assert_eq!(chart.panels.len(), 3);
    }

    #[test]
    fn test_empty_bars() {
        let result = ChartBuilder::new("AAPL", Vec::new()).build();
        assert!(matches!(result, Err(StockError::DataUnavailable { .. })));
    }

    #[test]
    fn test_to_plotly() {
        let chart = ChartBuilder::new("AAPL", sample_bars(40))
            .with(IndicatorKind::Sma { period: 5 })
            .with(IndicatorKind::Rsi { period: 14 })
            .build()
            .unwrap();
        let figure = chart.to_plotly();

        let data = figure["data"].as_array().unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data[0]["type"], "candlestick");
        assert_eq!(data[3]["yaxis"], "y3");
        // warm-up values are null, not zero
        assert!(data[1]["y"][0].is_null());

        let layout = &figure["layout"];
        let top = layout["yaxis"]["domain"][1].as_f64().unwrap();
        let bottom = layout["yaxis3"]["domain"][0].as_f64().unwrap();
        assert!((top - 1.0).abs() < 1e-9);
        assert!(bottom.abs() < 1e-9);
        assert_eq!(layout["xaxis"]["anchor"], "y3");
        assert_eq!(layout["shapes"].as_array().unwrap().len(), 2);
    }
}
