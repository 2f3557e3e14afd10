//! Progress charts.
//!
//! Two bar panels side by side: water (drunk vs goal) and calories
//! (consumed, burned, balance, goal). Written as standalone SVG so no
//! rasteriser is needed; Telegram delivers it as a document.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ChartError;
use crate::store::UserId;
use crate::tracker::ProgressSnapshot;

/// Renders a snapshot to a file and returns its path.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(
        &self,
        user_id: &UserId,
        snapshot: &ProgressSnapshot,
    ) -> Result<PathBuf, ChartError>;
}

/// Writes `<dir>/progress_<user>.svg`, overwriting the previous chart.
pub struct SvgChartRenderer {
    dir: PathBuf,
}

impl SvgChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &UserId) -> PathBuf {
        let safe: String = user_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("progress_{safe}.svg"))
    }
}

#[async_trait]
impl ChartRenderer for SvgChartRenderer {
    async fn render(
        &self,
        user_id: &UserId,
        snapshot: &ProgressSnapshot,
    ) -> Result<PathBuf, ChartError> {
        let path = self.path_for(user_id);
        let write_err = |source| ChartError::Write {
            path: path.display().to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_err)?;
        tokio::fs::write(&path, render_svg(snapshot))
            .await
            .map_err(write_err)?;

        tracing::debug!(user_id = %user_id, path = %path.display(), "Progress chart written");
        Ok(path)
    }
}

struct Bar<'a> {
    label: &'a str,
    value: f64,
    color: &'a str,
}

struct Panel<'a> {
    title: &'a str,
    unit: &'a str,
    bars: Vec<Bar<'a>>,
}

const PANEL_WIDTH: f64 = 500.0;
const HEIGHT: f64 = 500.0;
const PLOT_LEFT: f64 = 70.0;
const PLOT_RIGHT: f64 = 480.0;
const PLOT_TOP: f64 = 60.0;
const PLOT_BOTTOM: f64 = 440.0;

/// Full SVG document for a snapshot.
pub fn render_svg(snapshot: &ProgressSnapshot) -> String {
    let water = Panel {
        title: "Прогресс по воде",
        unit: "мл",
        bars: vec![
            Bar {
                label: "Выпито",
                value: f64::from(snapshot.water.logged_ml),
                color: "blue",
            },
            Bar {
                label: "Цель",
                value: f64::from(snapshot.water.goal_ml),
                color: "gray",
            },
        ],
    };
    let calories = Panel {
        title: "Прогресс по калориям",
        unit: "ккал",
        bars: vec![
            Bar {
                label: "Потреблено",
                value: snapshot.calories.logged,
                color: "orange",
            },
            Bar {
                label: "Сожжено",
                value: f64::from(snapshot.calories.burned),
                color: "red",
            },
            Bar {
                label: "Баланс",
                value: snapshot.calories.balance,
                color: "green",
            },
            Bar {
                label: "Цель",
                value: f64::from(snapshot.calories.goal),
                color: "blue",
            },
        ],
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{HEIGHT}" viewBox="0 0 {w} {HEIGHT}" font-family="sans-serif">"#,
        w = PANEL_WIDTH * 2.0
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    render_panel(&mut svg, &water, 0.0);
    render_panel(&mut svg, &calories, PANEL_WIDTH);
    svg.push_str("</svg>\n");
    svg
}

fn render_panel(svg: &mut String, panel: &Panel<'_>, offset_x: f64) {
    let lo = panel.bars.iter().map(|b| b.value).fold(0.0_f64, f64::min);
    let mut hi = panel.bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    if hi - lo < f64::EPSILON {
        hi = lo + 1.0;
    }
    let y_of = |v: f64| PLOT_TOP + (hi - v) / (hi - lo) * (PLOT_BOTTOM - PLOT_TOP);

    let _ = writeln!(svg, r#"<g transform="translate({offset_x},0)">"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="35" font-size="18" text-anchor="middle">{}</text>"#,
        (PLOT_LEFT + PLOT_RIGHT) / 2.0,
        escape(panel.title)
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{}" font-size="14" text-anchor="middle" transform="rotate(-90 20 {})">{}</text>"#,
        (PLOT_TOP + PLOT_BOTTOM) / 2.0,
        (PLOT_TOP + PLOT_BOTTOM) / 2.0,
        escape(panel.unit)
    );

    // Axes: left edge and the zero line.
    let zero_y = y_of(0.0);
    let _ = writeln!(
        svg,
        r#"<line x1="{PLOT_LEFT}" y1="{PLOT_TOP}" x2="{PLOT_LEFT}" y2="{PLOT_BOTTOM}" stroke="black"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{PLOT_LEFT}" y1="{zero_y:.1}" x2="{PLOT_RIGHT}" y2="{zero_y:.1}" stroke="black"/>"#
    );

    let slot = (PLOT_RIGHT - PLOT_LEFT) / panel.bars.len().max(1) as f64;
    let bar_width = slot * 0.6;
    for (i, bar) in panel.bars.iter().enumerate() {
        let x = PLOT_LEFT + slot * i as f64 + (slot - bar_width) / 2.0;
        let top = y_of(bar.value.max(0.0));
        let bottom = y_of(bar.value.min(0.0));
        let center = x + bar_width / 2.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{x:.1}" y="{top:.1}" width="{bar_width:.1}" height="{:.1}" fill="{}"/>"#,
            bottom - top,
            bar.color
        );
        let value_y = if bar.value < 0.0 { bottom + 16.0 } else { top - 6.0 };
        let _ = writeln!(
            svg,
            r#"<text x="{center:.1}" y="{value_y:.1}" font-size="12" text-anchor="middle">{}</text>"#,
            format_value(bar.value)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{center:.1}" y="{}" font-size="13" text-anchor="middle">{}</text>"#,
            PLOT_BOTTOM + 25.0,
            escape(bar.label)
        );
    }
    svg.push_str("</g>\n");
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
