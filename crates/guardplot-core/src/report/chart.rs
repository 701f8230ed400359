use std::fmt::Write as _;

use super::export::html_escape;
use super::{SeriesView, ViewKind};

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 70.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

const BLUE: &str = "#2563eb";
const RED: &str = "#dc2626";
const RATE: &str = "#16a34a";

/// File name of the chart for `view`, e.g. `testloop.out_all_clients.svg`
/// or `testloop.out_thread_worker-1.svg`.
///
/// Thread charts carry a `thread_` prefix so no thread id can name an
/// aggregate chart. Characters that are unsafe in file names are replaced
/// with `_`; [`AnalysisReport::chart_files`](super::AnalysisReport::chart_files)
/// resolves the collisions that replacement can cause.
pub fn chart_file_name(basename: &str, view: &SeriesView) -> String {
    let safe: String = view
        .label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match view.kind {
        ViewKind::Thread => format!("{basename}_thread_{safe}.svg"),
        ViewKind::AllClients | ViewKind::AllDelays => format!("{basename}_{safe}.svg"),
    }
}

/// Linear mapping from a data range onto a pixel range.
struct Scale {
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Scale {
    fn new(lo: f64, hi: f64, px_lo: f64, px_hi: f64) -> Self {
        // A flat range would divide by zero.
        let hi = if hi > lo { hi } else { lo + 1.0 };
        Self { lo, hi, px_lo, px_hi }
    }

    fn map(&self, v: f64) -> f64 {
        self.px_lo + (v - self.lo) / (self.hi - self.lo) * (self.px_hi - self.px_lo)
    }
}

/// Render a view as a standalone SVG scatter chart.
///
/// Points at or below the mean are blue, points above it red; a dashed line
/// marks the mean and the blue/red ratio is printed in the corner. When the
/// view carries a rate series it is drawn as a line against a right-hand axis.
pub fn render_svg(view: &SeriesView) -> String {
    let summary = &view.summary;
    let values: Vec<f64> = view.delays.iter().map(|p| p.value_ms).collect();

    let x_lo = view.x.iter().copied().min().unwrap_or(0) as f64;
    let x_hi = view.x.iter().copied().max().unwrap_or(1) as f64;
    let y_lo = values.iter().copied().fold(0.0, f64::min);
    let y_hi = values.iter().copied().fold(summary.mean_ms, f64::max) * 1.05;

    let plot_left = MARGIN_LEFT;
    let plot_right = WIDTH - MARGIN_RIGHT;
    let plot_top = MARGIN_TOP;
    let plot_bottom = HEIGHT - MARGIN_BOTTOM;

    let xs = Scale::new(x_lo, x_hi, plot_left, plot_right);
    let ys = Scale::new(y_lo, y_hi, plot_bottom, plot_top);

    let is_red = |i: usize| summary.red.binary_search(&i).is_ok();
    let mean_y = ys.map(summary.mean_ms);

    let mut body = String::new();

    // Stems: blue from the axis, red from the mean.
    for (i, (&x, &v)) in view.x.iter().zip(&values).enumerate() {
        let px = xs.map(x as f64);
        let (from, color) = if is_red(i) { (mean_y, RED) } else { (ys.map(0.0), BLUE) };
        let _ = writeln!(
            body,
            r#"<line x1="{px:.1}" y1="{from:.1}" x2="{px:.1}" y2="{:.1}" stroke="{color}" stroke-opacity="0.1" stroke-width="0.5"/>"#,
            ys.map(v)
        );
    }

    // Segments take the colour of the point they lead to.
    for i in 1..values.len() {
        let color = if is_red(i) { RED } else { BLUE };
        let _ = writeln!(
            body,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{color}" stroke-opacity="0.5" stroke-width="1"/>"#,
            xs.map(view.x[i - 1] as f64),
            ys.map(values[i - 1]),
            xs.map(view.x[i] as f64),
            ys.map(values[i]),
        );
    }

    for (i, (&x, &v)) in view.x.iter().zip(&values).enumerate() {
        let color = if is_red(i) { RED } else { BLUE };
        let _ = writeln!(
            body,
            r#"<circle cx="{:.1}" cy="{:.1}" r="1.5" fill="{color}"/>"#,
            xs.map(x as f64),
            ys.map(v)
        );
    }

    let _ = writeln!(
        body,
        r#"<line x1="{plot_left}" y1="{mean_y:.1}" x2="{plot_right}" y2="{mean_y:.1}" stroke="{RED}" stroke-dasharray="6 4"/>"#
    );

    if let (Some(rates), Some(stats)) = (&view.rates, summary.rate) {
        let rs = Scale::new(0.0, stats.max * 1.05, plot_bottom, plot_top);
        let points = view
            .x
            .iter()
            .zip(rates)
            .map(|(&x, &r)| format!("{:.1},{:.1}", xs.map(x as f64), rs.map(r)))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            body,
            r#"<polyline points="{points}" fill="none" stroke="{RATE}" stroke-width="1"/>"#
        );
        let _ = writeln!(
            body,
            r#"<text x="{:.1}" y="{:.1}" font-size="12" fill="{RATE}" text-anchor="end">max {:.1} req/min</text>"#,
            plot_right,
            plot_top - 8.0,
            stats.max
        );
    }

    let x_label = match view.kind {
        ViewKind::Thread => "Thread Sequence Number",
        ViewKind::AllClients => "Request Sequence Number",
        ViewKind::AllDelays => "Request Order (by issue time)",
    };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">
<rect width="100%" height="100%" fill="#ffffff"/>
<text x="{title_x}" y="24" font-size="16" text-anchor="middle">Delays over time: {label}</text>
<line x1="{plot_left}" y1="{plot_bottom}" x2="{plot_right}" y2="{plot_bottom}" stroke="#334155"/>
<line x1="{plot_left}" y1="{plot_top}" x2="{plot_left}" y2="{plot_bottom}" stroke="#334155"/>
<text x="{title_x}" y="{x_label_y}" font-size="12" text-anchor="middle">{x_label}</text>
<text x="16" y="{y_label_y}" font-size="12" transform="rotate(-90 16 {y_label_y})" text-anchor="middle">API Delay [ms]</text>
<text x="{plot_left}" y="{y_lo_y}" font-size="10" text-anchor="end" dx="-4">{y_lo:.0}</text>
<text x="{plot_left}" y="{plot_top}" font-size="10" text-anchor="end" dx="-4">{y_hi:.0}</text>
{body}<text x="{legend_x}" y="{legend_y}" font-size="12" fill="{BLUE}">Delays &lt;= Mean ({blue})</text>
<text x="{legend_x}" y="{legend_y2}" font-size="12" fill="{RED}">Delays &gt; Mean ({red})</text>
<text x="{legend_x}" y="{legend_y3}" font-size="12" fill="{RED}">Mean Delay: {mean:.2}</text>
<rect x="{ratio_x}" y="{ratio_y}" width="240" height="22" rx="6" fill="#6b7280" fill-opacity="0.8"/>
<text x="{ratio_text_x}" y="{ratio_text_y}" font-size="12" fill="#ffffff">Ratio (&lt;= mean / &gt; mean): {ratio:.2}</text>
</svg>
"##,
        title_x = WIDTH / 2.0,
        label = html_escape(&view.label),
        x_label_y = HEIGHT - 12.0,
        y_label_y = HEIGHT / 2.0,
        y_lo_y = plot_bottom,
        legend_x = plot_left + 10.0,
        legend_y = plot_top + 16.0,
        legend_y2 = plot_top + 32.0,
        legend_y3 = plot_top + 48.0,
        blue = summary.blue.len(),
        red = summary.red.len(),
        mean = summary.mean_ms,
        ratio_x = plot_right - 250.0,
        ratio_y = plot_top + 40.0,
        ratio_text_x = plot_right - 240.0,
        ratio_text_y = plot_top + 55.0,
        ratio = summary.ratio,
    )
}
