use std::path::{Path, PathBuf};

use crate::config::ReportConfig;
use crate::error::GuardplotError;
use crate::report::chart::render_svg;
use crate::report::export::{export_csv, export_html, export_json};
use crate::report::AnalysisReport;

/// Write the transaction table to `<dir>/<basename>.csv`.
pub async fn write_csv(report: &AnalysisReport, dir: &Path) -> Result<PathBuf, GuardplotError> {
    let content = export_csv(report)?;
    let path = dir.join(format!("{}.csv", report.basename));
    tokio::fs::write(&path, content).await?;
    Ok(path)
}

/// Write the report as JSON to `<dir>/<basename>.report.json`.
pub async fn write_json(report: &AnalysisReport, dir: &Path) -> Result<PathBuf, GuardplotError> {
    let content = export_json(report)?;
    let path = dir.join(format!("{}.report.json", report.basename));
    tokio::fs::write(&path, content).await?;
    Ok(path)
}

/// Write the HTML report to `<dir>/<basename>.html`.
pub async fn write_html(
    report: &AnalysisReport,
    config: &ReportConfig,
    dir: &Path,
) -> Result<PathBuf, GuardplotError> {
    let content = export_html(report, config);
    let path = dir.join(format!("{}.html", report.basename));
    tokio::fs::write(&path, content).await?;
    Ok(path)
}

/// Write one SVG chart per view, named by [`AnalysisReport::chart_files`].
pub async fn write_charts(
    report: &AnalysisReport,
    dir: &Path,
) -> Result<Vec<PathBuf>, GuardplotError> {
    let mut written = Vec::new();
    for (view, file) in report.chart_files() {
        let path = dir.join(file);
        tokio::fs::write(&path, render_svg(view)).await?;
        written.push(path);
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
