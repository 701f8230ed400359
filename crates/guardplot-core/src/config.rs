use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Log file read when no input path is given.
pub const DEFAULT_INPUT_FILE: &str = "testloop.out.json";

/// Default cap on transaction rows rendered into the HTML report.
pub const DEFAULT_HTML_ROW_LIMIT: usize = 500;

/// Which artefacts a run writes, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ReportConfig {
    /// Directory for all outputs. `None` means next to the input file.
    pub output_dir: Option<PathBuf>,
    pub write_csv: bool,
    pub write_html: bool,
    pub write_charts: bool,
    pub write_json: bool,
    pub html_row_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            write_csv: true,
            write_html: true,
            write_charts: true,
            write_json: true,
            html_row_limit: DEFAULT_HTML_ROW_LIMIT,
        }
    }
}

impl ReportConfig {
    /// Resolve the output directory for a given input file.
    pub fn output_dir_for(&self, input: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_write_everything() {
        let config = ReportConfig::default();
        assert!(config.write_csv && config.write_html && config.write_charts && config.write_json);
        assert_eq!(config.html_row_limit, 500);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn output_dir_defaults_to_input_directory() {
        let config = ReportConfig::default();
        assert_eq!(
            config.output_dir_for(Path::new("/tmp/runs/a.json")),
            PathBuf::from("/tmp/runs")
        );
        assert_eq!(config.output_dir_for(Path::new("a.json")), PathBuf::from("."));
    }

    #[test]
    fn explicit_output_dir_wins() {
        let config = ReportConfig {
            output_dir: Some(PathBuf::from("/out")),
            ..ReportConfig::default()
        };
        assert_eq!(config.output_dir_for(Path::new("/tmp/a.json")), PathBuf::from("/out"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ReportConfig =
            serde_json::from_str(r#"{"write_csv": false}"#).expect("deserialize");
        assert!(!config.write_csv);
        assert!(config.write_html);
        assert_eq!(config.html_row_limit, DEFAULT_HTML_ROW_LIMIT);
    }
}
