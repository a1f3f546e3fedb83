use std::str::FromStr;

/// How `SELECT` rows (and other statement results) are rendered on
/// stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format '{other}', expected table|json|yaml")),
        }
    }
}

/// Session-wide CLI behavior: whether to echo statement timing and
/// how to render rows.
#[derive(Debug, Clone)]
pub struct CliOptions {
    debug: bool,
    format: OutputFormat,
}

impl CliOptions {
    pub fn new(debug: bool, format: OutputFormat) -> Self {
        CliOptions { debug, format }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

impl Default for CliOptions {
    fn default() -> Self {
        CliOptions::new(false, OutputFormat::Table)
    }
}
