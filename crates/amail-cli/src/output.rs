//! Output mode selection, the JSON envelope and plain-text tables.
//!
//! The mode is decided once in `main` and passed down as a value.

use std::io::IsTerminal;

use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Text,
}

impl OutputMode {
    /// `--json` wins over `--text`; with neither, a terminal gets text and
    /// anything else gets JSON.
    pub fn detect(json: bool, text: bool) -> Self {
        Self::resolve(json, text, std::io::stdout().is_terminal())
    }

    pub fn resolve(json: bool, text: bool, stdout_is_tty: bool) -> Self {
        if json {
            OutputMode::Json
        } else if text || stdout_is_tty {
            OutputMode::Text
        } else {
            OutputMode::Json
        }
    }

    pub fn is_json(self) -> bool {
        self == OutputMode::Json
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    pub code: &'static str,
}

/// Print `data` wrapped in a success envelope.
pub fn print_json<T: Serialize>(data: T) -> Result<(), CliError> {
    let envelope = Envelope {
        success: true,
        data: Some(data),
        error: None,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Report a failed command: an error envelope on stdout in JSON mode, a
/// plain message on stderr otherwise.
pub fn print_error(mode: OutputMode, err: &CliError) {
    if mode.is_json() {
        let envelope: Envelope<()> = Envelope {
            success: false,
            data: None,
            error: Some(ErrorInfo {
                message: err.to_string(),
                code: err.code(),
            }),
        };
        match serde_json::to_string_pretty(&envelope) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: {err} (could not encode as JSON: {e})"),
        }
    } else {
        eprintln!("Error: {err}");
    }
}

// ── Plain-text table ─────────────────────────────────────────────────────

/// Column-aligned table. Widths are measured in chars so emoji and accented
/// roles line up as well as a terminal allows.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }

    /// Header, a dashed rule under each header, then the rows.
    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let rule: Vec<String> = self
            .headers
            .iter()
            .map(|h| "-".repeat(h.chars().count()))
            .collect();

        let mut out = String::new();
        for row in std::iter::once(&self.headers)
            .chain(std::iter::once(&rule))
            .chain(&self.rows)
        {
            out.push_str(&format_row(row, &widths));
            out.push('\n');
        }
        out
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let last = widths.len().saturating_sub(1);
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i == last {
            line.push_str(cell);
        } else {
            line.push_str(cell);
            let pad = width.saturating_sub(cell.chars().count()) + 2;
            line.extend(std::iter::repeat(' ').take(pad));
        }
    }
    line.trim_end().to_string()
}
