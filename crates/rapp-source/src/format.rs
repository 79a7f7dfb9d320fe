//! Formatting collaborator
//!
//! The rewriter only needs `format(text, kind) -> text`. [`BasicFormatter`]
//! normalizes whitespace for TypeScript and pretty-prints JSON; projects can
//! plug in any other [`Formatter`].

use crate::error::{SourceError, SourceResult};
use serde::Deserialize;
use std::path::Path;

/// Kind of file being formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// TypeScript class or entry source
    TypeScript,
    /// JSON metadata
    Json,
}

/// Pretty-printer
pub trait Formatter: Send + Sync {
    /// Format text of the given kind
    ///
    /// # Errors
    /// Returns [`SourceError::Format`] if the text cannot be formatted
    fn format(&self, text: &str, kind: FileKind) -> SourceResult<String>;
}

/// Project formatting rules, read from `.prettierrc`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatOptions {
    /// Spaces per indentation level
    pub tab_width: usize,
    /// Indent with tabs
    pub use_tabs: bool,
    /// Prefer single quotes
    pub single_quote: bool,
    /// Terminate statements with semicolons
    pub semi: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            tab_width: 2,
            use_tabs: false,
            single_quote: false,
            semi: true,
        }
    }
}

impl FormatOptions {
    /// Name of the project formatting config
    pub const FILE_NAME: &'static str = ".prettierrc";

    /// Load `.prettierrc` from a project root
    ///
    /// A missing or unreadable config yields the defaults.
    pub async fn load(root: &Path) -> Self {
        let path = root.join(Self::FILE_NAME);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Self::parse(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "ignoring invalid formatting config: {}", e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Parse the JSON form of `.prettierrc`
    ///
    /// # Errors
    /// Returns [`SourceError::Format`] if the text is not a valid config
    pub fn parse(text: &str) -> SourceResult<Self> {
        serde_json::from_str(text).map_err(|e| SourceError::Format(e.to_string()))
    }

    /// One indentation level
    #[must_use]
    pub fn indent(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.tab_width)
        }
    }

    /// String quote character
    #[inline]
    #[must_use]
    pub fn quote(&self) -> char {
        if self.single_quote {
            '\''
        } else {
            '"'
        }
    }

    /// Statement terminator
    #[inline]
    #[must_use]
    pub fn terminator(&self) -> &'static str {
        if self.semi {
            ";"
        } else {
            ""
        }
    }
}

/// Whitespace-normalizing formatter
#[derive(Debug, Clone, Default)]
pub struct BasicFormatter {
    options: FormatOptions,
}

impl BasicFormatter {
    /// Create formatter with project options
    #[inline]
    #[must_use]
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    fn format_typescript(text: &str) -> String {
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        let mut output: Vec<String> = Vec::with_capacity(lines.len());

        for (index, line) in lines.iter().enumerate() {
            if line.is_empty() {
                let previous = output.last();
                let next = lines[index + 1..].iter().find(|l| !l.is_empty());
                let after_open = previous.map_or(true, |p| p.is_empty() || p.ends_with('{'));
                let before_close = next.map_or(true, |n| n.trim_start().starts_with('}'));
                if after_open || before_close {
                    continue;
                }
            }
            // Empty braces collapse onto one line
            let closes = line.trim_start();
            if let Some(open) = output.last_mut().filter(|p| p.ends_with('{') && closes.starts_with('}')) {
                open.push_str(closes);
                continue;
            }
            output.push((*line).to_string());
        }

        let mut formatted = output.join("\n");
        formatted.push('\n');
        formatted
    }

    fn format_json(&self, text: &str) -> SourceResult<String> {
        use serde::Serialize;

        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| SourceError::Format(e.to_string()))?;
        let indent = self.options.indent();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value
            .serialize(&mut serializer)
            .map_err(|e| SourceError::Format(e.to_string()))?;

        let mut formatted =
            String::from_utf8(buffer).map_err(|e| SourceError::Format(e.to_string()))?;
        formatted.push('\n');
        Ok(formatted)
    }
}

impl Formatter for BasicFormatter {
    fn format(&self, text: &str, kind: FileKind) -> SourceResult<String> {
        match kind {
            FileKind::TypeScript => Ok(Self::format_typescript(text)),
            FileKind::Json => self.format_json(text),
        }
    }
}
