use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Root configuration for bufsync.
///
/// Usually handed over by the editor plugin as a JSON object. All fields use
/// sensible defaults if not specified.
///
/// # Examples
///
/// ```
/// use bufsync_core::config::BufsyncConfig;
///
/// let json = r#"{
///     "diagnostics": {
///         "async_filetypes": ["java", "kotlin"],
///         "max_to_display": 0
///     }
/// }"#;
///
/// let config: BufsyncConfig = serde_json::from_str(json).unwrap();
/// assert!(config.is_async_diagnostics(&["kotlin".to_string()]));
/// assert_eq!(config.diagnostics.max_to_display, 0);
/// assert_eq!(config.parse_event, "FileReadyToParse");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BufsyncConfig {
    /// Event name sent with every parse request.
    #[serde(default = "default_parse_event")]
    pub parse_event: String,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub highlights: HighlightsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl Default for BufsyncConfig {
    fn default() -> Self {
        Self {
            parse_event: default_parse_event(),
            diagnostics: DiagnosticsConfig::default(),
            highlights: HighlightsConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

/// Configuration for diagnostic handling.
///
/// # Defaults
///
/// - `async_filetypes`: `["java"]` - diagnostics arrive through a separate channel
/// - `ui_filetypes`: C-family, C#, CUDA, JavaScript and TypeScript
/// - `max_to_display`: `30` (`0` disables the limit)
/// - `echo_current`: `true`
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_async_filetypes")]
    pub async_filetypes: BTreeSet<String>,
    #[serde(default = "default_ui_filetypes")]
    pub ui_filetypes: BTreeSet<String>,
    #[serde(default = "default_max_to_display")]
    pub max_to_display: usize,
    #[serde(default = "default_true")]
    pub echo_current: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            async_filetypes: default_async_filetypes(),
            ui_filetypes: default_ui_filetypes(),
            max_to_display: default_max_to_display(),
            echo_current: true,
        }
    }
}

/// Configuration for semantic highlighting.
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_highlight_filetypes")]
    pub filetypes: BTreeSet<String>,
}

impl Default for HighlightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filetypes: default_highlight_filetypes(),
        }
    }
}

/// Configuration for the task backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Per-request timeout in milliseconds; unset means wait forever.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl BufsyncConfig {
    /// Builds a configuration from plugin-provided options.
    ///
    /// A `null` value yields the defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Whether diagnostics for a buffer with these filetypes arrive
    /// asynchronously, outside the parse response.
    pub fn is_async_diagnostics(&self, filetypes: &[String]) -> bool {
        any_listed(&self.diagnostics.async_filetypes, filetypes)
    }

    /// Whether parse responses should feed the diagnostic UI.
    pub fn diagnostic_ui_enabled(&self, filetypes: &[String]) -> bool {
        any_listed(&self.diagnostics.ui_filetypes, filetypes)
            || self.is_async_diagnostics(filetypes)
    }

    pub fn highlights_enabled(&self, filetypes: &[String]) -> bool {
        self.highlights.enabled && any_listed(&self.highlights.filetypes, filetypes)
    }
}

fn any_listed(listed: &BTreeSet<String>, filetypes: &[String]) -> bool {
    filetypes.iter().any(|filetype| listed.contains(filetype))
}

// Default value functions
const fn default_true() -> bool {
    true
}

fn default_parse_event() -> String {
    "FileReadyToParse".to_string()
}

const fn default_max_to_display() -> usize {
    30
}

fn default_async_filetypes() -> BTreeSet<String> {
    set(&["java"])
}

fn default_ui_filetypes() -> BTreeSet<String> {
    set(&[
        "c",
        "cpp",
        "cs",
        "cuda",
        "javascript",
        "objc",
        "objcpp",
        "typescript",
    ])
}

fn default_highlight_filetypes() -> BTreeSet<String> {
    set(&["c", "cpp"])
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}
