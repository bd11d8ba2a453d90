use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config was read from, `None` if no location is known.
    pub file_path: Option<PathBuf>,
    /// Parse error of an existing config file; the defaults are used instead.
    pub maybe_error: Option<toml::de::Error>,
}

/// Default location of the config file.
///
/// Linux: ~/.config/mdlive/config.toml
/// macOS: ~/Library/Application\ Support/org.mdlive.mdlive/config.toml
/// Windows: ~\AppData\Roaming\mdlive\mdlive\config\config.toml
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("org", "mdlive", "mdlive")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Read the config from `specified_config_file`, or from the default
/// location when `None`.
///
/// A missing or unreadable file yields the default config. A file that fails
/// to parse also yields the default config, with the error returned for the
/// caller to report.
pub fn load_config(specified_config_file: Option<PathBuf>) -> LoadedConfig {
    let Some(config_file) = specified_config_file.or_else(default_config_file) else {
        return LoadedConfig {
            config: Config::default(),
            file_path: None,
            maybe_error: None,
        };
    };

    let mut maybe_error = None;
    let config = match std::fs::read_to_string(&config_file) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            maybe_error.replace(err);
            Config::default()
        }),
        Err(err) => {
            tracing::debug!(path = %config_file.display(), %err, "No config file, using defaults");
            Config::default()
        }
    };

    LoadedConfig {
        config,
        file_path: Some(config_file),
        maybe_error,
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LogConfig {
    /// Specify the log file path.
    ///
    /// Overridden by `--log` on the command line.
    pub log_file: Option<String>,

    /// Specify the max log level.
    pub max_level: String,

    /// Specify the log target to enable more detailed logging.
    ///
    /// ```toml
    /// [log]
    /// log-target = "markdown_preview_core=trace,markdown_preview_server=debug"
    /// ```
    pub log_target: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            max_level: "debug".into(),
            log_target: "".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Quiet interval in milliseconds after the last edit before re-rendering.
    pub debounce_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LanguageLoadingMode {
    /// Load the bootstrap languages on startup and the others on first use.
    #[default]
    Lazy,
    /// Load every supported language on startup.
    Eager,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HighlightConfig {
    pub loading: LanguageLoadingMode,

    /// Languages loaded on startup in lazy mode, also the candidates of
    /// auto-detection. The built-in set is used when absent.
    ///
    /// ```toml
    /// [highlight]
    /// bootstrap-languages = ["rust", "python", "bash"]
    /// ```
    pub bootstrap_languages: Option<Vec<String>>,

    /// Name of the color theme of highlighted code.
    pub theme: String,

    /// Directory of extra `<name>.sublime-syntax` grammars, consulted for
    /// languages without a bundled grammar.
    pub syntaxes_dir: Option<PathBuf>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            loading: LanguageLoadingMode::default(),
            bootstrap_languages: None,
            theme: "InspiredGitHub".into(),
            syntaxes_dir: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct MathConfig {
    /// Whether to typeset math.
    pub enabled: bool,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,

    /// `0` picks a free port.
    pub port: u16,

    /// Whether to open the preview in the default browser on start.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            open_browser: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Log configuration.
    pub log: LogConfig,

    /// Live preview configuration.
    pub preview: PreviewConfig,

    /// Syntax highlighting configuration.
    pub highlight: HighlightConfig,

    /// Math typesetting configuration.
    pub math: MathConfig,

    /// Preview server configuration.
    pub server: ServerConfig,
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.preview.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let toml_content = r#"
          [log]
          max-level = "trace"
          log-file = "/tmp/mdlive.log"

          [preview]
          debounce-ms = 150

          [highlight]
          loading = "eager"
          bootstrap-languages = ["rust", "go"]
          theme = "base16-ocean.light"
          syntaxes-dir = "/usr/share/mdlive/syntaxes"

          [math]
          enabled = false

          [server]
          port = 3000
          open-browser = false
"#;
        let user_config: Config =
            toml::from_str(toml_content).expect("Failed to deserialize config");

        assert_eq!(
            user_config,
            Config {
                log: LogConfig {
                    log_file: Some("/tmp/mdlive.log".to_string()),
                    max_level: "trace".to_string(),
                    ..Default::default()
                },
                preview: PreviewConfig { debounce_ms: 150 },
                highlight: HighlightConfig {
                    loading: LanguageLoadingMode::Eager,
                    bootstrap_languages: Some(vec!["rust".to_string(), "go".to_string()]),
                    theme: "base16-ocean.light".to_string(),
                    syntaxes_dir: Some(PathBuf::from("/usr/share/mdlive/syntaxes")),
                },
                math: MathConfig { enabled: false },
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 3000,
                    open_browser: false,
                },
            }
        );
        assert_eq!(user_config.debounce(), Duration::from_millis(150));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let loaded = load_config(Some(path.clone()));

        assert_eq!(loaded.config, Config::default());
        assert_eq!(loaded.file_path, Some(path));
        assert!(loaded.maybe_error.is_none());
        assert_eq!(loaded.config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_unknown_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[preview]\ndebounce = 100\n").unwrap();

        let loaded = load_config(Some(path));

        assert_eq!(loaded.config, Config::default());
        let err = loaded.maybe_error.expect("unknown field must be reported");
        assert!(err.to_string().contains("debounce"));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.open_browser);
        assert_eq!(config.highlight.loading, LanguageLoadingMode::Lazy);
    }
}
