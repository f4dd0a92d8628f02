//! Persistent application configuration model and defaults.

/// Root configuration persisted to `festplan.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Festival program source preferences.
    #[serde(default)]
    pub program: ProgramConfig,
    #[serde(default)]
    /// UI preferences.
    pub ui: UiConfig,
    #[serde(default)]
    /// Planner behavior.
    pub planner: PlannerConfig,
}

/// Where the festival program is read from.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ProgramConfig {
    /// Program file loaded on startup when the stored plan is empty.
    /// Empty means no automatic load.
    #[serde(default)]
    pub program_file: String,
}

/// UI preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UiConfig {
    /// Window title shown while a screening is selected. `{film}` is
    /// replaced with the current film's title.
    #[serde(default = "default_window_title_template")]
    pub window_title_template: String,
    #[serde(default = "default_true")]
    pub use_24_hour_clock: bool,
    #[serde(default = "default_true")]
    pub show_ratings_column: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            window_title_template: default_window_title_template(),
            use_24_hour_clock: true,
            show_ratings_column: true,
        }
    }
}

/// Planner behavior persisted between sessions.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlannerConfig {
    /// Persist every plan mutation immediately.
    #[serde(default = "default_true")]
    pub autosave: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig { autosave: true }
    }
}

/// Bare application title used when nothing is selected.
pub const APP_TITLE: &str = "Festival Planner";

fn default_window_title_template() -> String {
    format!("{} - {{film}}", APP_TITLE)
}

fn default_true() -> bool {
    true
}
