#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Out-of-range values never fail: a negative or non-finite look-ahead is
//! read as 0, which disables preemptive loading. [`VisibilityConfig::validate`]
//! reports what a hand-built config got wrong.
//!
//! With the `config` feature, configs load from JSON. The loader accepts the
//! list component's option names (`premptiveLoading`,
//! `preemptiveLoadDistance`) as numbers or booleans: `false` disables the
//! feature and `true` selects the default look-ahead.
//!
//! ```json
//! { "premptiveLoading": 3, "preemptiveLoadDistance": false, "axis": "horizontal" }
//! ```

#[cfg(feature = "config")]
use std::path::Path;

use crate::geometry::Axis;

/// Rows walked past the visible rows when no count is configured.
pub const DEFAULT_PREEMPTIVE_ROWS: usize = 2;

/// Look-ahead margin, in layout units, when no distance is configured.
pub const DEFAULT_PREEMPTIVE_DISTANCE: f64 = 250.0;

/// Upper bound accepted by [`VisibilityConfig::validate`].
pub const MAX_PREEMPTIVE_ROWS: usize = 4096;

/// Environment variable that turns preemptive loading off.
pub const DISABLE_PREEMPTIVE_ENV: &str = "CELLVIS_DISABLE_PREEMPTIVE";

/// What to do with a cell that has mounted but not yet been laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum UnmeasuredPolicy {
    /// Leave it visible until measured.
    #[default]
    Visible,
    /// Hide it until its first layout report (window mode).
    Hidden,
}

/// Tuning knobs for a [`VisibilityEngine`](crate::engine::VisibilityEngine).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "config",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "RawConfig", rename_all = "camelCase")
)]
pub struct VisibilityConfig {
    /// Rows kept visible past the visible rows (explicit-delta mode).
    /// 0 disables preemptive loading.
    pub preemptive_rows: usize,
    /// Margin added on both sides of the scroll window (window mode).
    pub preemptive_distance: f64,
    /// Primary scroll axis.
    pub axis: Axis,
    pub unmeasured: UnmeasuredPolicy,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            preemptive_rows: DEFAULT_PREEMPTIVE_ROWS,
            preemptive_distance: DEFAULT_PREEMPTIVE_DISTANCE,
            axis: Axis::Vertical,
            unmeasured: UnmeasuredPolicy::Visible,
        }
    }
}

impl VisibilityConfig {
    /// A config with preemptive loading turned off in both modes.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            preemptive_rows: 0,
            preemptive_distance: 0.0,
            ..Self::default()
        }
    }

    /// Set the row look-ahead. Negative counts disable it.
    #[must_use]
    pub fn with_preemptive_rows(mut self, rows: i64) -> Self {
        self.preemptive_rows = usize::try_from(rows).unwrap_or(0);
        self
    }

    /// Set the distance look-ahead. Negative or non-finite values disable it.
    #[must_use]
    pub fn with_preemptive_distance(mut self, distance: f64) -> Self {
        self.preemptive_distance = sanitize_distance(distance);
        self
    }

    #[must_use]
    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    #[must_use]
    pub fn with_unmeasured(mut self, policy: UnmeasuredPolicy) -> Self {
        self.unmeasured = policy;
        self
    }

    /// Whether either mode will force rows visible past the window.
    #[must_use]
    pub fn preemptive_enabled(&self) -> bool {
        self.preemptive_rows > 0 || self.preemptive_distance > 0.0
    }

    /// Copy with every field clamped into range.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            preemptive_distance: sanitize_distance(self.preemptive_distance),
            ..self.clone()
        }
    }

    /// Apply `CELLVIS_DISABLE_PREEMPTIVE`.
    ///
    /// When set to `"1"`, `"true"`, or `"yes"` (case-insensitive), both
    /// look-ahead settings are zeroed.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        let disable = std::env::var(DISABLE_PREEMPTIVE_ENV)
            .map(|v| env_flag(&v))
            .unwrap_or(false);
        if disable {
            Self {
                preemptive_rows: 0,
                preemptive_distance: 0.0,
                ..self
            }
        } else {
            self
        }
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.preemptive_distance.is_finite() {
            errors.push(format!(
                "preemptive_distance must be finite, got {}",
                self.preemptive_distance
            ));
        } else if self.preemptive_distance < 0.0 {
            errors.push(format!(
                "preemptive_distance must be >= 0, got {}",
                self.preemptive_distance
            ));
        }

        if self.preemptive_rows > MAX_PREEMPTIVE_ROWS {
            errors.push(format!(
                "preemptive_rows must be <= {MAX_PREEMPTIVE_ROWS}, got {}",
                self.preemptive_rows
            ));
        }

        errors
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty JSON.
    #[cfg(feature = "config")]
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Json)
    }
}

fn sanitize_distance(distance: f64) -> f64 {
    if distance.is_finite() && distance > 0.0 {
        distance
    } else {
        0.0
    }
}

fn env_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

// ── JSON loading ────────────────────────────────────────────────────

/// A look-ahead option as the list component accepts it.
#[cfg(feature = "config")]
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Toggle {
    Flag(bool),
    Amount(f64),
}

#[cfg(feature = "config")]
#[derive(serde::Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawConfig {
    #[serde(alias = "premptiveLoading", alias = "preemptiveLoading")]
    preemptive_rows: Option<Toggle>,
    #[serde(alias = "preemptiveLoadDistance")]
    preemptive_distance: Option<Toggle>,
    axis: Option<Axis>,
    horizontal: Option<bool>,
    unmeasured: Option<UnmeasuredPolicy>,
}

#[cfg(feature = "config")]
impl From<RawConfig> for VisibilityConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let preemptive_rows = match raw.preemptive_rows {
            None | Some(Toggle::Flag(true)) => defaults.preemptive_rows,
            Some(Toggle::Flag(false)) => 0,
            // Saturating cast: NaN and negatives land on 0.
            Some(Toggle::Amount(n)) => n.floor() as usize,
        };
        let preemptive_distance = match raw.preemptive_distance {
            None | Some(Toggle::Flag(true)) => defaults.preemptive_distance,
            Some(Toggle::Flag(false)) => 0.0,
            Some(Toggle::Amount(d)) => sanitize_distance(d),
        };
        let axis = match (raw.axis, raw.horizontal) {
            (Some(axis), _) => axis,
            (None, Some(true)) => Axis::Horizontal,
            (None, _) => defaults.axis,
        };
        Self {
            preemptive_rows,
            preemptive_distance,
            axis,
            unmeasured: raw.unmeasured.unwrap_or_default(),
        }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors from loading a [`VisibilityConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
