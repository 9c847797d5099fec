//! Renderer configuration.
//!
//! [`RenderConfig`] can be built in code or deserialized from YAML:
//!
//! ```rust
//! use spool_render::{HelperErrorPolicy, PluginErrorPolicy, RenderConfig};
//!
//! let config = RenderConfig::from_yaml(r#"
//! plugin_errors: continue
//! helper_errors: placeholder
//! placeholder_text: "[unavailable]"
//! data_dirs:
//!   - ./data
//! "#).unwrap();
//!
//! assert_eq!(config.plugin_errors, PluginErrorPolicy::Continue);
//! assert_eq!(config.helper_errors, HelperErrorPolicy::Placeholder);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// What a render pass does when a plugin handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginErrorPolicy {
    /// Fail the render with a plugin-event error.
    #[default]
    Abort,
    /// Log the failure and continue with the next lifecycle stage.
    Continue,
}

/// What template execution does when a helper fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HelperErrorPolicy {
    /// Fail the render with a helper error.
    #[default]
    Abort,
    /// Render the helper's `error` body, or the placeholder text, and go on.
    Placeholder,
}

/// Renderer-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub plugin_errors: PluginErrorPolicy,
    pub helper_errors: HelperErrorPolicy,
    /// Written in place of a failed helper that has no `error` body.
    pub placeholder_text: String,
    /// Directories loaded through the data registry before every render.
    pub data_dirs: Vec<PathBuf>,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, RenderError> {
        serde_yaml::from_str(yaml).map_err(|e| RenderError::Config(e.to_string()))
    }

    pub fn plugin_errors(mut self, policy: PluginErrorPolicy) -> Self {
        self.plugin_errors = policy;
        self
    }

    pub fn helper_errors(mut self, policy: HelperErrorPolicy) -> Self {
        self.helper_errors = policy;
        self
    }

    pub fn placeholder_text(mut self, text: impl Into<String>) -> Self {
        self.placeholder_text = text.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dirs.push(dir.into());
        self
    }
}
