use thiserror::Error;

use super::LifecycleEvent;

/// Errors raised by plugins and the plugin manager.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin with the same name is already attached.
    #[error("a plugin named `{0}` is already attached")]
    DuplicateName(String),

    /// A plugin was constructed with an empty name.
    #[error("plugin name must not be empty")]
    EmptyName,

    /// A plugin's `on_attach` failed; nothing it staged was committed.
    #[error("plugin `{plugin}` failed to attach: {source}")]
    Attach {
        plugin: String,
        #[source]
        source: Box<PluginError>,
    },

    /// A plugin's handler for `event` failed.
    #[error("plugin `{plugin}` failed handling {event}: {source}")]
    Handler {
        plugin: String,
        event: LifecycleEvent,
        #[source]
        source: Box<PluginError>,
    },

    /// An event name did not match any lifecycle event.
    #[error("unknown lifecycle event `{0}`")]
    UnknownEvent(String),

    /// A plugin-defined failure.
    #[error("{0}")]
    Failed(String),
}

impl PluginError {
    pub fn failed(message: impl Into<String>) -> Self {
        PluginError::Failed(message.into())
    }

    /// Name of the plugin this error is attributed to, if any.
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            PluginError::DuplicateName(name) => Some(name),
            PluginError::Attach { plugin, .. } | PluginError::Handler { plugin, .. } => {
                Some(plugin)
            }
            _ => None,
        }
    }
}
