//! Error types for rendering.
//!
//! [`RenderError`] is what every public [`Renderer`](crate::Renderer)
//! operation returns. A failed render pass always surfaces as a single
//! [`TemplateRenderError`] naming the stage that failed, rather than the raw
//! error from whichever nested chunk or plugin raised it.

use std::fmt;

use spool_data::DataError;
use spool_stream::{BoxError, StreamError};
use thiserror::Error;

use crate::plugin::{LifecycleEvent, PluginError};

/// The stage of a render pass at which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// Resolving and compiling the template.
    Parse,
    /// Loading data files or serializing the caller's data.
    DataLoad,
    /// A plugin handler for the given event.
    PluginEvent(LifecycleEvent),
    /// A helper invoked from the template.
    Helper,
    /// Executing the template outside any helper (missing partial, flush failure).
    Execute,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStage::Parse => write!(f, "parse"),
            RenderStage::DataLoad => write!(f, "data-load"),
            RenderStage::PluginEvent(event) => write!(f, "plugin-event ({})", event),
            RenderStage::Helper => write!(f, "helper"),
            RenderStage::Execute => write!(f, "execute"),
        }
    }
}

/// A failed render pass.
///
/// Carries the failing stage, the template being rendered, the helper or
/// plugin that raised the error when known, and the underlying error.
#[derive(Debug)]
pub struct TemplateRenderError {
    pub stage: RenderStage,
    pub template: String,
    pub origin: Option<String>,
    pub source: BoxError,
}

impl TemplateRenderError {
    pub fn new(stage: RenderStage, template: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            stage,
            template: template.into(),
            origin: None,
            source: source.into(),
        }
    }

    /// Names the helper or plugin the error came from.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Classifies a stream failure: helper-attributed errors become
    /// [`RenderStage::Helper`], everything else [`RenderStage::Execute`].
    pub(crate) fn from_stream(template: &str, err: StreamError) -> Self {
        match err {
            StreamError::Helper { helper, source } => {
                Self::new(RenderStage::Helper, template, source).with_origin(helper)
            }
            other => Self::new(RenderStage::Execute, template, other),
        }
    }
}

impl fmt::Display for TemplateRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed while rendering '{}'", self.stage, self.template)?;
        if let Some(origin) = &self.origin {
            write!(f, " in '{}'", origin)?;
        }
        write!(f, ": {}", self.source)
    }
}

impl std::error::Error for TemplateRenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Error raised by a [`TemplateEngine`](crate::template::TemplateEngine).
#[derive(Debug, Error)]
#[error("expression error: {message}")]
pub struct EngineError {
    pub message: String,
}

impl From<minijinja::Error> for EngineError {
    fn from(err: minijinja::Error) -> Self {
        EngineError {
            message: err.to_string(),
        }
    }
}

/// Error type for renderer operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A render pass failed.
    #[error(transparent)]
    Template(#[from] TemplateRenderError),

    /// Attaching a plugin failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Data registry error outside a render pass.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RenderError {
    /// The failing stage, if this is a render pass failure.
    pub fn stage(&self) -> Option<RenderStage> {
        match self {
            RenderError::Template(err) => Some(err.stage),
            _ => None,
        }
    }
}
