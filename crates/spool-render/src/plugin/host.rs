use std::fmt;
use std::rc::Rc;

use spool_data::{normalize_extension, DataRegistry, ExtensionHandler};

use crate::config::RenderConfig;
use spool_stream::{Chunk, Context};

use crate::helper::{Bodies, Helper, HelperOutput, Params};
use crate::template::{Environment, Template};

/// Registrations staged by a plugin, committed after a successful attach.
#[derive(Default)]
pub(crate) struct Staged {
    pub(crate) extension_handlers: Vec<(String, Rc<dyn ExtensionHandler>)>,
    pub(crate) helpers: Vec<(String, Rc<dyn Helper>)>,
    pub(crate) templates: Vec<(String, Template)>,
}

/// The renderer as seen by a plugin while it is being attached.
///
/// Reads see the renderer's current registrations plus anything staged so
/// far. Writes are staged and only reach the renderer once the plugin has
/// attached successfully, so a rejected plugin leaves nothing behind.
pub struct PluginHost<'a> {
    data: &'a DataRegistry,
    env: &'a Environment,
    config: &'a RenderConfig,
    staged: Staged,
}

impl<'a> PluginHost<'a> {
    pub(crate) fn new(data: &'a DataRegistry, env: &'a Environment, config: &'a RenderConfig) -> Self {
        Self {
            data,
            env,
            config,
            staged: Staged::default(),
        }
    }

    /// Registers a data extension handler, overriding any existing one.
    pub fn add_extension_handler<H>(&mut self, extension: &str, handler: H)
    where
        H: ExtensionHandler + 'static,
    {
        self.staged
            .extension_handlers
            .push((normalize_extension(extension), Rc::new(handler)));
    }

    /// Registers a helper function.
    pub fn add_helper<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&mut Chunk, &Context, &Bodies, &Params) -> spool_stream::Result<HelperOutput>
            + 'static,
    {
        self.insert_helper(name, Rc::new(helper));
    }

    /// Registers a shared helper.
    pub fn insert_helper(&mut self, name: impl Into<String>, helper: Rc<dyn Helper>) {
        self.staged.helpers.push((name.into(), helper));
    }

    /// Registers a template (usable as a partial).
    pub fn add_template(&mut self, name: impl Into<String>, template: Template) {
        self.staged.templates.push((name.into(), template));
    }

    pub fn has_extension_handler(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        self.data.has_handler(&extension)
            || self
                .staged
                .extension_handlers
                .iter()
                .any(|(staged, _)| *staged == extension)
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.env.has_helper(name) || self.staged.helpers.iter().any(|(staged, _)| staged == name)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.has_template(name)
            || self
                .staged
                .templates
                .iter()
                .any(|(staged, _)| staged == name)
    }

    /// The renderer's configuration.
    pub fn config(&self) -> &RenderConfig {
        self.config
    }

    pub(crate) fn into_staged(self) -> Staged {
        self.staged
    }
}

impl fmt::Debug for PluginHost<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("staged_extension_handlers", &self.staged.extension_handlers.len())
            .field("staged_helpers", &self.staged.helpers.len())
            .field("staged_templates", &self.staged.templates.len())
            .finish()
    }
}
