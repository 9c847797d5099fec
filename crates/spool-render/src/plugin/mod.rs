//! Plugin lifecycle.
//!
//! A [`Plugin`] is attached to a [`Renderer`](crate::Renderer) through a
//! constructor that receives a [`PluginHost`], the renderer's registration
//! view. During a render pass the [`PluginManager`] dispatches each
//! [`LifecycleEvent`] to every attached plugin subscribed to it, in attach
//! order.
//!
//! ```text
//! constructor(&mut PluginHost)      stage helpers / handlers / templates
//!   → name check                    DuplicateName fails, nothing committed
//!   → Plugin::on_attach             may stage more, failure aborts attach
//!   → commit staged registrations
//!   → (dispatch)*                   parse-start .. complete, per pass
//!   → Plugin::on_detach             reverse attach order, on renderer drop
//! ```
//!
//! For simple cases [`HandlerPlugin`] builds a plugin from closures:
//!
//! ```rust
//! use spool_render::{HandlerPlugin, LifecycleEvent, Renderer, Template};
//! use serde_json::json;
//!
//! let mut renderer = Renderer::new();
//! renderer.add_template("page", Template::new().reference("site"));
//! renderer
//!     .attach_plugin(|_host| {
//!         HandlerPlugin::new("site-name").on(LifecycleEvent::PreRender, |state| {
//!             state.set_global("site", "spool");
//!             Ok(())
//!         })
//!     })
//!     .unwrap();
//!
//! assert_eq!(renderer.render("page", &json!({})).unwrap(), "spool");
//! ```

mod error;
mod event;
mod host;
mod manager;

pub use error::PluginError;
pub use event::{EventSet, LifecycleEvent, RenderState};
pub use host::PluginHost;
pub use manager::{PluginManager, PluginState};

use std::collections::HashMap;
use std::fmt;

/// A renderer extension notified at lifecycle events.
pub trait Plugin {
    /// Unique name within one renderer.
    fn name(&self) -> &str;

    /// Events this plugin handles. Others are skipped without calling
    /// [`on_event`](Self::on_event).
    fn events(&self) -> EventSet;

    /// Runs once when the plugin is attached, after the name check.
    ///
    /// Registrations made through `host` are committed only if this
    /// returns `Ok`.
    fn on_attach(&mut self, host: &mut PluginHost<'_>) -> Result<(), PluginError> {
        let _ = host;
        Ok(())
    }

    /// Handles a subscribed event.
    fn on_event(&mut self, event: LifecycleEvent, state: &mut RenderState)
        -> Result<(), PluginError>;

    /// Runs once when the plugin is detached.
    fn on_detach(&mut self) {}
}

type EventHandler = Box<dyn FnMut(&mut RenderState) -> Result<(), PluginError>>;
type AttachHook = Box<dyn FnOnce(&mut PluginHost<'_>) -> Result<(), PluginError>>;

/// A plugin assembled from per-event closures.
pub struct HandlerPlugin {
    name: String,
    handlers: HashMap<LifecycleEvent, EventHandler>,
    on_attach: Option<AttachHook>,
}

impl HandlerPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
            on_attach: None,
        }
    }

    /// Sets the handler for `event`, replacing any earlier one.
    pub fn on<F>(mut self, event: LifecycleEvent, handler: F) -> Self
    where
        F: FnMut(&mut RenderState) -> Result<(), PluginError> + 'static,
    {
        self.handlers.insert(event, Box::new(handler));
        self
    }

    /// Sets the attach hook.
    pub fn with_attach<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut PluginHost<'_>) -> Result<(), PluginError> + 'static,
    {
        self.on_attach = Some(Box::new(hook));
        self
    }
}

impl Plugin for HandlerPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn events(&self) -> EventSet {
        self.handlers.keys().copied().collect()
    }

    fn on_attach(&mut self, host: &mut PluginHost<'_>) -> Result<(), PluginError> {
        match self.on_attach.take() {
            Some(hook) => hook(host),
            None => Ok(()),
        }
    }

    fn on_event(
        &mut self,
        event: LifecycleEvent,
        state: &mut RenderState,
    ) -> Result<(), PluginError> {
        match self.handlers.get_mut(&event) {
            Some(handler) => handler(state),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HandlerPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerPlugin")
            .field("name", &self.name)
            .field("events", &self.events())
            .finish()
    }
}
