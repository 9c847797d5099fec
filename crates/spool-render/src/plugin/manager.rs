use std::fmt;

use super::{EventSet, LifecycleEvent, Plugin, PluginError, PluginHost, RenderState};

/// Where an attached plugin is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Attached,
    Detached,
}

struct Entry {
    name: String,
    events: EventSet,
    state: PluginState,
    plugin: Box<dyn Plugin>,
}

/// Attached plugins, in attach order.
///
/// Attach order is dispatch order for every event. Plugins are detached in
/// reverse order by [`detach_all`](Self::detach_all), which also runs when
/// the manager is dropped.
#[derive(Default)]
pub struct PluginManager {
    entries: Vec<Entry>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a constructed plugin.
    ///
    /// # Errors
    ///
    /// - [`PluginError::EmptyName`] if the plugin has no name
    /// - [`PluginError::DuplicateName`] if the name is already attached
    /// - [`PluginError::Attach`] if `on_attach` fails
    ///
    /// On error the plugin is dropped without being registered.
    pub fn attach(
        &mut self,
        mut plugin: Box<dyn Plugin>,
        host: &mut PluginHost<'_>,
    ) -> Result<(), PluginError> {
        let name = plugin.name().to_string();
        if name.is_empty() {
            return Err(PluginError::EmptyName);
        }
        if self.contains(&name) {
            return Err(PluginError::DuplicateName(name));
        }

        plugin
            .on_attach(host)
            .map_err(|source| PluginError::Attach {
                plugin: name.clone(),
                source: Box::new(source),
            })?;

        let events = plugin.events();
        tracing::debug!(plugin = %name, position = self.entries.len(), "plugin attached");
        self.entries.push(Entry {
            name,
            events,
            state: PluginState::Attached,
            plugin,
        });
        Ok(())
    }

    /// Dispatches `event` to every attached plugin subscribed to it, in
    /// attach order.
    ///
    /// The first failing handler stops the dispatch; later plugins do not
    /// see the event.
    pub fn dispatch(
        &mut self,
        event: LifecycleEvent,
        state: &mut RenderState,
    ) -> Result<(), PluginError> {
        for entry in &mut self.entries {
            if entry.state != PluginState::Attached || !entry.events.contains(event) {
                continue;
            }
            tracing::debug!(plugin = %entry.name, %event, "dispatching lifecycle event");
            entry
                .plugin
                .on_event(event, state)
                .map_err(|source| PluginError::Handler {
                    plugin: entry.name.clone(),
                    event,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    /// Detaches every attached plugin, newest first.
    pub fn detach_all(&mut self) {
        for entry in self.entries.iter_mut().rev() {
            if entry.state == PluginState::Attached {
                entry.plugin.on_detach();
                entry.state = PluginState::Detached;
                tracing::debug!(plugin = %entry.name, "plugin detached");
            }
        }
    }

    /// Plugin names in attach order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        self.detach_all();
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| (&entry.name, entry.state)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::plugin::HandlerPlugin;
    use crate::template::Environment;
    use spool_data::DataRegistry;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn events(&self) -> EventSet {
            EventSet::all()
        }

        fn on_event(
            &mut self,
            event: LifecycleEvent,
            _state: &mut RenderState,
        ) -> Result<(), PluginError> {
            self.log.borrow_mut().push(format!("{}:{}", self.name, event));
            Ok(())
        }

        fn on_detach(&mut self) {
            self.log.borrow_mut().push(format!("{}:detach", self.name));
        }
    }

    fn attach(manager: &mut PluginManager, plugin: impl Plugin + 'static) -> Result<(), PluginError> {
        let data = DataRegistry::new();
        let env = Environment::default();
        let config = RenderConfig::default();
        let mut host = PluginHost::new(&data, &env, &config);
        manager.attach(Box::new(plugin), &mut host)
    }

    #[test]
    fn dispatch_follows_attach_order() {
        let log = Log::default();
        let mut manager = PluginManager::new();
        attach(&mut manager, Recorder { name: "b", log: log.clone() }).unwrap();
        attach(&mut manager, Recorder { name: "a", log: log.clone() }).unwrap();

        let mut state = RenderState::new("page");
        manager.dispatch(LifecycleEvent::PreRender, &mut state).unwrap();
        assert_eq!(*log.borrow(), vec!["b:pre-render", "a:pre-render"]);
        assert_eq!(manager.names(), vec!["b", "a"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let log = Log::default();
        let mut manager = PluginManager::new();
        attach(&mut manager, Recorder { name: "x", log: log.clone() }).unwrap();
        let err = attach(&mut manager, Recorder { name: "x", log }).unwrap_err();
        assert!(matches!(err, PluginError::DuplicateName(name) if name == "x"));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut manager = PluginManager::new();
        let err = attach(&mut manager, HandlerPlugin::new("")).unwrap_err();
        assert!(matches!(err, PluginError::EmptyName));
        assert!(manager.is_empty());
    }

    #[test]
    fn failed_attach_hook_leaves_plugin_unregistered() {
        let mut manager = PluginManager::new();
        let plugin = HandlerPlugin::new("broken")
            .with_attach(|_host| Err(PluginError::failed("no config")));
        let err = attach(&mut manager, plugin).unwrap_err();
        assert!(matches!(err, PluginError::Attach { ref plugin, .. } if plugin == "broken"));
        assert!(!manager.contains("broken"));
    }

    #[test]
    fn detach_runs_in_reverse_order_once() {
        let log = Log::default();
        let mut manager = PluginManager::new();
        attach(&mut manager, Recorder { name: "first", log: log.clone() }).unwrap();
        attach(&mut manager, Recorder { name: "second", log: log.clone() }).unwrap();

        manager.detach_all();
        manager.detach_all();
        assert_eq!(*log.borrow(), vec!["second:detach", "first:detach"]);
        assert_eq!(manager.state("first"), Some(PluginState::Detached));

        let mut state = RenderState::new("page");
        manager.dispatch(LifecycleEvent::Complete, &mut state).unwrap();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn drop_detaches() {
        let log = Log::default();
        {
            let mut manager = PluginManager::new();
            attach(&mut manager, Recorder { name: "p", log: log.clone() }).unwrap();
        }
        assert_eq!(*log.borrow(), vec!["p:detach"]);
    }
}
