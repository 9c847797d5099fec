//! Lifecycle events and the state handed to plugin handlers.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::PluginError;

/// A stage of a render pass at which plugins are notified.
///
/// Events fire in declaration order, once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleEvent {
    /// Before the template is resolved and compiled.
    ParseStart,
    /// After the template compiled successfully.
    ParseComplete,
    /// After data is loaded, before any output is produced.
    PreRender,
    /// After the full output is produced, before it is returned.
    PostRender,
    /// Last event of a successful pass.
    Complete,
}

impl LifecycleEvent {
    /// Every event, in firing order.
    pub const ALL: [LifecycleEvent; 5] = [
        LifecycleEvent::ParseStart,
        LifecycleEvent::ParseComplete,
        LifecycleEvent::PreRender,
        LifecycleEvent::PostRender,
        LifecycleEvent::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::ParseStart => "parse-start",
            LifecycleEvent::ParseComplete => "parse-complete",
            LifecycleEvent::PreRender => "pre-render",
            LifecycleEvent::PostRender => "post-render",
            LifecycleEvent::Complete => "complete",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| PluginError::UnknownEvent(s.to_string()))
    }
}

/// The set of events a plugin subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSet(u8);

impl EventSet {
    pub fn empty() -> Self {
        EventSet(0)
    }

    pub fn all() -> Self {
        LifecycleEvent::ALL.into_iter().collect()
    }

    pub fn with(mut self, event: LifecycleEvent) -> Self {
        self.insert(event);
        self
    }

    pub fn insert(&mut self, event: LifecycleEvent) {
        self.0 |= event.bit();
    }

    pub fn contains(&self, event: LifecycleEvent) -> bool {
        self.0 & event.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Subscribed events in firing order.
    pub fn iter(&self) -> impl Iterator<Item = LifecycleEvent> + '_ {
        LifecycleEvent::ALL.into_iter().filter(|event| self.contains(*event))
    }
}

impl FromIterator<LifecycleEvent> for EventSet {
    fn from_iter<I: IntoIterator<Item = LifecycleEvent>>(iter: I) -> Self {
        let mut set = EventSet::empty();
        for event in iter {
            set.insert(event);
        }
        set
    }
}

impl<const N: usize> From<[LifecycleEvent; N]> for EventSet {
    fn from(events: [LifecycleEvent; N]) -> Self {
        events.into_iter().collect()
    }
}

/// Mutable state shared with plugin handlers during one render pass.
///
/// Handlers for [`LifecycleEvent::PreRender`] may add `globals`, which are
/// visible to the template at lowest precedence. Handlers for
/// [`LifecycleEvent::PostRender`] may rewrite the `output`. `values` is a
/// scratch area plugins can use to pass data between events.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    template: String,
    output: Option<String>,
    globals: Map<String, Value>,
    values: Map<String, Value>,
    dispatched: Vec<LifecycleEvent>,
}

impl RenderState {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    /// Name of the template being rendered.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The rendered output. `None` until rendering finishes.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn set_output(&mut self, output: impl Into<String>) {
        self.output = Some(output.into());
    }

    pub(crate) fn take_output(&mut self) -> Option<String> {
        self.output.take()
    }

    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    pub fn set_global(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(key.into(), value.into());
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Events fired so far in this pass, in order.
    pub fn dispatched(&self) -> &[LifecycleEvent] {
        &self.dispatched
    }

    pub(crate) fn record(&mut self, event: LifecycleEvent) {
        self.dispatched.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_round_trip() {
        for event in LifecycleEvent::ALL {
            assert_eq!(event.as_str().parse::<LifecycleEvent>().unwrap(), event);
        }
        assert!(matches!(
            "render".parse::<LifecycleEvent>(),
            Err(PluginError::UnknownEvent(name)) if name == "render"
        ));
    }

    #[test]
    fn event_set_membership() {
        let set = EventSet::from([LifecycleEvent::PreRender, LifecycleEvent::Complete]);
        assert!(set.contains(LifecycleEvent::PreRender));
        assert!(!set.contains(LifecycleEvent::ParseStart));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![LifecycleEvent::PreRender, LifecycleEvent::Complete]
        );
        assert!(EventSet::empty().is_empty());
        assert_eq!(EventSet::all().iter().count(), 5);
    }

    #[test]
    fn render_state_records_globals_and_output() {
        let mut state = RenderState::new("page");
        assert_eq!(state.template(), "page");
        assert!(state.output().is_none());
        state.set_global("site", "spool");
        state.set_output("done");
        assert_eq!(state.globals()["site"], "spool");
        assert_eq!(state.output(), Some("done"));
    }
}
