// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types shared by the attribute reader, parsers, and router.

use hashbrown::HashMap;
use slim_dom::NodeId;
use smallvec::SmallVec;

/// Name of the synthetic visibility event.
pub const APPEAR: &str = "appear";

/// One trigger declaration: an event name and an optional scope selector.
///
/// Without a scope the handler is *local*: it fires only when the event reaches
/// its own element. With a scope it is *global*: it fires whenever the event
/// reaches any element matching the selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventSpec {
    /// Event name. Never empty.
    pub event: String,
    /// Scope selector for global handlers.
    pub scope: Option<String>,
}

impl EventSpec {
    /// A local trigger.
    pub fn local(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            scope: None,
        }
    }

    /// A global trigger scoped by `selector`.
    pub fn scoped(event: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            scope: Some(selector.into()),
        }
    }

    /// Returns true for triggers without a scope selector.
    pub fn is_local(&self) -> bool {
        self.scope.is_none()
    }
}

/// Trigger declarations of one element, in declaration order.
pub type EventSpecs = SmallVec<[EventSpec; 2]>;

/// A follow-on event to broadcast, optionally after a delay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitSpec {
    /// Event name to broadcast. Never empty.
    pub event: String,
    /// Delay in whole milliseconds; zero broadcasts synchronously.
    pub delay_ms: u64,
}

/// Request method of a declared action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Precedence order used when an element declares more than one action.
    pub const ALL: [Self; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];

    /// Upper-case method token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared network action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionConfig {
    /// URL as written, possibly relative.
    pub url: String,
    /// Request method.
    pub method: Method,
}

/// How content is placed into a target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SwapStrategy {
    /// Replace the target's children.
    #[default]
    Inner,
    /// Replace the target itself.
    Outer,
}

impl SwapStrategy {
    /// `"outer"` selects [`SwapStrategy::Outer`]; anything else is inner.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("outer") => Self::Outer,
            _ => Self::Inner,
        }
    }
}

bitflags::bitflags! {
    /// Action-bearing capabilities of an element.
    ///
    /// Only elements with at least one capability take part in routing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Declares a network action.
        const ACTION   = 0b0000_0001;
        /// Declares a follow-on event.
        const EMIT     = 0b0000_0010;
        /// Declares scripted evaluation.
        const EVAL     = 0b0000_0100;
        /// Declares a template copy.
        const TEMPLATE = 0b0000_1000;
        /// Declares a history push.
        const PUSH     = 0b0001_0000;
    }
}

/// Typed record of everything an element declares.
///
/// Built once per element per dispatch pass by
/// [`AttributeNames::read_element`](crate::attrs::AttributeNames::read_element).
/// Empty attribute values count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementConfig {
    /// Declared triggers, or the tag default when none are declared.
    pub triggers: EventSpecs,
    /// Network action.
    pub action: Option<ActionConfig>,
    /// Follow-on event.
    pub emit: Option<EmitSpec>,
    /// Inline scripted reaction.
    pub eval: Option<String>,
    /// Selector of a template whose content is copied into the targets.
    pub template: Option<String>,
    /// History push URL.
    pub push: Option<String>,
    /// Target selector; `None` targets the element itself.
    pub target: Option<String>,
    /// Swap strategy for content placed into targets.
    pub swap: SwapStrategy,
    /// Confirmation prompt.
    pub confirm: Option<String>,
}

impl ElementConfig {
    /// Capabilities present on this element.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::ACTION, self.action.is_some());
        caps.set(Capabilities::EMIT, self.emit.is_some());
        caps.set(Capabilities::EVAL, self.eval.is_some());
        caps.set(Capabilities::TEMPLATE, self.template.is_some());
        caps.set(Capabilities::PUSH, self.push.is_some());
        caps
    }

    /// Returns true if the element takes part in routing.
    pub fn is_candidate(&self) -> bool {
        !self.capabilities().is_empty()
    }

    /// Returns true if any trigger listens for `event`.
    pub fn listens_for(&self, event: &str) -> bool {
        self.triggers.iter().any(|t| t.event == event)
    }
}

/// How an event reaches handlers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    /// The event has a concrete origin element and bubbles from it.
    Targeted {
        /// Element the event was dispatched on.
        origin: NodeId,
    },
    /// The event has no origin and reaches every matching handler.
    Broadcast,
}

/// Drag payload carried by drag events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataTransfer {
    data: HashMap<String, String>,
    /// Allowed effects set on drag start.
    pub effect_allowed: Option<String>,
    /// Effect chosen by the drop target.
    pub drop_effect: Option<String>,
}

impl DataTransfer {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store data under a media type.
    pub fn set_data(&mut self, media_type: &str, data: &str) {
        self.data
            .insert(media_type.to_ascii_lowercase(), data.to_owned());
    }

    /// Data stored under a media type.
    pub fn get_data(&self, media_type: &str) -> Option<&str> {
        self.data
            .get(&media_type.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// An event flowing through the router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Event type, matched against trigger names.
    pub name: String,
    /// Targeted or broadcast.
    pub mode: DispatchMode,
    /// Whether a targeted event continues to ancestors.
    pub bubbles: bool,
    /// Set by handlers that claim the event's default action.
    pub default_prevented: bool,
    /// Drag payload for drag events.
    pub data_transfer: Option<DataTransfer>,
}

impl Event {
    /// A bubbling event dispatched on `origin`.
    pub fn targeted(name: impl Into<String>, origin: NodeId) -> Self {
        let name = name.into();
        let bubbles = name != APPEAR;
        Self {
            name,
            mode: DispatchMode::Targeted { origin },
            bubbles,
            default_prevented: false,
            data_transfer: None,
        }
    }

    /// A non-bubbling `appear` dispatched on `origin`.
    pub fn appear(origin: NodeId) -> Self {
        Self::targeted(APPEAR, origin)
    }

    /// An event without origin.
    pub fn broadcast(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: DispatchMode::Broadcast,
            bubbles: false,
            default_prevented: false,
            data_transfer: None,
        }
    }

    /// Attach a drag payload.
    pub fn with_data_transfer(mut self, data_transfer: DataTransfer) -> Self {
        self.data_transfer = Some(data_transfer);
        self
    }

    /// Origin element of a targeted event.
    pub fn origin(&self) -> Option<NodeId> {
        match self.mode {
            DispatchMode::Targeted { origin } => Some(origin),
            DispatchMode::Broadcast => None,
        }
    }

    /// Mark the default action as handled.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

/// A handler selected to fire for one event, in firing order.
///
/// Produced by [`Router::route`](crate::router::Router::route) and consumed by
/// the action executor. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMatch {
    /// Element that declared the handler.
    pub element: NodeId,
    /// Name of the event that matched.
    pub event: String,
    /// The trigger that matched.
    pub trigger: EventSpec,
    /// Everything the element declares.
    pub config: ElementConfig,
}
