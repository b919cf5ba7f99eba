// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.
//!
//! Every name the engine reads or writes is configurable; the defaults match
//! the `s-` attribute vocabulary and the `S-` response headers.

use core::time::Duration;

use slim_responder::attrs::AttributeNames;
use slim_responder::router::BroadcastScopePolicy;

/// How non-success response statuses are treated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Any completed response is processed normally.
    #[default]
    Resolve,
    /// Statuses outside `200..300` fail the request.
    Reject,
}

/// Names of the headers exchanged with the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderNames {
    /// Request header carrying the current location.
    pub location: String,
    /// `"true"` requests a full reload.
    pub refresh: String,
    /// Navigate to this URL instead of processing the body.
    pub redirect: String,
    /// Overrides the declared target selector.
    pub target: String,
    /// `"outer"` forces outer swaps.
    pub swap: String,
    /// Event broadcast after the response.
    pub emit: String,
    /// URL pushed onto history after the response.
    pub push: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            location: "S-Location".into(),
            refresh: "S-Refresh".into(),
            redirect: "S-Redirect".into(),
            target: "S-Target".into(),
            swap: "S-Swap".into(),
            emit: "S-Emit".into(),
            push: "S-Push".into(),
        }
    }
}

/// Names of the lifecycle notifications raised on the acting element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationNames {
    /// The request completed and was applied.
    pub ok: String,
    /// The request failed.
    pub error: String,
    /// Raised after every request, success or failure.
    pub done: String,
}

impl Default for NotificationNames {
    fn default() -> Self {
        Self {
            ok: "slim:ok".into(),
            error: "slim:error".into(),
            done: "slim:done".into(),
        }
    }
}

/// Events delivered by the host that reach the router.
pub const ROUTED_EVENTS: [&str; 9] = [
    "click",
    "change",
    "input",
    "submit",
    "appear",
    "dragstart",
    "dragover",
    "dragleave",
    "drop",
];

/// Shortest delay before a live-update reconnect.
pub const MIN_RECONNECT_BACKOFF: Duration = Duration::from_millis(1);

/// Engine configuration.
///
/// Construct with [`EngineConfig::default`] and adjust with the `with_*` setters.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Declarative attribute names.
    pub names: AttributeNames,
    /// Targeted host events that are routed. Others are ignored.
    pub routed_events: Vec<String>,
    /// Response and request header names.
    pub headers: HeaderNames,
    /// Lifecycle notification names.
    pub notifications: NotificationNames,
    /// Broadcast after history changes (push or back/forward).
    pub navigation_event: String,
    /// Broadcast when the location fragment changes.
    pub hash_event: String,
    /// Delay before reconnecting a failed live-update socket.
    ///
    /// Values below [`MIN_RECONNECT_BACKOFF`] are raised to it, so a refused
    /// connection never retries within the same instant.
    pub reconnect_backoff: Duration,
    /// Treatment of non-success statuses.
    pub status_policy: StatusPolicy,
    /// Treatment of scoped handlers during broadcasts.
    pub broadcast_scope: BroadcastScopePolicy,
    /// Bound on synchronously nested broadcasts (emit chains).
    pub max_broadcast_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            names: AttributeNames::default(),
            routed_events: ROUTED_EVENTS.iter().map(|&e| e.to_owned()).collect(),
            headers: HeaderNames::default(),
            notifications: NotificationNames::default(),
            navigation_event: "location:change".into(),
            hash_event: "hash:change".into(),
            reconnect_backoff: Duration::from_secs(1),
            status_policy: StatusPolicy::default(),
            broadcast_scope: BroadcastScopePolicy::default(),
            max_broadcast_depth: 32,
        }
    }
}

impl EngineConfig {
    /// Read attributes with a custom prefix, e.g. `"data-s"`.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.names = AttributeNames::with_prefix(prefix);
        self
    }

    /// Set the status policy.
    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    /// Set the socket reconnect delay, raised to at least [`MIN_RECONNECT_BACKOFF`].
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff.max(MIN_RECONNECT_BACKOFF);
        self
    }

    /// Set how scoped handlers take part in broadcasts.
    pub fn with_broadcast_scope(mut self, policy: BroadcastScopePolicy) -> Self {
        self.broadcast_scope = policy;
        self
    }

    /// Bound nested broadcasts.
    pub fn with_max_broadcast_depth(mut self, depth: usize) -> Self {
        self.max_broadcast_depth = depth;
        self
    }

    /// Route an additional targeted event type.
    pub fn with_routed_event(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.routes(&name) {
            self.routed_events.push(name);
        }
        self
    }

    /// Returns true if targeted host events named `name` reach the router.
    pub fn routes(&self, name: &str) -> bool {
        self.routed_events.iter().any(|e| e == name)
    }
}
