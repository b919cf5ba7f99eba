// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine: owns the document and runs declared actions.
//!
//! ## Event loop
//!
//! The engine is single-threaded and cooperative. Host events enter through
//! [`Engine::dispatch`]; everything asynchronous (request completions, socket
//! messages, visibility changes, delayed emits, reconnects) is picked up by
//! [`Engine::run_until_idle`]. Time is virtual and moves only with
//! [`Engine::advance`].
//!
//! ## Executor order
//!
//! For every routed handler, in firing order:
//!
//! 1. confirmation (declining skips the rest of this handler),
//! 2. inline script,
//! 3. history push, then the navigation broadcast,
//! 4. emit, synchronous or scheduled,
//! 5. network request,
//! 6. template copy.
//!
//! Each step is independent; a failure is logged and the next step still runs.

use core::time::Duration;

use hashbrown::HashMap;
use kurbo::Rect;
use slim_dom::{Document, NodeId};
use slim_responder::dnd::apply_drag_bookkeeping;
use slim_responder::router::Router;
use slim_responder::types::{
    APPEAR, ActionConfig, DataTransfer, DispatchMode, ElementConfig, EmitSpec, Event, PendingMatch,
    SwapStrategy,
};
use url::Url;

use crate::bridge::{Connector, LiveBridge, NoConnector, SocketEvent, resolve_endpoint};
use crate::config::{EngineConfig, MIN_RECONNECT_BACKOFF};
use crate::error::{EngineError, SocketError, TransportError};
use crate::host::Host;
use crate::pipeline::{Directive, RequestResult, build_request, interpret_response, resolve_targets};
use crate::queue::{Scheduler, Task};
use crate::swap::{Rescan, swap};
use crate::transport::{RequestId, Response, Transport};
use crate::visibility::VisibilityObserver;

/// A lifecycle notification raised on the element whose request finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Notification name, e.g. `slim:ok`.
    pub name: String,
    /// Acting element.
    pub element: NodeId,
    /// Response status, when one was received.
    pub status: Option<u16>,
}

#[derive(Clone, Debug)]
struct InFlight {
    element: NodeId,
    target: Option<String>,
    swap: SwapStrategy,
}

/// Attribute-driven behavior engine.
///
/// ## Usage
///
/// - Build with [`Engine::new`] (or [`Engine::from_html`]) from a document, a [`Host`],
///   and a [`Transport`]. Add live updates with [`Engine::with_connector`].
/// - Call [`Engine::start`] once to register `appear` handlers and connect the bridge.
/// - Feed host events with [`Engine::dispatch`] and drive completions with
///   [`Engine::run_until_idle`] and [`Engine::advance`].
/// - Read lifecycle notifications with [`Engine::drain_notifications`].
pub struct Engine<H, T, C: Connector = NoConnector> {
    config: EngineConfig,
    router: Router,
    document: Document,
    host: H,
    transport: T,
    connector: C,
    bridge: LiveBridge<C::Socket>,
    observer: Option<VisibilityObserver>,
    scheduler: Scheduler,
    in_flight: HashMap<RequestId, InFlight>,
    next_request: u64,
    notifications: Vec<Notification>,
    viewport: Option<Rect>,
    depth: usize,
    drag: Option<DataTransfer>,
    started: bool,
}

impl<H, T, C: Connector> core::fmt::Debug for Engine<H, T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("document", &self.document)
            .field("bridge", &self.bridge)
            .field("in_flight", &self.in_flight.len())
            .field("timers", &self.scheduler.len())
            .field("now", &self.scheduler.now())
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

fn router_for(config: &EngineConfig) -> Router {
    let mut router = Router::with_names(config.names.clone());
    router.set_broadcast_scope(config.broadcast_scope);
    router
}

impl<H: Host, T: Transport> Engine<H, T> {
    /// Create an engine without live updates.
    pub fn new(document: Document, host: H, transport: T) -> Self {
        let config = EngineConfig::default();
        Self {
            router: router_for(&config),
            config,
            document,
            host,
            transport,
            connector: NoConnector,
            bridge: LiveBridge::new(),
            observer: None,
            scheduler: Scheduler::default(),
            in_flight: HashMap::new(),
            next_request: 0,
            notifications: Vec::new(),
            viewport: None,
            depth: 0,
            drag: None,
            started: false,
        }
    }

    /// Parse `html` and create an engine for it.
    pub fn from_html(html: &str, host: H, transport: T) -> Result<Self, EngineError> {
        Ok(Self::new(Document::parse(html)?, host, transport))
    }
}

impl<H: Host, T: Transport, C: Connector> Engine<H, T, C> {
    /// Use `connector` for live updates. Call before [`Engine::start`].
    pub fn with_connector<D: Connector>(mut self, connector: D) -> Engine<H, T, D> {
        self.bridge.close();
        let mut engine = Engine {
            config: self.config,
            router: self.router,
            document: self.document,
            host: self.host,
            transport: self.transport,
            connector,
            bridge: LiveBridge::new(),
            observer: self.observer,
            scheduler: self.scheduler,
            in_flight: self.in_flight,
            next_request: self.next_request,
            notifications: self.notifications,
            viewport: self.viewport,
            depth: 0,
            drag: self.drag,
            started: self.started,
        };
        if engine.started {
            engine.connect_bridge();
        }
        engine
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.router = router_for(&config);
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register `appear` handlers, connect live updates, and settle.
    ///
    /// Calling it again has no effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        tracing::info!("engine started");
        self.rescan(Rescan::Subtree(self.document.root()));
        self.connect_bridge();
        self.run_until_idle();
    }

    /// Close the socket and drop pending timers, requests, and observations.
    pub fn shutdown(&mut self) {
        self.bridge.close();
        self.scheduler.clear();
        self.in_flight.clear();
        self.observer = None;
        self.drag = None;
        self.started = false;
        tracing::info!("engine shut down");
    }

    /// Deliver a host event.
    ///
    /// Targeted events are routed only if their type is in
    /// [`EngineConfig::routed_events`] and their origin is alive. `submit`
    /// events are always claimed. Returns the event after routing, so hosts
    /// can read `default_prevented` and drag data.
    pub fn dispatch(&mut self, mut event: Event) -> Event {
        if let DispatchMode::Targeted { origin } = event.mode {
            if !self.config.routes(&event.name) {
                tracing::trace!(event = %event.name, "ignoring unrouted event");
                return event;
            }
            if !self.document.is_alive(origin) {
                tracing::debug!(event = %event.name, ?origin, "ignoring event on removed node");
                return event;
            }
            if event.name == "submit" {
                event.prevent_default();
            }
        }
        self.route(&mut event);
        event
    }

    /// Broadcast `name` to every handler listening for it.
    pub fn broadcast(&mut self, name: impl Into<String>) {
        let mut event = Event::broadcast(name);
        self.route(&mut event);
    }

    /// The host moved through history (back/forward).
    pub fn pop_state(&mut self) {
        self.broadcast(self.config.navigation_event.clone());
    }

    /// The location fragment changed.
    pub fn hash_change(&mut self) {
        self.broadcast(self.config.hash_event.clone());
    }

    /// Process request completions, socket messages, visibility changes, and
    /// due timers until nothing is left. Returns the number of items handled.
    pub fn run_until_idle(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let before = handled;
            while let Some((id, result)) = self.transport.poll() {
                self.complete(id, result);
                handled += 1;
            }
            handled += self.poll_bridge();
            handled += self.check_visibility();
            while let Some(task) = self.scheduler.pop_due() {
                self.run_task(task);
                handled += 1;
            }
            if handled == before {
                return handled;
            }
        }
    }

    /// Advance virtual time by `by`, firing timers as they fall due.
    pub fn advance(&mut self, by: Duration) {
        let target = self.scheduler.now() + by;
        while let Some(due) = self.scheduler.next_deadline().filter(|&due| due <= target) {
            self.scheduler.set_now(due);
            self.run_until_idle();
        }
        self.scheduler.set_now(target);
        self.run_until_idle();
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Due time of the next pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Set the viewport used for `appear` detection.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = Some(viewport);
    }

    /// Record the rendered bounds of an element.
    pub fn set_bounds(&mut self, id: NodeId, bounds: Option<Rect>) {
        self.document.set_bounds(id, bounds);
    }

    /// Register `appear` handlers in `root` and below, e.g. after the host edited the document.
    pub fn observe_appear(&mut self, root: NodeId) {
        self.rescan(Rescan::Subtree(root));
    }

    /// The visibility observer, once something has been observed.
    pub fn observer(&self) -> Option<&VisibilityObserver> {
        self.observer.as_ref()
    }

    /// Take the notifications raised so far.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        core::mem::take(&mut self.notifications)
    }

    /// Number of requests sent and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true if the live-update socket is open.
    pub fn is_live(&self) -> bool {
        self.bridge.is_open()
    }

    /// The document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access to the document.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The live-update connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Mutable access to the live-update connector.
    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    // --- routing ---

    fn route(&mut self, event: &mut Event) {
        if self.depth >= self.config.max_broadcast_depth {
            tracing::warn!(
                event = %event.name,
                depth = self.depth,
                "dropping event nested too deeply"
            );
            return;
        }
        if event.origin().is_some() {
            self.track_drag(event);
        }
        self.depth += 1;
        let matches = self.router.route(&self.document, event);
        for pending in matches {
            self.execute(pending, event);
        }
        self.depth -= 1;
    }

    fn track_drag(&mut self, event: &mut Event) {
        if matches!(event.name.as_str(), "dragover" | "dragleave" | "drop")
            && event.data_transfer.is_none()
        {
            event.data_transfer.clone_from(&self.drag);
        }
        apply_drag_bookkeeping(&mut self.document, self.router.names(), event);
        match event.name.as_str() {
            "dragstart" => self.drag.clone_from(&event.data_transfer),
            "drop" => self.drag = None,
            _ => {}
        }
    }

    fn execute(&mut self, pending: PendingMatch, event: &Event) {
        let PendingMatch {
            element, config, ..
        } = pending;
        if !self.document.is_alive(element) {
            tracing::debug!(?element, "skipping handler on removed element");
            return;
        }
        if let Some(message) = &config.confirm
            && !self.host.confirm(message)
        {
            tracing::debug!(?element, "action declined");
            return;
        }
        if let Some(code) = &config.eval
            && let Err(err) = self.host.eval(code, &self.document, element, event)
        {
            tracing::error!(?element, error = %err, "inline script failed");
        }
        if let Some(push) = &config.push {
            self.push_history(push);
        }
        if let Some(emit) = &config.emit {
            self.emit(element, emit);
        }
        if let Some(action) = &config.action {
            self.send(element, action, &config, event);
        }
        if let Some(template) = &config.template {
            self.copy_template(element, template, &config);
        }
    }

    fn push_history(&mut self, declared: &str) {
        match self.host.location().join(declared) {
            Ok(url) => {
                tracing::debug!(%url, "pushing history");
                self.host.push_state(&url);
                self.broadcast(self.config.navigation_event.clone());
            }
            Err(err) => tracing::warn!(url = declared, error = %err, "invalid push url"),
        }
    }

    fn emit(&mut self, origin: NodeId, emit: &EmitSpec) {
        if emit.delay_ms == 0 {
            self.broadcast(emit.event.clone());
        } else {
            self.scheduler.schedule(
                Duration::from_millis(emit.delay_ms),
                Task::Emit {
                    origin,
                    event: emit.event.clone(),
                },
            );
        }
    }

    fn copy_template(&mut self, element: NodeId, selector: &str, config: &ElementConfig) {
        let template = match self.document.query_selector(selector) {
            Ok(Some(template)) => template,
            Ok(None) => {
                tracing::warn!(selector, "template not found");
                return;
            }
            Err(err) => {
                tracing::warn!(selector, error = %err, "invalid template selector");
                return;
            }
        };
        let content = self.document.inner_html(template);
        let targets = resolve_targets(&self.document, element, config.target.as_deref());
        self.swap_into(&content, &targets, config.swap);
    }

    fn swap_into(&mut self, content: &str, targets: &[NodeId], strategy: SwapStrategy) {
        let outcome = swap(&mut self.document, content, targets, strategy);
        tracing::debug!(swapped = outcome.swapped.len(), ?strategy, "swapped content");
        for scope in outcome.rescan {
            self.rescan(scope);
        }
    }

    fn rescan(&mut self, scope: Rescan) {
        let (root, include_root) = match scope {
            Rescan::Descendants(root) => (root, false),
            Rescan::Subtree(root) => (root, true),
        };
        for (id, config) in self.router.candidates_within(&self.document, root) {
            if (include_root || id != root) && config.listens_for(APPEAR) {
                self.observer
                    .get_or_insert_with(VisibilityObserver::new)
                    .observe(id);
            }
        }
    }

    fn check_visibility(&mut self) -> usize {
        let (Some(viewport), Some(observer)) = (self.viewport, self.observer.as_mut()) else {
            return 0;
        };
        let visible = observer.take_intersecting(&self.document, viewport);
        for &id in &visible {
            tracing::debug!(element = ?id, "element appeared");
            self.dispatch(Event::appear(id));
        }
        visible.len()
    }

    // --- requests ---

    fn send(
        &mut self,
        element: NodeId,
        action: &ActionConfig,
        config: &ElementConfig,
        event: &Event,
    ) {
        let location = self.host.location();
        match build_request(&self.document, &self.config, element, action, event, &location) {
            Ok(request) => {
                self.next_request += 1;
                let id = RequestId(self.next_request);
                tracing::info!(?id, method = %request.method, url = %request.url, "sending request");
                self.in_flight.insert(
                    id,
                    InFlight {
                        element,
                        target: config.target.clone(),
                        swap: config.swap,
                    },
                );
                self.transport.send(id, request);
            }
            Err(err) => {
                tracing::error!(?element, error = %err, "failed to build request");
                self.notify(self.config.notifications.error.clone(), element, None);
                self.notify(self.config.notifications.done.clone(), element, None);
            }
        }
    }

    fn complete(&mut self, id: RequestId, result: Result<Response, TransportError>) {
        let Some(flight) = self.in_flight.remove(&id) else {
            tracing::warn!(?id, "completion for unknown request");
            return;
        };
        let interpreted = result.and_then(|response| {
            interpret_response(
                &self.document,
                &self.config,
                &response,
                flight.element,
                flight.target.as_deref(),
                flight.swap,
            )
        });
        let status = match interpreted {
            Ok(result) => {
                let status = result.status;
                tracing::debug!(?id, status, "request completed");
                self.apply(flight.element, result);
                self.notify(self.config.notifications.ok.clone(), flight.element, Some(status));
                Some(status)
            }
            Err(err) => {
                tracing::error!(?id, error = %err, "request failed");
                let status = match err {
                    TransportError::Status(status) => Some(status),
                    _ => None,
                };
                self.notify(self.config.notifications.error.clone(), flight.element, status);
                status
            }
        };
        self.notify(self.config.notifications.done.clone(), flight.element, status);
    }

    fn apply(&mut self, element: NodeId, result: RequestResult) {
        match result.directive {
            Some(Directive::Reload) => {
                tracing::info!("server requested reload");
                self.host.reload();
                return;
            }
            Some(Directive::Redirect(declared)) => {
                match self.host.location().join(&declared) {
                    Ok(url) => {
                        tracing::info!(%url, "server requested redirect");
                        self.host.assign(&url);
                    }
                    Err(err) => {
                        tracing::warn!(url = %declared, error = %err, "invalid redirect url");
                    }
                }
                return;
            }
            None => {}
        }

        if let Some(html) = &result.html {
            self.swap_into(html, &result.targets, result.swap);
        } else if let Some(text) = &result.text {
            let selector = result.target_selector.as_deref();
            for target in resolve_targets(&self.document, element, selector) {
                if let Err(err) = self.document.set_text_content(target, text) {
                    tracing::warn!(?target, error = %err, "failed to assign text");
                }
            }
        } else if let Some(event) = result.event {
            self.broadcast(event);
        }
        if let Some(push) = &result.push {
            self.push_history(push);
        }
    }

    fn notify(&mut self, name: String, element: NodeId, status: Option<u16>) {
        self.notifications.push(Notification {
            name: name.clone(),
            element,
            status,
        });
        if self.config.routes(&name) && self.document.is_alive(element) {
            let mut event = Event::targeted(name, element);
            event.bubbles = false;
            self.route(&mut event);
        }
    }

    // --- timers and live updates ---

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Emit { origin, event } => {
                if self.document.is_connected(origin) {
                    self.broadcast(event);
                } else {
                    tracing::debug!(%event, "dropping delayed emit from detached element");
                }
            }
            Task::Reconnect => self.connect_bridge(),
        }
    }

    fn connect_bridge(&mut self) {
        if self.bridge.endpoint().is_none() {
            let root = self.document.root();
            let names = self.router.names();
            let Some(declared) = names.value(&self.document, root, &names.ws) else {
                return;
            };
            match resolve_endpoint(&self.host.location(), declared) {
                Ok(url) => self.bridge.set_endpoint(url),
                Err(err) => {
                    tracing::warn!(error = %err, "live updates disabled");
                    return;
                }
            }
        }
        match self.bridge.connect(&mut self.connector) {
            Ok(()) => tracing::info!(
                endpoint = ?self.bridge.endpoint().map(Url::as_str),
                "live updates connected"
            ),
            Err(SocketError::Unsupported) => {
                tracing::warn!("live updates declared but no connector is configured");
            }
            Err(err) => {
                tracing::warn!(error = %err, "live update connection failed");
                self.schedule_reconnect();
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.scheduler.has(&Task::Reconnect) {
            return;
        }
        let backoff = self.config.reconnect_backoff.max(MIN_RECONNECT_BACKOFF);
        tracing::debug!(?backoff, "scheduling reconnect");
        self.scheduler.schedule(backoff, Task::Reconnect);
    }

    fn poll_bridge(&mut self) -> usize {
        let events = self.bridge.drain();
        let handled = events.len();
        for event in events {
            match event {
                SocketEvent::Message(name) if name.is_empty() => {
                    tracing::debug!("ignoring empty socket message");
                }
                SocketEvent::Message(name) => self.broadcast(name),
                SocketEvent::Error(err) => {
                    tracing::warn!(error = %err, "live update connection lost");
                    self.schedule_reconnect();
                }
                SocketEvent::Closed => tracing::info!("live update connection closed"),
            }
        }
        handled
    }
}
