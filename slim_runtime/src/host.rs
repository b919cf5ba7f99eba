// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host environment seam.
//!
//! The engine never touches a window, a history stack, or a script runtime
//! directly. Everything outside the document goes through [`Host`].

use std::collections::VecDeque;

use slim_dom::{Document, NodeId};
use slim_responder::types::Event;
use url::Url;

use crate::error::ScriptError;

/// Environment the engine runs in.
pub trait Host {
    /// Current location. Relative URLs resolve against it.
    fn location(&self) -> Url;

    /// Ask the user to confirm an action. Declining cancels the whole action.
    fn confirm(&mut self, message: &str) -> bool {
        let _ = message;
        true
    }

    /// Evaluate an inline script with the acting element and triggering event in scope.
    fn eval(
        &mut self,
        code: &str,
        document: &Document,
        element: NodeId,
        event: &Event,
    ) -> Result<(), ScriptError> {
        let _ = (code, document, element, event);
        Err(ScriptError::Unsupported)
    }

    /// Push a history entry and make it the current location.
    fn push_state(&mut self, url: &Url);

    /// Reload the whole page.
    fn reload(&mut self);

    /// Navigate away to `url`.
    fn assign(&mut self, url: &Url);
}

/// A script evaluation recorded by [`HeadlessHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// Script source.
    pub code: String,
    /// Acting element.
    pub element: NodeId,
    /// Name of the triggering event.
    pub event: String,
}

/// In-memory host that records every interaction.
#[derive(Clone, Debug)]
pub struct HeadlessHost {
    location: Url,
    /// History entries pushed, oldest first.
    pub history: Vec<Url>,
    /// Number of reloads requested.
    pub reloads: usize,
    /// Navigations requested with [`Host::assign`].
    pub navigations: Vec<Url>,
    /// Confirmation prompts shown, oldest first.
    pub prompts: Vec<String>,
    /// Scripts evaluated, oldest first.
    pub evaluations: Vec<Evaluation>,
    answers: VecDeque<bool>,
    failing_scripts: bool,
}

impl HeadlessHost {
    /// Create a host positioned at `location`.
    pub fn new(location: Url) -> Self {
        Self {
            location,
            history: Vec::new(),
            reloads: 0,
            navigations: Vec::new(),
            prompts: Vec::new(),
            evaluations: Vec::new(),
            answers: VecDeque::new(),
            failing_scripts: false,
        }
    }

    /// Queue the answer to the next confirmation prompt. Unqueued prompts are accepted.
    pub fn answer_next_confirm(&mut self, accept: bool) {
        self.answers.push_back(accept);
    }

    /// Make every subsequent script evaluation fail.
    pub fn fail_scripts(&mut self, fail: bool) {
        self.failing_scripts = fail;
    }

    /// Move to `url` without pushing history, as back/forward navigation does.
    pub fn set_location(&mut self, url: Url) {
        self.location = url;
    }
}

impl Host for HeadlessHost {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.prompts.push(message.to_owned());
        self.answers.pop_front().unwrap_or(true)
    }

    fn eval(
        &mut self,
        code: &str,
        _document: &Document,
        element: NodeId,
        event: &Event,
    ) -> Result<(), ScriptError> {
        self.evaluations.push(Evaluation {
            code: code.to_owned(),
            element,
            event: event.name.clone(),
        });
        if self.failing_scripts {
            return Err(ScriptError::Failed(code.to_owned()));
        }
        Ok(())
    }

    fn push_state(&mut self, url: &Url) {
        self.history.push(url.clone());
        self.location = url.clone();
    }

    fn reload(&mut self) {
        self.reloads += 1;
    }

    fn assign(&mut self, url: &Url) {
        self.navigations.push(url.clone());
        self.location = url.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HeadlessHost {
        HeadlessHost::new(Url::parse("http://localhost/app").unwrap())
    }

    #[test]
    fn confirm_answers_are_consumed_in_order() {
        let mut host = host();
        host.answer_next_confirm(false);
        assert!(!host.confirm("first"));
        assert!(host.confirm("second"));
        assert_eq!(host.prompts, ["first", "second"]);
    }

    #[test]
    fn push_state_moves_location() {
        let mut host = host();
        let next = Url::parse("http://localhost/next").unwrap();
        host.push_state(&next);
        assert_eq!(host.location(), next);
        assert_eq!(host.history, [next]);
    }

    #[test]
    fn scripts_can_fail() {
        let mut host = host();
        let doc = Document::new();
        let event = Event::broadcast("x");
        assert!(host.eval("ok()", &doc, doc.root(), &event).is_ok());
        host.fail_scripts(true);
        assert!(matches!(
            host.eval("boom()", &doc, doc.root(), &event),
            Err(ScriptError::Failed(_))
        ));
        assert_eq!(host.evaluations.len(), 2);
    }
}
