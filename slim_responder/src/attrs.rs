// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute reader: builds an [`ElementConfig`] from one element.

use slim_dom::{Document, NodeId};

use crate::trigger::{default_event_specs, parse_emit_spec, parse_event_specs};
use crate::types::{ActionConfig, ElementConfig, Method, SwapStrategy};

/// Declarative attribute names derived from a prefix.
///
/// The default prefix is `s`, giving `s-on`, `s-get`, `s-target`, and so on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeNames {
    /// Trigger list.
    pub on: String,
    /// `GET` action URL.
    pub get: String,
    /// `POST` action URL.
    pub post: String,
    /// `PUT` action URL.
    pub put: String,
    /// `DELETE` action URL.
    pub delete: String,
    /// Target selector.
    pub target: String,
    /// Swap strategy.
    pub swap: String,
    /// Ambient query fragment.
    pub query: String,
    /// Follow-on event.
    pub emit: String,
    /// Inline script.
    pub eval: String,
    /// Template selector.
    pub template: String,
    /// History push URL.
    pub push: String,
    /// Confirmation prompt.
    pub confirm: String,
    /// JSON payload attached on drag start.
    pub drag_json: String,
    /// Allowed drag effect.
    pub drag_effect: String,
    /// Class toggled while a drag hovers a drop target.
    pub drop_class: String,
    /// Drop effect a drop target accepts.
    pub drop_effect: String,
    /// Live-update socket endpoint, read from the root only.
    pub ws: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self::with_prefix("s")
    }
}

impl AttributeNames {
    /// Names for `prefix`, e.g. `"s"` or `"data-s"`.
    pub fn with_prefix(prefix: &str) -> Self {
        let name = |suffix: &str| format!("{prefix}-{suffix}");
        Self {
            on: name("on"),
            get: name("get"),
            post: name("post"),
            put: name("put"),
            delete: name("delete"),
            target: name("target"),
            swap: name("swap"),
            query: name("query"),
            emit: name("emit"),
            eval: name("eval"),
            template: name("template"),
            push: name("push"),
            confirm: name("confirm"),
            drag_json: name("drag-json"),
            drag_effect: name("drag-effect"),
            drop_class: name("drop-class"),
            drop_effect: name("drop-effect"),
            ws: name("ws"),
        }
    }

    /// Attribute carrying the URL for `method`.
    pub fn action(&self, method: Method) -> &str {
        match method {
            Method::Get => &self.get,
            Method::Post => &self.post,
            Method::Put => &self.put,
            Method::Delete => &self.delete,
        }
    }

    /// Non-empty value of `name` on `id`.
    pub fn value<'d>(&self, doc: &'d Document, id: NodeId, name: &str) -> Option<&'d str> {
        doc.attribute(id, name).filter(|v| !v.trim().is_empty())
    }

    /// Read everything `id` declares. Returns `None` for stale ids and text nodes.
    pub fn read_element(&self, doc: &Document, id: NodeId) -> Option<ElementConfig> {
        let tag = doc.tag_name(id)?;
        let get = |name: &str| self.value(doc, id, name).map(str::to_owned);

        let triggers = match self.value(doc, id, &self.on) {
            Some(declared) => parse_event_specs(declared),
            None => default_event_specs(tag),
        };
        let action = Method::ALL.into_iter().find_map(|method| {
            self.value(doc, id, self.action(method))
                .map(|url| ActionConfig {
                    url: url.trim().to_owned(),
                    method,
                })
        });

        Some(ElementConfig {
            triggers,
            action,
            emit: self.value(doc, id, &self.emit).and_then(parse_emit_spec),
            eval: get(&self.eval),
            template: get(&self.template),
            push: get(&self.push),
            target: get(&self.target),
            swap: SwapStrategy::from_attr(doc.attribute(id, &self.swap)),
            confirm: get(&self.confirm),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capabilities, EmitSpec, EventSpec};

    fn first(doc: &Document) -> NodeId {
        doc.children_of(doc.root())[0]
    }

    #[test]
    fn full_declaration() {
        let doc = Document::parse(
            r##"<button s-put="/increment" s-target="#result" s-swap="outer"
                s-emit="counted after 1s" s-confirm="Sure?" s-on="click | dblclick on .x">+</button>"##,
        )
        .unwrap();
        let config = AttributeNames::default()
            .read_element(&doc, first(&doc))
            .unwrap();
        assert_eq!(
            config.action,
            Some(ActionConfig {
                url: "/increment".into(),
                method: Method::Put
            })
        );
        assert_eq!(config.target.as_deref(), Some("#result"));
        assert_eq!(config.swap, SwapStrategy::Outer);
        assert_eq!(
            config.emit,
            Some(EmitSpec {
                event: "counted".into(),
                delay_ms: 1000
            })
        );
        assert_eq!(config.confirm.as_deref(), Some("Sure?"));
        assert_eq!(
            config.triggers.as_slice(),
            &[EventSpec::local("click"), EventSpec::scoped("dblclick", ".x")]
        );
        assert_eq!(
            config.capabilities(),
            Capabilities::ACTION | Capabilities::EMIT
        );
    }

    #[test]
    fn action_precedence_is_get_post_put_delete() {
        let doc =
            Document::parse(r#"<div s-delete="/d" s-post="/p" s-put="/u"></div>"#).unwrap();
        let config = AttributeNames::default()
            .read_element(&doc, first(&doc))
            .unwrap();
        assert_eq!(config.action.map(|a| a.method), Some(Method::Post));
    }

    #[test]
    fn empty_values_are_absent() {
        let doc = Document::parse(r#"<form s-get="" s-on=" " s-push=""></form>"#).unwrap();
        let config = AttributeNames::default()
            .read_element(&doc, first(&doc))
            .unwrap();
        assert!(!config.is_candidate());
        assert_eq!(config.triggers.as_slice(), &[EventSpec::local("submit")]);
    }

    #[test]
    fn custom_prefix() {
        let doc = Document::parse(r#"<a data-s-push="/next" data-s-on="click">go</a>"#).unwrap();
        let names = AttributeNames::with_prefix("data-s");
        let config = names.read_element(&doc, first(&doc)).unwrap();
        assert_eq!(config.push.as_deref(), Some("/next"));
        assert!(config.listens_for("click"));
        assert!(AttributeNames::default()
            .read_element(&doc, first(&doc))
            .is_some_and(|c| !c.is_candidate()));
    }

    #[test]
    fn text_nodes_have_no_config() {
        let doc = Document::parse("just text").unwrap();
        assert_eq!(AttributeNames::default().read_element(&doc, first(&doc)), None);
    }
}
