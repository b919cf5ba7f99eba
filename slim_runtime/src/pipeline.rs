// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Request construction and response interpretation.
//!
//! ## Requests
//!
//! - The action URL resolves against the current location.
//! - Ambient query parameters are collected root → element with last-write-wins,
//!   then override same-named parameters already on the URL.
//! - Forms serialize their controls: appended to the query for `GET`, sent as
//!   multipart fields otherwise.
//! - Other elements send the drag payload, if the triggering event carries one, as JSON.
//! - Every request carries the current location in a header.
//!
//! ## Responses
//!
//! Headers are checked in a fixed order: refresh, redirect, status, target,
//! swap, emit, push. The body is classified by media type.

use indexmap::IndexMap;
use slim_dom::{Document, NodeId};
use slim_responder::attrs::AttributeNames;
use slim_responder::dnd::DRAG_MEDIA_TYPE;
use slim_responder::types::{ActionConfig, Event, Method, SwapStrategy};
use url::{Url, form_urlencoded};

use crate::config::{EngineConfig, StatusPolicy};
use crate::error::{EngineError, TransportError};
use crate::transport::{Body, Headers, Request, Response};

/// Ordered query parameters with unique keys.
pub type QueryParams = IndexMap<String, String>;

/// Collect the ambient query for `element`.
///
/// Query fragments declared on the root down to the element are merged so the
/// nearest declaration wins. For elements other than forms, named form
/// controls inside the element contribute their values (first in document
/// order wins), followed by the element's own value when it is a named control.
pub fn collect_query(doc: &Document, names: &AttributeNames, element: NodeId) -> QueryParams {
    let mut params = QueryParams::new();
    let mut path: Vec<NodeId> = core::iter::once(element)
        .chain(doc.ancestors(element))
        .collect();
    path.reverse();
    for node in path {
        let Some(fragment) = names.value(doc, node, &names.query) else {
            continue;
        };
        let fragment = fragment.trim().trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
    }

    if doc.tag_name(element) != Some("form") {
        for field in doc.descendant_elements(element).into_iter().rev() {
            if let Some((key, value)) = named_field_value(doc, field) {
                params.insert(key, value);
            }
        }
        if let Some((key, value)) = named_field_value(doc, element) {
            params.insert(key, value);
        }
    }
    params
}

/// Set `params` on `url`, replacing parameters of the same name.
pub fn merge_query(url: &mut Url, params: &QueryParams) {
    if params.is_empty() {
        return;
    }
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (key, value) in params {
        match pairs.iter().position(|(k, _)| k == key) {
            Some(first) => {
                pairs[first].1.clone_from(value);
                let mut index = 0;
                pairs.retain(|(k, _)| {
                    let keep = k != key || index == first;
                    index += 1;
                    keep
                });
            }
            None => pairs.push((key.clone(), value.clone())),
        }
    }
    url.query_pairs_mut().clear().extend_pairs(&pairs);
}

/// Serialize the controls of `form` in document order.
///
/// Controls need a name and must not be disabled. Checkboxes and radios count
/// only when checked. Buttons and file inputs are omitted; a headless document
/// has no file contents to send.
pub fn serialize_form(doc: &Document, form: NodeId) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for control in doc.descendant_elements(form) {
        let Some(name) = doc.attribute(control, "name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if is_disabled(doc, control, form) {
            continue;
        }
        match doc.tag_name(control) {
            Some("select") => {
                for value in selected_values(doc, control) {
                    fields.push((name.to_owned(), value));
                }
            }
            Some("input" | "textarea") => {
                if let Some(value) = field_value(doc, control) {
                    fields.push((name.to_owned(), value));
                }
            }
            _ => {}
        }
    }
    fields
}

/// Current value of a form control, or `None` when it contributes nothing.
pub fn field_value(doc: &Document, control: NodeId) -> Option<String> {
    match doc.tag_name(control)? {
        "input" => {
            let kind = doc
                .attribute(control, "type")
                .unwrap_or("text")
                .to_ascii_lowercase();
            match kind.as_str() {
                "checkbox" | "radio" => doc
                    .has_attribute(control, "checked")
                    .then(|| doc.attribute(control, "value").unwrap_or("on").to_owned()),
                "file" | "submit" | "button" | "reset" | "image" => None,
                _ => Some(doc.attribute(control, "value").unwrap_or_default().to_owned()),
            }
        }
        "select" => selected_values(doc, control).into_iter().next(),
        "textarea" => Some(doc.text_content(control)),
        _ => None,
    }
}

fn named_field_value(doc: &Document, control: NodeId) -> Option<(String, String)> {
    let key = ["name", "id"]
        .into_iter()
        .find_map(|attr| doc.attribute(control, attr).filter(|k| !k.is_empty()))?;
    let value = field_value(doc, control).filter(|v| !v.is_empty())?;
    Some((key.to_owned(), value))
}

fn selected_values(doc: &Document, select: NodeId) -> Vec<String> {
    let options: Vec<NodeId> = doc
        .descendant_elements(select)
        .into_iter()
        .filter(|&o| doc.tag_name(o) == Some("option") && !doc.has_attribute(o, "disabled"))
        .collect();
    let option_value = |o: NodeId| {
        doc.attribute(o, "value")
            .map(str::to_owned)
            .unwrap_or_else(|| doc.text_content(o).trim().to_owned())
    };
    let selected: Vec<String> = options
        .iter()
        .copied()
        .filter(|&o| doc.has_attribute(o, "selected"))
        .map(option_value)
        .collect();
    if !selected.is_empty() || doc.has_attribute(select, "multiple") {
        return selected;
    }
    options.first().copied().map(option_value).into_iter().collect()
}

fn is_disabled(doc: &Document, control: NodeId, form: NodeId) -> bool {
    doc.has_attribute(control, "disabled")
        || doc
            .ancestors(control)
            .take_while(|&a| a != form)
            .any(|a| doc.tag_name(a) == Some("fieldset") && doc.has_attribute(a, "disabled"))
}

/// Build the request for `action` declared on `element`.
pub fn build_request(
    doc: &Document,
    config: &EngineConfig,
    element: NodeId,
    action: &ActionConfig,
    event: &Event,
    location: &Url,
) -> Result<Request, EngineError> {
    let mut url = location.join(&action.url).map_err(|source| EngineError::Url {
        url: action.url.clone(),
        source,
    })?;
    merge_query(&mut url, &collect_query(doc, &config.names, element));

    let mut headers = Headers::new();
    headers.insert(&config.headers.location, location.as_str());

    let body = if doc.tag_name(element) == Some("form") {
        let fields = serialize_form(doc, element);
        if action.method == Method::Get {
            if !fields.is_empty() {
                url.query_pairs_mut().extend_pairs(&fields);
            }
            Body::Empty
        } else {
            Body::Multipart(fields)
        }
    } else {
        match event
            .data_transfer
            .as_ref()
            .and_then(|t| t.get_data(DRAG_MEDIA_TYPE))
            .filter(|json| !json.is_empty())
        {
            Some(json) => {
                headers.insert("Content-Type", DRAG_MEDIA_TYPE);
                Body::Json(json.to_owned())
            }
            None => Body::Empty,
        }
    };

    Ok(Request {
        method: action.method,
        url,
        headers,
        body,
    })
}

/// Navigation requested by the server instead of content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Reload the whole page.
    Reload,
    /// Navigate to this URL, possibly relative.
    Redirect(String),
}

/// Outcome of interpreting one response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestResult {
    /// Response status.
    pub status: u16,
    /// Navigation that replaces content processing.
    pub directive: Option<Directive>,
    /// Markup to swap into [`RequestResult::targets`].
    pub html: Option<String>,
    /// Plain text assigned to targets resolved when it is applied.
    pub text: Option<String>,
    /// Event to broadcast after the response is applied.
    pub event: Option<String>,
    /// Swap targets, resolved when the response arrived. Only set for markup.
    pub targets: Vec<NodeId>,
    /// Target selector after the server override; `None` targets the element.
    pub target_selector: Option<String>,
    /// Swap strategy after the server override.
    pub swap: SwapStrategy,
    /// URL to push onto history.
    pub push: Option<String>,
}

/// Interpret `response` for the request sent by `element`.
///
/// A refresh or redirect short-circuits with an otherwise empty result.
/// With [`StatusPolicy::Reject`], statuses outside `200..300` fail.
pub fn interpret_response(
    doc: &Document,
    config: &EngineConfig,
    response: &Response,
    element: NodeId,
    declared_target: Option<&str>,
    declared_swap: SwapStrategy,
) -> Result<RequestResult, TransportError> {
    let names = &config.headers;
    let header = |name: &str| {
        response
            .headers
            .get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let mut result = RequestResult {
        status: response.status,
        swap: declared_swap,
        ..RequestResult::default()
    };

    if header(&names.refresh) == Some("true") {
        result.directive = Some(Directive::Reload);
        return Ok(result);
    }
    if let Some(location) = header(&names.redirect) {
        result.directive = Some(Directive::Redirect(location.to_owned()));
        return Ok(result);
    }
    if config.status_policy == StatusPolicy::Reject && !response.is_success() {
        return Err(TransportError::Status(response.status));
    }

    result.target_selector = header(&names.target)
        .or(declared_target)
        .map(str::to_owned);
    if header(&names.swap).is_some_and(|v| v.eq_ignore_ascii_case("outer")) {
        result.swap = SwapStrategy::Outer;
    }
    result.event = header(&names.emit).map(str::to_owned);
    result.push = header(&names.push).map(str::to_owned);

    match media_type(&response.headers).as_deref() {
        Some("text/html") => {
            result.targets = resolve_targets(doc, element, result.target_selector.as_deref());
            result.html = Some(response.body.clone());
        }
        Some("text/plain") => result.text = Some(response.body.clone()),
        _ => {}
    }
    Ok(result)
}

/// Media type of a response: the `Content-Type` value before any parameters, lowercased.
pub fn media_type(headers: &Headers) -> Option<String> {
    let value = headers.get("Content-Type")?;
    let media = value.split(';').next().unwrap_or_default().trim();
    (!media.is_empty()).then(|| media.to_ascii_lowercase())
}

/// Elements a result applies to.
///
/// No selector targets `element` itself; otherwise every connected match in
/// document order. An unsupported selector yields nothing.
pub fn resolve_targets(doc: &Document, element: NodeId, selector: Option<&str>) -> Vec<NodeId> {
    match selector {
        None => doc.is_alive(element).then_some(element).into_iter().collect(),
        Some(selector) => doc.query_selector_all(selector).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "target selector matched nothing");
            Vec::new()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slim_responder::types::DataTransfer;

    fn by_id(doc: &Document, id: &str) -> NodeId {
        doc.query_selector(&format!("#{id}")).unwrap().unwrap()
    }

    fn location() -> Url {
        Url::parse("http://localhost:8000/app/page").unwrap()
    }

    fn action(method: Method, url: &str) -> ActionConfig {
        ActionConfig {
            url: url.into(),
            method,
        }
    }

    #[test]
    fn nearest_query_declaration_wins() {
        let doc = Document::parse(
            r#"<section s-query="a=1&b=x"><button id="b" s-get="/q" s-query="a=2">go</button></section>"#,
        )
        .unwrap();
        let params = collect_query(&doc, &AttributeNames::default(), by_id(&doc, "b"));
        assert_eq!(params.get("a").map(String::as_str), Some("2"));
        assert_eq!(params.get("b").map(String::as_str), Some("x"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn field_values_join_the_query() {
        let doc = Document::parse(
            r#"<div id="filters" s-get="/search" s-query="page=1">
                 <input name="q" value="apples">
                 <input id="lang" value="en">
                 <input name="q" value="pears">
                 <input name="empty" value="">
                 <input type="checkbox" name="fresh">
                 <select name="sort"><option value="asc">Up</option><option value="desc" selected>Down</option></select>
               </div>"#,
        )
        .unwrap();
        let params = collect_query(&doc, &AttributeNames::default(), by_id(&doc, "filters"));
        let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            [("page", "1"), ("sort", "desc"), ("q", "apples"), ("lang", "en")]
        );
    }

    #[test]
    fn own_value_of_named_control() {
        let doc = Document::parse(r#"<input id="q" name="term" value="rust" s-get="/search" s-on="input">"#)
            .unwrap();
        let params = collect_query(&doc, &AttributeNames::default(), by_id(&doc, "q"));
        assert_eq!(params.get("term").map(String::as_str), Some("rust"));
    }

    #[test]
    fn ambient_overrides_url_parameters() {
        let mut url = Url::parse("http://h/list?a=1&keep=y&a=3").unwrap();
        let mut params = QueryParams::new();
        params.insert("a".into(), "2".into());
        params.insert("new".into(), "z".into());
        merge_query(&mut url, &params);
        assert_eq!(url.query(), Some("a=2&keep=y&new=z"));

        let mut untouched = Url::parse("http://h/list").unwrap();
        merge_query(&mut untouched, &QueryParams::new());
        assert_eq!(untouched.query(), None);
    }

    #[test]
    fn form_serialization_rules() {
        let doc = Document::parse(
            r#"<form id="f" s-post="/save">
                 <input name="title" value="Milk">
                 <input name="done" type="checkbox" checked>
                 <input name="skip" type="checkbox">
                 <input name="size" type="radio" value="s">
                 <input name="size" type="radio" value="l" checked>
                 <input name="off" value="x" disabled>
                 <fieldset disabled><input name="fenced" value="y"></fieldset>
                 <input name="upload" type="file">
                 <textarea name="notes">two
lines</textarea>
                 <input value="anonymous">
                 <button name="go" value="1">Save</button>
               </form>"#,
        )
        .unwrap();
        let fields = serialize_form(&doc, by_id(&doc, "f"));
        let fields: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            fields,
            [
                ("title", "Milk"),
                ("done", "on"),
                ("size", "l"),
                ("notes", "two\nlines"),
            ]
        );
    }

    #[test]
    fn get_forms_append_fields() {
        let doc = Document::parse(
            r#"<div s-query="tab=all"><form id="f" s-get="/search?tab=x">
                 <input name="q" value="a b">
                 <input name="q" value="c">
               </form></div>"#,
        )
        .unwrap();
        let f = by_id(&doc, "f");
        let request = build_request(
            &doc,
            &EngineConfig::default(),
            f,
            &action(Method::Get, "/search?tab=x"),
            &Event::targeted("submit", f),
            &location(),
        )
        .unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:8000/search?tab=all&q=a+b&q=c");
        assert_eq!(request.body, Body::Empty);
        assert_eq!(
            request.headers.get("s-location"),
            Some("http://localhost:8000/app/page")
        );
    }

    #[test]
    fn other_methods_send_multipart() {
        let doc =
            Document::parse(r#"<form id="f" s-post="items"><input name="title" value="Eggs"></form>"#)
                .unwrap();
        let f = by_id(&doc, "f");
        let request = build_request(
            &doc,
            &EngineConfig::default(),
            f,
            &action(Method::Post, "items"),
            &Event::targeted("submit", f),
            &location(),
        )
        .unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:8000/app/items");
        assert_eq!(
            request.body,
            Body::Multipart(vec![("title".into(), "Eggs".into())])
        );
    }

    #[test]
    fn drag_payload_becomes_json_body() {
        let doc = Document::parse(r#"<ul id="lane" s-post="/move" s-on="drop"></ul>"#).unwrap();
        let lane = by_id(&doc, "lane");
        let mut transfer = DataTransfer::new();
        transfer.set_data(DRAG_MEDIA_TYPE, r#"{"id":7}"#);
        let event = Event::targeted("drop", lane).with_data_transfer(transfer);
        let request = build_request(
            &doc,
            &EngineConfig::default(),
            lane,
            &action(Method::Post, "/move"),
            &event,
            &location(),
        )
        .unwrap();
        assert_eq!(request.body, Body::Json(r#"{"id":7}"#.into()));
        assert_eq!(request.headers.get("content-type"), Some("application/json"));

        let plain = build_request(
            &doc,
            &EngineConfig::default(),
            lane,
            &action(Method::Post, "/move"),
            &Event::targeted("drop", lane),
            &location(),
        )
        .unwrap();
        assert_eq!(plain.body, Body::Empty);
    }

    #[test]
    fn unresolvable_action_url() {
        let doc = Document::parse(r#"<button id="b" s-get="http://[::1">x</button>"#).unwrap();
        let b = by_id(&doc, "b");
        let err = build_request(
            &doc,
            &EngineConfig::default(),
            b,
            &action(Method::Get, "http://[::1"),
            &Event::targeted("click", b),
            &location(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Url { .. }));
    }

    fn counter_doc() -> (Document, NodeId) {
        let doc = Document::parse(
            r##"<button id="b" s-put="/increment" s-target="#result">+</button>
                <div id="result">Counter: 0</div><div class="alt"></div><div class="alt"></div>"##,
        )
        .unwrap();
        let b = by_id(&doc, "b");
        (doc, b)
    }

    #[test]
    fn refresh_short_circuits() {
        let (doc, b) = counter_doc();
        let response = Response::html("<p>ignored</p>")
            .with_header("S-Refresh", "true")
            .with_header("S-Redirect", "/elsewhere");
        let result = interpret_response(
            &doc,
            &EngineConfig::default(),
            &response,
            b,
            Some("#result"),
            SwapStrategy::Inner,
        )
        .unwrap();
        assert_eq!(result.directive, Some(Directive::Reload));
        assert!(result.html.is_none());
        assert!(result.targets.is_empty());
    }

    #[test]
    fn redirect_short_circuits() {
        let (doc, b) = counter_doc();
        let response = Response::html("<p>ignored</p>").with_header("s-redirect", "/login");
        let result = interpret_response(
            &doc,
            &EngineConfig::default(),
            &response,
            b,
            None,
            SwapStrategy::Inner,
        )
        .unwrap();
        assert_eq!(result.directive, Some(Directive::Redirect("/login".into())));
        assert!(result.html.is_none());
    }

    #[test]
    fn status_policy() {
        let (doc, b) = counter_doc();
        let response = Response::html("<p>oops</p>").with_header("S-Emit", "x");
        let response = Response {
            status: 500,
            ..response
        };
        let resolved = interpret_response(
            &doc,
            &EngineConfig::default(),
            &response,
            b,
            None,
            SwapStrategy::Inner,
        )
        .unwrap();
        assert_eq!(resolved.status, 500);
        assert_eq!(resolved.html.as_deref(), Some("<p>oops</p>"));

        let rejecting = EngineConfig::default().with_status_policy(StatusPolicy::Reject);
        let rejected =
            interpret_response(&doc, &rejecting, &response, b, None, SwapStrategy::Inner);
        assert!(matches!(rejected, Err(TransportError::Status(500))));
    }

    #[test]
    fn server_overrides_target_and_swap() {
        let (doc, b) = counter_doc();
        let response = Response::html("<p>x</p>")
            .with_header("S-Target", ".alt")
            .with_header("S-Swap", "outer")
            .with_header("S-Emit", "items:updated")
            .with_header("S-Push", "/items");
        let result = interpret_response(
            &doc,
            &EngineConfig::default(),
            &response,
            b,
            Some("#result"),
            SwapStrategy::Inner,
        )
        .unwrap();
        assert_eq!(result.targets.len(), 2);
        assert_eq!(result.swap, SwapStrategy::Outer);
        assert_eq!(result.event.as_deref(), Some("items:updated"));
        assert_eq!(result.push.as_deref(), Some("/items"));
    }

    #[test]
    fn media_type_classification() {
        let (doc, b) = counter_doc();
        let interpret = |response: Response| {
            interpret_response(
                &doc,
                &EngineConfig::default(),
                &response,
                b,
                Some("#result"),
                SwapStrategy::Inner,
            )
            .unwrap()
        };

        let html = interpret(Response::html("Counter: 1"));
        assert_eq!(html.targets, [by_id(&doc, "result")]);
        assert_eq!(html.html.as_deref(), Some("Counter: 1"));

        let text = interpret(Response::text("<b>literal</b>"));
        assert_eq!(text.text.as_deref(), Some("<b>literal</b>"));
        assert!(text.targets.is_empty());
        assert_eq!(text.target_selector.as_deref(), Some("#result"));

        let json = interpret(
            Response::new(200)
                .with_header("Content-Type", "application/json")
                .with_body("{}"),
        );
        assert!(json.html.is_none() && json.text.is_none() && json.targets.is_empty());

        let bare = interpret(Response::new(204));
        assert!(bare.html.is_none() && bare.text.is_none());
    }

    #[test]
    fn media_type_parsing() {
        let mut headers = Headers::new();
        assert_eq!(media_type(&headers), None);
        headers.insert("content-type", " Text/HTML ; charset=utf-8");
        assert_eq!(media_type(&headers).as_deref(), Some("text/html"));
    }

    #[test]
    fn targets_default_to_element() {
        let (doc, b) = counter_doc();
        assert_eq!(resolve_targets(&doc, b, None), [b]);
        assert!(resolve_targets(&doc, b, Some("#missing")).is_empty());
        assert!(resolve_targets(&doc, b, Some("div:hover")).is_empty());
    }

    proptest! {
        #[test]
        fn merging_twice_changes_nothing(
            base in proptest::collection::vec(("[a-c]{1,2}", "[a-z0-9]{0,3}"), 0..6),
            extra in proptest::collection::vec(("[a-c]{1,2}", "[a-z0-9]{0,3}"), 0..6),
        ) {
            let mut url = location();
            url.query_pairs_mut().extend_pairs(&base);
            let params: QueryParams = extra.into_iter().collect();

            merge_query(&mut url, &params);
            let once = url.clone();
            merge_query(&mut url, &params);
            prop_assert_eq!(url.as_str(), once.as_str());

            let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            for (key, value) in &params {
                let hits: Vec<_> = pairs.iter().filter(|(k, _)| k == key).collect();
                prop_assert_eq!(hits.len(), 1);
                prop_assert_eq!(&hits[0].1, value);
            }
        }
    }
}
