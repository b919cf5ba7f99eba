// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markup parsing on top of `tl`.

use std::borrow::Cow;

use crate::document::Document;
use crate::error::DomError;
use crate::types::NodeId;

fn tokenize(html: &str) -> Result<tl::VDom<'_>, DomError> {
    tl::parse(html, tl::ParserOptions::default()).map_err(|e| DomError::Parse(format!("{e:?}")))
}

/// Parse a page into `doc`, adopting the `body` element when present.
pub(crate) fn build_document(doc: &mut Document, html: &str) -> Result<(), DomError> {
    let dom = tokenize(html)?;
    let parser = dom.parser();
    let root = doc.root();

    let top: Vec<tl::NodeHandle> = match find_body(dom.children(), parser) {
        Some(body) => {
            copy_attributes(doc, root, body)?;
            body.children().top().iter().copied().collect()
        }
        None => dom.children().to_vec(),
    };
    for handle in top {
        if let Some(id) = convert(doc, handle, parser)? {
            doc.append_child(root, id)?;
        }
    }
    Ok(())
}

/// Parse a fragment into detached nodes, returned in document order.
pub(crate) fn build_fragment(doc: &mut Document, html: &str) -> Result<Vec<NodeId>, DomError> {
    let dom = tokenize(html)?;
    let parser = dom.parser();
    let mut out = Vec::new();
    for handle in dom.children() {
        if let Some(id) = convert(doc, *handle, parser)? {
            out.push(id);
        }
    }
    Ok(out)
}

fn find_body<'p, 'a>(
    handles: &[tl::NodeHandle],
    parser: &'p tl::Parser<'a>,
) -> Option<&'p tl::HTMLTag<'a>> {
    for handle in handles {
        let Some(tl::Node::Tag(tag)) = handle.get(parser) else {
            continue;
        };
        if tag.name().as_utf8_str().eq_ignore_ascii_case("body") {
            return Some(tag);
        }
        let kids: Vec<tl::NodeHandle> = tag.children().top().iter().copied().collect();
        if let Some(body) = find_body(&kids, parser) {
            return Some(body);
        }
    }
    None
}

fn convert(
    doc: &mut Document,
    handle: tl::NodeHandle,
    parser: &tl::Parser<'_>,
) -> Result<Option<NodeId>, DomError> {
    let Some(node) = handle.get(parser) else {
        return Ok(None);
    };
    match node {
        tl::Node::Tag(tag) => {
            let name = tag.name().as_utf8_str().to_ascii_lowercase();
            // Doctype and processing instructions.
            if name.is_empty() || name.starts_with('!') || name.starts_with('?') {
                return Ok(None);
            }
            let element = doc.create_element(&name);
            copy_attributes(doc, element, tag)?;
            if name == "template" {
                doc.set_inner_html(element, &template_markup(tag, parser))?;
                return Ok(Some(element));
            }
            let kids: Vec<tl::NodeHandle> = tag.children().top().iter().copied().collect();
            for kid in kids {
                if let Some(child) = convert(doc, kid, parser)? {
                    doc.append_child(element, child)?;
                }
            }
            Ok(Some(element))
        }
        tl::Node::Raw(bytes) => {
            let raw = bytes.as_utf8_str();
            if raw.is_empty() {
                return Ok(None);
            }
            Ok(Some(doc.create_text(&decode_entities(&raw))))
        }
        tl::Node::Comment(_) => Ok(None),
    }
}

/// Copy attributes in source order.
///
/// `tl` stores attributes in a hash map, so the order is recovered from the
/// raw start tag.
fn copy_attributes(
    doc: &mut Document,
    element: NodeId,
    tag: &tl::HTMLTag<'_>,
) -> Result<(), DomError> {
    let raw = tag.raw().as_utf8_str();
    let (order, _) = scan_start_tag(&raw);
    let mut attrs: Vec<(String, String)> = tag
        .attributes()
        .iter()
        .map(|(key, value)| {
            let value = value.map(|v| decode_entities(&v).into_owned());
            (key.into_owned(), value.unwrap_or_default())
        })
        .collect();
    attrs.sort_by_key(|(key, _)| {
        order
            .iter()
            .position(|name| name.eq_ignore_ascii_case(key))
            .unwrap_or(usize::MAX)
    });
    for (key, value) in attrs {
        doc.set_attribute(element, &key, &value)?;
    }
    Ok(())
}

/// Source markup between a template's start and end tags.
fn template_markup<'a>(tag: &tl::HTMLTag<'a>, parser: &tl::Parser<'a>) -> String {
    const END: &str = "</template>";
    let raw = tag.raw().as_utf8_str();
    let (_, start) = scan_start_tag(&raw);
    let inner = raw.get(start..).unwrap_or_default();
    match inner
        .len()
        .checked_sub(END.len())
        .and_then(|split| Some((inner.get(..split)?, inner.get(split..)?)))
    {
        Some((content, end)) if end.eq_ignore_ascii_case(END) => content.to_owned(),
        // Unterminated template: fall back to the parsed children.
        _ => tag.inner_html(parser),
    }
}

/// Attribute names of a raw start tag in source order, and the byte length of the tag.
fn scan_start_tag(raw: &str) -> (Vec<&str>, usize) {
    let bytes = raw.as_bytes();
    let len = bytes.len();
    let is_space = |b: u8| b.is_ascii_whitespace();
    let mut names = Vec::new();

    let mut i = 1;
    while i < len && !is_space(bytes[i]) && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    loop {
        while i < len && (is_space(bytes[i]) || bytes[i] == b'/') {
            i += 1;
        }
        if i >= len {
            return (names, len);
        }
        if bytes[i] == b'>' {
            return (names, i + 1);
        }
        let start = i;
        while i < len && !is_space(bytes[i]) && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        if i == start {
            // Stray `=`.
            i += 1;
            continue;
        }
        names.push(&raw[start..i]);
        while i < len && is_space(bytes[i]) {
            i += 1;
        }
        if i < len && bytes[i] == b'=' {
            i += 1;
            while i < len && is_space(bytes[i]) {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    i += 1;
                    while i < len && bytes[i] != quote {
                        i += 1;
                    }
                    i = (i + 1).min(len);
                }
                _ => {
                    while i < len && !is_space(bytes[i]) && bytes[i] != b'>' {
                        i += 1;
                    }
                }
            }
        }
    }
}

/// Decode the character references that appear in hand-written markup.
pub(crate) fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_adopted() {
        let doc = Document::parse(
            r#"<!DOCTYPE html><html><head><title>x</title></head>
            <body s-ws="/live"><main id="app"><p class="note">hi</p></main></body></html>"#,
        )
        .unwrap();
        let root = doc.root();
        assert_eq!(doc.attribute(root, "s-ws"), Some("/live"));
        let main = doc.query_selector("#app").unwrap().unwrap();
        assert_eq!(doc.parent_of(main), Some(root));
        let p = doc.query_selector("p.note").unwrap().unwrap();
        assert_eq!(doc.text_content(p), "hi");
        assert!(doc.query_selector("title").unwrap().is_none(), "head is dropped");
    }

    #[test]
    fn bare_markup_lands_under_root() {
        let doc = Document::parse(r#"<button s-put="/increment">+</button><div id="result"></div>"#)
            .unwrap();
        let kids = doc.children_of(doc.root());
        assert_eq!(kids.len(), 2);
        assert_eq!(doc.tag_name(kids[0]), Some("button"));
        assert_eq!(doc.attribute(kids[0], "s-put"), Some("/increment"));
    }

    #[test]
    fn fragment_nodes_are_detached_and_ordered() {
        let mut doc = Document::new();
        let nodes = doc
            .parse_fragment("text <li>a</li><li>b</li><!-- note -->")
            .unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(doc.text(nodes[0]), Some("text "));
        assert_eq!(doc.text_content(nodes[2]), "b");
        assert!(nodes.iter().all(|&n| !doc.is_connected(n)));
    }

    #[test]
    fn void_inputs_do_not_swallow_siblings() {
        let doc =
            Document::parse(r#"<form><input name="a" value="1"><input name="b"></form>"#).unwrap();
        let form = doc.query_selector("form").unwrap().unwrap();
        assert_eq!(doc.children_of(form).len(), 2);
    }

    #[test]
    fn attributes_keep_source_order() {
        let html = r#"<li data-x="1" class="row" s-on="a > b" id="r" hidden>t</li>"#;
        let doc = Document::parse(html).unwrap();
        let li = doc.query_selector("#r").unwrap().unwrap();
        let names: Vec<&str> = doc.attributes(li).iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["data-x", "class", "s-on", "id", "hidden"]);
        assert_eq!(
            doc.outer_html(li),
            r#"<li data-x="1" class="row" s-on="a > b" id="r" hidden="">t</li>"#
        );
    }

    #[test]
    fn start_tag_scanning() {
        let raw = r#"<a href=/x title='a > b' b = "c>d">rest"#;
        let (names, end) = scan_start_tag(raw);
        assert_eq!(names, ["href", "title", "b"]);
        assert_eq!(&raw[end..], "rest");
        assert_eq!(scan_start_tag("<br/>"), (Vec::new(), 5));
    }

    #[test]
    fn template_content_stays_inert() {
        let doc = Document::parse(
            r#"<ul id="list"></ul><template id="tpl"><li class="row" s-get="/row" s-on="x">t</li></template>"#,
        )
        .unwrap();
        let tpl = doc.query_selector("#tpl").unwrap().unwrap();
        assert!(doc.children_of(tpl).is_empty());
        assert!(doc.query_selector("li").unwrap().is_none());
        assert_eq!(doc.elements().len(), 3);
        let markup = r#"<li class="row" s-get="/row" s-on="x">t</li>"#;
        assert_eq!(doc.template_content(tpl), Some(markup));
        assert_eq!(doc.inner_html(tpl), markup);
        assert_eq!(
            doc.outer_html(tpl),
            format!(r#"<template id="tpl">{markup}</template>"#)
        );
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;p&gt;"), "<p>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }
}
