// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markup serialization.

use crate::document::Document;
use crate::types::{NodeId, is_void};

/// Append the markup for `id` and its subtree to `out`.
pub(crate) fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    if let Some(text) = doc.text(id) {
        escape_text(text, out);
        return;
    }
    let Some(element) = doc.element(id) else {
        return;
    };
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
    if is_void(&element.tag) {
        return;
    }
    if let Some(content) = &element.content {
        out.push_str(content);
    }
    for &child in doc.children_of(id) {
        write_node(doc, child, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn escapes_text_and_attributes() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.set_attribute(p, "title", "say \"hi\" & go").unwrap();
        doc.set_text_content(p, "1 < 2 & 3 > 2").unwrap();
        assert_eq!(
            doc.outer_html(p),
            "<p title=\"say &quot;hi&quot; &amp; go\">1 &lt; 2 &amp; 3 &gt; 2</p>"
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let mut doc = Document::new();
        let form = doc.create_element("form");
        let input = doc.create_element("input");
        doc.set_attribute(input, "name", "q").unwrap();
        doc.append_child(form, input).unwrap();
        assert_eq!(doc.outer_html(form), "<form><input name=\"q\"></form>");
    }
}
