// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSS selector subset.
//!
//! Supported:
//! - Selector lists separated by `,`.
//! - Combinators: descendant (whitespace), child `>`, adjacent sibling `+`, general sibling `~`.
//! - Compound steps of `tag`, `*`, `#id`, `.class`, and attribute conditions
//!   `[a]`, `[a=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`, `[a~=v]`, `[a|=v]` with optional quotes.
//!
//! Pseudo-classes are rejected with [`SelectorError`].

use crate::document::Document;
use crate::error::SelectorError;
use crate::types::NodeId;

/// A parsed selector list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Vec<SelectorPart>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Contains { key: String, value: String },
    Includes { key: String, value: String },
    DashMatch { key: String, value: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SelectorStep {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SelectorPart {
    step: SelectorStep,
    // Relation to the previous (left) part.
    combinator: Option<Combinator>,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let groups = split_groups(selector)?
            .iter()
            .map(|g| parse_chain(g))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    /// Returns true if the element matches any selector in the list.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        doc.is_element(id)
            && self
                .groups
                .iter()
                .any(|parts| matches_chain(doc, id, parts, parts.len() - 1))
    }
}

impl core::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn unsupported(s: &str) -> SelectorError {
    SelectorError(s.to_owned())
}

/// Match `parts[..=idx]` with `parts[idx]` anchored at `node`, backtracking over
/// alternative ancestors and siblings.
fn matches_chain(doc: &Document, node: NodeId, parts: &[SelectorPart], idx: usize) -> bool {
    if !matches_step(doc, node, &parts[idx].step) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match parts[idx].combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => doc
            .parent_of(node)
            .is_some_and(|p| matches_chain(doc, p, parts, idx - 1)),
        Combinator::Descendant => doc
            .ancestors(node)
            .any(|a| matches_chain(doc, a, parts, idx - 1)),
        Combinator::AdjacentSibling => doc
            .previous_element_sibling(node)
            .is_some_and(|s| matches_chain(doc, s, parts, idx - 1)),
        Combinator::GeneralSibling => {
            core::iter::successors(doc.previous_element_sibling(node), |&s| {
                doc.previous_element_sibling(s)
            })
            .any(|s| matches_chain(doc, s, parts, idx - 1))
        }
    }
}

fn matches_step(doc: &Document, node: NodeId, step: &SelectorStep) -> bool {
    let Some(tag) = doc.tag_name(node) else {
        return false;
    };
    if let Some(want) = &step.tag
        && !tag.eq_ignore_ascii_case(want)
    {
        return false;
    }
    if let Some(id) = &step.id
        && doc.attribute(node, "id") != Some(id.as_str())
    {
        return false;
    }
    if !step.classes.iter().all(|c| doc.has_class(node, c)) {
        return false;
    }
    step.attrs.iter().all(|cond| match cond {
        AttrCondition::Exists { key } => doc.has_attribute(node, key),
        AttrCondition::Eq { key, value } => doc.attribute(node, key) == Some(value.as_str()),
        AttrCondition::StartsWith { key, value } => doc
            .attribute(node, key)
            .is_some_and(|v| !value.is_empty() && v.starts_with(value.as_str())),
        AttrCondition::EndsWith { key, value } => doc
            .attribute(node, key)
            .is_some_and(|v| !value.is_empty() && v.ends_with(value.as_str())),
        AttrCondition::Contains { key, value } => doc
            .attribute(node, key)
            .is_some_and(|v| !value.is_empty() && v.contains(value.as_str())),
        AttrCondition::Includes { key, value } => doc
            .attribute(node, key)
            .is_some_and(|v| v.split_ascii_whitespace().any(|w| w == value)),
        AttrCondition::DashMatch { key, value } => doc.attribute(node, key).is_some_and(|v| {
            v == value
                || v.strip_prefix(value.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        }),
    })
}

fn parse_chain(selector: &str) -> Result<Vec<SelectorPart>, SelectorError> {
    let tokens = tokenize(selector)?;
    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokens {
        let combinator = match token.as_str() {
            ">" => Some(Combinator::Child),
            "+" => Some(Combinator::AdjacentSibling),
            "~" => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(c) = combinator {
            if pending.is_some() || parts.is_empty() {
                return Err(unsupported(selector));
            }
            pending = Some(c);
            continue;
        }
        let step = parse_step(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(SelectorPart { step, combinator });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(unsupported(selector));
    }
    Ok(parts)
}

fn split_groups(selector: &str) -> Result<Vec<String>, SelectorError> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0_usize;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        match (ch, quote) {
            (q, Some(open)) if q == open => {
                quote = None;
                current.push(ch);
            }
            (_, Some(_)) => current.push(ch),
            ('"' | '\'', None) if bracket_depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            ('[', None) => {
                bracket_depth += 1;
                current.push(ch);
            }
            (']', None) => {
                bracket_depth = bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(selector))?;
                current.push(ch);
            }
            (',', None) if bracket_depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(unsupported(selector));
                }
                groups.push(trimmed.to_owned());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 || quote.is_some() {
        return Err(unsupported(selector));
    }
    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(unsupported(selector));
    }
    groups.push(trimmed.to_owned());
    Ok(groups)
}

fn tokenize(selector: &str) -> Result<Vec<String>, SelectorError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0_usize;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.trim().is_empty() {
            tokens.push(current.trim().to_owned());
        }
        current.clear();
    };

    for ch in selector.chars() {
        match ch {
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                bracket_depth = bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(selector))?;
                current.push(ch);
            }
            '>' | '+' | '~' if bracket_depth == 0 => {
                flush(&mut current, &mut tokens);
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() && bracket_depth == 0 => flush(&mut current, &mut tokens),
            _ => current.push(ch),
        }
    }
    if bracket_depth != 0 {
        return Err(unsupported(selector));
    }
    flush(&mut current, &mut tokens);
    Ok(tokens)
}

fn parse_step(part: &str) -> Result<SelectorStep, SelectorError> {
    let mut step = SelectorStep::default();
    let mut i = 0_usize;

    while i < part.len() {
        let rest = &part[i..];
        let Some(first) = rest.chars().next() else {
            break;
        };
        match first {
            '*' => {
                if step.universal || step.tag.is_some() {
                    return Err(unsupported(part));
                }
                step.universal = true;
                i += 1;
            }
            '#' => {
                let (id, len) = ident(&rest[1..]).ok_or_else(|| unsupported(part))?;
                if step.id.replace(id).is_some() {
                    return Err(unsupported(part));
                }
                i += 1 + len;
            }
            '.' => {
                let (class, len) = ident(&rest[1..]).ok_or_else(|| unsupported(part))?;
                step.classes.push(class);
                i += 1 + len;
            }
            '[' => {
                let end = rest.find(']').ok_or_else(|| unsupported(part))?;
                step.attrs.push(parse_attr(&rest[1..end]).ok_or_else(|| unsupported(part))?);
                i += end + 1;
            }
            _ => {
                if i != 0 {
                    return Err(unsupported(part));
                }
                let (tag, len) = ident(rest).ok_or_else(|| unsupported(part))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i += len;
            }
        }
    }

    if step == SelectorStep::default() {
        return Err(unsupported(part));
    }
    Ok(step)
}

/// Leading identifier and its byte length.
fn ident(s: &str) -> Option<(String, usize)> {
    let len = s
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()))
        .map_or(s.len(), |(i, _)| i);
    (len > 0).then(|| (s[..len].to_owned(), len))
}

fn parse_attr(inner: &str) -> Option<AttrCondition> {
    let inner = inner.trim();
    let Some(eq) = inner.find('=') else {
        let (key, len) = ident(inner)?;
        return (len == inner.len()).then_some(AttrCondition::Exists { key });
    };
    let (lhs, value) = (&inner[..eq], inner[eq + 1..].trim());
    let (key_part, op) = match lhs.chars().last()? {
        c @ ('^' | '$' | '*' | '~' | '|') => (&lhs[..lhs.len() - 1], Some(c)),
        _ => (lhs, None),
    };
    let key = key_part.trim();
    let (parsed, len) = ident(key)?;
    if len != key.len() {
        return None;
    }
    let key = parsed.to_ascii_lowercase();
    let value = unquote(value)?;
    Some(match op {
        None => AttrCondition::Eq { key, value },
        Some('^') => AttrCondition::StartsWith { key, value },
        Some('$') => AttrCondition::EndsWith { key, value },
        Some('*') => AttrCondition::Contains { key, value },
        Some('~') => AttrCondition::Includes { key, value },
        Some(_) => AttrCondition::DashMatch { key, value },
    })
}

fn unquote(value: &str) -> Option<String> {
    for q in ['"', '\''] {
        if let Some(stripped) = value.strip_prefix(q) {
            return stripped.strip_suffix(q).map(str::to_owned);
        }
    }
    (!value.is_empty() && !value.contains(char::is_whitespace)).then(|| value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn doc() -> Document {
        Document::parse(
            r#"<ul id="todo" class="list main">
                <li class="item done" data-id="a-1">one</li>
                <li class="item" data-id="b-2"><a href="/x">two</a></li>
                <li class="item"><span lang="en-US">three</span></li>
            </ul>
            <form name="f"><input type="checkbox" name="c"></form>"#,
        )
        .unwrap()
    }

    fn count(doc: &Document, s: &str) -> usize {
        doc.query_selector_all(s).unwrap().len()
    }

    #[test]
    fn compound_steps() {
        let d = doc();
        assert_eq!(count(&d, "li"), 3);
        assert_eq!(count(&d, "LI.item"), 3);
        assert_eq!(count(&d, ".item.done"), 1);
        assert_eq!(count(&d, "#todo"), 1);
        assert_eq!(count(&d, "ul#todo.main"), 1);
        assert_eq!(count(&d, "*"), d.elements().len());
    }

    #[test]
    fn combinators() {
        let d = doc();
        assert_eq!(count(&d, "ul a"), 1);
        assert_eq!(count(&d, "ul > a"), 0);
        assert_eq!(count(&d, "ul > li > a"), 1);
        assert_eq!(count(&d, ".done + li"), 1);
        assert_eq!(count(&d, ".done ~ li"), 2);
        assert_eq!(count(&d, "body > form input"), 1);
    }

    #[test]
    fn descendant_backtracks() {
        // `.main li span` needs the outer ul even though li is the nearest ancestor.
        let d = doc();
        assert_eq!(count(&d, ".main li span"), 1);
        assert_eq!(count(&d, ".list span"), 1);
    }

    #[test]
    fn attribute_conditions() {
        let d = doc();
        assert_eq!(count(&d, "[data-id]"), 2);
        assert_eq!(count(&d, "[data-id=a-1]"), 1);
        assert_eq!(count(&d, "[data-id=\"b-2\"]"), 1);
        assert_eq!(count(&d, "[data-id^=b]"), 1);
        assert_eq!(count(&d, "[data-id$='-1']"), 1);
        assert_eq!(count(&d, "[data-id*=-]"), 2);
        assert_eq!(count(&d, "[class~=done]"), 1);
        assert_eq!(count(&d, "[lang|=en]"), 1);
        assert_eq!(count(&d, "input[type=checkbox][name=c]"), 1);
    }

    #[test]
    fn selector_lists() {
        let d = doc();
        assert_eq!(count(&d, "a, span, #todo"), 3);
        let order = d.query_selector_all("span, a").unwrap();
        assert_eq!(d.tag_name(order[0]), Some("a"), "results follow document order");
    }

    #[test]
    fn closest_is_inclusive() {
        let d = doc();
        let a = d.query_selector("a").unwrap().unwrap();
        let li = d.closest(a, "li").unwrap().unwrap();
        assert_eq!(d.tag_name(li), Some("li"));
        assert_eq!(d.closest(a, "a").unwrap(), Some(a));
        assert_eq!(d.closest(a, "form").unwrap(), None);
    }

    #[test]
    fn rejects_unsupported_syntax() {
        for bad in ["", "  ", "li:first-child", "a >", "> a", "a,,b", "[x", "a b]", "li..x", "#"] {
            assert!(Selector::parse(bad).is_err(), "`{bad}` should be rejected");
        }
    }

    proptest! {
        #[test]
        fn arbitrary_selectors_never_panic(input in ".{0,48}") {
            let d = doc();
            if let Ok(selector) = Selector::parse(&input) {
                for id in d.elements() {
                    let _ = selector.matches(&d, id);
                }
            }
        }
    }
}
