use log::trace;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::core::nodes::{Element, Node};
use crate::errors::TemplateError;

#[derive(Parser)]
#[grammar = "markup.pest"]
struct MarkupParser;

/// Reads a markup string into a node. Several top-level nodes come back as a
/// fragment, a single one as itself.
pub fn parse_markup(markup: &str) -> Result<Node, TemplateError> {
    trace!("Parsing markup ({} bytes)", markup.len());
    let mut pairs = MarkupParser::parse(Rule::document, markup).map_err(|e| {
        let position = match e.location {
            pest::error::InputLocation::Pos(p) => p,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        TemplateError::Markup { position, message: e.variant.message().to_string() }
    })?;

    let mut nodes = Vec::new();
    if let Some(document) = pairs.next() {
        for pair in document.into_inner() {
            if let Some(node) = build_node(pair)? {
                nodes.push(node);
            }
        }
    }
    Ok(Node::from_nodes(nodes))
}

fn build_node(pair: Pair<Rule>) -> Result<Option<Node>, TemplateError> {
    match pair.as_rule() {
        Rule::text => Ok(Some(Node::text(decode_entities(pair.as_str())))),
        Rule::comment => {
            let body = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Some(Node::comment(body)))
        }
        Rule::element => build_element(pair).map(|e| Some(Node::Element(e))),
        _ => Ok(None),
    }
}

fn build_element(pair: Pair<Rule>) -> Result<Element, TemplateError> {
    let position = pair.as_span().start();
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .filter(|p| matches!(p.as_rule(), Rule::tag_name | Rule::void_name))
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| TemplateError::Markup { position, message: "expected a tag name".to_string() })?;

    let mut element = Element::new(name);
    for child in inner {
        match child.as_rule() {
            Rule::attribute => {
                let mut parts = child.into_inner();
                let attr_name = parts.next().map(|p| p.as_str().to_string()).unwrap_or_default();
                let value = parts.next().map(|p| decode_entities(p.as_str())).unwrap_or_default();
                element.set_attribute(attr_name, value);
            }
            _ => {
                if let Some(node) = build_node(child)? {
                    element.children.push(node);
                }
            }
        }
    }
    Ok(element)
}

/// Resolves the named entities the serializer produces plus numeric references.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse::<u32>().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
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
    out
}
