//! Reader for the small reStructuredText subset math pages are written in.
//!
//! Understands paragraphs, explicit directive blocks
//!
//! ```text
//! .. math::
//!     :class: wide
//!
//!     e^{i\pi} + 1 = 0
//! ```
//!
//! and interpreted text with an explicit role, ``:math:`x^2` ``. Directives
//! and roles are looked up in a [`Registry`]; everything else is plain text.

use nom::{
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, space0, space1},
    sequence::{delimited, pair},
    IResult,
};

use super::node::{Node, SystemMessage};
use super::options::Options;
use super::registry::{DirectiveInvocation, Registry, RoleInvocation};
use crate::error::Result;

/// Parse `source` into document nodes, running directives and roles.
pub fn parse_document(source: &str, registry: &Registry) -> Result<Vec<Node>> {
    let lines: Vec<&str> = source.lines().collect();
    let mut nodes = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if is_blank(lines[i]) {
            i += 1;
            continue;
        }

        if let Ok((_, (name, argument))) = directive_marker(lines[i]) {
            let end = block_end(&lines, i + 1);
            let invocation = directive_invocation(&lines, i, end, name, argument, registry);
            nodes.extend(registry.run_directive(&invocation)?);
            i = end;
            continue;
        }

        let start = i;
        i += 1;
        while i < lines.len() && !is_blank(lines[i]) && directive_marker(lines[i]).is_err() {
            i += 1;
        }
        let text = lines[start..i].join("\n");
        let (children, messages) = parse_inline(&text, start + 1, registry)?;
        nodes.push(Node::paragraph(children));
        nodes.extend(messages.into_iter().map(Node::SystemMessage));
    }

    Ok(nodes)
}

/// Parse paragraph text, running every role reference found in it.
///
/// `first_line` is the 1-based source line of the paragraph.
pub fn parse_inline(
    text: &str,
    first_line: usize,
    registry: &Registry,
) -> Result<(Vec<Node>, Vec<SystemMessage>)> {
    let mut nodes = Vec::new();
    let mut messages = Vec::new();
    let mut pending = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find(':') {
        let candidate = &rest[pos..];
        match role_reference(candidate) {
            Ok((after, (name, interpreted))) => {
                pending.push_str(&rest[..pos]);
                if !pending.is_empty() {
                    nodes.push(Node::Text(std::mem::take(&mut pending)));
                }

                let consumed = text.len() - candidate.len();
                let lineno = first_line + text[..consumed].matches('\n').count();
                let rawtext = &candidate[..candidate.len() - after.len()];
                let invocation = RoleInvocation::new(name, rawtext, interpreted, lineno);
                let (produced, reported) = registry.run_role(&invocation)?;
                nodes.extend(produced);
                messages.extend(reported);

                rest = after;
            }
            Err(_) => {
                pending.push_str(&rest[..=pos]);
                rest = &rest[pos + 1..];
            }
        }
    }

    pending.push_str(rest);
    if !pending.is_empty() {
        nodes.push(Node::Text(pending));
    }

    Ok((nodes, messages))
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Leading spaces and tabs, in bytes. Other whitespace counts as text.
fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '+')
}

/// `.. name:: argument`
fn directive_marker(line: &str) -> IResult<&str, (&str, &str)> {
    let (rest, _) = tag("..")(line)?;
    let (rest, _) = space1(rest)?;
    let (rest, name) = take_while1(is_name_char)(rest)?;
    let (rest, _) = tag("::")(rest)?;
    let (rest, _) = space0(rest)?;
    Ok(("", (name, rest.trim_end())))
}

/// `:name: value`
fn option_line(line: &str) -> IResult<&str, (&str, &str)> {
    let (rest, name) = delimited(
        char(':'),
        take_while1(|c: char| c != ':' && !c.is_whitespace()),
        char(':'),
    )(line.trim_start())?;
    Ok(("", (name, rest.trim())))
}

/// ``:name:`text` ``
fn role_reference(input: &str) -> IResult<&str, (&str, &str)> {
    pair(
        delimited(char(':'), take_while1(is_name_char), char(':')),
        delimited(char('`'), take_until("`"), char('`')),
    )(input)
}

/// Index one past the last line of an indented block starting at `start`.
fn block_end(lines: &[&str], start: usize) -> usize {
    let mut end = start;
    while end < lines.len()
        && (is_blank(lines[end]) || lines[end].starts_with(' ') || lines[end].starts_with('\t'))
    {
        end += 1;
    }
    while end > start && is_blank(lines[end - 1]) {
        end -= 1;
    }
    end
}

fn directive_invocation(
    lines: &[&str],
    marker: usize,
    end: usize,
    name: &str,
    argument: &str,
    registry: &Registry,
) -> DirectiveInvocation {
    let mut options = Options::new();
    let mut body = marker + 1;
    while body < end {
        match option_line(lines[body]) {
            Ok((_, (key, value))) => {
                options.insert(key, value);
                body += 1;
            }
            Err(_) => break,
        }
    }
    while body < end && is_blank(lines[body]) {
        body += 1;
    }

    let indent = lines[body..end]
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);
    let mut content: Vec<String> = lines[body..end]
        .iter()
        .map(|line| {
            if is_blank(line) {
                String::new()
            } else {
                line[indent..].to_string()
            }
        })
        .collect();
    let mut content_offset = body;

    let mut arguments = Vec::new();
    if !argument.is_empty() {
        let takes_arguments = registry
            .directive(name)
            .map_or(false, |d| d.has_arguments());
        if takes_arguments {
            arguments.push(argument.to_string());
        } else {
            // text after the marker starts the content
            if !content.is_empty() {
                content.insert(0, String::new());
            }
            content.insert(0, argument.to_string());
            content_offset = marker;
        }
    }

    DirectiveInvocation {
        name: name.to_string(),
        arguments,
        options,
        content,
        lineno: marker + 1,
        content_offset,
        block_text: lines[marker..end].join("\n"),
    }
}
