//! Document tree nodes and their HTML serialization.

use std::collections::BTreeMap;
use std::fmt;

/// Attributes common to every element node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub classes: Vec<String>,
    /// Source line the node was produced from.
    pub line: Option<usize>,
    /// Options not otherwise interpreted, kept as plain attributes.
    pub extra: BTreeMap<String, String>,
}

impl Attributes {
    /// Register `name` as a reference name and derive an id from it.
    pub fn add_name(&mut self, name: &str) {
        let name = normalize_name(name);
        let id = make_id(&name);
        if !id.is_empty() && !self.ids.contains(&id) {
            self.ids.push(id);
        }
        self.names.push(name);
    }

    fn write_html(&self, out: &mut String) {
        if let Some(id) = self.ids.first() {
            out.push_str(&format!(r#" id="{}""#, escape_html(id)));
        }
        if !self.classes.is_empty() {
            out.push_str(&format!(
                r#" class="{}""#,
                escape_html(&self.classes.join(" "))
            ));
        }
    }
}

/// Raw markup passed through to one output format.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    /// Source text the node was produced from.
    pub rawsource: String,
    /// Markup emitted verbatim.
    pub text: String,
    /// Writer format the markup is meant for, e.g. `html`.
    pub format: String,
    pub attributes: Attributes,
}

impl RawNode {
    /// Raw node carrying HTML markup.
    pub fn html(rawsource: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            rawsource: rawsource.into(),
            text: text.into(),
            format: "html".to_string(),
            attributes: Attributes::default(),
        }
    }

    pub fn is_html(&self) -> bool {
        self.format.split_whitespace().any(|f| f == "html")
    }
}

/// Severity of a [`SystemMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info = 1,
    Warning = 2,
    Error = 3,
    Severe = 4,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Severe => "SEVERE",
        };
        write!(f, "{}/{}", name, *self as u8)
    }
}

/// Problem report inserted into the document.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMessage {
    pub level: Level,
    pub message: String,
    pub line: Option<usize>,
    /// Offending source text, shown as a literal block.
    pub source: Option<String>,
}

impl SystemMessage {
    pub fn error(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            line,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Paragraph {
        attributes: Attributes,
        children: Vec<Node>,
    },
    Container {
        attributes: Attributes,
        children: Vec<Node>,
    },
    Raw(RawNode),
    /// Text that failed to process, kept visible in the output.
    Problematic(String),
    SystemMessage(SystemMessage),
}

impl Node {
    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph {
            attributes: Attributes::default(),
            children,
        }
    }

    pub fn container(attributes: Attributes, children: Vec<Node>) -> Self {
        Node::Container {
            attributes,
            children,
        }
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Node::Paragraph { attributes, .. } | Node::Container { attributes, .. } => {
                Some(attributes)
            }
            Node::Raw(raw) => Some(&raw.attributes),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph { children, .. } | Node::Container { children, .. } => children,
            _ => &[],
        }
    }

    /// Serialize this node and its children to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Paragraph {
                attributes,
                children,
            } => {
                out.push_str("<p");
                attributes.write_html(out);
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</p>\n");
            }
            Node::Container {
                attributes,
                children,
            } => {
                out.push_str("<div");
                attributes.write_html(out);
                out.push_str(">\n");
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</div>\n");
            }
            Node::Raw(raw) => {
                // Raw markup for other writers is dropped
                if raw.is_html() {
                    for id in &raw.attributes.ids {
                        out.push_str(&format!(r#"<span id="{}"></span>"#, escape_html(id)));
                    }
                    out.push_str(&raw.text);
                }
            }
            Node::Problematic(text) => {
                out.push_str(&format!(
                    r#"<span class="problematic">{}</span>"#,
                    escape_html(text)
                ));
            }
            Node::SystemMessage(msg) => {
                out.push_str(r#"<div class="system-message">"#);
                out.push('\n');
                out.push_str(r#"<p class="system-message-title">System Message: "#);
                out.push_str(&msg.level.to_string());
                if let Some(line) = msg.line {
                    out.push_str(&format!(" (line {})", line));
                }
                out.push_str("</p>\n");
                out.push_str(&format!("<p>{}</p>\n", escape_html(&msg.message)));
                if let Some(source) = &msg.source {
                    out.push_str(&format!(
                        "<pre class=\"literal-block\">{}</pre>\n",
                        escape_html(source)
                    ));
                }
                out.push_str("</div>\n");
            }
        }
    }
}

/// Serialize a sequence of nodes.
pub fn render_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_html(&mut out);
    }
    out
}

/// Lowercase and collapse whitespace, as reference names are compared.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Convert a name into a valid identifier: lowercase ASCII letters, digits
/// and single hyphens, starting with a letter.
pub fn make_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !id.is_empty() {
                id.push('-');
            }
            pending_hyphen = false;
            if id.is_empty() && !c.is_ascii_alphabetic() {
                continue;
            }
            id.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    id
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
