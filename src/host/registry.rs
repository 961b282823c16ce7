//! Directive and role registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::node::{Node, SystemMessage};
use super::options::Options;
use crate::error::{DirectiveError, Error, Result};

/// One use of a directive in a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveInvocation {
    pub name: String,
    pub arguments: Vec<String>,
    pub options: Options,
    pub content: Vec<String>,
    /// Line of the directive marker, 1-based.
    pub lineno: usize,
    /// Line offset of the first content line, 0-based.
    pub content_offset: usize,
    /// Full source text of the directive block.
    pub block_text: String,
}

impl DirectiveInvocation {
    pub fn new(name: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            name: name.into(),
            content,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

/// One use of an interpreted-text role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleInvocation {
    pub name: String,
    /// Complete source, markers included, e.g. ``:math:`x^2` ``.
    pub rawtext: String,
    /// Interpreted text between the markers.
    pub text: String,
    pub lineno: usize,
    pub options: Options,
    pub content: Vec<String>,
}

impl RoleInvocation {
    /// Invocation with empty options and content.
    pub fn new(
        name: impl Into<String>,
        rawtext: impl Into<String>,
        text: impl Into<String>,
        lineno: usize,
    ) -> Self {
        Self {
            name: name.into(),
            rawtext: rawtext.into(),
            text: text.into(),
            lineno,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

/// A block-level directive.
pub trait Directive: Send + Sync {
    /// Option names the directive accepts.
    fn option_spec(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether text after the `::` marker is an argument rather than content.
    fn has_arguments(&self) -> bool {
        false
    }

    fn run(&self, invocation: &DirectiveInvocation) -> Result<Vec<Node>>;
}

/// An inline interpreted-text role.
pub trait Role: Send + Sync {
    /// Produce inline nodes plus any messages to report next to the paragraph.
    fn run(&self, invocation: &RoleInvocation) -> Result<(Vec<Node>, Vec<SystemMessage>)>;
}

/// Directives and roles available while reading a document.
#[derive(Default, Clone)]
pub struct Registry {
    directives: HashMap<String, Arc<dyn Directive>>,
    roles: HashMap<String, Arc<dyn Role>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_directive(&mut self, name: &str, directive: impl Directive + 'static) {
        self.directives
            .insert(name.to_lowercase(), Arc::new(directive));
    }

    pub fn register_canonical_role(&mut self, name: &str, role: impl Role + 'static) {
        self.roles.insert(name.to_lowercase(), Arc::new(role));
    }

    pub fn directive(&self, name: &str) -> Option<&dyn Directive> {
        self.directives.get(&name.to_lowercase()).map(|d| d.as_ref())
    }

    pub fn role(&self, name: &str) -> Option<&dyn Role> {
        self.roles.get(&name.to_lowercase()).map(|r| r.as_ref())
    }

    /// Run a directive.
    ///
    /// Validation failures come back as a system message node; anything else
    /// is returned as an error and should abort the document.
    pub fn run_directive(&self, invocation: &DirectiveInvocation) -> Result<Vec<Node>> {
        let Some(directive) = self.directive(&invocation.name) else {
            return Ok(vec![self.report(
                format!("Unknown directive type \"{}\".", invocation.name),
                invocation.lineno,
                &invocation.block_text,
            )]);
        };

        let outcome = invocation
            .options
            .check(directive.option_spec())
            .map_err(|e| Error::from(DirectiveError::from(e)))
            .and_then(|()| directive.run(invocation));

        match outcome {
            Ok(nodes) => Ok(nodes),
            Err(err) if err.is_recoverable() => Ok(vec![self.report(
                format!("Error in \"{}\" directive:\n{}", invocation.name, err),
                invocation.lineno,
                &invocation.block_text,
            )]),
            Err(err) => Err(err),
        }
    }

    /// Run a role.
    ///
    /// Validation failures turn the source into problematic text plus a
    /// system message.
    pub fn run_role(&self, invocation: &RoleInvocation) -> Result<(Vec<Node>, Vec<SystemMessage>)> {
        let outcome = match self.role(&invocation.name) {
            Some(role) => role.run(invocation),
            None => {
                let msg = format!("Unknown interpreted text role \"{}\".", invocation.name);
                return Ok(self.problematic(invocation, msg));
            }
        };

        match outcome {
            Ok(produced) => Ok(produced),
            Err(err) if err.is_recoverable() => Ok(self.problematic(invocation, err.to_string())),
            Err(err) => Err(err),
        }
    }

    fn report(&self, message: String, lineno: usize, source: &str) -> Node {
        warn!(target: "math_svg::host", line = lineno, "{}", message);
        Node::SystemMessage(SystemMessage::error(message, Some(lineno)).with_source(source))
    }

    fn problematic(
        &self,
        invocation: &RoleInvocation,
        message: String,
    ) -> (Vec<Node>, Vec<SystemMessage>) {
        warn!(target: "math_svg::host", line = invocation.lineno, "{}", message);
        (
            vec![Node::Problematic(invocation.rawtext.clone())],
            vec![SystemMessage::error(message, Some(invocation.lineno))],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;

    struct Echo;

    impl Directive for Echo {
        fn option_spec(&self) -> &'static [&'static str] {
            &["class"]
        }

        fn run(&self, invocation: &DirectiveInvocation) -> Result<Vec<Node>> {
            if invocation.content.is_empty() {
                return Err(DirectiveError::EmptyContent(invocation.name.clone()).into());
            }
            if invocation.content[0] == "boom" {
                return Err(RenderError::Math("boom".into()).into());
            }
            Ok(vec![Node::Text(invocation.content.join("\n"))])
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_directive("echo", Echo);
        registry
    }

    #[test]
    fn test_run_registered_directive() {
        let nodes = registry()
            .run_directive(&DirectiveInvocation::new("ECHO", vec!["hi".into()]))
            .unwrap();
        assert_eq!(nodes, vec![Node::Text("hi".into())]);
    }

    #[test]
    fn test_unknown_directive_is_reported() {
        let nodes = registry()
            .run_directive(&DirectiveInvocation::new("nope", vec![]))
            .unwrap();
        match &nodes[..] {
            [Node::SystemMessage(msg)] => assert!(msg.message.contains("Unknown directive type")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_validation_error_becomes_message() {
        let nodes = registry()
            .run_directive(&DirectiveInvocation::new("echo", vec![]))
            .unwrap();
        match &nodes[..] {
            [Node::SystemMessage(msg)] => {
                assert!(msg.message.contains("content block expected"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_option_becomes_message() {
        let invocation = DirectiveInvocation::new("echo", vec!["x".into()])
            .with_options(Options::new().with("align", "left"));
        let nodes = registry().run_directive(&invocation).unwrap();
        assert!(matches!(&nodes[..], [Node::SystemMessage(_)]));
    }

    #[test]
    fn test_fatal_error_propagates() {
        let err = registry()
            .run_directive(&DirectiveInvocation::new("echo", vec!["boom".into()]))
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_unknown_role_is_problematic() {
        let invocation = RoleInvocation::new("nope", ":nope:`x`", "x", 4);
        let (nodes, messages) = registry().run_role(&invocation).unwrap();
        assert_eq!(nodes, vec![Node::Problematic(":nope:`x`".into())]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].line, Some(4));
    }
}
