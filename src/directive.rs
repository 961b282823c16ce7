//! The `math` directive: display formulas as block-level SVG.

use std::sync::Arc;

use tracing::debug;

use crate::config::RenderParams;
use crate::error::{DirectiveError, Result};
use crate::host::{Attributes, Directive, DirectiveInvocation, Node, RawNode};
use crate::render::{FormulaRenderer, MathMode};
use crate::svg::rewrite_header;
use crate::MATH_CLASS;

/// Renders each paragraph of its content as a display formula.
///
/// ```text
/// .. math::
///     :class: wide
///     :name: euler
///
///     e^{i\pi} + 1 = 0
///
///     \sum_{k=1}^n k = \frac{n(n+1)}{2}
/// ```
pub struct MathDirective {
    params: Arc<RenderParams>,
    renderer: Arc<dyn FormulaRenderer>,
}

impl MathDirective {
    pub fn new(params: Arc<RenderParams>, renderer: Arc<dyn FormulaRenderer>) -> Self {
        Self { params, renderer }
    }

    fn render_block(&self, block: &str, invocation: &DirectiveInvocation) -> Result<RawNode> {
        let rendered = self
            .renderer
            .render(&MathMode::Display.wrap(block), &self.params)?;
        let (svg, _) = rewrite_header(&rendered.svg, "", block);

        let mut node = RawNode::html(invocation.block_text.clone(), svg);
        node.attributes.line = Some(invocation.content_offset + 1);
        Ok(node)
    }
}

impl Directive for MathDirective {
    fn option_spec(&self) -> &'static [&'static str] {
        &["class", "name"]
    }

    fn run(&self, invocation: &DirectiveInvocation) -> Result<Vec<Node>> {
        let mut options = invocation.options.clone();
        let classes = options.take_classes().map_err(DirectiveError::from)?;
        let mut name = options.remove("name");

        if invocation.content.is_empty() {
            return Err(DirectiveError::EmptyContent(invocation.name.clone()).into());
        }

        let content = invocation.content.join("\n");
        let mut nodes = Vec::new();
        for block in content.split("\n\n") {
            if block.is_empty() {
                continue;
            }

            debug!(target: "math_svg::directive", line = invocation.lineno, block, "Rendering display math");
            let mut raw = self.render_block(block, invocation)?;
            // ids must stay unique
            if let Some(name) = name.take() {
                raw.attributes.add_name(&name);
            }

            let mut attributes = Attributes {
                classes: classes.clone(),
                ..Attributes::default()
            };
            attributes.classes.push(MATH_CLASS.to_string());
            nodes.push(Node::container(attributes, vec![Node::Raw(raw)]));
        }

        Ok(nodes)
    }
}
