//! The `math` role: inline formulas aligned to the text baseline.

use std::sync::Arc;

use nom::{
    bytes::complete::take_until,
    character::complete::char,
    sequence::{delimited, preceded},
    IResult,
};
use tracing::debug;

use crate::config::RenderParams;
use crate::error::{Result, RoleError};
use crate::host::{Node, RawNode, Role, RoleInvocation, SystemMessage};
use crate::render::{FormulaRenderer, MathMode};
use crate::svg::rewrite_header;
use crate::MATH_CLASS;

/// Renders ``:math:`...` `` as an inline SVG.
pub struct MathRole {
    params: Arc<RenderParams>,
    renderer: Arc<dyn FormulaRenderer>,
    /// Points per unit of depth: font size times dvisvgm zoom.
    scale: f64,
}

impl MathRole {
    pub fn new(params: Arc<RenderParams>, renderer: Arc<dyn FormulaRenderer>) -> Self {
        let scale = f64::from(params.font_size) * params.zoom();
        Self {
            params,
            renderer,
            scale,
        }
    }

    /// How far below the baseline the image has to be shifted, in points.
    ///
    /// SVGs are aligned by their top edge, so the depth of the formula is
    /// scaled back from font-relative units to the zoomed font size.
    pub fn baseline_shift(&self, depth: f64) -> f64 {
        depth.max(0.0) * self.scale
    }
}

impl Role for MathRole {
    fn run(&self, invocation: &RoleInvocation) -> Result<(Vec<Node>, Vec<SystemMessage>)> {
        // Taken from the raw text, the parsed text has its backslashes consumed
        let formula = extract_formula(&invocation.rawtext)?;

        let mut options = invocation.options.clone();
        let mut classes = vec![MATH_CLASS.to_string()];
        classes.extend(options.take_classes().map_err(RoleError::from)?);

        debug!(target: "math_svg::role", line = invocation.lineno, formula, "Rendering inline math");
        let rendered = self
            .renderer
            .render(&MathMode::Inline.wrap(formula), &self.params)?;

        let attribs = inline_attributes(&classes, self.baseline_shift(rendered.depth));
        let (svg, _) = rewrite_header(&rendered.svg, &attribs, formula);

        let mut node = RawNode::html(invocation.rawtext.clone(), svg);
        node.attributes.line = Some(invocation.lineno);
        node.attributes.extra = options.into_map();

        Ok((vec![Node::Raw(node)], Vec::new()))
    }
}

/// Extract the formula between the first pair of backticks.
pub fn extract_formula(rawtext: &str) -> std::result::Result<&str, RoleError> {
    let formula = match backticked(rawtext) {
        Ok((_, formula)) => formula,
        Err(_) => {
            return Err(RoleError::MissingMarker {
                rawtext: rawtext.to_string(),
            })
        }
    };
    if formula.is_empty() {
        return Err(RoleError::EmptyFormula {
            rawtext: rawtext.to_string(),
        });
    }
    Ok(formula)
}

fn backticked(input: &str) -> IResult<&str, &str> {
    preceded(
        take_until("`"),
        delimited(char('`'), take_until("`"), char('`')),
    )(input)
}

/// Attributes spliced into the root `<svg>` element of an inline formula.
pub fn inline_attributes(classes: &[String], shift: f64) -> String {
    format!(
        r#" class="{}" style="vertical-align: -{:.1}pt;""#,
        classes.join(" "),
        shift
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::host::Options;
    use crate::render::testing::StubRenderer;
    use pretty_assertions::assert_eq;

    fn role(renderer: Arc<StubRenderer>) -> MathRole {
        MathRole::new(Arc::new(RenderParams::site()), renderer)
    }

    fn raw(nodes: &[Node]) -> &RawNode {
        match nodes {
            [Node::Raw(raw)] => raw,
            other => panic!("expected one raw node, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_formula() {
        assert_eq!(extract_formula(r":math:`\alpha+\beta`").unwrap(), r"\alpha+\beta");
        assert_eq!(extract_formula("`x`:math:").unwrap(), "x");
        assert_eq!(extract_formula(":math:`a` and `b`").unwrap(), "a");
    }

    #[test]
    fn test_extract_formula_errors() {
        assert!(matches!(
            extract_formula(":math:x"),
            Err(RoleError::MissingMarker { .. })
        ));
        assert!(matches!(
            extract_formula(":math:`x"),
            Err(RoleError::MissingMarker { .. })
        ));
        assert!(matches!(
            extract_formula(":math:``"),
            Err(RoleError::EmptyFormula { .. })
        ));
    }

    #[test]
    fn test_inline_attributes() {
        assert_eq!(
            inline_attributes(&["m-math".into(), "foo".into()], 3.0),
            r#" class="m-math foo" style="vertical-align: -3.0pt;""#
        );
    }

    #[test]
    fn test_baseline_shift() {
        let role = role(Arc::new(StubRenderer::new(0.0)));
        assert_eq!(format!("{:.1}", role.baseline_shift(0.2)), "3.0");
        assert_eq!(format!("{:.1}", role.baseline_shift(0.0)), "0.0");
        assert_eq!(role.baseline_shift(-0.1), 0.0);
    }

    #[test]
    fn test_renders_inline_formula() {
        let renderer = Arc::new(StubRenderer::new(0.2));
        let invocation = RoleInvocation::new("math", r":math:`\alpha+\beta`", "alpha+beta", 12);
        let (nodes, messages) = role(renderer.clone()).run(&invocation).unwrap();

        assert!(messages.is_empty());
        assert_eq!(renderer.calls(), vec![r"$\alpha+\beta$"]);

        let node = raw(&nodes);
        assert!(node.is_html());
        assert_eq!(node.attributes.line, Some(12));
        assert_eq!(node.rawsource, r":math:`\alpha+\beta`");
        assert!(node
            .text
            .starts_with(r#"<svg class="m-math" style="vertical-align: -3.0pt;" version='1.1'"#));
        assert!(node.text.contains("<description>\n\\\\alpha+\\\\beta\n</description>"));
    }

    #[test]
    fn test_zero_depth() {
        let renderer = Arc::new(StubRenderer::new(0.0));
        let invocation = RoleInvocation::new("math", ":math:`x`", "x", 1);
        let (nodes, _) = role(renderer).run(&invocation).unwrap();

        assert!(raw(&nodes).text.contains(r#"style="vertical-align: -0.0pt;""#));
    }

    #[test]
    fn test_user_classes_follow_math_class() {
        let renderer = Arc::new(StubRenderer::new(0.0));
        let invocation = RoleInvocation::new("math", ":math:`x`", "x", 1)
            .with_options(Options::new().with("class", "foo").with("title", "square"));
        let (nodes, _) = role(renderer).run(&invocation).unwrap();

        let node = raw(&nodes);
        assert!(node.text.contains(r#"class="m-math foo""#));
        assert!(!node.attributes.extra.contains_key("class"));
        assert_eq!(node.attributes.extra.get("title").map(String::as_str), Some("square"));
        assert!(node.attributes.classes.is_empty());
    }

    #[test]
    fn test_missing_marker_is_validation_error() {
        let renderer = Arc::new(StubRenderer::new(0.0));
        let invocation = RoleInvocation::new("math", ":math:x", "x", 1);
        let err = role(renderer.clone()).run(&invocation).unwrap_err();

        assert!(matches!(err, Error::Role(RoleError::MissingMarker { .. })));
        assert!(err.to_string().contains(":math:x"));
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_renderer_failure_propagates() {
        let renderer = Arc::new(StubRenderer::new(0.0).failing_on(r"$\nope$"));
        let invocation = RoleInvocation::new("math", r":math:`\nope`", "nope", 1);
        let err = role(renderer).run(&invocation).unwrap_err();

        assert!(matches!(err, Error::Render(_)));
    }
}
