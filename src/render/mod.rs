//! Formula rendering backends.

pub mod latex;

pub use self::latex::LatexSvgRenderer;

use crate::config::RenderParams;
use crate::error::RenderError;

/// Math mode a formula is typeset in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathMode {
    /// Inline math, `$...$`.
    Inline,
    /// Display math, `$$...$$`.
    Display,
}

impl MathMode {
    /// Wrap a formula in the delimiters for this mode.
    pub fn wrap(self, formula: &str) -> String {
        match self {
            MathMode::Inline => format!("${}$", formula),
            MathMode::Display => format!("$${}$$", formula),
        }
    }
}

/// Output of a single render call.
///
/// Metrics are relative to the font size.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// SVG document as emitted by the renderer.
    pub svg: String,
    /// Distance from the baseline to the bottom of the image.
    pub depth: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Trait for formula-to-SVG renderers.
pub trait FormulaRenderer: Send + Sync {
    /// Render `code`, which already carries its math delimiters.
    fn render(&self, code: &str, params: &RenderParams) -> Result<Rendered, RenderError>;
}
