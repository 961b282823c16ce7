//! # math-svg
//!
//! LaTeX math for documentation pages, rendered ahead of time into inline SVG.
//!
//! The crate registers a `math` directive and a `math` role into a
//! reStructuredText-style [`host::Registry`]:
//!
//! ```text
//! .. math::
//!     :class: wide
//!
//!     \int_0^1 x\,dx = \frac{1}{2}
//!
//! Inline math like :math:`e^{i\pi} + 1 = 0` sits on the text baseline.
//! ```
//!
//! Every formula goes through a [`FormulaRenderer`] (by default
//! [`LatexSvgRenderer`], which drives `latex` and `dvisvgm`). The SVG header
//! dvisvgm writes is then replaced by one carrying the `m-math` class, a
//! `<title>` and a `<description>` with the formula source, so screen readers
//! and text search see the LaTeX. Inline formulas also get a
//! `vertical-align` style computed from the depth dvisvgm reports.
//!
//! ## Quick Start
//!
//! ```no_run
//! use math_svg::{host::Registry, MathExtension};
//!
//! let mut registry = Registry::new();
//! math_svg::register(&mut registry, &MathExtension::site());
//!
//! let html = math_svg::render_document(
//!     "The area is :math:`\\pi r^2`.",
//!     &registry,
//! ).unwrap();
//! assert!(html.contains("m-math"));
//! ```
//!
//! ## Configuration
//!
//! Rendering parameters can be adjusted from TOML before the extension is
//! built; anything left out keeps the site defaults.
//!
//! ```toml
//! [math]
//! font_size = 12
//! dvisvgm_cmd = "dvisvgm --no-fonts -Z 1.25"
//! libgs = "/usr/lib/libgs.so"
//! ```

pub mod config;
pub mod directive;
pub mod error;
pub mod host;
pub mod render;
pub mod role;
pub mod svg;

pub use config::{MathConfig, RenderParams};
pub use directive::MathDirective;
pub use error::{ConfigError, DirectiveError, Error, RenderError, Result, RoleError};
pub use render::{FormulaRenderer, LatexSvgRenderer, MathMode, Rendered};
pub use role::MathRole;

use std::sync::Arc;

use host::Registry;

/// Name the directive and the role are registered under.
pub const NAME: &str = "math";

/// Class carried by every rendered formula.
pub const MATH_CLASS: &str = "m-math";

/// Frozen rendering setup shared by the directive and the role.
#[derive(Clone)]
pub struct MathExtension {
    params: Arc<RenderParams>,
    renderer: Arc<dyn FormulaRenderer>,
}

impl MathExtension {
    pub fn new(params: RenderParams, renderer: Arc<dyn FormulaRenderer>) -> Self {
        Self {
            params: Arc::new(params),
            renderer,
        }
    }

    /// Site parameters rendered through the local TeX installation.
    pub fn site() -> Self {
        Self::new(RenderParams::site(), Arc::new(LatexSvgRenderer::new()))
    }

    /// Site parameters with `config` applied, rendered through TeX.
    pub fn from_config(config: MathConfig) -> Result<Self> {
        let params = config.into_params()?;
        Ok(Self::new(params, Arc::new(LatexSvgRenderer::new())))
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    pub fn directive(&self) -> MathDirective {
        MathDirective::new(self.params.clone(), self.renderer.clone())
    }

    pub fn role(&self) -> MathRole {
        MathRole::new(self.params.clone(), self.renderer.clone())
    }
}

/// Register the `math` directive and role.
pub fn register(registry: &mut Registry, extension: &MathExtension) {
    registry.register_directive(NAME, extension.directive());
    registry.register_canonical_role(NAME, extension.role());
    tracing::debug!(target: "math_svg", "Registered math directive and role");
}

/// Read `source` with `registry` and serialize the result to HTML.
pub fn render_document(source: &str, registry: &Registry) -> Result<String> {
    let nodes = host::parse_document(source, registry)?;
    Ok(host::render_html(&nodes))
}
