//! Formula rendering through the `latex` and `dvisvgm` command-line tools.
//!
//! Each call typesets the formula in a scratch directory: the template is
//! written to `code.tex`, `latex` turns it into `code.dvi` and `dvisvgm`
//! converts that to `code.svg`. dvisvgm reports the image size and depth on
//! stderr, which is where the layout metrics come from.

use std::{
    fs,
    io::ErrorKind,
    path::Path,
    process::{Command, Output, Stdio},
    sync::OnceLock,
    time::Instant,
};

use regex_lite::Regex;
use tracing::{debug, info, warn};

use super::{FormulaRenderer, Rendered};
use crate::config::RenderParams;
use crate::error::RenderError;

const TEX_FILE: &str = "code.tex";
const DVI_FILE: &str = "code.dvi";
const SVG_FILE: &str = "code.svg";

/// Renderer shelling out to a TeX installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexSvgRenderer;

impl LatexSvgRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl FormulaRenderer for LatexSvgRenderer {
    fn render(&self, code: &str, params: &RenderParams) -> Result<Rendered, RenderError> {
        let started_at = Instant::now();
        let latex_args = params.latex_args()?;
        let dvisvgm_args = params.dvisvgm_args()?;

        let workdir = tempfile::Builder::new().prefix("math-svg").tempdir()?;
        fs::write(workdir.path().join(TEX_FILE), params.document(code))?;

        run_tool("latex", &latex_args, TEX_FILE, workdir.path(), None)?;
        let output = run_tool(
            "dvisvgm",
            &dvisvgm_args,
            DVI_FILE,
            workdir.path(),
            params.libgs.as_deref(),
        )?;

        let svg = fs::read_to_string(workdir.path().join(SVG_FILE))?;
        let report = String::from_utf8_lossy(&output.stderr);
        let metrics = Metrics::parse(&report, params.font_size);

        let depth = metrics.depth.unwrap_or_else(|| {
            warn!(
                target: "math_svg::render::latex",
                code,
                "dvisvgm reported no depth; assuming the formula sits on the baseline"
            );
            0.0
        });

        info!(
            target: "math_svg::render::latex",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            svg_bytes = svg.len(),
            depth,
            "Formula rendered via latex/dvisvgm"
        );

        Ok(Rendered {
            svg,
            depth,
            width: metrics.width,
            height: metrics.height,
        })
    }
}

/// Size and depth of the rendered image, divided by the font size.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
}

impl Metrics {
    /// Parse the dvisvgm message log.
    pub fn parse(report: &str, font_size: u32) -> Self {
        let font_size = f64::from(font_size);
        let (width, height) = match size_regex().captures(report) {
            Some(caps) => (
                caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()),
                caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok()),
            ),
            None => (None, None),
        };
        let depth = depth_regex()
            .captures(report)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        Self {
            width: width.map(|w| w / font_size),
            height: height.map(|h| h / font_size),
            depth: depth.map(|d| d / font_size),
        }
    }
}

fn size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([0-9.]+)pt x ([0-9.]+)pt").expect("size pattern is valid")
    })
}

fn depth_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bdepth=([0-9.e-]+)pt").expect("depth pattern is valid")
    })
}

fn run_tool(
    tool: &'static str,
    args: &[String],
    input: &str,
    cwd: &Path,
    libgs: Option<&Path>,
) -> Result<Output, RenderError> {
    let (program, rest) = args.split_first().ok_or(RenderError::EmptyCommand(tool))?;

    let mut command = Command::new(program);
    command
        .args(rest)
        .arg(input)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(libgs) = libgs {
        command.env("LIBGS", libgs);
    }

    debug!(target: "math_svg::render::latex", tool, program = %program, input, "Spawning");
    let output = command.output().map_err(|err| {
        warn!(
            target: "math_svg::render::latex",
            tool,
            program = %program,
            error = %err,
            "Failed to spawn renderer tool"
        );
        if err.kind() == ErrorKind::NotFound {
            RenderError::NotFound {
                program: program.clone(),
                source: err,
            }
        } else {
            RenderError::Io(err)
        }
    })?;

    if !output.status.success() {
        let exit_code = output.status.code();
        // latex reports errors on stdout, dvisvgm on stderr
        let log = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        warn!(
            target: "math_svg::render::latex",
            tool,
            program = %program,
            exit_code = exit_code.map(i64::from).unwrap_or(-1),
            "Renderer tool failed"
        );
        return Err(RenderError::Command {
            program: program.clone(),
            exit_code,
            output: log.trim().to_string(),
        });
    }

    Ok(output)
}
