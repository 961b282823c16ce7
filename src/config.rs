//! Rendering parameters shared by every formula render call.
//!
//! [`RenderParams::default`] is the parameter set published by the LaTeX to
//! SVG pipeline. [`RenderParams::site`] overrides the preamble and the
//! `dvisvgm` invocation for documentation pages, and [`MathConfig`] lets a
//! site layer its own TOML overrides on top before the record is frozen.

use crate::error::ConfigError;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map},
    multi::{many1, separated_list0},
    sequence::delimited,
    IResult,
};
use serde::Deserialize;
use std::path::PathBuf;

/// LaTeX document wrapped around every formula.
pub const DEFAULT_TEMPLATE: &str = r"\documentclass[{{ fontsize }}pt,preview]{standalone}
{{ preamble }}
\begin{document}
\begin{preview}
{{ code }}
\end{preview}
\end{document}
";

/// Preamble published with the renderer defaults.
pub const DEFAULT_PREAMBLE: &str = r"
\usepackage[utf8x]{inputenc}
\usepackage{amsmath}
\usepackage{amsfonts}
\usepackage{amssymb}
\usepackage{newtxtext}
\usepackage[libertine]{newtxmath}
";

/// Preamble used for documentation pages.
///
/// Leaves out the libertine math fonts, they clash with the page fonts.
pub const SITE_PREAMBLE: &str = r"
\usepackage[utf8x]{inputenc}
\usepackage{amsmath}
\usepackage{amsfonts}
\usepackage{amssymb}
\usepackage{newtxtext}
";

pub const DEFAULT_LATEX_CMD: &str = "latex -interaction nonstopmode -halt-on-error";
pub const DEFAULT_DVISVGM_CMD: &str = "dvisvgm --no-fonts";

/// No embedded fonts, letters zoomed to match the page font size.
pub const SITE_DVISVGM_CMD: &str = "dvisvgm --no-fonts -Z 1.25";

/// Parameters handed to the formula renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    /// Nominal font size in points.
    pub font_size: u32,
    /// LaTeX document template with `{{ preamble }}`, `{{ fontsize }}` and `{{ code }}` placeholders.
    pub template: String,
    /// Packages loaded before the document body.
    pub preamble: String,
    /// Command line producing a DVI file from `code.tex`.
    pub latex_cmd: String,
    /// Command line converting `code.dvi` to SVG.
    pub dvisvgm_cmd: String,
    /// Ghostscript library exported as `LIBGS` to dvisvgm.
    pub libgs: Option<PathBuf>,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            font_size: 12,
            template: DEFAULT_TEMPLATE.to_string(),
            preamble: DEFAULT_PREAMBLE.to_string(),
            latex_cmd: DEFAULT_LATEX_CMD.to_string(),
            dvisvgm_cmd: DEFAULT_DVISVGM_CMD.to_string(),
            libgs: None,
        }
    }
}

impl RenderParams {
    /// Defaults with the documentation-site preamble and `dvisvgm` flags.
    pub fn site() -> Self {
        Self {
            preamble: SITE_PREAMBLE.to_string(),
            dvisvgm_cmd: SITE_DVISVGM_CMD.to_string(),
            ..Self::default()
        }
    }

    /// Fill the template with the preamble, font size and formula code.
    pub fn document(&self, code: &str) -> String {
        self.template
            .replace("{{ preamble }}", &self.preamble)
            .replace("{{ fontsize }}", &self.font_size.to_string())
            .replace("{{ code }}", code)
    }

    /// Zoom factor passed to dvisvgm with `-Z` or `--zoom`, 1.0 when absent.
    pub fn zoom(&self) -> f64 {
        let Ok(args) = split_command_line(&self.dvisvgm_cmd) else {
            return 1.0;
        };

        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            let value = match arg.as_str() {
                "-Z" | "--zoom" => iter.next().map(String::as_str),
                other => other
                    .strip_prefix("--zoom=")
                    .or_else(|| other.strip_prefix("-Z")),
            };
            if let Some(zoom) = value.and_then(|v| v.parse::<f64>().ok()) {
                return zoom;
            }
        }

        1.0
    }

    /// Argument vector for the LaTeX invocation.
    pub fn latex_args(&self) -> Result<Vec<String>, ConfigError> {
        split_command_line(&self.latex_cmd)
    }

    /// Argument vector for the dvisvgm invocation.
    pub fn dvisvgm_args(&self) -> Result<Vec<String>, ConfigError> {
        split_command_line(&self.dvisvgm_cmd)
    }
}

/// User overrides for [`RenderParams`], read from TOML.
///
/// Every field is optional; anything left out keeps the site default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MathConfig {
    pub font_size: Option<u32>,
    pub template: Option<String>,
    pub preamble: Option<String>,
    pub latex_cmd: Option<String>,
    pub dvisvgm_cmd: Option<String>,
    pub libgs: Option<PathBuf>,
}

impl MathConfig {
    /// Parse overrides from a TOML document.
    ///
    /// Accepts either a document with a `[math]` table or the bare table.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(input)?;
        let config: MathConfig = match table.get("math") {
            Some(math) => math.clone().try_into()?,
            None => toml::Value::Table(table).try_into()?,
        };
        Ok(config)
    }

    /// Apply the overrides on top of `base`.
    pub fn apply(self, base: RenderParams) -> RenderParams {
        RenderParams {
            font_size: self.font_size.unwrap_or(base.font_size),
            template: self.template.unwrap_or(base.template),
            preamble: self.preamble.unwrap_or(base.preamble),
            latex_cmd: self.latex_cmd.unwrap_or(base.latex_cmd),
            dvisvgm_cmd: self.dvisvgm_cmd.unwrap_or(base.dvisvgm_cmd),
            libgs: self.libgs.or(base.libgs),
        }
    }

    /// Site defaults with these overrides, command lines checked.
    pub fn into_params(self) -> Result<RenderParams, ConfigError> {
        let params = self.apply(RenderParams::site());
        params.latex_args()?;
        params.dvisvgm_args()?;
        Ok(params)
    }
}

/// Split a shell-like command line into arguments.
///
/// Single and double quotes group words; there is no escape handling.
pub fn split_command_line(command: &str) -> Result<Vec<String>, ConfigError> {
    all_consuming(command_line)(command)
        .map(|(_, args)| args)
        .map_err(|e| ConfigError::CommandLine {
            command: command.to_string(),
            message: match e {
                nom::Err::Error(e) | nom::Err::Failure(e) => {
                    format!("unbalanced quote near {:?}", e.input)
                }
                nom::Err::Incomplete(_) => "incomplete input".to_string(),
            },
        })
}

fn command_line(input: &str) -> IResult<&str, Vec<String>> {
    delimited(multispace0, separated_list0(multispace1, argument), multispace0)(input)
}

fn argument(input: &str) -> IResult<&str, String> {
    map(many1(alt((single_quoted, double_quoted, bare_word))), |parts| {
        parts.concat()
    })(input)
}

fn single_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_while(|c| c != '\''), char('\''))(input)
}

fn double_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"'))(input)
}

fn bare_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != '\'' && c != '"')(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_site_overrides_two_fields() {
        let defaults = RenderParams::default();
        let site = RenderParams::site();

        assert_eq!(site.font_size, defaults.font_size);
        assert_eq!(site.template, defaults.template);
        assert_eq!(site.latex_cmd, defaults.latex_cmd);
        assert_eq!(site.libgs, defaults.libgs);
        assert_eq!(site.dvisvgm_cmd, "dvisvgm --no-fonts -Z 1.25");
        assert!(!site.preamble.contains("libertine"));
        assert!(site.preamble.contains(r"\usepackage{amsmath}"));
    }

    #[test]
    fn test_document_fills_template() {
        let params = RenderParams::site();
        let doc = params.document("$x^2$");

        assert!(doc.starts_with(r"\documentclass[12pt,preview]{standalone}"));
        assert!(doc.contains(r"\usepackage{newtxtext}"));
        assert!(doc.contains("\\begin{preview}\n$x^2$\n\\end{preview}"));
    }

    #[test]
    fn test_zoom() {
        assert_eq!(RenderParams::default().zoom(), 1.0);
        assert_eq!(RenderParams::site().zoom(), 1.25);

        let mut params = RenderParams::default();
        params.dvisvgm_cmd = "dvisvgm --zoom=1.5 --no-fonts".into();
        assert_eq!(params.zoom(), 1.5);

        params.dvisvgm_cmd = "dvisvgm -Z2".into();
        assert_eq!(params.zoom(), 2.0);
    }

    #[test]
    fn test_split_command_line() {
        assert_eq!(
            split_command_line("  latex -interaction nonstopmode ").unwrap(),
            vec!["latex", "-interaction", "nonstopmode"]
        );
        assert_eq!(
            split_command_line(r#"dvisvgm --libgs='/opt/gs lib' "a b"c"#).unwrap(),
            vec!["dvisvgm", "--libgs=/opt/gs lib", "a bc"]
        );
        assert!(split_command_line("").unwrap().is_empty());
        assert!(split_command_line("dvisvgm 'oops").is_err());
    }

    #[test]
    fn test_config_from_math_table() {
        let config = MathConfig::from_toml_str(
            r#"
[math]
font_size = 10
dvisvgm_cmd = "dvisvgm --no-fonts -Z 1.5"
"#,
        )
        .unwrap();

        let params = config.into_params().unwrap();
        assert_eq!(params.font_size, 10);
        assert_eq!(params.zoom(), 1.5);
        assert_eq!(params.preamble, SITE_PREAMBLE);
    }

    #[test]
    fn test_config_bare_table() {
        let config = MathConfig::from_toml_str(r#"libgs = "/usr/lib/libgs.so""#).unwrap();
        assert_eq!(config.libgs, Some(PathBuf::from("/usr/lib/libgs.so")));
        assert_eq!(config.apply(RenderParams::site()).dvisvgm_cmd, SITE_DVISVGM_CMD);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(MathConfig::from_toml_str("[math]\nzoom = 2").is_err());
    }

    #[test]
    fn test_config_rejects_bad_command() {
        let config = MathConfig {
            latex_cmd: Some("latex 'unterminated".into()),
            ..MathConfig::default()
        };
        assert!(matches!(
            config.into_params(),
            Err(ConfigError::CommandLine { .. })
        ));
    }
}
