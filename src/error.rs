//! Error types for the math-svg extension.

use thiserror::Error;

/// Result type alias for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Directive error: {0}")]
    Directive(#[from] DirectiveError),

    #[error("Role error: {0}")]
    Role(#[from] RoleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether the host may report this error in the document and carry on.
    ///
    /// Renderer failures abort the document being built.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Directive(_) | Error::Role(_))
    }
}

/// Errors raised by the external formula renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{program} not found: {source}")]
    NotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed (exit {exit_code:?}): {output}")]
    Command {
        program: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("empty command line for {0}")]
    EmptyCommand(&'static str),

    #[error("{0}")]
    CommandLine(#[from] ConfigError),

    #[error("failed to prepare render workspace: {0}")]
    Io(#[from] std::io::Error),

    #[error("Math rendering error: {0}")]
    Math(String),
}

/// Validation errors raised by the `math` directive.
#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("content block expected for the \"{0}\" directive; none found")]
    EmptyContent(String),

    #[error(transparent)]
    Option(#[from] OptionError),
}

/// Validation errors raised by the `math` role.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("missing or unbalanced backtick in inline math: {rawtext}")]
    MissingMarker { rawtext: String },

    #[error("empty inline math: {rawtext}")]
    EmptyFormula { rawtext: String },

    #[error(transparent)]
    Option(#[from] OptionError),
}

/// A directive or role option the host could not accept.
#[derive(Debug, Error)]
pub enum OptionError {
    #[error("unknown option: \"{0}\"")]
    Unknown(String),

    #[error("invalid option value for \"{name}\": {message}")]
    Invalid { name: String, message: String },
}

/// Errors raised while loading rendering configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid command line {command:?}: {message}")]
    CommandLine { command: String, message: String },
}
