//! Document-processing host the math extension plugs into.
//!
//! Mirrors the parts of a reStructuredText toolchain an extension sees:
//! directive and role traits, their option handling, a registry, the node
//! tree and an HTML writer.

pub mod node;
pub mod options;
pub mod reader;
pub mod registry;

pub use node::{render_html, Attributes, Level, Node, RawNode, SystemMessage};
pub use options::{class_option, Options};
pub use reader::parse_document;
pub use registry::{Directive, DirectiveInvocation, Registry, Role, RoleInvocation};
