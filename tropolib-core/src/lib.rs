//! Tropolib Core
//!
//! Declarative model of CloudFormation templates: property values and
//! intrinsic functions, resources, outputs and per-type schemas, rendered to
//! JSON or YAML.

pub mod naming;
pub mod resource;
pub mod schema;
pub mod template;

pub use resource::{Resource, Tag, Value};
pub use template::{Output, Template, TemplateError, TemplateResult};
