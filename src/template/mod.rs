//! CloudFormation template model.
//!
//! The declared-resource structures produced by synthesis, plus the
//! intrinsic-function helpers and template fingerprinting.

mod document;
mod hash;

pub use document::{
    get_att, join, ref_to, select_az, sub, tag, DeletionPolicy, Output, Resource, Template,
    TEMPLATE_FORMAT_VERSION,
};
pub use hash::TemplateHasher;
