use super::TypeOps;

/// An option whose value is an instance of another loaded [`crate::model::Model`],
/// named by the owning [`crate::basic_type::BasicType`]'s `model` attribute.
/// Dispatch and nested-pipeline recursion live in
/// [`crate::basic_type::BasicType`]/[`crate::pipeline`], which have access
/// to the [`crate::registry::Registry`]; this marker only carries the
/// kind's identity and object-ness.
#[derive(Debug)]
pub struct Class;

impl TypeOps for Class {
    fn name(&self) -> &'static str {
        "class"
    }

    fn is_object(&self) -> bool {
        true
    }
}
