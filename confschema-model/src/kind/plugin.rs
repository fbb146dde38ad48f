use super::TypeOps;

/// An option whose children are each dispatched to the first registered
/// plugin model whose trigger path matches that child's location
/// (spec.md §4.6). Dispatch reads the [`crate::registry::Registry`]'s
/// trigger map, so it lives on [`crate::basic_type::BasicType`]; this
/// marker only carries the kind's identity and object-ness.
#[derive(Debug)]
pub struct Plugin;

impl TypeOps for Plugin {
    fn name(&self) -> &'static str {
        "plugin"
    }

    fn is_object(&self) -> bool {
        true
    }
}
