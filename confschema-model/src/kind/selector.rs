use confschema_core::Arity;

use super::TypeOps;

/// A `Map<name, Template-clone>`: each instance key instantiates a clone of
/// the named `template` type; `size` (an [`Arity`]) bounds the number of
/// keys. The only kind restricted in its permitted declared arity
/// (SPEC_FULL.md §4.6.1): a `Selector` instance is a single object, not an
/// array of selectors, so its own arity may only be `?` or `1`.
#[derive(Debug)]
pub struct Selector;

impl TypeOps for Selector {
    fn name(&self) -> &'static str {
        "select"
    }

    fn permitted_arity(&self, arity: &Arity) -> bool {
        matches!(arity.kind(), confschema_core::arity::Kind::UpToOne | confschema_core::arity::Kind::One)
    }

    fn is_object(&self) -> bool {
        true
    }
}
