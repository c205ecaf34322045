//! Guessing how a member access should be spelled.
//!
//! RiriLang has no static types, so the emitter decides from syntax alone
//! whether `object` is a value aggregate (string, vector, request struct)
//! accessed with `.`, or a class instance held by `std::shared_ptr` and
//! accessed with `->`. The guess is deliberately local and imprecise.

use crate::ast::Expr;
use crate::codegen_cpp::EmitOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverShape {
    /// Accessed in place: `obj.size()`, `obj.substr`.
    ValueAggregate,
    /// Accessed through a pointer: `(obj)->field`.
    ReferenceAggregate,
    /// Left to C++ overload resolution (`_riri_push` / `_riri_pop`).
    Unknown,
}

/// Members that only exist on strings and vectors.
pub const VALUE_MEMBERS: &[&str] = &["length", "size", "substr", "at", "push_back", "pop_back"];

pub fn classify_receiver(object: &Expr, property: &str, options: &EmitOptions) -> ReceiverShape {
    if property == "push" || property == "pop" {
        return ReceiverShape::Unknown;
    }
    if VALUE_MEMBERS.contains(&property) {
        return ReceiverShape::ValueAggregate;
    }
    if options.gui_toolkit && object.is_identifier("document") {
        return ReceiverShape::ValueAggregate;
    }
    if options.http_server {
        if matches!(property, "params" | "query") {
            return ReceiverShape::ValueAggregate;
        }
        if property == "body" && object.is_identifier("req") {
            return ReceiverShape::ValueAggregate;
        }
    }
    ReceiverShape::ReferenceAggregate
}
