//! The runtime value representation.
//!
//! Scalars (`Int`, `Bool`) live inline; strings, arrays and dicts are
//! heap-backed and refcounted through [`crate::heap::Heap`]; functions carry
//! a direct reference to their defining AST node plus an `Rc`-shared
//! captures map (see [`crate::function::FunctionHandle`]). The shape is an
//! inline tag for immediates plus a `HeapId` indirection for everything
//! heap-shaped — no leak-detector feature flag, since that depends on
//! multi-threaded bookkeeping this single-threaded interpreter doesn't need.

use crate::function::FunctionHandle;
use crate::heap::{Heap, HeapData, HeapId};

#[derive(Debug, Clone)]
pub enum Value<'a> {
    Int(i64),
    Bool(bool),
    Str(HeapId),
    Array(HeapId),
    Dict(HeapId),
    Function(FunctionHandle<'a>),
}

impl<'a> Value<'a> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dictionary",
            Self::Function(_) => "function",
        }
    }

    /// Bumps the refcount of the backing heap slot, if this value is
    /// heap-shaped. Called whenever a value is stored somewhere it didn't
    /// already live (binding a let, pushing into an array/dict), per the
    /// read-through-boundary lifetime discipline every compound value
    /// follows.
    pub fn add_ref(&self, heap: &mut Heap<'a>) {
        if let Self::Str(id) | Self::Array(id) | Self::Dict(id) = self {
            heap.inc_ref(*id);
        }
    }

    /// Drops the refcount of the backing heap slot, freeing it (and
    /// recursively releasing its children) when it reaches zero.
    pub fn release(&self, heap: &mut Heap<'a>) {
        if let Self::Str(id) | Self::Array(id) | Self::Dict(id) = self {
            heap.dec_ref(*id);
        }
    }

    /// Produces an independent value with no aliasing to `self`.
    /// Scalars and function handles are returned as-is (functions alias
    /// their closure environment rather than copying it); compounds are
    /// recursively rebuilt into fresh heap slots.
    pub fn deep_copy(&self, heap: &mut Heap<'a>) -> Value<'a> {
        match self {
            Self::Int(_) | Self::Bool(_) | Self::Function(_) => self.clone(),
            Self::Str(id) => {
                let s = heap.get(*id).as_str().to_owned();
                Value::Str(heap.allocate(HeapData::Str(s)))
            }
            Self::Array(id) => {
                let items: Vec<Value<'a>> = heap.get(*id).as_array().to_vec();
                let copied: Vec<Value<'a>> = items.iter().map(|v| v.deep_copy(heap)).collect();
                Value::Array(heap.allocate(HeapData::Array(copied)))
            }
            Self::Dict(id) => {
                let entries: Vec<(Value<'a>, Value<'a>)> = heap.get(*id).as_dict().to_vec();
                let copied: Vec<(Value<'a>, Value<'a>)> =
                    entries.iter().map(|(k, v)| (k.deep_copy(heap), v.deep_copy(heap))).collect();
                Value::Dict(heap.allocate(HeapData::Dict(copied)))
            }
        }
    }

    /// Structural equality: compounds compare by contents,
    /// not by heap identity; functions compare by AST-node identity.
    pub fn structural_eq(&self, other: &Value<'a>, heap: &Heap<'a>) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => heap.get(*a).as_str() == heap.get(*b).as_str(),
            (Self::Array(a), Self::Array(b)) => {
                let a = heap.get(*a).as_array();
                let b = heap.get(*b).as_array();
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y, heap))
            }
            (Self::Dict(a), Self::Dict(b)) => {
                let a = heap.get(*a).as_dict();
                let b = heap.get(*b).as_dict();
                a.len() == b.len()
                    && a.iter().all(|(ak, av)| {
                        b.iter().any(|(bk, bv)| ak.structural_eq(bk, heap) && av.structural_eq(bv, heap))
                    })
            }
            (Self::Function(a), Self::Function(b)) => a.ast_id() == b.ast_id(),
            _ => false,
        }
    }

    /// Renders the value's display form, used for `puts`, string
    /// concatenation, and error messages. Strings are quoted here; use
    /// [`Self::render_top`] for the unquoted top-level form.
    pub fn render(&self, heap: &Heap<'a>) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Str(id) => format!("{:?}", heap.get(*id).as_str()),
            Self::Array(id) => {
                let items = heap.get(*id).as_array();
                let rendered: Vec<String> = items.iter().map(|v| v.render(heap)).collect();
                format!("[{}]", rendered.join(", "))
            }
            Self::Dict(id) => {
                let entries = heap.get(*id).as_dict();
                let rendered: Vec<String> =
                    entries.iter().map(|(k, v)| format!("{}: {}", k.render(heap), v.render(heap))).collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Self::Function(f) => f.render(),
        }
    }

    /// Top-level render used by `puts` and string concatenation's
    /// value-render of a bare string.
    pub fn render_top(&self, heap: &Heap<'a>) -> String {
        match self {
            Self::Str(id) => heap.get(*id).as_str().to_owned(),
            other => other.render(heap),
        }
    }
}

/// Looks up a key in a dict's entry list by structural equality, returning
/// its index.
pub fn dict_find<'a>(entries: &[(Value<'a>, Value<'a>)], key: &Value<'a>, heap: &Heap<'a>) -> Option<usize> {
    entries.iter().position(|(k, _)| k.structural_eq(key, heap))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_copy_of_a_string_allocates_a_fresh_slot() {
        let mut heap = Heap::new();
        let original = Value::Str(heap.allocate(HeapData::Str("hi".to_owned())));
        let copy = original.deep_copy(&mut heap);
        let Value::Str(a) = original else { unreachable!() };
        let Value::Str(b) = copy else { unreachable!() };
        assert_ne!(a, b);
        assert_eq!(heap.get(a).as_str(), heap.get(b).as_str());
    }

    #[test]
    fn deep_copy_is_an_identity_on_structural_equality() {
        let mut heap = Heap::new();
        let arr = Value::Array(heap.allocate(HeapData::Array(vec![Value::Int(1), Value::Int(2)])));
        let copy = arr.deep_copy(&mut heap);
        assert!(arr.structural_eq(&copy, &heap));
    }

    #[test]
    fn arrays_compare_structurally_not_by_heap_identity() {
        let mut heap = Heap::new();
        let a = Value::Array(heap.allocate(HeapData::Array(vec![Value::Int(1)])));
        let b = Value::Array(heap.allocate(HeapData::Array(vec![Value::Int(1)])));
        assert!(a.structural_eq(&b, &heap));
    }

    #[test]
    fn dicts_compare_by_key_set_regardless_of_insertion_order() {
        let mut heap = Heap::new();
        let a = Value::Dict(heap.allocate(HeapData::Dict(vec![
            (Value::Str(heap.allocate(HeapData::Str("x".to_owned()))), Value::Int(1)),
            (Value::Str(heap.allocate(HeapData::Str("y".to_owned()))), Value::Int(2)),
        ])));
        let b = Value::Dict(heap.allocate(HeapData::Dict(vec![
            (Value::Str(heap.allocate(HeapData::Str("y".to_owned()))), Value::Int(2)),
            (Value::Str(heap.allocate(HeapData::Str("x".to_owned()))), Value::Int(1)),
        ])));
        assert!(a.structural_eq(&b, &heap));
    }

    #[test]
    fn render_quotes_strings_inside_aggregates_but_not_at_top_level() {
        let mut heap = Heap::new();
        let s = Value::Str(heap.allocate(HeapData::Str("hi".to_owned())));
        assert_eq!(s.render(&heap), "\"hi\"");
        assert_eq!(s.render_top(&heap), "hi");
    }

    #[test]
    fn equality_is_commutative() {
        let mut heap = Heap::new();
        let a = Value::Array(heap.allocate(HeapData::Array(vec![Value::Bool(true)])));
        let b = Value::Array(heap.allocate(HeapData::Array(vec![Value::Bool(true)])));
        assert_eq!(a.structural_eq(&b, &heap), b.structural_eq(&a, &heap));
    }
}
