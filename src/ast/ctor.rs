//! Constructed-aggregate expressions (spec.md §3 Expression "Ctor").
//!
//! A `Ctor` builds a heap or composite value from element expressions —
//! list/vector/set/map literals, struct literals, and regexp literals. It
//! is distinct from [`crate::ast::constant::Constant`]: a ctor's elements
//! may themselves be arbitrary (non-constant) expressions.

use crate::{ast::expr::ExprId, ast::ty::TypeId, intern::StringId};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Ctor {
    List { elem_ty: TypeId, elements: Vec<ExprId> },
    Vector { elem_ty: TypeId, elements: Vec<ExprId> },
    Set { elem_ty: TypeId, elements: Vec<ExprId> },
    Map { key_ty: TypeId, value_ty: TypeId, entries: Vec<(ExprId, ExprId)> },
    Tuple(Vec<ExprId>),
    /// `{ field: value, ... }` against a `Type::Struct`.
    Struct { ty: TypeId, fields: Vec<(StringId, ExprId)> },
    Bytes(Vec<u8>),
    RegExp(Vec<String>),
    /// Classifier rule construction: key tuple + associated value.
    Classifier { ty: TypeId, entries: Vec<(ExprId, ExprId)> },
}
