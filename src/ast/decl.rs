//! Declarations (spec.md §3 Declaration).

use crate::{
    ast::{arena::Idx, expr::ExprId, ty::TypeId},
    id::Id,
    location::SourceRange,
};

pub type DeclId = Idx<Declaration>;

/// Visibility/origin of a declaration (spec.md §3 Declaration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Linkage {
    Local,
    Private,
    Exported,
    Imported,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum DeclKind {
    Variable { ty: TypeId, init: Option<ExprId> },
    Constant { ty: TypeId, value: ExprId },
    Type { ty: TypeId },
    Function { ty: TypeId, body: Option<crate::ast::stmt::StmtId> },
    /// A hook may be declared multiple times with an overload priority
    /// (spec.md Glossary "Hook"); each declaration is a separate `Hook`
    /// entry sharing the same `id`.
    Hook { ty: TypeId, priority: i32, body: crate::ast::stmt::StmtId },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Declaration {
    pub id: Id,
    pub linkage: Linkage,
    pub kind: DeclKind,
    pub location: SourceRange,
    pub comments: Vec<String>,
}

impl Declaration {
    #[must_use]
    pub fn is_hook(&self) -> bool {
        matches!(self.kind, DeclKind::Hook { .. })
    }

    #[must_use]
    pub fn ty(&self) -> TypeId {
        match &self.kind {
            DeclKind::Variable { ty, .. }
            | DeclKind::Constant { ty, .. }
            | DeclKind::Type { ty }
            | DeclKind::Function { ty, .. }
            | DeclKind::Hook { ty, .. } => *ty,
        }
    }
}
