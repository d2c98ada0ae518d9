//! Expressions (spec.md §3 Expression), mutually recursive with [`crate::ast::ty::Type`].

use smallvec::SmallVec;

use crate::{
    ast::{arena::Idx, constant::Constant, ctor::Ctor, decl::DeclId, stmt::StmtId, ty::TypeId},
    id::Id,
    location::SourceRange,
    operator::{OperatorId, OperatorKind},
};

pub type ExprId = Idx<ExprNode>;

/// An expression together with its (initially possibly-unresolved) type and
/// source location.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExprNode {
    pub kind: Expr,
    pub ty: TypeId,
    pub location: SourceRange,
    pub comments: Vec<String>,
}

/// Up to three positional operands of an [`Expr::UnresolvedOperator`] /
/// [`Expr::ResolvedOperator`], inline-allocated (spec.md §4.2: "up to three
/// positional operands").
pub type Operands = SmallVec<[ExprId; 3]>;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Constant(Constant),
    Ctor(Ctor),
    Variable(DeclId),
    Parameter(DeclId),
    Function(DeclId),
    /// Reference to an imported module as a first-class value, used when
    /// resolving `A::f` before the `f` component is peeled off.
    Module(crate::intern::StringId),
    /// An expression that denotes a type itself (e.g. the operand of a
    /// `new` or `size` operator).
    Type(TypeId),
    /// Unresolved reference; rewritten in place by the resolver
    /// (spec.md §4.1).
    Id(Id),
    /// `inner` coerced to `target` by a successful [`crate::operator::Coercer`] match.
    Coerced { inner: ExprId, target: TypeId },
    /// The default value of `ty` (e.g. the field initializer `Unit`'s
    /// builder synthesizes when none is given).
    Default(TypeId),
    /// An expression-position block (used by some constructs to embed
    /// statements, e.g. `unit::&convert` hooks evaluated for their value).
    Block(StmtId),
    Assign { dst: ExprId, src: ExprId },
    Conditional { cond: ExprId, then_branch: ExprId, else_branch: ExprId },
    /// Not yet matched against the operator registry.
    UnresolvedOperator { kind: OperatorKind, operands: Operands },
    /// Uniquely matched against a registered operator (spec.md §4.2).
    ResolvedOperator { op: OperatorId, operands: Operands },
    /// Reserves a typed slot in the tree for a value filled in later by a
    /// downstream pass (e.g. codegen-inserted temporaries); never reaches
    /// the validator unresolved.
    PlaceHolder(TypeId),
}

impl Expr {
    /// True when this expression is safe to use as a compile-time variable
    /// initializer (spec.md §3 Expression "initializer()").
    #[must_use]
    pub fn is_initializer(&self) -> bool {
        matches!(
            self,
            Self::Constant(_) | Self::Ctor(_) | Self::Default(_) | Self::Type(_)
        )
    }

    /// True for the unresolved placeholder forms the final resolver pass
    /// must diagnose (spec.md §4.1 "report_unresolved").
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Id(_) | Self::UnresolvedOperator { .. })
    }
}
