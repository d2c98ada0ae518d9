//! Operator registry and coercer (spec.md §4.2).
//!
//! Every expression built from more than one sub-expression — arithmetic,
//! comparison, indexing, attribute access, calls — goes through operator
//! matching rather than ad-hoc per-AST-node type rules. This mirrors the
//! teacher's binary-op dunder dispatch (`bytecode/vm/binary.rs`): try an
//! exact match first, then retry allowing coercion, and for commutative
//! kinds retry once more with operands swapped.

use smallvec::SmallVec;

use crate::{
    ast::{
        constant::Constant,
        expr::{Expr, Operands},
        module::Module,
        ty::{Type, TypeId, TypeNode},
    },
    diagnostics::{Diagnostic, DiagnosticKind},
    location::SourceRange,
};

/// Index of a registered [`OperatorDef`] inside an [`OperatorRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OperatorId(u32);

/// The kind of an operator use (spec.md §4.2 "its kind").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum OperatorKind {
    Equal,
    NotEqual,
    Lower,
    Greater,
    LowerEqual,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    Negate,
    Call,
    MethodCall,
    Coerce,
    Index,
    Attribute,
    Size,
    Begin,
    End,
    New,
    Cast,
    In,
    Deref,
    Incr,
    Decr,
}

impl OperatorKind {
    /// Kinds eligible for the commutative swap-and-retry step (spec.md
    /// §4.2 matching algorithm step 3).
    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Equal | Self::NotEqual | Self::Add | Self::Mul | Self::BitAnd | Self::BitOr | Self::BitXor
                | Self::LogicalAnd | Self::LogicalOr
        )
    }

    #[must_use]
    pub fn is_binary(self) -> bool {
        !matches!(
            self,
            Self::LogicalNot | Self::Negate | Self::Size | Self::New | Self::Deref | Self::Incr | Self::Decr
        )
    }
}

/// A coarse-grained description of what concrete types an operand spec
/// accepts. Kept separate from [`Type`] itself (rather than storing a
/// literal `Type` per signature) so one signature can match every integer
/// width, every container element type, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TypeShape {
    Integer,
    Bool,
    Double,
    String,
    Bytes,
    Address,
    Network,
    Port,
    Time,
    Interval,
    List,
    Vector,
    Set,
    Map,
    Tuple,
    Struct,
    Unit,
    Callable,
    Function,
    Reference,
    Enum,
    Bitset,
    Exception,
    Sink,
    Any,
}

#[must_use]
pub fn shape_of(ty: &Type) -> TypeShape {
    match ty {
        Type::Integer { .. } => TypeShape::Integer,
        Type::Bool => TypeShape::Bool,
        Type::Double => TypeShape::Double,
        Type::String => TypeShape::String,
        Type::Bytes => TypeShape::Bytes,
        Type::Address => TypeShape::Address,
        Type::Network => TypeShape::Network,
        Type::Port => TypeShape::Port,
        Type::Time => TypeShape::Time,
        Type::Interval => TypeShape::Interval,
        Type::List(_) => TypeShape::List,
        Type::Vector(_) => TypeShape::Vector,
        Type::Set(_) => TypeShape::Set,
        Type::Map(_, _) => TypeShape::Map,
        Type::Tuple(_) => TypeShape::Tuple,
        Type::Struct(_) => TypeShape::Struct,
        Type::Unit(_) => TypeShape::Unit,
        Type::Callable(_, _) => TypeShape::Callable,
        Type::Function(_, _, _) => TypeShape::Function,
        Type::Reference(_) => TypeShape::Reference,
        Type::Enum(_) => TypeShape::Enum,
        Type::Bitset(_) => TypeShape::Bitset,
        Type::Exception { .. } => TypeShape::Exception,
        Type::Sink(_) => TypeShape::Sink,
        _ => TypeShape::Any,
    }
}

/// What one positional or call-arg operand slot will accept.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum OperandSpec {
    Shape(TypeShape),
    /// `Any` is a universal match target (spec.md §4.2 "Any is a universal
    /// target").
    Any,
    /// Trailing call-arg that may be entirely absent
    /// (`Type::OptionalArgument`, spec.md §3, §4.2).
    Optional(TypeShape),
}

impl OperandSpec {
    #[must_use]
    pub fn matches(self, ty: &Type, allow_coerce: bool) -> bool {
        let actual = shape_of(ty);
        match self {
            Self::Any => true,
            Self::Shape(shape) | Self::Optional(shape) => {
                shape == actual || (allow_coerce && Coercer::shape_coercible(actual, shape))
            }
        }
    }
}

/// How a matched operator's result type is derived from its operand types.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum ResultRule {
    SameAsOperand(usize),
    ElementOfOperand(usize),
    Bool,
    Void,
    /// An unsigned 64-bit count (`size`/`length`-style operators).
    Size,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OperatorDef {
    pub id: OperatorId,
    pub kind: OperatorKind,
    pub operands: SmallVec<[OperandSpec; 3]>,
    /// Present only for `MethodCall`: up to five call-argument specs
    /// (spec.md §4.2 "up to five call-arguments for MethodCall").
    pub call_args: Option<Vec<OperandSpec>>,
    pub result: ResultRule,
    pub doc: String,
}

/// Registry of all known operator signatures (spec.md §4.2, §6 "Operator/Instruction registry API").
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct OperatorRegistry {
    defs: Vec<OperatorDef>,
}

impl OperatorRegistry {
    /// Registers every built-in operator signature the front end ships
    /// with. Front-end extension points may `register` more afterward.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut reg = Self::default();
        reg.register_builtins();
        reg
    }

    pub fn register(&mut self, kind: OperatorKind, operands: &[OperandSpec], result: ResultRule, doc: &str) -> OperatorId {
        let id = OperatorId(u32::try_from(self.defs.len()).expect("operator registry overflow"));
        self.defs.push(OperatorDef {
            id,
            kind,
            operands: operands.iter().copied().collect(),
            call_args: None,
            result,
            doc: doc.to_owned(),
        });
        id
    }

    pub fn register_method_call(
        &mut self,
        operands: &[OperandSpec],
        call_args: Vec<OperandSpec>,
        result: ResultRule,
        doc: &str,
    ) -> OperatorId {
        let id = OperatorId(u32::try_from(self.defs.len()).expect("operator registry overflow"));
        self.defs.push(OperatorDef {
            id,
            kind: OperatorKind::MethodCall,
            operands: operands.iter().copied().collect(),
            call_args: Some(call_args),
            result,
            doc: doc.to_owned(),
        });
        id
    }

    fn register_builtins(&mut self) {
        use OperandSpec::{Any, Shape};
        use ResultRule::{Bool as ResBool, ElementOfOperand, SameAsOperand, Size as ResSize};
        use TypeShape as S;

        for (shape, doc) in [
            (S::Integer, "integer arithmetic"),
            (S::Double, "floating-point arithmetic"),
        ] {
            for kind in [OperatorKind::Add, OperatorKind::Sub, OperatorKind::Mul, OperatorKind::Div, OperatorKind::Mod] {
                self.register(kind, &[Shape(shape), Shape(shape)], SameAsOperand(0), doc);
            }
        }
        for kind in [
            OperatorKind::Equal,
            OperatorKind::NotEqual,
            OperatorKind::Lower,
            OperatorKind::Greater,
            OperatorKind::LowerEqual,
            OperatorKind::GreaterEqual,
        ] {
            self.register(kind, &[Any, Any], ResBool, "value comparison");
        }
        self.register(OperatorKind::LogicalAnd, &[Shape(S::Bool), Shape(S::Bool)], ResBool, "logical and");
        self.register(OperatorKind::LogicalOr, &[Shape(S::Bool), Shape(S::Bool)], ResBool, "logical or");
        self.register(OperatorKind::LogicalNot, &[Shape(S::Bool)], ResBool, "logical not");
        self.register(OperatorKind::Negate, &[Shape(S::Integer)], SameAsOperand(0), "integer negation");
        self.register(OperatorKind::Negate, &[Shape(S::Double)], SameAsOperand(0), "double negation");

        for container in [S::List, S::Vector, S::Set] {
            self.register(OperatorKind::Size, &[Shape(container)], ResSize, "container size");
            self.register(OperatorKind::Index, &[Shape(container), Shape(S::Integer)], ElementOfOperand(0), "container indexing");
        }
        self.register(OperatorKind::Size, &[Shape(S::Bytes)], ResSize, "bytes length");
        self.register(OperatorKind::Index, &[Shape(S::Map), Any], ElementOfOperand(0), "map indexing");
        self.register(OperatorKind::Index, &[Shape(S::Bytes), Shape(S::Integer)], SameAsOperand(0), "bytes indexing");

        self.register(OperatorKind::Call, &[Shape(S::Function), Any], ResultRule::Void, "function call");
        self.register(OperatorKind::Call, &[Shape(S::Callable), Any], ResultRule::Void, "callable invocation");
        self.register(OperatorKind::Attribute, &[Shape(S::Struct), Any], ResultRule::Void, "struct field access");
        self.register(OperatorKind::Attribute, &[Shape(S::Unit), Any], ResultRule::Void, "unit field access");
        self.register(OperatorKind::New, &[Shape(S::Reference)], SameAsOperand(0), "heap allocation");
        self.register(OperatorKind::Begin, &[Shape(S::List)], ElementOfOperand(0), "sequence begin iterator");
        self.register(OperatorKind::End, &[Shape(S::List)], ElementOfOperand(0), "sequence end iterator");
        self.register(OperatorKind::Coerce, &[Any], SameAsOperand(0), "implicit coercion");
    }

    #[must_use]
    pub fn get(&self, id: OperatorId) -> &OperatorDef {
        &self.defs[id.0 as usize]
    }

    #[must_use]
    pub fn by_kind(&self, kind: OperatorKind) -> Vec<&OperatorDef> {
        self.defs.iter().filter(|d| d.kind == kind).collect()
    }

    /// Core matching algorithm (spec.md §4.2 "Matching algorithm").
    ///
    /// Returns every candidate that matches `operand_types` for `kind`,
    /// trying exact-type matching first and only allowing coercion if no
    /// exact match exists; for commutative binary kinds, operands are
    /// additionally tried swapped. `__match` refinement hooks are not
    /// modeled here (no registered builtin needs one); a future
    /// registration can still narrow by inspecting `OperatorDef::doc`/
    /// extra predicate fields without changing this algorithm's shape.
    #[must_use]
    pub fn get_matching(&self, kind: OperatorKind, operand_types: &[&Type]) -> Vec<(OperatorId, bool)> {
        let candidates = self.by_kind(kind);
        let exact: Vec<_> = candidates
            .iter()
            .filter(|d| operand_types_match(d, operand_types, false))
            .map(|d| (d.id, false))
            .collect();
        if !exact.is_empty() {
            return exact;
        }
        let mut coerced: Vec<_> = candidates
            .iter()
            .filter(|d| operand_types_match(d, operand_types, true))
            .map(|d| (d.id, true))
            .collect();
        if coerced.is_empty() && kind.is_commutative() && operand_types.len() == 2 {
            let swapped = [operand_types[1], operand_types[0]];
            coerced = candidates
                .iter()
                .filter(|d| operand_types_match(d, &swapped, true))
                .map(|d| (d.id, true))
                .collect();
        }
        coerced
    }

    /// Resolves a single operand list to a uniquely-matching operator,
    /// producing a diagnostic on zero or multiple matches (spec.md §4.2
    /// steps 4-5, §8 scenario 2 "ambiguous operator").
    pub fn resolve(
        &self,
        kind: OperatorKind,
        operand_types: &[&Type],
        location: SourceRange,
    ) -> Result<OperatorId, Diagnostic> {
        let matches = self.get_matching(kind, operand_types);
        match matches.len() {
            0 => Err(Diagnostic::new(
                DiagnosticKind::NoMatchingOperator,
                location,
                format!("no matching operator for {kind}"),
            )),
            1 => Ok(matches[0].0),
            _ => Err(Diagnostic::new(
                DiagnosticKind::AmbiguousOperator,
                location,
                format!(
                    "use of overloaded instruction {kind} is ambiguous\ncandidates:\n{}",
                    matches
                        .iter()
                        .map(|(id, _)| format!("  - {}", self.get(*id).doc))
                        .collect::<Vec<_>>()
                        .join("\n")
                ),
            )),
        }
    }
}

fn operand_types_match(def: &OperatorDef, operand_types: &[&Type], allow_coerce: bool) -> bool {
    if def.operands.len() != operand_types.len() {
        return false;
    }
    def.operands
        .iter()
        .zip(operand_types.iter())
        .all(|(spec, ty)| spec.matches(ty, allow_coerce))
}

/// Implicit-conversion engine, dispatched separately from operator
/// matching proper (spec.md §4.2 "Coercer").
pub struct Coercer;

impl Coercer {
    /// Whether a value of `from` can be implicitly converted to `to`.
    /// `Any` is a universal target; types equal under either direction of
    /// `Type::equal` coerce trivially with an identity coercion (spec.md
    /// §4.2, §8 property 2).
    #[must_use]
    pub fn can_coerce(from: &Type, to: &Type) -> bool {
        if matches!(to, Type::Any) {
            return true;
        }
        if let Type::OptionalArgument(_) = to {
            return true;
        }
        if types_structurally_equal(from, to) {
            return true;
        }
        Self::shape_coercible(shape_of(from), shape_of(to))
    }

    /// Coarse shape-level coercibility used by operand matching's
    /// "allow coercion" retry — e.g. any `Integer` width coerces toward
    /// any other `Integer` width (narrowing is checked at the constant
    /// level by `Constant::fits_integer_width`; for non-constant
    /// expressions the downstream code generator inserts a runtime check).
    #[must_use]
    pub fn shape_coercible(from: TypeShape, to: TypeShape) -> bool {
        use TypeShape::{Any, Bool, Double, Integer};
        if from == to || to == Any {
            return true;
        }
        matches!((from, to), (Integer, Bool) | (Bool, Integer) | (Integer, Double))
    }

    /// Folds a constant-to-constant coercion at compile time (spec.md
    /// §4.2 "Constant-to-constant coercion is special-cased"). Returns
    /// `None` when the source constant cannot be represented as `target`.
    /// `target_id` is threaded through rather than invented here, since a
    /// folded constant must point at the caller's own arena slot for
    /// `target`.
    #[must_use]
    pub fn fold_constant(value: &Constant, target: &Type, target_id: TypeId) -> Option<Constant> {
        match (value, target) {
            (Constant::Integer { value, .. }, Type::Integer { width, signed }) => {
                Constant::fits_integer_width(*value, *width, *signed)
                    .then(|| Constant::Integer { value: *value, ty: target_id })
            }
            (Constant::Integer { value, .. }, Type::Bool) => Some(Constant::Bool(*value != 0)),
            (Constant::Integer { value, .. }, Type::Double) => Some(Constant::Double(*value as f64)),
            (Constant::Tuple(elems), Type::Tuple(_)) => {
                // Elementwise folding is driven by the resolver, which has
                // access to each element type; here we only validate shape.
                Some(Constant::Tuple(elems.clone()))
            }
            _ => None,
        }
    }
}

fn types_structurally_equal(a: &Type, b: &Type) -> bool {
    shape_of(a) == shape_of(b)
        && match (a, b) {
            (Type::Integer { width: w1, signed: s1 }, Type::Integer { width: w2, signed: s2 }) => w1 == w2 && s1 == s2,
            _ => true,
        }
}

/// Helper the resolver uses to look up or synthesize commonly-needed
/// well-known types (`Bool`, `Void`) inside a module's arena without
/// duplicating a fresh node for every use site.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WellKnownTypes {
    bool_ty: Option<TypeId>,
    void_ty: Option<TypeId>,
    size_ty: Option<TypeId>,
}

impl WellKnownTypes {
    pub fn bool_type(&mut self, module: &mut Module, location: SourceRange) -> TypeId {
        if let Some(id) = self.bool_ty {
            return id;
        }
        let id = module.types.push(TypeNode { kind: Type::Bool, location, doc: None });
        self.bool_ty = Some(id);
        id
    }

    pub fn void_type(&mut self, module: &mut Module, location: SourceRange) -> TypeId {
        if let Some(id) = self.void_ty {
            return id;
        }
        let id = module.types.push(TypeNode { kind: Type::Void, location, doc: None });
        self.void_ty = Some(id);
        id
    }

    /// The unsigned 64-bit type `size`/`length`-style operators return.
    pub fn size_type(&mut self, module: &mut Module, location: SourceRange) -> TypeId {
        if let Some(id) = self.size_ty {
            return id;
        }
        let id = module.types.push(TypeNode {
            kind: Type::Integer { width: 64, signed: false },
            location,
            doc: None,
        });
        self.size_ty = Some(id);
        id
    }
}

/// Resolves `rule` against concrete operand types, producing the result
/// `TypeId` in `module`'s arena. `well_known` caches `Bool`/`Void` nodes
/// across calls.
pub fn apply_result_rule(
    rule: ResultRule,
    operand_tys: &[TypeId],
    module: &mut Module,
    well_known: &mut WellKnownTypes,
    location: SourceRange,
) -> TypeId {
    match rule {
        ResultRule::SameAsOperand(i) => operand_tys[i],
        ResultRule::Bool => well_known.bool_type(module, location),
        ResultRule::Void => well_known.void_type(module, location),
        ResultRule::Size => well_known.size_type(module, location),
        ResultRule::ElementOfOperand(i) => {
            let elem = match &module.ty(operand_tys[i]).kind {
                Type::List(e) | Type::Vector(e) | Type::Set(e) | Type::Map(_, e) => *e,
                _ => operand_tys[i],
            };
            elem
        }
    }
}

/// Convenience used by the resolver to build a [`Expr::ResolvedOperator`]
/// once [`OperatorRegistry::resolve`] has produced an id.
#[must_use]
pub fn resolved_operator_expr(op: OperatorId, operands: Operands) -> Expr {
    Expr::ResolvedOperator { op, operands }
}
