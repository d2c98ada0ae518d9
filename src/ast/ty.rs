//! The type catalog (spec.md §3 Type).
//!
//! `Type` is mutually recursive with [`crate::ast::expr::Expr`]: a `Unit`
//! type embeds field types built from expressions (defaults, lengths), and
//! an expression's `Type::TypeType` variant embeds a type. Both arenas are
//! owned by the enclosing [`crate::ast::module::Module`]; recursive
//! references are [`TypeId`] indices rather than `Box<Type>`, per the
//! arena-of-indices design in `arena.rs`.

use indexmap::IndexMap;

use crate::{
    ast::arena::Idx,
    id::Id,
    intern::StringId,
    location::SourceRange,
};

pub type TypeId = Idx<TypeNode>;

/// A type together with its source location and doc comment, as stored in
/// a module's type arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TypeNode {
    pub kind: Type,
    pub location: SourceRange,
    /// Distinct from the general comment sequence on declarations —
    /// populated by `&doc` unit/field attributes (spec.md §3, supplemental
    /// from `original_source/binpac/attribute.cc`).
    pub doc: Option<String>,
}

/// Calling convention for a [`Type::Function`] or hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CallingConvention {
    Hilti,
    HiltiC,
    C,
    Hook,
}

/// A single labeled member of a [`Type::Bitset`] or [`Type::Enum`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Label {
    pub name: StringId,
    /// Explicit bit position (bitset) or integer value (enum); `None` means
    /// auto-assigned in declaration order.
    pub value: Option<i64>,
}

/// One parameter of a [`Type::Function`] or [`Type::Callable`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Param {
    pub name: Option<StringId>,
    pub ty: TypeId,
    pub optional: bool,
    pub location: SourceRange,
}

/// A declared field inside a [`Type::Struct`] or [`Type::Union`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FieldDecl {
    pub name: StringId,
    pub ty: TypeId,
    /// Compile-time default value, if any — must coerce to `ty` (validator
    /// rule, spec.md §4.5 Struct).
    pub default: Option<crate::ast::expr::ExprId>,
    pub location: SourceRange,
}

/// Where an [`Type::Overlay`] field starts (spec.md §4.5 Overlay fields).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum OverlayStart {
    /// Fixed byte offset from the start of the overlay.
    Offset(u64),
    /// Immediately after the named predecessor field, which must already be
    /// declared earlier in the same overlay.
    AfterField(StringId),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OverlayField {
    pub name: StringId,
    pub ty: TypeId,
    pub start: OverlayStart,
    pub location: SourceRange,
}

/// A parameter or item of a [`Type::Unit`] (protocol-parsing composite).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum UnitItem {
    Variable { name: StringId, ty: TypeId },
    Field { name: StringId, ty: TypeId, until: Option<crate::ast::expr::ExprId> },
    Property { name: StringId, value: Option<crate::ast::expr::ExprId> },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UnitType {
    pub params: Vec<Param>,
    pub items: Vec<UnitItem>,
}

/// Source for a [`Type::IOSource`] (file, socket, capture handle, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum IoSourceKind {
    File,
    Socket,
    Pcap,
}

/// Attributes of a [`Type::RegExp`] — the pattern set and match-token flag.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegExpAttrs {
    pub patterns: Vec<String>,
    /// `&nosub`-style flag: match as a token set rather than capturing groups.
    pub token_mode: bool,
}

/// The closed catalog of type variants (spec.md §3 Type).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Type {
    // --- Primitive value types ---
    Integer { width: u8, signed: bool },
    Bool,
    Double,
    String,
    Address,
    Network,
    Port,
    Time,
    Interval,
    CAddr,
    Void,
    Any,
    Label,
    Bitset(Vec<Label>),
    Enum(Vec<Label>),
    Bytes,

    // --- Composite value types ---
    Tuple(Vec<TypeId>),
    RegExp(RegExpAttrs),
    TypeType(TypeId),

    // --- Heap/reference types ---
    Reference(TypeId),
    List(TypeId),
    Vector(TypeId),
    Set(TypeId),
    Map(TypeId, TypeId),
    Channel(TypeId),
    Callable(TypeId, Vec<TypeId>),
    IOSource(IoSourceKind),
    File,
    Timer,
    TimerMgr,
    Classifier(TypeId, TypeId),
    Overlay(Vec<OverlayField>),
    Struct(Vec<FieldDecl>),
    Union(Vec<FieldDecl>),
    /// `base` must itself be an `Exception` type; `arg` is the payload type.
    Exception { base: Option<TypeId>, arg: Option<TypeId> },
    Unit(UnitType),
    /// Supplemental: the destination of a `&sink`-bound unit
    /// (`original_source/binpac/attribute.cc`); not explicit in spec.md's
    /// catalog but required for `Sinkable` attribute validation to type-check.
    Sink(TypeId),

    // --- Meta/infrastructure ---
    Iterator(TypeId),
    Function(TypeId, Vec<Param>, CallingConvention),
    Hook,
    /// Placeholder for a not-yet-resolved type; rewritten in place by the
    /// resolver (spec.md §4.1).
    Unknown(Id),
    TypeByName(Id),
    OptionalArgument(TypeId),
    MemberAttribute(Id),
    Unset,
}

/// The declarative capability set of a type (spec.md Glossary "Trait").
///
/// Hand-rolled rather than pulled in from a `bitflags`-style crate: the
/// teacher's dependency graph has no such crate anywhere, and eleven fixed
/// bits don't earn a new dependency (`Type::traits` is the only caller that
/// needs more than `contains`/`union`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TraitSet(u16);

impl TraitSet {
    pub const VALUE_TYPE: Self = Self(1 << 0);
    pub const HEAP_TYPE: Self = Self(1 << 1);
    pub const ITERABLE: Self = Self(1 << 2);
    pub const HASHABLE: Self = Self(1 << 3);
    pub const PARAMETERIZED: Self = Self(1 << 4);
    pub const TYPE_LIST: Self = Self(1 << 5);
    pub const CONTAINER: Self = Self(1 << 6);
    pub const SINKABLE: Self = Self(1 << 7);
    pub const PARSEABLE: Self = Self(1 << 8);
    pub const UNPACKABLE: Self = Self(1 << 9);
    pub const CLASSIFIABLE: Self = Self(1 << 10);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TraitSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Type {
    /// The trait set gating validation, coercion, and codegen dispatch for
    /// this type (spec.md §3 "Each type declares a trait set").
    #[must_use]
    pub fn traits(&self) -> TraitSet {
        use TraitSet as T;
        match self {
            Self::Integer { .. } => {
                T::VALUE_TYPE | T::HASHABLE | T::PARSEABLE | T::UNPACKABLE | T::CLASSIFIABLE
            }
            Self::Bool => T::VALUE_TYPE | T::HASHABLE,
            Self::Double => T::VALUE_TYPE,
            Self::String => T::VALUE_TYPE | T::HASHABLE,
            Self::Address => T::VALUE_TYPE | T::HASHABLE | T::PARSEABLE | T::UNPACKABLE | T::CLASSIFIABLE,
            Self::Network => T::VALUE_TYPE | T::CLASSIFIABLE,
            Self::Port => T::VALUE_TYPE | T::HASHABLE | T::PARSEABLE | T::UNPACKABLE | T::CLASSIFIABLE,
            Self::Time => T::VALUE_TYPE | T::PARSEABLE | T::UNPACKABLE,
            Self::Interval => T::VALUE_TYPE | T::PARSEABLE | T::UNPACKABLE,
            Self::CAddr => T::VALUE_TYPE,
            Self::Void | Self::Any | Self::Unset => T::empty(),
            Self::Label => T::VALUE_TYPE,
            Self::Bitset(_) => T::VALUE_TYPE | T::HASHABLE | T::PARSEABLE | T::UNPACKABLE,
            Self::Enum(_) => T::VALUE_TYPE | T::HASHABLE | T::PARSEABLE | T::UNPACKABLE,
            Self::Bytes => T::VALUE_TYPE | T::ITERABLE | T::HASHABLE | T::PARSEABLE | T::CLASSIFIABLE,
            Self::Tuple(_) => T::VALUE_TYPE | T::TYPE_LIST | T::CLASSIFIABLE,
            Self::RegExp(_) => T::VALUE_TYPE | T::PARAMETERIZED,
            Self::TypeType(_) => T::VALUE_TYPE | T::PARAMETERIZED,
            Self::Reference(_) => T::HEAP_TYPE | T::PARAMETERIZED,
            Self::List(_) => T::HEAP_TYPE | T::ITERABLE | T::PARAMETERIZED | T::CONTAINER,
            Self::Vector(_) => T::HEAP_TYPE | T::ITERABLE | T::PARAMETERIZED | T::CONTAINER,
            Self::Set(_) => T::HEAP_TYPE | T::ITERABLE | T::PARAMETERIZED | T::CONTAINER,
            Self::Map(_, _) => T::HEAP_TYPE | T::ITERABLE | T::PARAMETERIZED | T::CONTAINER,
            Self::Channel(_) => T::HEAP_TYPE | T::ITERABLE | T::PARAMETERIZED | T::CONTAINER,
            Self::Callable(_, _) => T::HEAP_TYPE | T::PARAMETERIZED,
            Self::IOSource(_) => T::HEAP_TYPE | T::PARAMETERIZED,
            Self::File | Self::Timer | Self::TimerMgr => T::HEAP_TYPE,
            Self::Classifier(_, _) => T::HEAP_TYPE | T::PARAMETERIZED,
            Self::Overlay(_) => T::HEAP_TYPE | T::PARSEABLE,
            Self::Struct(_) => T::HEAP_TYPE,
            Self::Union(_) => T::HEAP_TYPE,
            Self::Exception { .. } => T::HEAP_TYPE | T::PARAMETERIZED,
            Self::Unit(_) => T::HEAP_TYPE | T::PARSEABLE | T::SINKABLE,
            Self::Sink(_) => T::HEAP_TYPE | T::PARAMETERIZED | T::SINKABLE,
            Self::Iterator(_) => T::PARAMETERIZED,
            Self::Function(_, _, _) => T::empty(),
            Self::Hook => T::empty(),
            Self::Unknown(_) | Self::TypeByName(_) | Self::MemberAttribute(_) => T::empty(),
            Self::OptionalArgument(_) => T::PARAMETERIZED,
        }
    }

    #[must_use]
    pub fn has_trait(&self, t: TraitSet) -> bool {
        self.traits().contains(t)
    }

    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.has_trait(TraitSet::VALUE_TYPE)
    }

    #[must_use]
    pub fn is_heap_type(&self) -> bool {
        self.has_trait(TraitSet::HEAP_TYPE)
    }

    /// True for the still-unresolved placeholder variants the resolver must
    /// rewrite before validation (spec.md §4.1, §7 "Internal errors").
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unknown(_) | Self::TypeByName(_) | Self::MemberAttribute(_))
    }
}

/// Per-type declaration scope: enum/bitset labels and unit items install a
/// child scope keyed by the type's own id (spec.md §4.1 Scope construction).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TypeScope {
    pub members: IndexMap<StringId, crate::ast::expr::ExprId>,
}
