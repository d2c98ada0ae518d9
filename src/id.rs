//! Identifiers: possibly-scoped dotted name paths (spec.md §3 Identifier).

use std::fmt;

use smallvec::SmallVec;

use crate::{intern::StringId, location::SourceRange};

/// A possibly-scoped dotted identifier, e.g. `conn`, `Main::run`, or
/// `a.b.c`. Comparison is structural equality of the component path, not
/// of source text — two `ID`s built from the same components at different
/// source locations are equal.
///
/// Stored inline for up to three components (the overwhelming majority of
/// identifiers in protocol units: `field`, `Unit::field`, `Module::Unit::field`)
/// before spilling to the heap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Id {
    components: SmallVec<[StringId; 3]>,
    pub location: SourceRange,
}

impl Id {
    #[must_use]
    pub fn new(components: impl IntoIterator<Item = StringId>, location: SourceRange) -> Self {
        Self {
            components: components.into_iter().collect(),
            location,
        }
    }

    #[must_use]
    pub fn unqualified(name: StringId, location: SourceRange) -> Self {
        Self {
            components: SmallVec::from_slice(&[name]),
            location,
        }
    }

    #[must_use]
    pub fn components(&self) -> &[StringId] {
        &self.components
    }

    /// True for `a.b` style ids that cross a scope boundary.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.components.len() > 1
    }

    /// The first path component — for a scoped id, the module/type prefix
    /// used to look up a child scope (spec.md §3 Scope lookup).
    #[must_use]
    pub fn head(&self) -> StringId {
        self.components[0]
    }

    /// All but the first path component, as a new `Id` anchored at the same
    /// location — used when recursing into a child scope.
    #[must_use]
    pub fn tail(&self) -> Option<Id> {
        if self.components.len() <= 1 {
            return None;
        }
        Some(Self {
            components: self.components[1..].iter().copied().collect(),
            location: self.location,
        })
    }

    /// The final path component — the unqualified name the id ultimately
    /// refers to.
    #[must_use]
    pub fn local_name(&self) -> StringId {
        *self.components.last().expect("Id always has >=1 component")
    }

    /// Renders as `a::b::c` for diagnostics.
    #[must_use]
    pub fn render(&self, interner: &crate::intern::Interner) -> String {
        self.components
            .iter()
            .map(|c| interner.resolve(*c))
            .collect::<Vec<_>>()
            .join("::")
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<id with {} component(s)>", self.components.len())
    }
}
