//! String interning for identifiers, filenames, and module-search paths.
//!
//! Every name that flows through the AST — identifier components, filenames,
//! struct/field names — is interned once and referenced afterward by a
//! `Copy` [`StringId`]. This keeps nodes small and makes identifier equality
//! (used constantly by scope lookup) a `u32` comparison instead of a string
//! compare.
//!
//! `StringId` values below [`StringId::RESERVED_COUNT`] are reserved for
//! well-known names the compiler itself needs to recognize without a hash
//! lookup (`Main`, `run`, the implicit `libhilti` import). Everything else
//! is interned on first use starting at [`StringId::RESERVED_COUNT`].

use ahash::AHashMap;

/// Index into an [`Interner`]'s backing storage.
///
/// Uses `u32` rather than `usize` to keep AST nodes compact; a module with
/// more than ~4 billion distinct identifiers is not a realistic input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct StringId(u32);

impl StringId {
    const RESERVED: &'static [&'static str] = &["<synthetic>", "Main", "run", "libhilti", "self"];

    /// Reserved id for synthesized nodes with no real source file.
    pub const SYNTHETIC: Self = Self(0);
    pub const MAIN: Self = Self(1);
    pub const RUN: Self = Self(2);
    pub const LIBHILTI: Self = Self(3);
    pub const SELF_: Self = Self(4);

    const RESERVED_COUNT: u32 = Self::RESERVED.len() as u32;

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Append-only string interner.
///
/// Reserved names (see [`StringId::RESERVED`]) are seeded at construction so
/// that comparisons against `Main`/`run`/`libhilti` never need a hash
/// lookup. Everything interned afterward is looked up by value first so
/// repeated identifiers (the common case — field names, operator names)
/// share one slot.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Interner {
    strings: Vec<String>,
    index: AHashMap<String, StringId>,
}

impl Default for Interner {
    fn default() -> Self {
        let mut strings = Vec::with_capacity(StringId::RESERVED.len());
        let mut index = AHashMap::default();
        for (i, s) in StringId::RESERVED.iter().enumerate() {
            strings.push((*s).to_owned());
            index.insert((*s).to_owned(), StringId(i as u32));
        }
        Self { strings, index }
    }
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning its existing id if already present.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(id) = self.index.get(s) {
            return *id;
        }
        let id = StringId(u32::try_from(self.strings.len()).expect("interner overflow"));
        self.strings.push(s.to_owned());
        self.index.insert(s.to_owned(), id);
        id
    }

    /// Resolves an id back to its string. Panics on an id from a different
    /// interner — callers never hold a `StringId` across interners.
    #[must_use]
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
