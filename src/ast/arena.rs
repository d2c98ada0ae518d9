//! Generic index-based arena.
//!
//! Per the rewrite note in spec.md §9 ("AST ownership and parent links"),
//! the AST is not a tree of `Rc`/`Weak` pointers: each node kind (`Type`,
//! `Expr`, `Stmt`) lives in its own per-module arena and is referenced by a
//! typed `Idx<T>`. A resolver rewrite (`replace`) is just overwriting the
//! arena slot at that index — no re-parenting, no shared-pointer aliasing.

use std::{fmt, hash::Hash, marker::PhantomData};

/// A typed index into an [`Arena<T>`].
///
/// `Idx<T>` is `Copy` and carries no lifetime, so it can be stored inside
/// other arena-resident nodes (e.g. `Type::Reference` holding a `Idx<Type>`)
/// without borrow-checker friction.
pub struct Idx<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    #[must_use]
    pub fn index(self) -> usize {
        self.raw as usize
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Idx<T> {}
impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl<T> Eq for Idx<T> {}
impl<T> Hash for Idx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({})", self.raw)
    }
}
impl<T> serde::Serialize for Idx<T> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(s)
    }
}
impl<'de, T> serde::Deserialize<'de> for Idx<T> {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self {
            raw: u32::deserialize(d)?,
            _marker: PhantomData,
        })
    }
}

/// An append-only, mutable-in-place arena of `T`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T) -> Idx<T> {
        let raw = u32::try_from(self.items.len()).expect("arena overflow");
        self.items.push(value);
        Idx { raw, _marker: PhantomData }
    }

    #[must_use]
    pub fn get(&self, idx: Idx<T>) -> &T {
        &self.items[idx.index()]
    }

    pub fn get_mut(&mut self, idx: Idx<T>) -> &mut T {
        &mut self.items[idx.index()]
    }

    /// Overwrites the slot at `idx` with `value`. This is the "rewrite the
    /// tree in place" primitive resolver passes use to turn an `Unknown`
    /// type or unresolved `ID` expression into its resolved counterpart
    /// (spec.md §4.1).
    pub fn replace(&mut self, idx: Idx<T>, value: T) -> T {
        std::mem::replace(&mut self.items[idx.index()], value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &T)> {
        self.items.iter().enumerate().map(|(i, v)| {
            (
                Idx {
                    raw: i as u32,
                    _marker: PhantomData,
                },
                v,
            )
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
