//! Lookup Result
//!
//! Three-way outcome of a cache read. A reachable tier that has no entry is a
//! `Miss`; a tier that could not be asked is `Unavailable`. The two are never
//! folded together.

/// Outcome of reading a subject through the cache tiers.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// A live entry was found in one of the tiers
    Hit(T),
    /// The durable tier answered and holds no live entry
    Miss,
    /// The durable tier could not be consulted
    Unavailable,
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// Converts into the payload, dropping the miss/unavailable distinction.
    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Unavailable => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Hit(value) => Lookup::Hit(f(value)),
            Lookup::Miss => Lookup::Miss,
            Lookup::Unavailable => Lookup::Unavailable,
        }
    }
}
