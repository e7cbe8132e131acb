// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::sync::{Arc, Weak};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::state::PrivilegeState;

/// An immutable set of privilege states, one slot per catalog index.
///
/// Cloning is cheap and shares the underlying slots. There is no way to change a slot once the
/// set is built, all transformations in [`PrivilegeAlgebra`](crate::PrivilegeAlgebra) return new
/// sets.
///
/// Equality, hashing and ordering are defined slot-by-slot in index order. Ordering resolves on
/// the first differing slot using the precedence of [`PrivilegeState`], a shorter set sorts
/// before a longer one sharing its prefix.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrivilegeSet(Arc<[PrivilegeState]>);

impl PrivilegeSet {
    /// Build a set from fully-specified per-privilege states.
    pub fn new(states: impl Into<Vec<PrivilegeState>>) -> Self {
        Self(Arc::from(states.into()))
    }

    /// A set of `len` slots all in the same state.
    pub fn filled(len: usize, state: PrivilegeState) -> Self {
        Self::new(vec![state; len])
    }

    /// A set of `len` unspecified slots.
    pub fn unspecified(len: usize) -> Self {
        Self::filled(len, PrivilegeState::Unspecified)
    }

    /// State of the slot at `index`, out-of-range indices read as unspecified.
    pub fn get(&self, index: usize) -> PrivilegeState {
        self.0.get(index).copied().unwrap_or_default()
    }

    pub fn states(&self) -> &[PrivilegeState] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if any slot is allowed, explicitly or by inheritance.
    pub fn has_any_allowed(&self) -> bool {
        self.0.iter().any(|state| state.is_allowed())
    }

    /// Returns `true` if no slot is left unspecified.
    pub fn is_resolved(&self) -> bool {
        !self.0.iter().any(|state| state.is_unspecified())
    }

    /// Returns `true` if both sets share the same backing slots.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Copy of the slots for building a derived set.
    pub(crate) fn to_states(&self) -> Vec<PrivilegeState> {
        self.0.to_vec()
    }

    /// Non-owning handle to the backing slots.
    pub(crate) fn downgrade(&self) -> Weak<[PrivilegeState]> {
        Arc::downgrade(&self.0)
    }

    /// Recover a set from a handle, if any owner still holds it.
    pub(crate) fn upgrade(handle: &Weak<[PrivilegeState]>) -> Option<Self> {
        handle.upgrade().map(Self)
    }
}

impl From<Vec<PrivilegeState>> for PrivilegeSet {
    fn from(states: Vec<PrivilegeState>) -> Self {
        Self::new(states)
    }
}

impl Display for PrivilegeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivilegeSet[")?;
        for state in self.0.iter() {
            write!(f, "{}", state)?;
        }
        write!(f, "]")
    }
}
