// SPDX-License-Identifier: MIT OR Apache-2.0

//! Construction and combination of privilege sets.
//!
//! Evaluating an ACL for a principal is a fold over its entries: every matching entry is
//! decoded into a privilege set and merged into the running result, inherited entries ranking
//! below explicit ones. The result is then resolved (unspecified slots become allowed for the
//! owner, denied otherwise) and clamped against the maximum privileges for the resource.

use crate::catalog::{CalDavPrivileges, Privilege, PrivilegeCatalog};
use crate::cursor::{AclCursor, FRAGMENT_SEPARATOR, INHERITED_MARKER};
use crate::error::AccessError;
use crate::pool::PrivilegePool;
use crate::set::PrivilegeSet;
use crate::state::PrivilegeState;
use crate::well_known;

/// Privilege set operations over a catalog.
///
/// Every set returned passes through the algebra's [`PrivilegePool`], so with an enabled pool
/// equal results share one instance.
#[derive(Debug)]
pub struct PrivilegeAlgebra<C> {
    catalog: C,
    pool: PrivilegePool,
}

impl PrivilegeAlgebra<CalDavPrivileges> {
    /// Algebra over the stock CalDAV catalog, with the well-known sets already interned.
    pub fn caldav(pool: PrivilegePool) -> Self {
        for set in well_known::all() {
            pool.intern(set);
        }

        Self::new(CalDavPrivileges::new(), pool)
    }
}

impl<C> PrivilegeAlgebra<C>
where
    C: PrivilegeCatalog,
{
    pub fn new(catalog: C, pool: PrivilegePool) -> Self {
        Self { catalog, pool }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn pool(&self) -> &PrivilegePool {
        &self.pool
    }

    /// Number of slots in every set built by this algebra.
    pub fn set_len(&self) -> usize {
        self.catalog.max_index() + 1
    }

    /// Build a set from explicit per-privilege states.
    pub fn construct(&self, states: Vec<PrivilegeState>) -> PrivilegeSet {
        self.pool.intern(PrivilegeSet::new(states))
    }

    /// Set holding `privilege` and everything it contains, allowed or (for a denial) denied.
    ///
    /// All other slots are unspecified.
    pub fn from_privilege(&self, privilege: &Privilege) -> PrivilegeSet {
        let mut states = vec![PrivilegeState::Unspecified; self.set_len()];
        let state = explicit_state(privilege);
        self.walk(privilege, |index| states[index] = state);
        self.construct(states)
    }

    /// Start from all-denied and apply each privilege in turn.
    ///
    /// Later privileges overwrite earlier ones where their containment overlaps.
    pub fn from_privileges<'a>(
        &self,
        privileges: impl IntoIterator<Item = &'a Privilege>,
    ) -> PrivilegeSet {
        let mut states = vec![PrivilegeState::Denied; self.set_len()];
        for privilege in privileges {
            let state = explicit_state(privilege);
            self.walk(privilege, |index| states[index] = state);
        }
        self.construct(states)
    }

    /// Copy of `set` with `privilege` and everything it contains set.
    pub fn add_privilege(&self, set: &PrivilegeSet, privilege: &Privilege) -> PrivilegeSet {
        let mut states = self.sized_states(set);
        let state = explicit_state(privilege);
        self.walk(privilege, |index| states[index] = state);
        self.construct(states)
    }

    /// Decode the privilege fragment of an encoded ACE.
    ///
    /// Tokens are read until a fragment separator, the inheritance marker or the end of the
    /// text. Each token's state spreads to every contained privilege. A grant always overwrites a
    /// slot while a denial only fills slots that are still unspecified, so within one fragment an
    /// explicit grant wins over a denial implied by an earlier token, never the other way round.
    pub fn decode(&self, cursor: &mut AclCursor<'_>) -> Result<PrivilegeSet, AccessError> {
        let mut states = vec![PrivilegeState::Unspecified; self.set_len()];

        while let Some(c) = cursor.get_char() {
            if c == FRAGMENT_SEPARATOR || c == INHERITED_MARKER {
                break;
            }
            cursor.back();

            let Some(privilege) = self.catalog.find(cursor) else {
                return Err(AccessError::BadAcl {
                    position: cursor.error_info(),
                });
            };

            if privilege.is_denial() {
                self.walk(privilege, |index| {
                    if states[index].is_unspecified() {
                        states[index] = PrivilegeState::Denied;
                    }
                });
            } else {
                self.walk(privilege, |index| states[index] = PrivilegeState::Allowed);
            }
        }

        Ok(self.construct(states))
    }

    /// Decode a standalone privilege fragment.
    pub fn decode_str(&self, text: &str) -> Result<PrivilegeSet, AccessError> {
        self.decode(&mut AclCursor::new(text))
    }

    /// Clamp `set` so that no slot grants what `cap` denies.
    ///
    /// A clamped slot takes the cap's state. Unspecified cap slots don't restrict anything.
    pub fn filter(&self, set: &PrivilegeSet, cap: &PrivilegeSet) -> PrivilegeSet {
        let states = set
            .states()
            .iter()
            .enumerate()
            .map(|(index, state)| {
                let limit = cap.get(index);
                if state.exceeds(limit) { limit } else { *state }
            })
            .collect::<Vec<_>>();

        self.construct(states)
    }

    /// Merge `addition` into `current`, each slot keeping the higher-precedence state.
    ///
    /// With `inherited` set the explicit states of `addition` are first downgraded to their
    /// inherited counterparts. Without a `current` set the (downgraded) addition is the result.
    pub fn merge(
        &self,
        current: Option<&PrivilegeSet>,
        addition: &PrivilegeSet,
        inherited: bool,
    ) -> PrivilegeSet {
        let addition = if inherited {
            addition
                .states()
                .iter()
                .map(|state| state.inherited())
                .collect::<Vec<_>>()
        } else {
            addition.to_states()
        };

        let Some(current) = current else {
            return self.construct(addition);
        };

        let len = current.len().max(addition.len());
        let states = (0..len)
            .map(|index| {
                let added = addition.get(index).copied().unwrap_or_default();
                current.get(index).max(added)
            })
            .collect::<Vec<_>>();

        self.construct(states)
    }

    /// Resolve every unspecified slot: allowed for the owner, denied for anyone else.
    pub fn resolve_unspecified(&self, set: &PrivilegeSet, is_owner: bool) -> PrivilegeSet {
        let resolved = if is_owner {
            PrivilegeState::Allowed
        } else {
            PrivilegeState::Denied
        };

        let states = self
            .sized_states(set)
            .into_iter()
            .map(|state| if state.is_unspecified() { resolved } else { state })
            .collect::<Vec<_>>();

        self.construct(states)
    }

    /// Smallest list of privileges whose containment covers every specified slot of `set`.
    ///
    /// This undoes the expansion performed when decoding: a set produced from "read" yields just
    /// "read", not its contained privileges. The returned definitions are the granting ones,
    /// read the state of each from `set`.
    pub fn minimal_privileges(&self, set: &PrivilegeSet) -> Vec<&Privilege> {
        let mut scratch = set.to_states();

        // Clear everything implied by a specified slot.
        for index in 0..scratch.len() {
            if scratch[index].is_unspecified() {
                continue;
            }

            let Some(privilege) = self.catalog.privilege(index) else {
                continue;
            };

            self.walk(privilege, |contained| {
                if contained == index {
                    return;
                }
                if let Some(slot) = scratch.get_mut(contained) {
                    *slot = PrivilegeState::Unspecified;
                }
            });
        }

        scratch
            .iter()
            .enumerate()
            .filter(|(_, state)| !state.is_unspecified())
            .filter_map(|(index, _)| self.catalog.privilege(index))
            .collect()
    }

    /// Visit `root` and every privilege it transitively contains, each index at most once.
    fn walk(&self, root: &Privilege, mut visit: impl FnMut(usize)) {
        let len = self.set_len();
        let mut visited = vec![false; len];

        if root.index() >= len {
            return;
        }
        visited[root.index()] = true;
        visit(root.index());

        let mut stack: Vec<usize> = root.contained().to_vec();
        while let Some(index) = stack.pop() {
            if index >= len || visited[index] {
                continue;
            }
            visited[index] = true;
            visit(index);

            if let Some(privilege) = self.catalog.privilege(index) {
                stack.extend_from_slice(privilege.contained());
            }
        }
    }

    /// Copy of the slots of `set`, padded with unspecified states to the catalog size.
    fn sized_states(&self, set: &PrivilegeSet) -> Vec<PrivilegeState> {
        let mut states = set.to_states();
        if states.len() < self.set_len() {
            states.resize(self.set_len(), PrivilegeState::Unspecified);
        }
        states
    }
}

fn explicit_state(privilege: &Privilege) -> PrivilegeState {
    if privilege.is_denial() {
        PrivilegeState::Denied
    } else {
        PrivilegeState::Allowed
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::catalog::{CalDavPrivileges, Privilege, PrivilegeCatalog};
    use crate::cursor::AclCursor;
    use crate::error::AccessError;
    use crate::pool::PrivilegePool;
    use crate::set::PrivilegeSet;
    use crate::state::PrivilegeState::{self, *};
    use crate::test_utils::{TestCatalog, random_set};
    use crate::well_known;

    use super::PrivilegeAlgebra;

    fn algebra() -> PrivilegeAlgebra<CalDavPrivileges> {
        PrivilegeAlgebra::caldav(PrivilegePool::enabled())
    }

    fn allowed_indices(set: &PrivilegeSet) -> Vec<usize> {
        (0..set.len())
            .filter(|index| set.get(*index) == Allowed)
            .collect()
    }

    #[test]
    fn from_privilege_spreads_to_contained() {
        let algebra = algebra();
        let write = algebra.catalog().privilege(CalDavPrivileges::WRITE).unwrap();
        let set = algebra.from_privilege(write);

        assert_eq!(
            allowed_indices(&set),
            vec![
                CalDavPrivileges::WRITE,
                CalDavPrivileges::WRITE_ACL,
                CalDavPrivileges::WRITE_PROPERTIES,
                CalDavPrivileges::WRITE_CONTENT,
                CalDavPrivileges::BIND,
                CalDavPrivileges::SCHEDULE,
                CalDavPrivileges::SCHEDULE_REQUEST,
                CalDavPrivileges::SCHEDULE_REPLY,
                CalDavPrivileges::SCHEDULE_FREE_BUSY,
                CalDavPrivileges::UNBIND,
            ]
        );
        assert_eq!(set.get(CalDavPrivileges::READ), Unspecified);

        let denied = algebra
            .catalog()
            .denied(CalDavPrivileges::READ)
            .unwrap();
        let set = algebra.from_privilege(denied);
        assert_eq!(set.get(CalDavPrivileges::READ), Denied);
        assert_eq!(set.get(CalDavPrivileges::READ_FREE_BUSY), Denied);
        assert_eq!(set.get(CalDavPrivileges::WRITE), Unspecified);
    }

    #[test]
    fn all_leaves_none_unspecified() {
        let algebra = algebra();
        let all = algebra.catalog().privilege(CalDavPrivileges::ALL).unwrap();
        let none = algebra.catalog().privilege(CalDavPrivileges::NONE).unwrap();

        let set = algebra.from_privilege(all);
        assert_eq!(set.get(CalDavPrivileges::NONE), Unspecified);

        let set = algebra.add_privilege(&set, none);
        assert_eq!(set.get(CalDavPrivileges::NONE), Denied);
        assert_eq!(set.get(CalDavPrivileges::UNLOCK), Allowed);
    }

    #[test]
    fn from_privileges_starts_denied() {
        let algebra = algebra();
        let catalog = algebra.catalog();
        let read = catalog.privilege(CalDavPrivileges::READ).unwrap();
        let unlock = catalog.privilege(CalDavPrivileges::UNLOCK).unwrap();
        let none = catalog.privilege(CalDavPrivileges::NONE).unwrap();

        let set = algebra.from_privileges([read, unlock]);
        assert!(set.is_resolved());
        assert_eq!(
            allowed_indices(&set),
            vec![
                CalDavPrivileges::READ,
                CalDavPrivileges::READ_ACL,
                CalDavPrivileges::READ_CURRENT_USER_PRIVILEGE_SET,
                CalDavPrivileges::READ_FREE_BUSY,
                CalDavPrivileges::UNLOCK,
            ]
        );

        // Unlike the read-only set, read-acl is granted through read.
        let set = algebra.from_privileges([read, unlock, none]);
        assert_eq!(set.get(CalDavPrivileges::NONE), Denied);
        assert_ne!(set, well_known::read_only());
    }

    #[test]
    fn add_privilege_keeps_other_slots() {
        let algebra = algebra();
        let base = well_known::default_non_owner();
        let bind = algebra.catalog().privilege(CalDavPrivileges::BIND).unwrap();

        let set = algebra.add_privilege(&base, bind);
        assert_eq!(
            allowed_indices(&set),
            vec![
                CalDavPrivileges::BIND,
                CalDavPrivileges::SCHEDULE,
                CalDavPrivileges::SCHEDULE_REQUEST,
                CalDavPrivileges::SCHEDULE_REPLY,
                CalDavPrivileges::SCHEDULE_FREE_BUSY,
            ]
        );

        // The source set is untouched.
        assert!(!base.has_any_allowed());
    }

    #[test]
    fn decode_fragment() {
        let algebra = algebra();
        let mut cursor = AclCursor::new("RU 'rest of ace'");
        let set = algebra.decode(&mut cursor).unwrap();

        assert_eq!(
            allowed_indices(&set),
            vec![
                CalDavPrivileges::READ,
                CalDavPrivileges::READ_ACL,
                CalDavPrivileges::READ_CURRENT_USER_PRIVILEGE_SET,
                CalDavPrivileges::READ_FREE_BUSY,
                CalDavPrivileges::UNLOCK,
            ]
        );

        // The separator was consumed, the cursor sits on what follows.
        assert_eq!(cursor.peek(), Some('\''));
    }

    #[test]
    fn decode_stops_at_inherited_marker() {
        let algebra = algebra();
        let mut cursor = AclCursor::new("W^R");
        let set = algebra.decode(&mut cursor).unwrap();

        assert_eq!(set.get(CalDavPrivileges::WRITE), Allowed);
        assert_eq!(set.get(CalDavPrivileges::READ), Unspecified);
        assert_eq!(cursor.peek(), Some('R'));
    }

    #[test]
    fn decode_grant_overrides_earlier_denial() {
        let algebra = algebra();

        // Deny all of write, then grant write-content explicitly.
        let set = algebra.decode_str("-Wc").unwrap();
        assert_eq!(set.get(CalDavPrivileges::WRITE), Denied);
        assert_eq!(set.get(CalDavPrivileges::WRITE_ACL), Denied);
        assert_eq!(set.get(CalDavPrivileges::WRITE_CONTENT), Allowed);

        // A later denial doesn't touch slots already granted.
        let set = algebra.decode_str("c-W").unwrap();
        assert_eq!(set.get(CalDavPrivileges::WRITE), Denied);
        assert_eq!(set.get(CalDavPrivileges::WRITE_CONTENT), Allowed);
    }

    #[test]
    fn decode_unknown_privilege() {
        let algebra = algebra();

        let err = algebra.decode_str("Rz").unwrap_err();
        assert_eq!(
            err,
            AccessError::BadAcl {
                position: "at position 2 in acl \"Rz\"".to_string()
            }
        );

        assert!(matches!(
            algebra.decode_str("R-"),
            Err(AccessError::BadAcl { .. })
        ));
    }

    #[test]
    fn decode_empty_fragment() {
        let algebra = algebra();
        let set = algebra.decode_str(" R").unwrap();
        assert_eq!(set, PrivilegeSet::unspecified(CalDavPrivileges::SIZE));
    }

    #[test]
    fn decode_then_flatten_roundtrip() {
        let algebra = algebra();

        let set = algebra.decode_str("R").unwrap();
        for index in [
            CalDavPrivileges::READ,
            CalDavPrivileges::READ_ACL,
            CalDavPrivileges::READ_CURRENT_USER_PRIVILEGE_SET,
            CalDavPrivileges::READ_FREE_BUSY,
        ] {
            assert_eq!(set.get(index), Allowed);
        }

        let minimal: Vec<&str> = algebra
            .minimal_privileges(&set)
            .into_iter()
            .map(Privilege::name)
            .collect();
        assert_eq!(minimal, vec!["read"]);
    }

    #[test]
    fn flatten_keeps_uncovered_privileges() {
        let algebra = algebra();

        let set = algebra.decode_str("RcU").unwrap();
        let minimal: Vec<&str> = algebra
            .minimal_privileges(&set)
            .into_iter()
            .map(Privilege::name)
            .collect();
        assert_eq!(minimal, vec!["read", "write-content", "unlock"]);

        let minimal: Vec<&str> = algebra
            .minimal_privileges(&well_known::default_owner())
            .into_iter()
            .map(Privilege::name)
            .collect();
        assert_eq!(minimal, vec!["all", "none"]);
    }

    #[test]
    fn merge_explicit_and_inherited() {
        let algebra = algebra();

        let current = PrivilegeSet::new(vec![Unspecified, DeniedInherited, Denied, Allowed]);
        let addition = PrivilegeSet::new(vec![Denied, Allowed, Allowed, Denied]);

        let merged = algebra.merge(Some(&current), &addition, false);
        assert_eq!(merged.states(), &[Denied, Allowed, Allowed, Allowed]);

        let merged = algebra.merge(Some(&current), &addition, true);
        assert_eq!(
            merged.states(),
            &[DeniedInherited, AllowedInherited, Denied, Allowed]
        );

        let merged = algebra.merge(None, &addition, true);
        assert_eq!(
            merged.states(),
            &[DeniedInherited, AllowedInherited, AllowedInherited, DeniedInherited]
        );
        assert_eq!(algebra.merge(None, &addition, false), addition);
    }

    #[test]
    fn merge_is_slotwise_max() {
        let algebra = algebra();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let a = random_set(&mut rng, CalDavPrivileges::SIZE);
            let b = random_set(&mut rng, CalDavPrivileges::SIZE);

            let merged = algebra.merge(Some(&a), &b, false);
            let inherited = algebra.merge(Some(&a), &b, true);
            for index in 0..CalDavPrivileges::SIZE {
                assert_eq!(merged.get(index), a.get(index).max(b.get(index)));
                assert_eq!(
                    inherited.get(index),
                    a.get(index).max(b.get(index).inherited())
                );
            }
        }
    }

    #[test]
    fn filter_never_grants_past_a_denial() {
        let algebra = algebra();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let set = random_set(&mut rng, CalDavPrivileges::SIZE);
            let cap = random_set(&mut rng, CalDavPrivileges::SIZE);
            let filtered = algebra.filter(&set, &cap);

            for index in 0..CalDavPrivileges::SIZE {
                if cap.get(index).is_denied() {
                    assert!(!filtered.get(index).is_allowed());
                } else {
                    assert_eq!(filtered.get(index), set.get(index));
                }
            }
        }
    }

    #[test]
    fn filter_against_user_home_max() {
        let algebra = algebra();
        let filtered = algebra.filter(&well_known::default_owner(), &well_known::user_home_max());
        assert_eq!(filtered, well_known::user_home_max());
        assert!(filtered.ptr_eq(&well_known::user_home_max()));

        // An unspecified cap leaves the set alone.
        let set = well_known::default_owner();
        let cap = PrivilegeSet::unspecified(CalDavPrivileges::SIZE);
        assert_eq!(algebra.filter(&set, &cap), set);
    }

    #[test]
    fn resolve_unspecified_by_ownership() {
        let algebra = algebra();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..100 {
            let set = random_set(&mut rng, CalDavPrivileges::SIZE);
            let owner = algebra.resolve_unspecified(&set, true);
            let other = algebra.resolve_unspecified(&set, false);

            assert!(owner.is_resolved());
            assert!(other.is_resolved());
            for index in 0..CalDavPrivileges::SIZE {
                match set.get(index) {
                    Unspecified => {
                        assert_eq!(owner.get(index), Allowed);
                        assert_eq!(other.get(index), Denied);
                    }
                    state => {
                        assert_eq!(owner.get(index), state);
                        assert_eq!(other.get(index), state);
                    }
                }
            }
        }
    }

    #[test]
    fn evaluation_resolves_to_well_known_instance() {
        let algebra = algebra();

        let set = algebra.decode_str("ra").unwrap();
        let resolved = algebra.resolve_unspecified(&set, false);
        assert!(resolved.ptr_eq(&well_known::owner_acl()));
    }

    #[test]
    fn disabled_pool_changes_identity_only() {
        let pooled = algebra();
        let unpooled = PrivilegeAlgebra::caldav(PrivilegePool::disabled());

        let a = pooled.decode_str("RW").unwrap();
        let b = pooled.decode_str("RW").unwrap();
        assert!(a.ptr_eq(&b));

        let c = unpooled.decode_str("RW").unwrap();
        let d = unpooled.decode_str("RW").unwrap();
        assert!(!c.ptr_eq(&d));

        assert_eq!(a, c);
        assert_eq!(b, d);
    }

    #[test]
    fn cyclic_catalog_terminates() {
        // "a" contains "b" which contains "a" again.
        let catalog = TestCatalog::new(vec![
            Privilege::new("a", 'a', 0, false, vec![1]),
            Privilege::new("b", 'b', 1, false, vec![0, 2]),
            Privilege::new("c", 'c', 2, false, vec![]),
        ]);
        let algebra = PrivilegeAlgebra::new(catalog, PrivilegePool::disabled());

        let set = algebra.decode_str("a").unwrap();
        assert_eq!(set.states(), &[Allowed, Allowed, Allowed]);

        let minimal: Vec<usize> = algebra
            .minimal_privileges(&set)
            .into_iter()
            .map(Privilege::index)
            .collect();
        assert_eq!(minimal, vec![0]);
    }

    #[test]
    fn construct_round_trips_states() {
        let algebra = algebra();
        let states: Vec<PrivilegeState> = vec![Allowed; CalDavPrivileges::SIZE];
        let set = algebra.construct(states);
        assert!(set.ptr_eq(&well_known::default_owner()));
    }
}
