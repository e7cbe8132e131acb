// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide privilege sets laid out against [`CalDavPrivileges`].
//!
//! Each set is built once on first use and handed out as a shared clone. Sets can't be mutated,
//! so no caller can alter what another one sees.

use std::sync::LazyLock;

use crate::catalog::CalDavPrivileges;
use crate::set::PrivilegeSet;
use crate::state::PrivilegeState::{self, Allowed, Denied};

static DEFAULT_OWNER: LazyLock<PrivilegeSet> =
    LazyLock::new(|| PrivilegeSet::filled(CalDavPrivileges::SIZE, Allowed));

static DEFAULT_NON_OWNER: LazyLock<PrivilegeSet> =
    LazyLock::new(|| PrivilegeSet::filled(CalDavPrivileges::SIZE, Denied));

static USER_HOME_MAX: LazyLock<PrivilegeSet> = LazyLock::new(|| {
    PrivilegeSet::new(layout([
        Denied,  // all
        Allowed, // read
        Allowed, // read-acl
        Allowed, // read-current-user-privilege-set
        Allowed, // read-free-busy
        Denied,  // write
        Allowed, // write-acl
        Allowed, // write-properties
        Allowed, // write-content
        Allowed, // bind
        Denied,  // schedule
        Denied,  // schedule-request
        Denied,  // schedule-reply
        Denied,  // schedule-free-busy
        Denied,  // unbind
        Allowed, // unlock
        Denied,  // schedule-deliver
        Denied,  // schedule-deliver-invite
        Denied,  // schedule-deliver-reply
        Denied,  // schedule-query-freebusy
        Denied,  // schedule-send
        Denied,  // schedule-send-invite
        Denied,  // schedule-send-reply
        Denied,  // schedule-send-freebusy
        Allowed, // none
    ]))
});

static READ_ONLY: LazyLock<PrivilegeSet> = LazyLock::new(|| {
    PrivilegeSet::new(layout([
        Denied,  // all
        Allowed, // read
        Denied,  // read-acl
        Allowed, // read-current-user-privilege-set
        Allowed, // read-free-busy
        Denied,  // write
        Denied,  // write-acl
        Denied,  // write-properties
        Denied,  // write-content
        Denied,  // bind
        Denied,  // schedule
        Denied,  // schedule-request
        Denied,  // schedule-reply
        Denied,  // schedule-free-busy
        Denied,  // unbind
        Allowed, // unlock
        Denied,  // schedule-deliver
        Denied,  // schedule-deliver-invite
        Denied,  // schedule-deliver-reply
        Denied,  // schedule-query-freebusy
        Denied,  // schedule-send
        Denied,  // schedule-send-invite
        Denied,  // schedule-send-reply
        Denied,  // schedule-send-freebusy
        Allowed, // none
    ]))
});

static OWNER_ACL: LazyLock<PrivilegeSet> = LazyLock::new(|| {
    let mut states = vec![Denied; CalDavPrivileges::SIZE];
    states[CalDavPrivileges::READ_ACL] = Allowed;
    states[CalDavPrivileges::WRITE_ACL] = Allowed;
    PrivilegeSet::new(states)
});

fn layout(states: [PrivilegeState; CalDavPrivileges::SIZE]) -> Vec<PrivilegeState> {
    states.to_vec()
}

/// Everything allowed, the default for the owner of a resource.
pub fn default_owner() -> PrivilegeSet {
    DEFAULT_OWNER.clone()
}

/// Everything denied, the default for anyone but the owner.
pub fn default_non_owner() -> PrivilegeSet {
    DEFAULT_NON_OWNER.clone()
}

/// Cap on what a non-superuser may hold on their own home collection.
///
/// Denies the privileges which would let the home itself be deleted or renamed, along with
/// scheduling on the home.
pub fn user_home_max() -> PrivilegeSet {
    USER_HOME_MAX.clone()
}

pub fn read_only() -> PrivilegeSet {
    READ_ONLY.clone()
}

/// Only read-acl and write-acl, what an owner always keeps on their own resources.
pub fn owner_acl() -> PrivilegeSet {
    OWNER_ACL.clone()
}

/// All well-known sets, used to seed an interning pool.
pub(crate) fn all() -> [PrivilegeSet; 5] {
    [
        default_owner(),
        default_non_owner(),
        user_home_max(),
        read_only(),
        owner_acl(),
    ]
}
