// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access-control evaluation core for WebDAV and CalDAV servers.
//!
//! Two parts:
//!
//! - The privilege algebra. A [`PrivilegeSet`] holds one [`PrivilegeState`] per privilege of a
//!   [`PrivilegeCatalog`]. [`PrivilegeAlgebra`] decodes ACL fragments into sets, merges them
//!   following inheritance precedence, resolves unspecified slots and clamps the result against
//!   a maximum, interning every result through a [`PrivilegePool`].
//! - The [`EvaluatedAccessCache`], which memoises the decision evaluated for an owner, accessor,
//!   desired privileges, maximum privileges and ACL text.
//!
//! ```
//! use caldav_access::{CalDavPrivileges, PrivilegeAlgebra, PrivilegePool, well_known};
//!
//! let algebra = PrivilegeAlgebra::caldav(PrivilegePool::enabled());
//!
//! // "R" grants read and everything read contains.
//! let granted = algebra.decode_str("R").unwrap();
//! let resolved = algebra.resolve_unspecified(&granted, false);
//! let capped = algebra.filter(&resolved, &well_known::user_home_max());
//!
//! assert!(capped.get(CalDavPrivileges::READ_FREE_BUSY).is_allowed());
//! assert!(capped.get(CalDavPrivileges::WRITE).is_denied());
//! ```

mod algebra;
mod cache;
mod catalog;
mod config;
pub mod cursor;
mod error;
mod pool;
mod set;
mod state;
mod stats;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod well_known;

pub use algebra::PrivilegeAlgebra;
pub use cache::EvaluatedAccessCache;
pub use catalog::{CalDavPrivileges, DENIAL_PREFIX, Privilege, PrivilegeCatalog};
pub use config::{CacheBound, CacheConfiguration};
pub use cursor::AclCursor;
pub use error::AccessError;
pub use pool::PrivilegePool;
pub use set::PrivilegeSet;
pub use state::PrivilegeState;
pub use stats::CacheStatistics;
