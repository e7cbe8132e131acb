// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The ACL text contains a token which does not name a known privilege.
    #[error("bad acl: unknown privilege {position}")]
    BadAcl { position: String },
}
