// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The state of a single privilege slot.
///
/// Variants are declared from lowest to highest precedence so the derived `Ord` is the order
/// every merge and comparison uses:
///
/// Unspecified < DeniedInherited < AllowedInherited < Denied < Allowed
///
/// Explicit entries outrank inherited ones, and within each kind "allowed" outranks "denied".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrivilegeState {
    #[default]
    Unspecified,
    DeniedInherited,
    AllowedInherited,
    Denied,
    Allowed,
}

impl PrivilegeState {
    /// Downgrade an explicit state to its inherited counterpart.
    ///
    /// Inherited and unspecified states are returned unchanged.
    pub fn inherited(self) -> Self {
        match self {
            PrivilegeState::Allowed => PrivilegeState::AllowedInherited,
            PrivilegeState::Denied => PrivilegeState::DeniedInherited,
            other => other,
        }
    }

    /// Returns `true` for both explicit and inherited grants.
    pub fn is_allowed(self) -> bool {
        matches!(
            self,
            PrivilegeState::Allowed | PrivilegeState::AllowedInherited
        )
    }

    /// Returns `true` for both explicit and inherited denials.
    pub fn is_denied(self) -> bool {
        matches!(self, PrivilegeState::Denied | PrivilegeState::DeniedInherited)
    }

    pub fn is_unspecified(self) -> bool {
        self == PrivilegeState::Unspecified
    }

    /// Returns `true` if this state must be clamped down to `cap`.
    ///
    /// Only a grant meeting a denial in `cap` is clamped, an unspecified cap slot leaves the
    /// state untouched.
    pub(crate) fn exceeds(self, cap: PrivilegeState) -> bool {
        cap.is_denied() && self.is_allowed()
    }
}

impl Display for PrivilegeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self {
            PrivilegeState::Unspecified => '.',
            PrivilegeState::DeniedInherited => 'd',
            PrivilegeState::AllowedInherited => 'a',
            PrivilegeState::Denied => 'D',
            PrivilegeState::Allowed => 'A',
        };

        write!(f, "{}", c)
    }
}
