// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities.

use std::io;
use std::sync::{Arc, Mutex};

use rand::Rng;

use crate::catalog::{DENIAL_PREFIX, Privilege, PrivilegeCatalog};
use crate::cursor::AclCursor;
use crate::set::PrivilegeSet;
use crate::state::PrivilegeState;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// A set of `len` slots with uniformly random states.
pub fn random_set<R: Rng>(rng: &mut R, len: usize) -> PrivilegeSet {
    const STATES: [PrivilegeState; 5] = [
        PrivilegeState::Unspecified,
        PrivilegeState::DeniedInherited,
        PrivilegeState::AllowedInherited,
        PrivilegeState::Denied,
        PrivilegeState::Allowed,
    ];

    let states: Vec<PrivilegeState> = (0..len)
        .map(|_| STATES[rng.random_range(0..STATES.len())])
        .collect();
    PrivilegeSet::new(states)
}

/// Decision type stored in caches under test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestAccess {
    pub privileges: PrivilegeSet,
    pub allowed: bool,
}

impl TestAccess {
    pub fn allowed(privileges: PrivilegeSet) -> Self {
        Self {
            privileges,
            allowed: true,
        }
    }

    pub fn denied(privileges: PrivilegeSet) -> Self {
        Self {
            privileges,
            allowed: false,
        }
    }
}

/// Catalog over an arbitrary list of privileges, encoded by their single-char encodings.
///
/// Containment isn't checked, which makes it possible to build cyclic hierarchies.
#[derive(Clone, Debug)]
pub struct TestCatalog {
    allowed: Vec<Privilege>,
    denied: Vec<Privilege>,
}

impl TestCatalog {
    pub fn new(privileges: Vec<Privilege>) -> Self {
        let denied = privileges.iter().map(Privilege::to_denial).collect();
        Self {
            allowed: privileges,
            denied,
        }
    }
}

impl PrivilegeCatalog for TestCatalog {
    fn max_index(&self) -> usize {
        self.allowed.len().saturating_sub(1)
    }

    fn privilege(&self, index: usize) -> Option<&Privilege> {
        self.allowed.get(index)
    }

    fn find(&self, cursor: &mut AclCursor<'_>) -> Option<&Privilege> {
        let mut c = cursor.get_char()?;
        let denial = c == DENIAL_PREFIX;
        if denial {
            c = cursor.get_char()?;
        }

        let index = self
            .allowed
            .iter()
            .position(|privilege| privilege.encoding() == c)?;
        if denial {
            self.denied.get(index)
        } else {
            self.allowed.get(index)
        }
    }
}

/// Log output collected from a scoped subscriber.
#[derive(Clone, Debug, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Subscriber writing warnings and errors into this buffer, for use with
    /// `tracing::subscriber::with_default`.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let logs = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || logs.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
