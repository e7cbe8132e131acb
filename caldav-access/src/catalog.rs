// SPDX-License-Identifier: MIT OR Apache-2.0

//! Privilege definitions and the catalog they are looked up in.

use std::fmt::Display;

use crate::cursor::AclCursor;

/// Prefix marking a denied privilege in encoded ACL text.
pub const DENIAL_PREFIX: char = '-';

/// A single privilege definition.
///
/// Privileges form a containment tree: granting (or denying) a privilege implicitly grants (or
/// denies) every privilege it contains. Children are referenced by their catalog index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Privilege {
    name: String,
    encoding: char,
    index: usize,
    denial: bool,
    contained: Vec<usize>,
}

impl Privilege {
    pub fn new(
        name: impl Into<String>,
        encoding: char,
        index: usize,
        denial: bool,
        contained: Vec<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            encoding,
            index,
            denial,
            contained,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Character this privilege is encoded as in ACL text.
    pub fn encoding(&self) -> char {
        self.encoding
    }

    /// Stable slot index of this privilege.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` if this definition denies rather than grants.
    pub fn is_denial(&self) -> bool {
        self.denial
    }

    /// Indices of the directly contained privileges.
    pub fn contained(&self) -> &[usize] {
        &self.contained
    }

    /// The same privilege with the denial flag set.
    pub fn to_denial(&self) -> Self {
        Self {
            denial: true,
            ..self.clone()
        }
    }
}

impl Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denial {
            write!(f, "not {}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Lookup capability over an immutable privilege hierarchy.
///
/// Indices are dense, run from `0` to `max_index()` and never change. Containment must be
/// acyclic, though walks over the hierarchy guard against cycles regardless.
pub trait PrivilegeCatalog {
    /// Highest privilege index. Every privilege set built against this catalog has
    /// `max_index() + 1` slots.
    fn max_index(&self) -> usize;

    /// The granting definition at `index`.
    fn privilege(&self, index: usize) -> Option<&Privilege>;

    /// Read one privilege token from the cursor.
    ///
    /// Returns `None` when the characters at the cursor do not name a known privilege.
    fn find(&self, cursor: &mut AclCursor<'_>) -> Option<&Privilege>;
}

/// The stock WebDAV (RFC 3744) and CalDAV scheduling (RFC 6638) privilege hierarchy.
///
/// ```text
/// all 'A'
///  +-- read 'R'
///  |    +-- read-acl 'r'
///  |    +-- read-current-user-privilege-set 'P'
///  |    +-- read-free-busy 'F'
///  +-- write 'W'
///  |    +-- write-acl 'a'
///  |    +-- write-properties 'p'
///  |    +-- write-content 'c'
///  |    +-- bind 'b'
///  |    |    +-- schedule 'S'
///  |    |         +-- schedule-request 't'
///  |    |         +-- schedule-reply 'y'
///  |    |         +-- schedule-free-busy 's'
///  |    +-- unbind 'u'
///  +-- unlock 'U'
///  +-- schedule-deliver 'D'
///  |    +-- schedule-deliver-invite 'i'
///  |    +-- schedule-deliver-reply 'e'
///  |    +-- schedule-query-freebusy 'q'
///  +-- schedule-send 'T'
///       +-- schedule-send-invite 'I'
///       +-- schedule-send-reply 'E'
///       +-- schedule-send-freebusy 'Q'
/// none 'N'
/// ```
#[derive(Clone, Debug)]
pub struct CalDavPrivileges {
    allowed: Vec<Privilege>,
    denied: Vec<Privilege>,
}

impl CalDavPrivileges {
    pub const ALL: usize = 0;
    pub const READ: usize = 1;
    pub const READ_ACL: usize = 2;
    pub const READ_CURRENT_USER_PRIVILEGE_SET: usize = 3;
    pub const READ_FREE_BUSY: usize = 4;
    pub const WRITE: usize = 5;
    pub const WRITE_ACL: usize = 6;
    pub const WRITE_PROPERTIES: usize = 7;
    pub const WRITE_CONTENT: usize = 8;
    pub const BIND: usize = 9;
    pub const SCHEDULE: usize = 10;
    pub const SCHEDULE_REQUEST: usize = 11;
    pub const SCHEDULE_REPLY: usize = 12;
    pub const SCHEDULE_FREE_BUSY: usize = 13;
    pub const UNBIND: usize = 14;
    pub const UNLOCK: usize = 15;
    pub const SCHEDULE_DELIVER: usize = 16;
    pub const SCHEDULE_DELIVER_INVITE: usize = 17;
    pub const SCHEDULE_DELIVER_REPLY: usize = 18;
    pub const SCHEDULE_QUERY_FREEBUSY: usize = 19;
    pub const SCHEDULE_SEND: usize = 20;
    pub const SCHEDULE_SEND_INVITE: usize = 21;
    pub const SCHEDULE_SEND_REPLY: usize = 22;
    pub const SCHEDULE_SEND_FREEBUSY: usize = 23;
    pub const NONE: usize = 24;

    /// Number of privilege slots.
    pub const SIZE: usize = Self::NONE + 1;

    pub fn new() -> Self {
        let allowed = vec![
            Privilege::new(
                "all",
                'A',
                Self::ALL,
                false,
                vec![
                    Self::READ,
                    Self::WRITE,
                    Self::UNLOCK,
                    Self::SCHEDULE_DELIVER,
                    Self::SCHEDULE_SEND,
                ],
            ),
            Privilege::new(
                "read",
                'R',
                Self::READ,
                false,
                vec![
                    Self::READ_ACL,
                    Self::READ_CURRENT_USER_PRIVILEGE_SET,
                    Self::READ_FREE_BUSY,
                ],
            ),
            Privilege::new("read-acl", 'r', Self::READ_ACL, false, vec![]),
            Privilege::new(
                "read-current-user-privilege-set",
                'P',
                Self::READ_CURRENT_USER_PRIVILEGE_SET,
                false,
                vec![],
            ),
            Privilege::new("read-free-busy", 'F', Self::READ_FREE_BUSY, false, vec![]),
            Privilege::new(
                "write",
                'W',
                Self::WRITE,
                false,
                vec![
                    Self::WRITE_ACL,
                    Self::WRITE_PROPERTIES,
                    Self::WRITE_CONTENT,
                    Self::BIND,
                    Self::UNBIND,
                ],
            ),
            Privilege::new("write-acl", 'a', Self::WRITE_ACL, false, vec![]),
            Privilege::new("write-properties", 'p', Self::WRITE_PROPERTIES, false, vec![]),
            Privilege::new("write-content", 'c', Self::WRITE_CONTENT, false, vec![]),
            Privilege::new("bind", 'b', Self::BIND, false, vec![Self::SCHEDULE]),
            Privilege::new(
                "schedule",
                'S',
                Self::SCHEDULE,
                false,
                vec![
                    Self::SCHEDULE_REQUEST,
                    Self::SCHEDULE_REPLY,
                    Self::SCHEDULE_FREE_BUSY,
                ],
            ),
            Privilege::new("schedule-request", 't', Self::SCHEDULE_REQUEST, false, vec![]),
            Privilege::new("schedule-reply", 'y', Self::SCHEDULE_REPLY, false, vec![]),
            Privilege::new(
                "schedule-free-busy",
                's',
                Self::SCHEDULE_FREE_BUSY,
                false,
                vec![],
            ),
            Privilege::new("unbind", 'u', Self::UNBIND, false, vec![]),
            Privilege::new("unlock", 'U', Self::UNLOCK, false, vec![]),
            Privilege::new(
                "schedule-deliver",
                'D',
                Self::SCHEDULE_DELIVER,
                false,
                vec![
                    Self::SCHEDULE_DELIVER_INVITE,
                    Self::SCHEDULE_DELIVER_REPLY,
                    Self::SCHEDULE_QUERY_FREEBUSY,
                ],
            ),
            Privilege::new(
                "schedule-deliver-invite",
                'i',
                Self::SCHEDULE_DELIVER_INVITE,
                false,
                vec![],
            ),
            Privilege::new(
                "schedule-deliver-reply",
                'e',
                Self::SCHEDULE_DELIVER_REPLY,
                false,
                vec![],
            ),
            Privilege::new(
                "schedule-query-freebusy",
                'q',
                Self::SCHEDULE_QUERY_FREEBUSY,
                false,
                vec![],
            ),
            Privilege::new(
                "schedule-send",
                'T',
                Self::SCHEDULE_SEND,
                false,
                vec![
                    Self::SCHEDULE_SEND_INVITE,
                    Self::SCHEDULE_SEND_REPLY,
                    Self::SCHEDULE_SEND_FREEBUSY,
                ],
            ),
            Privilege::new(
                "schedule-send-invite",
                'I',
                Self::SCHEDULE_SEND_INVITE,
                false,
                vec![],
            ),
            Privilege::new(
                "schedule-send-reply",
                'E',
                Self::SCHEDULE_SEND_REPLY,
                false,
                vec![],
            ),
            Privilege::new(
                "schedule-send-freebusy",
                'Q',
                Self::SCHEDULE_SEND_FREEBUSY,
                false,
                vec![],
            ),
            // "none" is a denial in its own right.
            Privilege::new("none", 'N', Self::NONE, true, vec![]),
        ];

        let denied = allowed.iter().map(Privilege::to_denial).collect();

        Self { allowed, denied }
    }

    /// The denying definition at `index`.
    pub fn denied(&self, index: usize) -> Option<&Privilege> {
        self.denied.get(index)
    }

    /// Look up a granting definition by its DAV name, e.g. `"read-acl"`.
    pub fn by_name(&self, name: &str) -> Option<&Privilege> {
        self.allowed.iter().find(|privilege| privilege.name() == name)
    }

    fn by_encoding(&self, encoding: char) -> Option<usize> {
        self.allowed
            .iter()
            .position(|privilege| privilege.encoding() == encoding)
    }
}

impl Default for CalDavPrivileges {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegeCatalog for CalDavPrivileges {
    fn max_index(&self) -> usize {
        Self::NONE
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

        let index = self.by_encoding(c)?;
        if denial {
            self.denied.get(index)
        } else {
            self.allowed.get(index)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::cursor::AclCursor;

    use super::{CalDavPrivileges, PrivilegeCatalog};

    #[test]
    fn indices_are_dense_and_stable() {
        let catalog = CalDavPrivileges::new();
        assert_eq!(catalog.max_index() + 1, CalDavPrivileges::SIZE);

        for index in 0..=catalog.max_index() {
            let privilege = catalog.privilege(index).unwrap();
            assert_eq!(privilege.index(), index);
            assert_eq!(catalog.denied(index).unwrap().index(), index);
        }

        assert!(catalog.privilege(CalDavPrivileges::SIZE).is_none());
    }

    #[test]
    fn encodings_are_unique() {
        let catalog = CalDavPrivileges::new();
        let encodings: HashSet<char> = (0..=catalog.max_index())
            .map(|index| catalog.privilege(index).unwrap().encoding())
            .collect();
        assert_eq!(encodings.len(), CalDavPrivileges::SIZE);
    }

    #[test]
    fn find_reads_one_token() {
        let catalog = CalDavPrivileges::new();
        let mut cursor = AclCursor::new("R-WN");

        let read = catalog.find(&mut cursor).unwrap();
        assert_eq!(read.index(), CalDavPrivileges::READ);
        assert!(!read.is_denial());

        let write = catalog.find(&mut cursor).unwrap();
        assert_eq!(write.index(), CalDavPrivileges::WRITE);
        assert!(write.is_denial());
        assert_eq!(write.to_string(), "not write");

        let none = catalog.find(&mut cursor).unwrap();
        assert_eq!(none.index(), CalDavPrivileges::NONE);
        assert!(none.is_denial());

        assert!(catalog.find(&mut cursor).is_none());
    }

    #[test]
    fn unknown_token() {
        let catalog = CalDavPrivileges::new();
        assert!(catalog.find(&mut AclCursor::new("z")).is_none());
        assert!(catalog.find(&mut AclCursor::new("-")).is_none());
    }

    #[test]
    fn lookup_by_name() {
        let catalog = CalDavPrivileges::new();
        let bind = catalog.by_name("bind").unwrap();
        assert_eq!(bind.index(), CalDavPrivileges::BIND);
        assert_eq!(bind.contained(), &[CalDavPrivileges::SCHEDULE]);
        assert!(catalog.by_name("delete").is_none());
    }
}
