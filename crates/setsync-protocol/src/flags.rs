//! List framing flags.

use crate::constants::*;
use serde::{Deserialize, Serialize};
use setsync_core::Marker;

/// Bitfield framing one message of a list transmission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListFlags(pub u8);

impl ListFlags {
    /// Middle of a sequence.
    pub const NONE: ListFlags = ListFlags(0);
    /// See [`LIST_FLAG_FIRST`].
    pub const FIRST: ListFlags = ListFlags(LIST_FLAG_FIRST);
    /// See [`LIST_FLAG_LAST`].
    pub const LAST: ListFlags = ListFlags(LIST_FLAG_LAST);
    /// See [`LIST_FLAG_EMPTY`].
    pub const EMPTY: ListFlags = ListFlags(LIST_FLAG_EMPTY);
    /// See [`LIST_FLAG_REMOVE`].
    pub const REMOVE: ListFlags = ListFlags(LIST_FLAG_REMOVE);

    /// Create from raw bits.
    pub fn from_bits(bits: u8) -> Self {
        ListFlags(bits)
    }

    /// Raw bits.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(&self, other: ListFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Interpret the flags as a sequence marker.
    ///
    /// When contradicting bits are combined, `EMPTY` wins over `REMOVE`, which
    /// wins over the `FIRST`/`LAST` framing.
    pub fn marker(&self) -> Marker {
        if self.contains(ListFlags::EMPTY) {
            Marker::Empty
        } else if self.contains(ListFlags::REMOVE) {
            Marker::Remove
        } else {
            match (self.contains(ListFlags::FIRST), self.contains(ListFlags::LAST)) {
                (true, true) => Marker::FirstLast,
                (true, false) => Marker::First,
                (false, true) => Marker::Last,
                (false, false) => Marker::None,
            }
        }
    }
}

impl std::ops::BitOr for ListFlags {
    type Output = ListFlags;

    fn bitor(self, rhs: ListFlags) -> ListFlags {
        ListFlags(self.0 | rhs.0)
    }
}

impl From<Marker> for ListFlags {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::None => ListFlags::NONE,
            Marker::First => ListFlags::FIRST,
            Marker::Last => ListFlags::LAST,
            Marker::FirstLast => ListFlags::FIRST | ListFlags::LAST,
            Marker::Empty => ListFlags::EMPTY,
            Marker::Remove => ListFlags::REMOVE,
        }
    }
}

impl std::fmt::Display for ListFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = [
            (ListFlags::FIRST, "FIRST"),
            (ListFlags::LAST, "LAST"),
            (ListFlags::EMPTY, "EMPTY"),
            (ListFlags::REMOVE, "REMOVE"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
