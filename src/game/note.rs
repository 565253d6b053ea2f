use crate::game::timing::Beat;
use std::ops::BitOr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoteKind {
    Tap,
    HoldHead,
    HoldTail,
    RollHead,
    Mine,
    Lift,
    Fake,
    Keysound,
}

impl NoteKind {
    /// Decodes a single note-grid character. `'0'` and unknown characters
    /// are not notes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(NoteKind::Tap),
            b'2' => Some(NoteKind::HoldHead),
            b'3' => Some(NoteKind::HoldTail),
            b'4' => Some(NoteKind::RollHead),
            b'M' => Some(NoteKind::Mine),
            b'L' => Some(NoteKind::Lift),
            b'F' => Some(NoteKind::Fake),
            b'K' => Some(NoteKind::Keysound),
            _ => None,
        }
    }

    #[inline]
    pub fn is_head(self) -> bool {
        matches!(self, NoteKind::HoldHead | NoteKind::RollHead)
    }

    #[inline]
    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// A set of note kinds, stored as a bitmask.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct NoteKinds(u16);

impl NoteKinds {
    /// Kinds that add to steps and combo.
    pub const STEPS: NoteKinds = NoteKinds::of(&[
        NoteKind::Tap,
        NoteKind::HoldHead,
        NoteKind::RollHead,
        NoteKind::Lift,
    ]);

    /// Kinds that add to the density graph and stream measures.
    pub const ARROWS: NoteKinds =
        NoteKinds::of(&[NoteKind::Tap, NoteKind::HoldHead, NoteKind::RollHead]);

    /// Kinds that count as objects.
    pub const OBJECTS: NoteKinds = NoteKinds::of(&[
        NoteKind::Tap,
        NoteKind::HoldHead,
        NoteKind::RollHead,
        NoteKind::Lift,
        NoteKind::Mine,
        NoteKind::Fake,
    ]);

    pub const fn of(kinds: &[NoteKind]) -> NoteKinds {
        let mut mask = 0u16;
        let mut i = 0;
        while i < kinds.len() {
            mask |= kinds[i].bit();
            i += 1;
        }
        NoteKinds(mask)
    }

    #[inline]
    pub const fn single(kind: NoteKind) -> NoteKinds {
        NoteKinds(kind.bit())
    }

    #[inline]
    pub fn contains(self, kind: NoteKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub fn with(self, kind: NoteKind) -> NoteKinds {
        NoteKinds(self.0 | kind.bit())
    }
}

impl BitOr for NoteKinds {
    type Output = NoteKinds;

    fn bitor(self, rhs: NoteKinds) -> NoteKinds {
        NoteKinds(self.0 | rhs.0)
    }
}

impl From<NoteKind> for NoteKinds {
    fn from(kind: NoteKind) -> Self {
        NoteKinds::single(kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub beat: Beat,
    pub column: usize,
    pub kind: NoteKind,
}

impl Note {
    pub fn new(beat: Beat, column: usize, kind: NoteKind) -> Self {
        Self { beat, column, kind }
    }
}
