use crate::game::note::{Note, NoteKind, NoteKinds};
use crate::game::timing::Beat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameBeatNotes {
    /// All notes on one beat form a single group.
    JoinAll,
    /// Every note is its own group.
    KeepSeparate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanedNotes {
    KeepOrphan,
    DropOrphan,
}

#[derive(Debug, Clone, Copy)]
pub struct GroupOptions {
    pub include: NoteKinds,
    pub same_beat: SameBeatNotes,
    /// Fold each tail into its head; the head then carries the tail beat.
    pub join_heads_to_tails: bool,
    pub orphans: OrphanedNotes,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            include: NoteKinds::STEPS,
            same_beat: SameBeatNotes::JoinAll,
            join_heads_to_tails: false,
            orphans: OrphanedNotes::KeepOrphan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedNote {
    pub note: Note,
    pub tail_beat: Option<Beat>,
}

/// Notes sharing one beat. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteGroup {
    notes: Vec<GroupedNote>,
}

impl NoteGroup {
    pub fn beat(&self) -> Beat {
        self.notes[0].note.beat
    }

    pub fn notes(&self) -> &[GroupedNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn count_kind(&self, kind: NoteKind) -> usize {
        self.notes.iter().filter(|g| g.note.kind == kind).count()
    }
}

/// Groups beat-ordered notes. Heads and tails pair per column: a head opens
/// the column, a tail closes it. A head replaced by another head, a head
/// never closed, and a tail with nothing to close are orphans.
pub fn group_notes(notes: &[Note], options: &GroupOptions) -> Vec<NoteGroup> {
    let included: Vec<&Note> = notes
        .iter()
        .filter(|n| options.include.contains(n.kind))
        .collect();

    let mut orphaned = vec![false; included.len()];
    let mut tail_of: Vec<Option<Beat>> = vec![None; included.len()];
    let mut paired_tail = vec![false; included.len()];

    if options.include.contains(NoteKind::HoldTail) {
        let columns = included.iter().map(|n| n.column + 1).max().unwrap_or(0);
        let mut open: Vec<Option<usize>> = vec![None; columns];
        for (i, note) in included.iter().enumerate() {
            if note.kind.is_head() {
                if let Some(prev) = open[note.column].replace(i) {
                    orphaned[prev] = true;
                }
            } else if note.kind == NoteKind::HoldTail {
                match open[note.column].take() {
                    Some(head) => {
                        tail_of[head] = Some(note.beat);
                        paired_tail[i] = true;
                    }
                    None => orphaned[i] = true,
                }
            }
        }
        for head in open.into_iter().flatten() {
            orphaned[head] = true;
        }
    }

    let mut groups: Vec<NoteGroup> = Vec::new();
    for (i, note) in included.into_iter().enumerate() {
        if orphaned[i] && options.orphans == OrphanedNotes::DropOrphan {
            continue;
        }
        if options.join_heads_to_tails && paired_tail[i] {
            continue;
        }
        let grouped = GroupedNote {
            note: note.clone(),
            tail_beat: if options.join_heads_to_tails { tail_of[i] } else { None },
        };
        match groups.last_mut() {
            Some(group)
                if options.same_beat == SameBeatNotes::JoinAll && group.beat() == note.beat =>
            {
                group.notes.push(grouped)
            }
            _ => groups.push(NoteGroup {
                notes: vec![grouped],
            }),
        }
    }
    groups
}

/// Keeps only the notes of `kinds` in each group, dropping groups left empty.
pub fn restrict(groups: &[NoteGroup], kinds: NoteKinds) -> Vec<NoteGroup> {
    groups
        .iter()
        .filter_map(|group| {
            let notes: Vec<GroupedNote> = group
                .notes
                .iter()
                .filter(|g| kinds.contains(g.note.kind))
                .cloned()
                .collect();
            (!notes.is_empty()).then_some(NoteGroup { notes })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::timing::beat_from_int;

    fn n(beat: i64, column: usize, kind: NoteKind) -> Note {
        Note::new(beat_from_int(beat), column, kind)
    }

    #[test]
    fn join_all_and_keep_separate() {
        let notes = vec![
            n(0, 0, NoteKind::Tap),
            n(0, 3, NoteKind::Tap),
            n(1, 1, NoteKind::Mine),
            n(2, 2, NoteKind::Lift),
        ];
        let joined = group_notes(&notes, &GroupOptions::default());
        assert_eq!(joined.iter().map(NoteGroup::len).collect::<Vec<_>>(), vec![2, 1]);

        let separate = group_notes(
            &notes,
            &GroupOptions {
                same_beat: SameBeatNotes::KeepSeparate,
                ..Default::default()
            },
        );
        assert_eq!(separate.len(), 3);
    }

    #[test]
    fn heads_join_their_tails() {
        let notes = vec![
            n(0, 0, NoteKind::HoldHead),
            n(1, 1, NoteKind::Tap),
            n(2, 0, NoteKind::HoldTail),
        ];
        let options = GroupOptions {
            include: NoteKinds::STEPS.with(NoteKind::HoldTail),
            join_heads_to_tails: true,
            ..Default::default()
        };
        let groups = group_notes(&notes, &options);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].notes()[0].tail_beat, Some(beat_from_int(2)));
        assert_eq!(groups[1].notes()[0].tail_beat, None);
    }

    #[test]
    fn orphans_are_dropped_on_request() {
        // Column 0: head, head, tail. The first head is orphaned.
        // Column 1: a tail with no head. Column 2: a head with no tail.
        let notes = vec![
            n(0, 0, NoteKind::HoldHead),
            n(1, 0, NoteKind::HoldHead),
            n(1, 1, NoteKind::HoldTail),
            n(2, 0, NoteKind::HoldTail),
            n(3, 2, NoteKind::RollHead),
        ];
        let drop = GroupOptions {
            include: NoteKinds::of(&[NoteKind::HoldHead, NoteKind::RollHead, NoteKind::HoldTail]),
            join_heads_to_tails: true,
            orphans: OrphanedNotes::DropOrphan,
            ..Default::default()
        };
        let groups = group_notes(&notes, &drop);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].beat(), beat_from_int(1));
        assert_eq!(groups[0].notes()[0].tail_beat, Some(beat_from_int(2)));

        let keep = GroupOptions {
            orphans: OrphanedNotes::KeepOrphan,
            ..drop
        };
        let kept: usize = group_notes(&notes, &keep).iter().map(NoteGroup::len).sum();
        assert_eq!(kept, 4);
    }

    #[test]
    fn restricting_after_grouping() {
        let notes = vec![
            n(0, 0, NoteKind::Tap),
            n(0, 1, NoteKind::Lift),
            n(1, 1, NoteKind::Lift),
        ];
        let groups = group_notes(&notes, &GroupOptions::default());
        let arrows = restrict(&groups, NoteKinds::ARROWS);
        assert_eq!(arrows.len(), 1);
        assert_eq!(arrows[0].len(), 1);
        assert_eq!(arrows[0].count_kind(NoteKind::Tap), 1);
    }
}
