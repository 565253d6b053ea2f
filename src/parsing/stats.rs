use crate::analysis::group::{GroupOptions, NoteGroup, OrphanedNotes, SameBeatNotes, group_notes};
use crate::game::note::{Note, NoteKind, NoteKinds};
use crate::game::timing::Beat;
use serde::Serialize;

/// Summary note counts of a chart.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChartCounts {
    pub objects: u32,
    pub steps: u32,
    pub combo: u32,
    pub jumps: u32,
    pub mines: u32,
    pub hands: u32,
    pub holds: u32,
    pub rolls: u32,
    pub lifts: u32,
    pub fakes: u32,
}

impl ChartCounts {
    /// `all` is every decoded note, `hittables` the filtered ones, and
    /// `step_groups` the same-beat groups of hittable steps. `hittable`
    /// decides whether a beat can be played, for the hands count.
    pub fn compute(
        all: &[Note],
        hittables: &[Note],
        step_groups: &[NoteGroup],
        hittable: impl FnMut(Beat) -> bool,
    ) -> Self {
        Self {
            objects: count_kinds(all, NoteKinds::OBJECTS),
            steps: step_groups.len() as u32,
            combo: step_groups.iter().map(NoteGroup::len).sum::<usize>() as u32,
            jumps: step_groups.iter().filter(|g| g.len() >= 2).count() as u32,
            mines: count_kinds(hittables, NoteKind::Mine.into()),
            hands: count_hands(all, hittable),
            holds: count_paired_heads(hittables, NoteKind::HoldHead),
            rolls: count_paired_heads(hittables, NoteKind::RollHead),
            lifts: count_kinds(hittables, NoteKind::Lift.into()),
            fakes: count_kinds(all, NoteKind::Fake.into()),
        }
    }
}

/// Same-beat groups of hittable steps, the basis of steps, combo and jumps.
pub fn step_groups(hittables: &[Note]) -> Vec<NoteGroup> {
    group_notes(hittables, &GroupOptions::default())
}

fn count_kinds(notes: &[Note], kinds: NoteKinds) -> u32 {
    notes.iter().filter(|n| kinds.contains(n.kind)).count() as u32
}

/// Heads of `kind` that have a tail.
fn count_paired_heads(notes: &[Note], kind: NoteKind) -> u32 {
    let options = GroupOptions {
        include: NoteKinds::single(kind).with(NoteKind::HoldTail),
        same_beat: SameBeatNotes::KeepSeparate,
        join_heads_to_tails: true,
        orphans: OrphanedNotes::DropOrphan,
    };
    group_notes(notes, &options)
        .iter()
        .map(|g| g.count_kind(kind))
        .sum::<usize>() as u32
}

/// Rows where three or more panels are held down at once, counting holds and
/// rolls still running from earlier rows. Tails that ended on an earlier
/// beat free their column first. Unhittable rows are skipped entirely, so
/// their heads start no holds.
pub fn count_hands(notes: &[Note], mut hittable: impl FnMut(Beat) -> bool) -> u32 {
    let options = GroupOptions {
        include: NoteKinds::STEPS.with(NoteKind::HoldTail),
        same_beat: SameBeatNotes::JoinAll,
        join_heads_to_tails: true,
        orphans: OrphanedNotes::KeepOrphan,
    };
    let groups = group_notes(notes, &options);
    let columns = notes.iter().map(|n| n.column + 1).max().unwrap_or(0);
    let mut active: Vec<Option<Beat>> = vec![None; columns];

    let mut hands = 0;
    for group in &groups {
        let beat = group.beat();
        for slot in active.iter_mut() {
            if matches!(*slot, Some(tail) if tail < beat) {
                *slot = None;
            }
        }
        if !hittable(beat) {
            continue;
        }
        let holding = active.iter().filter(|slot| slot.is_some()).count();
        if holding + group.len() > 2 {
            hands += 1;
        }
        for grouped in group.notes() {
            if let Some(tail) = grouped.tail_beat {
                active[grouped.note.column] = Some(tail);
            }
        }
    }
    hands
}
