use crate::game::note::{Note, NoteKind};
use crate::game::timing::{Beat, Segment, TimingModel, beat_from_int};
use log::debug;
use num_rational::Ratio;

/// Beat spans whose notes are for show only. Spans are sorted, disjoint, and
/// their ends increase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeRegions {
    regions: Vec<(Beat, Beat)>,
}

impl FakeRegions {
    /// Builds the region list from `#FAKES` segments. Regions shorter than
    /// `min_length` are dropped and negative lengths count as zero. A region
    /// starting inside the previous one replaces that one's end, even if
    /// the new end is earlier.
    pub fn new(segments: &[Segment], min_length: Ratio<i64>) -> Self {
        let mut sorted: Vec<&Segment> = segments.iter().collect();
        sorted.sort_by(|a, b| a.beat.cmp(&b.beat));

        let zero = beat_from_int(0);
        let mut regions: Vec<(Beat, Beat)> = Vec::with_capacity(sorted.len());
        for seg in sorted {
            let length = seg.value.max(zero);
            if length < min_length {
                debug!("Ignoring fake region at beat {} of length {}.", seg.beat, seg.value);
                continue;
            }
            let end = seg.beat + length;
            match regions.last_mut() {
                Some(last) if seg.beat < last.1 => last.1 = end,
                _ => regions.push((seg.beat, end)),
            }
        }
        Self { regions }
    }

    pub fn regions(&self) -> &[(Beat, Beat)] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn cursor(&self) -> FakeCursor<'_> {
        FakeCursor {
            regions: &self.regions,
            idx: 0,
            last: None,
        }
    }
}

/// Answers containment queries for a rising sequence of beats in one pass.
pub struct FakeCursor<'a> {
    regions: &'a [(Beat, Beat)],
    idx: usize,
    last: Option<Beat>,
}

impl FakeCursor<'_> {
    pub fn contains(&mut self, beat: Beat) -> bool {
        if matches!(self.last, Some(prev) if beat < prev) {
            debug!("Fake region cursor moved back to beat {}, rewinding.", beat);
            self.idx = 0;
        }
        self.last = Some(beat);
        while self.idx < self.regions.len() && self.regions[self.idx].1 <= beat {
            self.idx += 1;
        }
        self.regions
            .get(self.idx)
            .is_some_and(|&(start, _)| start <= beat)
    }
}

/// Hittability of a beat: reachable in time and outside every fake region.
pub struct HittableBeats<'a> {
    timing: &'a TimingModel,
    fakes: FakeCursor<'a>,
}

impl<'a> HittableBeats<'a> {
    pub fn new(timing: &'a TimingModel, fakes: &'a FakeRegions) -> Self {
        Self {
            timing,
            fakes: fakes.cursor(),
        }
    }

    pub fn check(&mut self, beat: Beat) -> bool {
        self.timing.hittable(beat) && !self.fakes.contains(beat)
    }
}

/// The notes a player can hit. Tails are always kept so that a head whose
/// tail falls in a fake region still pairs up; orphans are settled when
/// grouping.
pub fn hittable_notes(notes: &[Note], timing: &TimingModel, fakes: &FakeRegions) -> Vec<Note> {
    let mut beats = HittableBeats::new(timing, fakes);
    let kept: Vec<Note> = notes
        .iter()
        .filter(|note| note.kind == NoteKind::HoldTail || beats.check(note.beat))
        .cloned()
        .collect();
    debug!("{} of {} notes are hittable.", kept.len(), notes.len());
    kept
}
