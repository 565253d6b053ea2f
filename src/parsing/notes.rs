use crate::game::note::{Note, NoteKind};
use crate::game::timing::{Beat, beat_from_int};
use log::debug;
use num_rational::Ratio;

/// Measures in the grid that stands in for empty note data.
const EMPTY_GRID_MEASURES: usize = 4;

/// The decoded notes of one chart, in beat order (ties by column).
#[derive(Clone, Debug, Default)]
pub struct NoteData {
    pub columns: usize,
    pub measures: usize,
    notes: Vec<Note>,
}

impl NoteData {
    /// Decodes a `#NOTES` grid line by line. `//` comments are stripped
    /// first; then `,` closes a measure and `;` ends the grid. Rows are
    /// trimmed, blank lines dropped, and only the first `columns` characters
    /// of each row are read.
    pub fn parse(text: &str, columns: usize) -> NoteData {
        let mut measures: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut saw_separator = false;
        for line in text.lines() {
            let line = strip_comment(line);
            let (line, end_of_grid) = match line.split_once(';') {
                Some((before, _)) => (before, true),
                None => (line, false),
            };
            for (i, part) in line.split(',').enumerate() {
                if i > 0 {
                    measures.push(std::mem::take(&mut current));
                    saw_separator = true;
                }
                let row = part.trim();
                if !row.is_empty() {
                    current.push(row);
                }
            }
            if end_of_grid {
                break;
            }
        }

        if !saw_separator && current.is_empty() {
            debug!("Empty note data, using a blank {}-column grid.", columns);
            return NoteData {
                columns,
                measures: EMPTY_GRID_MEASURES,
                notes: Vec::new(),
            };
        }
        measures.push(current);

        let mut notes = Vec::new();
        for (measure_index, rows) in measures.iter().enumerate() {
            let rows_in_measure = rows.len() as i64;
            let measure_start = beat_from_int(measure_index as i64 * 4);
            for (row_index, row) in rows.iter().enumerate() {
                let beat = measure_start + Ratio::new(row_index as i64 * 4, rows_in_measure);
                for (column, byte) in row.bytes().take(columns).enumerate() {
                    if let Some(kind) = NoteKind::from_byte(byte) {
                        notes.push(Note::new(beat, column, kind));
                    }
                }
            }
        }

        debug!("Decoded {} notes over {} measures.", notes.len(), measures.len());
        NoteData {
            columns,
            measures: measures.len(),
            notes,
        }
    }

    #[inline]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Beat of the last note of any kind.
    pub fn last_beat(&self) -> Option<Beat> {
        self.notes.last().map(|n| n.beat)
    }
}

impl<'a> IntoIterator for &'a NoteData {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

/// Width of the first note row, for play styles with no known column count.
pub fn infer_columns(text: &str) -> Option<usize> {
    text.lines()
        .map(|line| strip_comment(line).trim())
        .find(|line| !line.is_empty() && !line.starts_with(',') && !line.starts_with(';'))
        .map(str::len)
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}
