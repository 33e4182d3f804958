use text_size::{TextRange, TextSize};

/// Replacement of `range` (in the text the edit applies to) with `new_len`
/// bytes of new text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextEdit {
    pub range: TextRange,
    pub new_len: TextSize,
}

impl TextEdit {
    #[inline]
    pub fn new(range: TextRange, new_len: TextSize) -> Self {
        Self { range, new_len }
    }

    #[inline]
    pub fn replace(range: TextRange, text: &str) -> Self {
        Self::new(range, TextSize::of(text))
    }

    #[inline]
    pub fn insert(offset: TextSize, text: &str) -> Self {
        Self::replace(TextRange::empty(offset), text)
    }

    #[inline]
    pub fn delete(range: TextRange) -> Self {
        Self::new(range, TextSize::new(0))
    }

    /// Range the replacement occupies in the edited text.
    #[inline]
    pub fn new_range(&self) -> TextRange {
        TextRange::at(self.range.start(), self.new_len)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EditRangeError {
    #[error("edit range {range:?} is outside of the text (length {len:?})")]
    OutOfBounds { range: TextRange, len: TextSize },
    #[error("edits produce a text of length {expected:?}, but the new text has length {actual:?}")]
    LengthMismatch { expected: TextSize, actual: TextSize },
    #[error("edit range {range:?} does not fall on character boundaries")]
    NotCharBoundary { range: TextRange },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Segment {
    old_start: TextSize,
    new_start: TextSize,
    len: TextSize,
}

impl Segment {
    #[inline]
    fn new_range(&self) -> TextRange {
        TextRange::at(self.new_start, self.len)
    }
}

/// Maps byte ranges of the last parsed text onto the current text.
///
/// Only bytes that no edit touched are mapped; everything else is "dirty".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditMap {
    segments: Vec<Segment>,
    len: TextSize,
    old_len: TextSize,
}

impl EditMap {
    /// Map for an unedited text of length `len`.
    pub fn identity(len: TextSize) -> Self {
        let segments = if len == TextSize::new(0) {
            Vec::new()
        } else {
            vec![Segment { old_start: TextSize::new(0), new_start: TextSize::new(0), len }]
        };
        Self { segments, len, old_len: len }
    }

    /// Length of the current (edited) text.
    #[inline]
    pub fn len(&self) -> TextSize {
        self.len
    }

    /// Length of the text the map was started from.
    #[inline]
    pub fn old_len(&self) -> TextSize {
        self.old_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == TextSize::new(0)
    }

    /// Returns `true` if no edit has been applied.
    pub fn is_identity(&self) -> bool {
        self.len == self.old_len
            && match self.segments.as_slice() {
                [] => self.len == TextSize::new(0),
                [only] => only.old_start == only.new_start && only.len == self.len,
                _ => false,
            }
    }

    /// Applies `edit`, whose range is expressed in the current text.
    pub fn apply(&self, edit: &TextEdit) -> Result<EditMap, EditRangeError> {
        if edit.range.end() > self.len {
            return Err(EditRangeError::OutOfBounds { range: edit.range, len: self.len });
        }

        let shift =
            |offset: TextSize| offset - edit.range.end() + edit.range.start() + edit.new_len;
        let mut segments = Vec::with_capacity(self.segments.len() + 1);

        for segment in &self.segments {
            let range = segment.new_range();
            if range.end() <= edit.range.start() {
                segments.push(*segment);
            } else if range.start() >= edit.range.end() {
                segments.push(Segment { new_start: shift(range.start()), ..*segment });
            } else {
                if range.start() < edit.range.start() {
                    let len = edit.range.start() - range.start();
                    segments.push(Segment { len, ..*segment });
                }
                if edit.range.end() < range.end() {
                    let skipped = edit.range.end() - range.start();
                    segments.push(Segment {
                        old_start: segment.old_start + skipped,
                        new_start: shift(edit.range.end()),
                        len: range.end() - edit.range.end(),
                    });
                }
            }
        }

        let len = shift(self.len);
        Ok(EditMap { segments, len, old_len: self.old_len })
    }

    /// Translates a range of the old text to the current text if every byte
    /// of it is untouched by edits.
    pub fn unchanged(&self, old: TextRange) -> Option<TextRange> {
        let index = self.segments.partition_point(|segment| segment.old_start <= old.start());
        let segment = self.segments.get(index.checked_sub(1)?)?;
        let old_end = segment.old_start + segment.len;
        if old.end() > old_end {
            return None;
        }
        Some(TextRange::at(segment.new_start + (old.start() - segment.old_start), old.len()))
    }

    /// Translates an offset of the old text to the current text. Offsets in
    /// replaced text land on the start of the replacement, so the mapping is
    /// monotonic but not exact for dirty bytes.
    pub fn map_offset(&self, old: TextSize) -> TextSize {
        let index = self.segments.partition_point(|segment| segment.old_start <= old);
        let Some(segment) = index.checked_sub(1).and_then(|index| self.segments.get(index)) else {
            return TextSize::new(0);
        };
        let delta = (old - segment.old_start).min(segment.len);
        segment.new_start + delta
    }
}
