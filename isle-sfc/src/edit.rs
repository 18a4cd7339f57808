use std::collections::BTreeMap;

use crate::error::AnnotateError;

/// Positional edits over an immutable source, applied all at once.
///
/// Insertions are anchored to byte offsets of the original text. At a given
/// offset, `append_left` content comes before `append_right` content, and both
/// come before the replacement of an overwrite starting there. Insertions that
/// fall strictly inside an overwritten range are dropped with it.
#[derive(Debug)]
pub struct EditBuffer<'a> {
    source: &'a str,
    inserts: BTreeMap<usize, Anchored>,
    overwrites: Vec<Overwrite>,
}

#[derive(Debug, Default)]
struct Anchored {
    left: Vec<String>,
    right: Vec<String>,
}

#[derive(Debug)]
struct Overwrite {
    start: usize,
    end: usize,
    content: String,
}

impl<'a> EditBuffer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inserts: BTreeMap::new(),
            overwrites: Vec::new(),
        }
    }

    pub fn overwrite(&mut self, start: usize, end: usize, content: impl Into<String>) {
        debug_assert!(start < end && end <= self.source.len());
        self.overwrites.push(Overwrite {
            start,
            end,
            content: content.into(),
        });
    }

    pub fn append_left(&mut self, index: usize, content: impl Into<String>) {
        self.inserts.entry(index).or_default().left.push(content.into());
    }

    pub fn append_right(&mut self, index: usize, content: impl Into<String>) {
        self.inserts.entry(index).or_default().right.push(content.into());
    }

    pub fn has_changed(&self) -> bool {
        !self.inserts.is_empty() || !self.overwrites.is_empty()
    }

    /// Render the edited text. Overlapping overwrites are rejected.
    pub fn apply(mut self) -> Result<String, AnnotateError> {
        self.overwrites.sort_by_key(|o| o.start);
        for pair in self.overwrites.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(AnnotateError::OverlappingEdit {
                    offset: pair[1].start,
                });
            }
        }

        let mut out = String::with_capacity(self.source.len() + 256);
        let mut cursor = 0;
        for ow in &self.overwrites {
            self.copy_range(&mut out, cursor, ow.start);
            out.push_str(&ow.content);
            cursor = ow.end;
        }
        self.copy_range(&mut out, cursor, self.source.len());
        Ok(out)
    }

    /// Copies `source[from..to]`, emitting insertions anchored in `from..=to`.
    fn copy_range(&self, out: &mut String, from: usize, to: usize) {
        let mut last = from;
        for (&at, anchored) in self.inserts.range(from..=to) {
            out.push_str(&self.source[last..at]);
            for s in anchored.left.iter().chain(&anchored.right) {
                out.push_str(s);
            }
            last = at;
        }
        out.push_str(&self.source[last..to]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_surround_overwrites() {
        let mut s = EditBuffer::new("<slot>x</slot>");
        s.overwrite(0, 6, "<div>");
        s.overwrite(7, 14, "</div>");
        s.append_right(6, "[");
        s.append_left(7, "]");
        assert_eq!(s.apply().unwrap(), "<div>[x]</div>");
    }

    #[test]
    fn left_before_right_at_same_offset() {
        let mut s = EditBuffer::new("ab");
        s.append_right(1, "R");
        s.append_left(1, "L");
        assert_eq!(s.apply().unwrap(), "aLRb");
    }

    #[test]
    fn overlapping_overwrites_are_an_error() {
        let mut s = EditBuffer::new("abcdef");
        s.overwrite(0, 3, "x");
        s.overwrite(2, 4, "y");
        assert!(matches!(
            s.apply(),
            Err(AnnotateError::OverlappingEdit { offset: 2 })
        ));
    }
}
