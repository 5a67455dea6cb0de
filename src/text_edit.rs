//! Offset-based source patching.
//!
//! The renderer never re-prints the AST; it removes and overwrites byte
//! ranges of the original module text. `Patcher` collects non-overlapping
//! edits, applies them in one pass, and reports where each retained chunk
//! of original text landed in the output, which is exactly what the
//! source-map builder needs.

/// Where a run of output text came from in the original source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset in the patched output.
    pub out: u32,
    /// Byte offset in the original source.
    pub src: u32,
}

#[derive(Debug)]
struct Edit {
    start: u32,
    end: u32,
    replacement: String,
}

/// Accumulates edits against one immutable source string.
pub struct Patcher<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl<'a> Patcher<'a> {
    pub fn new(source: &'a str) -> Self {
        Patcher {
            source,
            edits: Vec::new(),
        }
    }

    /// Delete `[start, end)`.
    pub fn remove(&mut self, start: u32, end: u32) {
        self.overwrite(start, end, String::new());
    }

    /// Replace `[start, end)` with `replacement`.
    pub fn overwrite(&mut self, start: u32, end: u32, replacement: String) {
        debug_assert!(start <= end && end as usize <= self.source.len());
        self.edits.push(Edit {
            start,
            end,
            replacement,
        });
    }

    /// Apply all edits. Edits must not overlap; an edit nested inside an
    /// already-removed range is silently dropped (a reference rewrite
    /// inside an excised statement).
    pub fn apply(mut self) -> (String, Vec<Chunk>) {
        self.edits.sort_by_key(|e| (e.start, e.end));

        let mut output = String::with_capacity(self.source.len());
        let mut chunks = Vec::new();
        let mut cursor = 0u32;

        for edit in &self.edits {
            if edit.start < cursor {
                // Swallowed by a preceding removal/overwrite.
                continue;
            }
            if edit.start > cursor {
                chunks.push(Chunk {
                    out: output.len() as u32,
                    src: cursor,
                });
                output.push_str(&self.source[cursor as usize..edit.start as usize]);
            }
            if !edit.replacement.is_empty() {
                // Replacement text maps back to the span it replaced.
                chunks.push(Chunk {
                    out: output.len() as u32,
                    src: edit.start,
                });
                output.push_str(&edit.replacement);
            }
            cursor = edit.end;
        }
        if (cursor as usize) < self.source.len() {
            chunks.push(Chunk {
                out: output.len() as u32,
                src: cursor,
            });
            output.push_str(&self.source[cursor as usize..]);
        }

        (output, chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_source_passes_through() {
        let (out, chunks) = Patcher::new("let a = 1;").apply();
        assert_eq!(out, "let a = 1;");
        assert_eq!(chunks, vec![Chunk { out: 0, src: 0 }]);
    }

    #[test]
    fn remove_and_overwrite() {
        let source = "export const foo = bar;";
        let mut patcher = Patcher::new(source);
        patcher.remove(0, 7); // "export "
        patcher.overwrite(19, 22, "bar$1".to_string());
        let (out, _) = patcher.apply();
        assert_eq!(out, "const foo = bar$1;");
    }

    #[test]
    fn nested_edit_inside_removal_is_dropped() {
        let source = "drop me; keep;";
        let mut patcher = Patcher::new(source);
        patcher.remove(0, 9);
        patcher.overwrite(5, 7, "you".to_string()); // inside the removal
        let (out, _) = patcher.apply();
        assert_eq!(out, "keep;");
    }

    #[test]
    fn chunks_track_retained_offsets() {
        let source = "aaa bbb ccc";
        let mut patcher = Patcher::new(source);
        patcher.remove(4, 8); // "bbb "
        let (out, chunks) = patcher.apply();
        assert_eq!(out, "aaa ccc");
        assert_eq!(
            chunks,
            vec![Chunk { out: 0, src: 0 }, Chunk { out: 4, src: 8 }]
        );
    }
}
