//! Version-3 source maps.
//!
//! The bundle emits a content-preserving map alongside the output: every
//! retained chunk of every module contributes one segment pointing from its
//! generated position back to its original line and column. Mappings use
//! the standard base64-VLQ encoding; the JSON shape is serialized with
//! `serde_json`.

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encode one value as base64-VLQ, appending to `out`.
fn encode_vlq(value: i64, out: &mut String) {
    // Sign bit goes in the low bit of the first digit.
    let mut rest = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (rest & 0x1f) as usize;
        rest >>= 5;
        if rest > 0 {
            digit |= 0x20; // continuation bit
        }
        out.push(BASE64[digit] as char);
        if rest == 0 {
            break;
        }
    }
}

/// Line-start table for converting byte offsets to (line, column).
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        LineIndex { line_starts }
    }

    /// Zero-based (line, column) of a byte offset.
    pub fn position(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line as u32, offset - self.line_starts[line])
    }
}

/// Serialized source-map document.
#[derive(Debug, Serialize)]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent")]
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("source map serialization cannot fail")
    }
}

/// One mapping segment before encoding.
#[derive(Clone, Copy, Debug)]
struct Segment {
    gen_line: u32,
    gen_col: u32,
    source: u32,
    src_line: u32,
    src_col: u32,
}

/// Accumulates segments and encodes the `mappings` string.
pub struct SourceMapBuilder {
    file: String,
    sources: Vec<String>,
    sources_content: Vec<String>,
    segments: Vec<Segment>,
}

impl SourceMapBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        SourceMapBuilder {
            file: file.into(),
            sources: Vec::new(),
            sources_content: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn add_source(&mut self, path: impl Into<String>, content: impl Into<String>) -> u32 {
        self.sources.push(path.into());
        self.sources_content.push(content.into());
        self.sources.len() as u32 - 1
    }

    pub fn add_segment(
        &mut self,
        gen_line: u32,
        gen_col: u32,
        source: u32,
        src_line: u32,
        src_col: u32,
    ) {
        self.segments.push(Segment {
            gen_line,
            gen_col,
            source,
            src_line,
            src_col,
        });
    }

    pub fn build(mut self) -> SourceMap {
        self.segments
            .sort_by_key(|s| (s.gen_line, s.gen_col, s.source));

        let mut mappings = String::new();
        let mut current_line = 0u32;
        // Fields are delta-encoded across the whole mappings string,
        // except the generated column which resets per line.
        let mut prev_gen_col = 0i64;
        let mut prev_source = 0i64;
        let mut prev_src_line = 0i64;
        let mut prev_src_col = 0i64;
        let mut first_in_line = true;

        for segment in &self.segments {
            while current_line < segment.gen_line {
                mappings.push(';');
                current_line += 1;
                prev_gen_col = 0;
                first_in_line = true;
            }
            if !first_in_line {
                mappings.push(',');
            }
            first_in_line = false;

            encode_vlq(segment.gen_col as i64 - prev_gen_col, &mut mappings);
            encode_vlq(segment.source as i64 - prev_source, &mut mappings);
            encode_vlq(segment.src_line as i64 - prev_src_line, &mut mappings);
            encode_vlq(segment.src_col as i64 - prev_src_col, &mut mappings);

            prev_gen_col = segment.gen_col as i64;
            prev_source = segment.source as i64;
            prev_src_line = segment.src_line as i64;
            prev_src_col = segment.src_col as i64;
        }

        SourceMap {
            version: 3,
            file: self.file,
            sources: self.sources,
            sources_content: self.sources_content,
            names: Vec::new(),
            mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[test]
    fn vlq_known_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
    }

    #[test]
    fn line_index_positions() {
        let index = LineIndex::new("ab\ncde\n\nf");
        assert_eq!(index.position(0), (0, 0));
        assert_eq!(index.position(1), (0, 1));
        assert_eq!(index.position(3), (1, 0));
        assert_eq!(index.position(5), (1, 2));
        assert_eq!(index.position(7), (2, 0));
        assert_eq!(index.position(8), (3, 0));
    }

    #[test]
    fn builder_emits_sorted_relative_segments() {
        let mut builder = SourceMapBuilder::new("bundle.js");
        let a = builder.add_source("/src/a.js", "let a = 1;\n");
        builder.add_segment(0, 0, a, 0, 0);
        builder.add_segment(1, 0, a, 1, 0);
        let map = builder.build();
        assert_eq!(map.version, 3);
        assert_eq!(map.mappings, "AAAA;AACA");
        assert_eq!(map.sources_content.len(), 1);
    }

    #[test]
    fn json_shape_uses_camel_case() {
        let map = SourceMapBuilder::new("bundle.js").build();
        let json = map.to_json();
        assert!(json.contains("\"sourcesContent\""));
        assert!(json.contains("\"version\":3"));
    }
}
