//! Source map (v3) generation.
//!
//! Mappings are gathered by the serializer as `(output offset, input span)`
//! pairs and encoded here as base64 VLQ segments, one group per output line.

use codemap::CodeMap;
use serde::Serialize;

use crate::serializer::SourceMapping;

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// The JSON object written alongside the CSS output.
#[derive(Debug, Serialize)]
pub struct SourceMap {
    pub version: u32,
    pub file: String,
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("source map serialization is infallible")
    }
}

/// Appends one signed VLQ value to `out`.
fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq != 0 {
            digit |= 0b100000;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Computes `(line, column)` pairs for a list of byte offsets into `text`.
///
/// Columns are in UTF-16 code units, per the source map specification.
fn offsets_to_positions(text: &str, offsets: &[usize]) -> Vec<(u32, u32)> {
    let mut positions = Vec::with_capacity(offsets.len());

    let mut sorted: Vec<(usize, usize)> = offsets.iter().copied().enumerate().collect();
    sorted.sort_by_key(|&(_, offset)| offset);

    positions.resize(offsets.len(), (0, 0));

    let mut line = 0_u32;
    let mut col = 0_u32;
    let mut byte = 0_usize;
    let mut iter = sorted.into_iter().peekable();

    for c in text.chars() {
        while let Some(&(idx, offset)) = iter.peek() {
            if offset <= byte {
                positions[idx] = (line, col);
                iter.next();
            } else {
                break;
            }
        }

        if iter.peek().is_none() {
            break;
        }

        byte += c.len_utf8();
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += c.len_utf16() as u32;
        }
    }

    for (idx, _) in iter {
        positions[idx] = (line, col);
    }

    positions
}

/// Builds the source map for one compilation.
pub(crate) fn build_source_map(
    output: &str,
    output_file: &str,
    mappings: &[SourceMapping],
    map: &CodeMap,
    include_contents: bool,
) -> SourceMap {
    let mut sources: Vec<String> = Vec::new();
    let mut contents: Vec<String> = Vec::new();

    let output_positions =
        offsets_to_positions(output, &mappings.iter().map(|m| m.offset).collect::<Vec<_>>());

    struct Segment {
        out_line: u32,
        out_col: u32,
        src_index: u32,
        src_line: u32,
        src_col: u32,
    }

    let mut segments: Vec<Segment> = Vec::with_capacity(mappings.len());

    for (mapping, &(out_line, out_col)) in mappings.iter().zip(&output_positions) {
        let loc = map.look_up_span(mapping.span);
        let file_name = loc.file.name().to_owned();

        let src_index = match sources.iter().position(|s| *s == file_name) {
            Some(idx) => idx,
            None => {
                sources.push(file_name);
                contents.push(loc.file.source().to_owned());
                sources.len() - 1
            }
        } as u32;

        segments.push(Segment {
            out_line,
            out_col,
            src_index,
            src_line: loc.begin.line as u32,
            src_col: loc.begin.column as u32,
        });
    }

    segments.sort_by_key(|s| (s.out_line, s.out_col));

    let mut encoded = String::new();

    let mut prev_out_line = 0_u32;
    let mut prev_out_col = 0_i64;
    let mut prev_src_index = 0_i64;
    let mut prev_src_line = 0_i64;
    let mut prev_src_col = 0_i64;
    let mut first_on_line = true;

    for segment in segments {
        while prev_out_line < segment.out_line {
            encoded.push(';');
            prev_out_line += 1;
            prev_out_col = 0;
            first_on_line = true;
        }

        if !first_on_line {
            encoded.push(',');
        }
        first_on_line = false;

        encode_vlq(&mut encoded, segment.out_col as i64 - prev_out_col);
        prev_out_col = segment.out_col as i64;

        encode_vlq(&mut encoded, segment.src_index as i64 - prev_src_index);
        prev_src_index = segment.src_index as i64;

        encode_vlq(&mut encoded, segment.src_line as i64 - prev_src_line);
        prev_src_line = segment.src_line as i64;

        encode_vlq(&mut encoded, segment.src_col as i64 - prev_src_col);
        prev_src_col = segment.src_col as i64;
    }

    SourceMap {
        version: 3,
        file: output_file.to_owned(),
        sources,
        sources_content: if include_contents {
            Some(contents)
        } else {
            None
        },
        names: Vec::new(),
        mappings: encoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_encodes_reference_values() {
        let mut out = String::new();
        encode_vlq(&mut out, 0);
        assert_eq!(out, "A");

        let mut out = String::new();
        encode_vlq(&mut out, 16);
        assert_eq!(out, "gB");

        let mut out = String::new();
        encode_vlq(&mut out, -1);
        assert_eq!(out, "D");
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let positions = offsets_to_positions("ab\ncd", &[0, 3, 4]);
        assert_eq!(positions, vec![(0, 0), (1, 0), (1, 1)]);
    }
}
