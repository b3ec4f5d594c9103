//! Source map v3 generation.
//!
//! The emitter records one `SegmentMapping` per generated statement;
//! this module serializes them into the standard VLQ-encoded JSON
//! format consumed by browsers and Node. The base64 alphabet and 5-bit
//! continuation encoding are a fixed external contract.

use serde::Serialize;

/// One generated-position to source-position pair. Lines and columns are
/// 1-indexed here (matching `Loc`); the v3 format is 0-indexed and the
/// conversion happens at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMapping {
    pub source_file: String,
    pub source_line: usize,
    pub source_col: usize,
    pub out_line: usize,
    pub out_col: usize,
}

#[derive(Serialize)]
struct SourceMapJson<'a> {
    version: u32,
    file: &'a str,
    sources: &'a [String],
    names: [&'a str; 0],
    mappings: String,
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encode one signed value as base64 VLQ: sign bit in the lowest
/// position, then 5-bit groups, 0x20 continuation flag.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (vlq & 0x1f) as usize;
        vlq >>= 5;
        if vlq != 0 {
            digit |= 0x20;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Serialize mappings to a v3 source map JSON string. `sources` is the
/// ordered list of contributing files (more than one after a directory
/// merge); mappings referencing unknown files are skipped.
pub fn generate_source_map(
    file: &str,
    sources: &[String],
    mappings: &[SegmentMapping],
) -> String {
    let mut sorted: Vec<&SegmentMapping> = mappings.iter().collect();
    sorted.sort_by_key(|m| (m.out_line, m.out_col));

    let mut encoded = String::new();
    let mut current_line = 1usize;
    let mut prev_out_col: i64 = 0;
    let mut prev_source: i64 = 0;
    let mut prev_src_line: i64 = 0;
    let mut prev_src_col: i64 = 0;
    let mut first_in_line = true;

    for mapping in sorted {
        let source_index = match sources.iter().position(|s| *s == mapping.source_file) {
            Some(index) => index as i64,
            None => continue,
        };
        while current_line < mapping.out_line {
            encoded.push(';');
            current_line += 1;
            prev_out_col = 0;
            first_in_line = true;
        }
        if !first_in_line {
            encoded.push(',');
        }
        first_in_line = false;

        let out_col = mapping.out_col.saturating_sub(1) as i64;
        let src_line = mapping.source_line.saturating_sub(1) as i64;
        let src_col = mapping.source_col.saturating_sub(1) as i64;

        encode_vlq(out_col - prev_out_col, &mut encoded);
        encode_vlq(source_index - prev_source, &mut encoded);
        encode_vlq(src_line - prev_src_line, &mut encoded);
        encode_vlq(src_col - prev_src_col, &mut encoded);

        prev_out_col = out_col;
        prev_source = source_index;
        prev_src_line = src_line;
        prev_src_col = src_col;
    }

    let map = SourceMapJson {
        version: 3,
        file,
        sources,
        names: [],
        mappings: encoded,
    };
    serde_json::to_string(&map).expect("source map serialization cannot fail")
}

/// The `//# sourceMappingURL=` footer appended to each emitted JS file.
pub fn source_map_footer(map_file: &str) -> String {
    format!("//# sourceMappingURL={}\n", map_file)
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
    fn test_vlq_known_vectors() {
        // Canonical examples from the source map spec
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
        assert_eq!(vlq(15), "e");
    }

    #[test]
    fn test_generate_simple_map() {
        let mappings = vec![
            SegmentMapping {
                source_file: "app.tova".to_string(),
                source_line: 1,
                source_col: 1,
                out_line: 1,
                out_col: 1,
            },
            SegmentMapping {
                source_file: "app.tova".to_string(),
                source_line: 2,
                source_col: 1,
                out_line: 2,
                out_col: 1,
            },
        ];
        let json = generate_source_map("app.shared.js", &["app.tova".to_string()], &mappings);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["version"], 3);
        assert_eq!(parsed["sources"][0], "app.tova");
        assert_eq!(parsed["mappings"], "AAAA;AACA");
    }

    #[test]
    fn test_multi_source_map() {
        let mappings = vec![
            SegmentMapping {
                source_file: "a.tova".to_string(),
                source_line: 1,
                source_col: 1,
                out_line: 1,
                out_col: 1,
            },
            SegmentMapping {
                source_file: "b.tova".to_string(),
                source_line: 1,
                source_col: 1,
                out_line: 2,
                out_col: 1,
            },
        ];
        let sources = vec!["a.tova".to_string(), "b.tova".to_string()];
        let json = generate_source_map("dir.shared.js", &sources, &mappings);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["sources"].as_array().unwrap().len(), 2);
        // Second segment switches source index (delta +1) and rewinds the line
        assert_eq!(parsed["mappings"], "AAAA;ACAA");
    }

    #[test]
    fn test_footer() {
        assert_eq!(
            source_map_footer("app.client.js.map"),
            "//# sourceMappingURL=app.client.js.map\n"
        );
    }
}
