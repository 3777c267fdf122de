//! Idempotent splice of generated code into hand-written files.
//!
//! Everything above the marker line belongs to the author and is carried
//! over verbatim. Everything from the marker to end-of-file is replaced on
//! every run.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Sentinel line separating authored code from generated code.
pub const MARKER: &str = "// ---- soliton:generated ---- DO NOT EDIT BELOW THIS LINE ----";

/// Any line mentioning this tag must be exactly [`MARKER`].
const MARKER_TAG: &str = "soliton:generated";

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error("splice target does not exist: {}", path.display())]
    #[diagnostic(code(soliton::splice::missing_file))]
    MissingFile { path: PathBuf },

    #[error("generated-code marker appears {} times (lines {lines:?})", lines.len())]
    #[diagnostic(
        code(soliton::splice::duplicate_marker),
        help("Remove all but one marker line; the file was left untouched")
    )]
    DuplicateMarker { lines: Vec<usize> },

    #[error("malformed generated-code marker on line {line}: {text}")]
    #[diagnostic(
        code(soliton::splice::malformed_marker),
        help("Restore the marker line exactly, or delete it and everything below it")
    )]
    MalformedMarker { line: usize, text: String },
}

/// Replaces the generated region of `existing` with `block`.
///
/// Pure: the caller decides whether to write the result. Fails without
/// guessing when the marker is duplicated or damaged.
pub fn splice(existing: &str, block: &str) -> Result<String, SpliceError> {
    let mut markers = Vec::new();
    let mut offset = 0;

    for (index, line) in existing.split_inclusive('\n').enumerate() {
        let content = line.trim();
        if content == MARKER {
            markers.push((index + 1, offset));
        } else if content.contains(MARKER_TAG) {
            return Err(SpliceError::MalformedMarker {
                line: index + 1,
                text: content.to_string(),
            });
        }
        offset += line.len();
    }

    let authored = match markers.as_slice() {
        [] => existing,
        [(_, start)] => &existing[..*start],
        _ => {
            return Err(SpliceError::DuplicateMarker {
                lines: markers.iter().map(|(line, _)| *line).collect(),
            })
        }
    };

    let newline = if authored.contains("\r\n") { "\r\n" } else { "\n" };
    let block = block.trim();
    let mut output = String::with_capacity(authored.len() + MARKER.len() + block.len() + 8);
    output.push_str(authored);

    // Only ever append: the separator is a blank line, and a prefix that
    // already ends in one gets nothing, so re-runs see the same prefix.
    if !authored.is_empty() {
        if !authored.ends_with('\n') {
            output.push_str(newline);
        }
        if !ends_with_blank_line(&output) {
            output.push_str(newline);
        }
    }

    output.push_str(MARKER);
    output.push_str(newline);
    if !block.is_empty() {
        output.push_str(newline);
        for line in block.lines() {
            output.push_str(line.trim_end_matches('\r'));
            output.push_str(newline);
        }
    }
    Ok(output)
}

fn ends_with_blank_line(text: &str) -> bool {
    text.ends_with("\n\n") || text.ends_with("\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORED: &str = "package model\n\n// +soliton:aggregate\ntype Order struct {\n\tID int64\n}\n";
    const BLOCK: &str = "func (e *Order) GetID() int64 {\n\treturn e.ID\n}\n";

    #[test]
    fn test_appends_when_marker_absent() {
        let output = splice(AUTHORED, BLOCK).unwrap();
        assert!(output.starts_with(AUTHORED));
        assert!(output.contains(MARKER));
        assert!(output.ends_with(BLOCK));
    }

    #[test]
    fn test_idempotent() {
        let once = splice(AUTHORED, BLOCK).unwrap();
        let twice = splice(&once, BLOCK).unwrap();
        let thrice = splice(&twice, BLOCK).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice, thrice);
    }

    #[test]
    fn test_replaces_generated_region_only() {
        let once = splice(AUTHORED, BLOCK).unwrap();
        let edited = once.replace("type Order struct", "type Order struct // edited");
        let output = splice(&edited, "func (e *Order) IsNew() bool {\n\treturn e.ID == 0\n}\n").unwrap();
        assert!(output.contains("// edited"));
        assert!(output.contains("IsNew"));
        assert!(!output.contains("GetID"));
    }

    #[test]
    fn test_duplicate_marker_fails() {
        let once = splice(AUTHORED, BLOCK).unwrap();
        let doubled = format!("{}{}\n", once, MARKER);
        match splice(&doubled, BLOCK).unwrap_err() {
            SpliceError::DuplicateMarker { lines } => assert_eq!(lines.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_marker_fails() {
        let damaged = format!("{}// ---- soliton:generated ----\n", AUTHORED);
        assert!(matches!(
            splice(&damaged, BLOCK),
            Err(SpliceError::MalformedMarker { line: 7, .. })
        ));
    }

    #[test]
    fn test_authored_trailing_whitespace_kept() {
        let authored = "package model\n\ntype Order struct {\n\tID int64\n}\n\n\n// trailing note   \n\t\n";
        let once = splice(authored, BLOCK).unwrap();
        assert!(once.starts_with(authored));
        assert_eq!(splice(&once, BLOCK).unwrap(), once);
    }

    #[test]
    fn test_missing_final_newline_completed() {
        let authored = "package model\n\ntype Order struct{}";
        let once = splice(authored, BLOCK).unwrap();
        assert!(once.starts_with("package model\n\ntype Order struct{}\n\n// ----"));
        assert_eq!(splice(&once, BLOCK).unwrap(), once);
    }

    #[test]
    fn test_crlf_authored_content_kept() {
        let authored = AUTHORED.replace('\n', "\r\n");
        let once = splice(&authored, BLOCK).unwrap();
        assert!(once.starts_with(&authored));
        assert!(!once.replace("\r\n", "").contains('\n'));
        assert_eq!(splice(&once, BLOCK).unwrap(), once);
    }

    #[test]
    fn test_crlf_marker_recognised() {
        let once = splice(AUTHORED, BLOCK).unwrap().replace('\n', "\r\n");
        assert!(splice(&once, BLOCK).is_ok());
    }
}
