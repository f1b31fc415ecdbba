use super::types::{JoinedLine, LogicalLine, PreprocessResult};

/// Join physical lines that are continued with a trailing backslash.
pub fn join_continued_lines(physical: &[&str]) -> Vec<JoinedLine> {
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < physical.len() {
        let start = i;
        let mut buf = String::new();

        loop {
            let line = physical[i];
            let det = line.trim_end_matches([' ', '\t', '\r']);
            let continues = det.ends_with('\\');
            let piece = if continues {
                &det[..det.len() - 1]
            } else {
                line.trim_end_matches('\r')
            };

            if buf.is_empty() {
                buf.push_str(piece);
            } else {
                buf.push(' ');
                buf.push_str(piece.trim_start());
            }

            if continues && i + 1 < physical.len() {
                i += 1;
                continue;
            }
            break;
        }

        out.push(JoinedLine {
            text: buf,
            phys_start: start,
            phys_end: i,
        });

        i += 1;
    }

    out
}

/// Width of the leading whitespace; a tab counts as four columns.
pub fn indent_width(text: &str) -> usize {
    let mut width = 0;
    for ch in text.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Measure indentation and normalize the text of each joined line.
pub fn annotate_indentation(joined: Vec<JoinedLine>) -> Vec<LogicalLine> {
    joined
        .into_iter()
        .map(|j| LogicalLine {
            indent: indent_width(&j.text),
            text: j.text.trim().to_string(),
            phys_start: j.phys_start,
            phys_end: j.phys_end,
        })
        .collect()
}

/// Full preprocessing pipeline
pub fn preprocess_lines(physical: &[&str]) -> PreprocessResult {
    PreprocessResult {
        logical: annotate_indentation(join_continued_lines(physical)),
    }
}
