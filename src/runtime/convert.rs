//! Statement-level translation between the indentation form and Jac's brace
//! form.

use super::RuntimeError;
use crate::parser::{is_comment, preprocess_lines, split_top_level};
use crate::protocol::ConversionDirection;

const INDENT: &str = "    ";

pub fn translate(direction: ConversionDirection, source: &str) -> Result<String, RuntimeError> {
    match direction {
        ConversionDirection::PythonToJac => Ok(python_to_jac(source)),
        ConversionDirection::JacToPython => jac_to_python(source),
    }
}

const BLOCK_KEYWORDS: [&str; 7] = ["def", "class", "for", "while", "if", "elif", "else"];

fn starts_block(header: &str) -> bool {
    let keyword = header.split([' ', '(', ':']).next().unwrap_or_default();
    BLOCK_KEYWORDS.contains(&keyword)
}

fn is_block_header(text: &str) -> bool {
    text.ends_with(':') && starts_block(text)
}

fn python_to_jac(source: &str) -> String {
    let physical: Vec<&str> = source.lines().collect();
    let pre = preprocess_lines(&physical);

    let mut out: Vec<String> = Vec::new();
    // Indentation of every open block header.
    let mut open: Vec<usize> = Vec::new();
    let mut entry_open = false;

    for line in pre.logical.iter().filter(|l| !l.text.is_empty()) {
        while open.last().is_some_and(|&header| line.indent <= header) {
            open.pop();
            out.push(format!("{}}}", INDENT.repeat(open.len() + entry_open as usize)));
        }

        let comment = is_comment(&line.text);
        if line.indent == 0 && !comment {
            let is_def = line.text.starts_with("def ");
            if is_def && entry_open {
                out.push("}".to_string());
                entry_open = false;
            } else if !is_def && !entry_open {
                out.push("with entry {".to_string());
                entry_open = true;
            }
        }

        let pad = INDENT.repeat(open.len() + entry_open as usize);
        if comment {
            out.push(format!("{}{}", pad, line.text));
        } else if is_block_header(&line.text) {
            let header = line.text.trim_end_matches(':').trim_end();
            out.push(format!("{}{} {{", pad, header));
            open.push(line.indent);
        } else {
            out.push(format!("{}{};", pad, line.text));
        }
    }

    while open.pop().is_some() {
        out.push(format!("{}}}", INDENT.repeat(open.len() + entry_open as usize)));
    }
    if entry_open {
        out.push("}".to_string());
    }

    join_lines(out)
}

struct OpenBlock {
    entry: bool,
    line: usize,
    statements: usize,
}

fn jac_to_python(source: &str) -> Result<String, RuntimeError> {
    let mut out: Vec<String> = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }
        let depth = open.iter().filter(|b| !b.entry).count();

        if text.starts_with('#') {
            out.push(format!("{}{}", INDENT.repeat(depth), text));
            continue;
        }

        if text == "}" {
            let block = open.pop().ok_or_else(|| {
                RuntimeError::Conversion(format!("unexpected '}}' on line {}", index + 1))
            })?;
            if !block.entry && block.statements == 0 {
                out.push(format!("{}pass", INDENT.repeat(depth)));
            }
            continue;
        }

        if let Some(parent) = open.last_mut() {
            parent.statements += 1;
        }

        let block = text
            .split_once('{')
            .map(|(header, rest)| (header.trim_end(), rest))
            .filter(|(header, _)| *header == "with entry" || starts_block(header));
        if let Some((header, rest)) = block {
            let entry = header == "with entry";
            if !entry {
                out.push(format!("{}{}:", INDENT.repeat(depth), header));
            }
            let inner_depth = if entry { depth } else { depth + 1 };

            match rest.trim().strip_suffix('}') {
                Some(body) => {
                    let statements = push_statements(&mut out, body, inner_depth);
                    if !entry && statements == 0 {
                        out.push(format!("{}pass", INDENT.repeat(inner_depth)));
                    }
                }
                None => {
                    let statements = push_statements(&mut out, rest, inner_depth);
                    open.push(OpenBlock {
                        entry,
                        line: index + 1,
                        statements,
                    });
                }
            }
            continue;
        }

        push_statements(&mut out, text, depth);
    }

    if let Some(block) = open.last() {
        return Err(RuntimeError::Conversion(format!(
            "block opened on line {} is never closed",
            block.line
        )));
    }

    Ok(join_lines(out))
}

/// Emit each `;`-separated statement of `text`; returns how many were emitted.
fn push_statements(out: &mut Vec<String>, text: &str, depth: usize) -> usize {
    let mut count = 0;
    for stmt in split_top_level(text, ';') {
        if stmt.is_empty() {
            continue;
        }
        out.push(format!("{}{}", INDENT.repeat(depth), stmt));
        count += 1;
    }
    count
}

fn join_lines(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}
