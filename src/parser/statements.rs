use super::preprocessor::preprocess_lines;
use super::text::{is_comment, is_identifier, normalize_whitespace, parse_string_literal, split_top_level};
use super::types::{Expr, LogicalLine, Stmt, StmtKind, SyntaxError};

/// Parse a whole program into a statement tree. Nothing is executed, so a
/// syntax error anywhere rejects the program before it produces output.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let physical: Vec<&str> = source.lines().collect();
    let pre = preprocess_lines(&physical);
    let lines: Vec<&LogicalLine> = pre.logical.iter().filter(|l| !is_comment(&l.text)).collect();

    let mut parser = BlockParser {
        lines: &lines,
        pos: 0,
        function_depth: 0,
    };
    let body = parser.block(0)?;

    if let Some(line) = lines.get(parser.pos) {
        return Err(SyntaxError::new(line.line_number(), "unindent does not match any outer indentation level"));
    }
    Ok(body)
}

struct BlockParser<'a> {
    lines: &'a [&'a LogicalLine],
    pos: usize,
    function_depth: usize,
}

impl<'a> BlockParser<'a> {
    fn block(&mut self, indent: usize) -> Result<Vec<Stmt>, SyntaxError> {
        let mut out = Vec::new();
        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(SyntaxError::new(line.line_number(), "unexpected indent"));
            }
            self.pos += 1;
            out.push(self.statement(line)?);
        }
        Ok(out)
    }

    fn body_of(&mut self, header: &LogicalLine) -> Result<Vec<Stmt>, SyntaxError> {
        match self.lines.get(self.pos).copied() {
            Some(next) if next.indent > header.indent => self.block(next.indent),
            _ => Err(SyntaxError::new(
                header.line_number(),
                "expected an indented block",
            )),
        }
    }

    fn statement(&mut self, line: &LogicalLine) -> Result<Stmt, SyntaxError> {
        let number = line.line_number();
        let text = normalize_whitespace(&line.text);
        let err = |message: &str| SyntaxError::new(number, message);

        let kind = if text == "pass" {
            StmtKind::Pass
        } else if text == "return" {
            if self.function_depth == 0 {
                return Err(err("'return' outside function"));
            }
            StmtKind::Return
        } else if text == "while True:" {
            StmtKind::While {
                body: self.body_of(line)?,
            }
        } else if let Some(rest) = text.strip_prefix("def ") {
            let name = rest
                .strip_suffix("():")
                .filter(|n| is_identifier(n))
                .ok_or_else(|| err("expected 'def name():'"))?;
            self.function_depth += 1;
            let body = self.body_of(line);
            self.function_depth -= 1;
            StmtKind::Def {
                name: name.to_string(),
                body: body?,
            }
        } else if let Some(rest) = text.strip_prefix("for ") {
            let (var, count) = parse_for_header(rest).ok_or_else(|| err("expected 'for name in range(n):'"))?;
            StmtKind::For {
                var,
                count: parse_expr(&count, number)?,
                body: self.body_of(line)?,
            }
        } else if let Some(rest) = text.strip_prefix("raise ") {
            parse_raise(rest, number)?
        } else if let Some(inner) = text
            .strip_prefix("print(")
            .and_then(|r| r.strip_suffix(')'))
        {
            let args = split_top_level(inner, ',')
                .iter()
                .map(|arg| parse_expr(arg, number))
                .collect::<Result<Vec<_>, _>>()?;
            StmtKind::Print(args)
        } else if let Some(rest) = text.strip_prefix("node ") {
            parse_node(rest, number)?
        } else if let Some(name) = text.strip_suffix("()").filter(|n| is_identifier(n)) {
            StmtKind::Call(name.to_string())
        } else if let Some((name, value)) = split_assignment(&text) {
            if !is_identifier(name) {
                return Err(err("cannot assign to expression"));
            }
            StmtKind::Assign {
                name: name.to_string(),
                value: parse_expr(value, number)?,
            }
        } else if let Some((from, to)) = text.split_once("++>") {
            let (from, to) = (from.trim(), to.trim().trim_end_matches(';').trim());
            if !is_identifier(from) || !is_identifier(to) {
                return Err(err("expected 'node ++> node'"));
            }
            StmtKind::Connect {
                from: from.to_string(),
                to: to.to_string(),
            }
        } else {
            return Err(err("invalid syntax"));
        };

        Ok(Stmt { line: number, kind })
    }
}

fn parse_for_header(rest: &str) -> Option<(String, String)> {
    let (var, iter) = rest.split_once(" in ")?;
    let count = iter
        .trim()
        .strip_prefix("range(")?
        .strip_suffix("):")?;
    is_identifier(var.trim()).then(|| (var.trim().to_string(), count.to_string()))
}

fn parse_raise(rest: &str, line: u32) -> Result<StmtKind, SyntaxError> {
    let rest = rest.trim();
    if is_identifier(rest) {
        return Ok(StmtKind::Raise {
            kind: rest.to_string(),
            message: None,
        });
    }
    let (kind, args) = rest
        .split_once('(')
        .and_then(|(k, a)| Some((k.trim(), a.strip_suffix(')')?)))
        .filter(|(k, _)| is_identifier(k))
        .ok_or_else(|| SyntaxError::new(line, "expected 'raise Kind(\"message\")'"))?;
    let message = if args.trim().is_empty() {
        None
    } else {
        Some(parse_expr(args, line)?)
    };
    Ok(StmtKind::Raise {
        kind: kind.to_string(),
        message,
    })
}

fn parse_node(rest: &str, line: u32) -> Result<StmtKind, SyntaxError> {
    let rest = rest.trim().trim_end_matches(';').trim();
    let (id, label) = match rest.split_once(' ') {
        Some((id, label)) => (id, Some(label.trim())),
        None => (rest, None),
    };
    if !is_identifier(id) {
        return Err(SyntaxError::new(line, "expected 'node name [\"label\"]'"));
    }
    let label = match label {
        Some(text) => Some(
            parse_string_literal(text)
                .ok_or_else(|| SyntaxError::new(line, "node label must be a string literal"))?,
        ),
        None => None,
    };
    Ok(StmtKind::Node {
        id: id.to_string(),
        label,
    })
}

/// `name = value`, ignoring `==` and `=` inside strings or calls.
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    if text.contains("==") {
        return None;
    }
    let parts = split_top_level(text, '=');
    if parts.len() != 2 {
        return None;
    }
    let eq = text.find('=')?;
    Some((text[..eq].trim(), text[eq + 1..].trim()))
}

pub fn parse_expr(text: &str, line: u32) -> Result<Expr, SyntaxError> {
    let terms = split_top_level(text, '+');
    let mut iter = terms.iter();
    let first = iter
        .next()
        .ok_or_else(|| SyntaxError::new(line, "expected an expression"))?;
    let mut expr = parse_term(first, line)?;
    for term in iter {
        expr = Expr::Add(Box::new(expr), Box::new(parse_term(term, line)?));
    }
    Ok(expr)
}

fn parse_term(text: &str, line: u32) -> Result<Expr, SyntaxError> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Expr::Int(value));
    }
    if let Some(value) = parse_string_literal(text) {
        return Ok(Expr::Str(value));
    }
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        return parse_expr(inner, line);
    }
    if is_identifier(text) {
        return Ok(Expr::Name(text.to_string()));
    }
    Err(SyntaxError::new(line, format!("invalid expression '{}'", text)))
}
