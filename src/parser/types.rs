use std::fmt;

/// One physical->logical joined line (before indentation is measured).
#[derive(Debug, Clone)]
pub struct JoinedLine {
    pub text: String,
    pub phys_start: usize,
    pub phys_end: usize,
}

/// Final normalized line with block metadata for the parser.
#[derive(Debug, Clone)]
pub struct LogicalLine {
    pub text: String,
    pub phys_start: usize,
    pub phys_end: usize,
    /// Leading whitespace width of the first physical line (tab = 4).
    pub indent: usize,
}

impl LogicalLine {
    /// 1-based line number as shown in the editor gutter.
    pub fn line_number(&self) -> u32 {
        u32::try_from(self.phys_start + 1).unwrap_or(u32::MAX)
    }
}

/// Output of preprocessing; each logical line keeps its physical span.
#[derive(Debug)]
pub struct PreprocessResult {
    pub logical: Vec<LogicalLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Name(String),
    Add(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    /// 1-based source line of the statement's first physical line.
    pub line: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Pass,
    Print(Vec<Expr>),
    Assign { name: String, value: Expr },
    Def { name: String, body: Vec<Stmt> },
    Call(String),
    Return,
    For { var: String, count: Expr, body: Vec<Stmt> },
    While { body: Vec<Stmt> },
    Raise { kind: String, message: Option<Expr> },
    Node { id: String, label: Option<String> },
    Connect { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SyntaxError {}
