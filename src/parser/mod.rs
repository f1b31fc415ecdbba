mod preprocessor;
mod statements;
mod text;
mod types;

pub use preprocessor::{indent_width, preprocess_lines};
pub use statements::{parse_expr, parse_program};
pub use text::{is_comment, is_identifier, normalize_whitespace, parse_string_literal, split_top_level};
pub use types::{Expr, LogicalLine, PreprocessResult, Stmt, StmtKind, SyntaxError};
