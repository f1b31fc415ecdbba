//! A small line-oriented reference runtime.
//!
//! It understands a Python-flavoured statement subset (see
//! [`crate::parser::StmtKind`]) and exists so the worker protocol can run
//! end to end without an embedded Python.

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::{ExecutionHooks, LineAction, Runtime, RuntimeError, ScriptError, StepFrame};
use crate::graph::GraphSnapshot;
use crate::parser::{parse_program, Expr, Stmt, StmtKind};
use crate::protocol::ConversionDirection;

const MAX_CALL_DEPTH: usize = 200;
const ROOT_NODE: &str = "root";

pub struct ScriptRuntime {
    source_path: String,
}

impl ScriptRuntime {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new("/tmp/main.jac")
    }
}

impl Runtime for ScriptRuntime {
    fn load(&mut self) -> Result<(), RuntimeError> {
        debug!(path = %self.source_path, "reference runtime ready");
        Ok(())
    }

    fn execute(&mut self, source: &str, hooks: &mut dyn ExecutionHooks) -> Result<(), ScriptError> {
        let program = parse_program(source).map_err(|e| ScriptError::Syntax {
            path: self.source_path.clone(),
            line: e.line,
            message: e.message,
        })?;
        debug!(statements = program.len(), "program parsed");

        let mut interp = Interpreter::new(hooks);
        match interp.exec_block(&program) {
            Ok(_) => Ok(()),
            Err(Unwind::Terminated) => Err(ScriptError::Terminated),
            Err(Unwind::Raised(exception)) => Err(ScriptError::Raised {
                traceback: exception.traceback(&self.source_path),
            }),
        }
    }

    fn convert(&mut self, direction: ConversionDirection, source: &str) -> Result<String, RuntimeError> {
        super::translate(direction, source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "str",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

enum Flow {
    Normal,
    Return,
}

enum Unwind {
    Raised(Exception),
    Terminated,
}

struct Exception {
    kind: String,
    message: String,
    /// (function name, line) from outermost to innermost.
    frames: Vec<(String, u32)>,
}

impl Exception {
    fn traceback(&self, path: &str) -> String {
        let mut out = String::from("Traceback (most recent call last):\n");
        for (name, line) in &self.frames {
            out.push_str(&format!("  File \"{}\", line {}, in {}\n", path, line, name));
        }
        if self.message.is_empty() {
            out.push_str(&format!("{}\n", self.kind));
        } else {
            out.push_str(&format!("{}: {}\n", self.kind, self.message));
        }
        out
    }
}

struct Frame {
    name: String,
    line: u32,
    locals: HashMap<String, Value>,
}

struct Interpreter<'p, 'h> {
    hooks: &'h mut dyn ExecutionHooks,
    frames: Vec<Frame>,
    functions: HashMap<String, &'p [Stmt]>,
    graph: GraphSnapshot,
}

impl<'p, 'h> Interpreter<'p, 'h> {
    fn new(hooks: &'h mut dyn ExecutionHooks) -> Self {
        Self {
            hooks,
            frames: vec![Frame {
                name: "<module>".to_string(),
                line: 0,
                locals: HashMap::new(),
            }],
            functions: HashMap::new(),
            graph: GraphSnapshot::new(),
        }
    }

    fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn exec_block(&mut self, body: &'p [Stmt]) -> Result<Flow, Unwind> {
        for stmt in body {
            if let Some(frame) = self.frames.last_mut() {
                frame.line = stmt.line;
            }
            let step = StepFrame {
                line: stmt.line,
                depth: self.depth(),
            };
            if self.hooks.on_line(step) == LineAction::Abort {
                return Err(Unwind::Terminated);
            }

            if let Flow::Return = self.exec(stmt)? {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &'p Stmt) -> Result<Flow, Unwind> {
        match &stmt.kind {
            StmtKind::Pass => {}
            StmtKind::Return => return Ok(Flow::Return),
            StmtKind::Print(args) => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg).map(|v| v.to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut text = values.join(" ");
                text.push('\n');
                self.hooks.stdout(&text);
            }
            StmtKind::Assign { name, value } => {
                let value = self.eval(value)?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.locals.insert(name.clone(), value);
                }
            }
            StmtKind::Def { name, body } => {
                self.functions.insert(name.clone(), body.as_slice());
            }
            StmtKind::Call(name) => {
                let body = match self.functions.get(name) {
                    Some(body) => *body,
                    None => return Err(self.name_error(name)),
                };
                if self.frames.len() >= MAX_CALL_DEPTH {
                    return Err(self.raise("RecursionError", "maximum recursion depth exceeded"));
                }
                self.frames.push(Frame {
                    name: name.clone(),
                    line: stmt.line,
                    locals: HashMap::new(),
                });
                let result = self.exec_block(body);
                self.frames.pop();
                result?;
            }
            StmtKind::For { var, count, body } => {
                let count = match self.eval(count)? {
                    Value::Int(n) => n,
                    other => {
                        let message = format!("'{}' object cannot be interpreted as an integer", other.type_name());
                        return Err(self.raise("TypeError", &message));
                    }
                };
                for i in 0..count.max(0) {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.locals.insert(var.clone(), Value::Int(i));
                    }
                    if let Flow::Return = self.exec_block(body)? {
                        return Ok(Flow::Return);
                    }
                }
            }
            StmtKind::While { body } => loop {
                if let Flow::Return = self.exec_block(body)? {
                    return Ok(Flow::Return);
                }
            },
            StmtKind::Raise { kind, message } => {
                let message = match message {
                    Some(expr) => self.eval(expr)?.to_string(),
                    None => String::new(),
                };
                return Err(self.raise(kind, &message));
            }
            StmtKind::Node { id, label } => {
                let label = label.clone().unwrap_or_else(|| id.clone());
                if self.graph.add_node(id.clone(), label) {
                    self.hooks.graph(&self.graph);
                }
            }
            StmtKind::Connect { from, to } => {
                for endpoint in [from, to] {
                    if endpoint == ROOT_NODE {
                        self.graph.add_node(ROOT_NODE, ROOT_NODE);
                    } else if !self.graph.nodes.iter().any(|n| &n.id == endpoint) {
                        return Err(self.name_error(endpoint));
                    }
                }
                self.graph.add_edge(from.clone(), to.clone());
                self.hooks.graph(&self.graph);
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Name(name) => self.lookup(name).cloned().ok_or_else(|| self.name_error(name)),
            Expr::Add(lhs, rhs) => match (self.eval(lhs)?, self.eval(rhs)?) {
                (Value::Int(a), Value::Int(b)) => a
                    .checked_add(b)
                    .map(Value::Int)
                    .ok_or_else(|| self.raise("OverflowError", "integer addition overflowed")),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                (a, b) => {
                    let message = format!(
                        "unsupported operand type(s) for +: '{}' and '{}'",
                        a.type_name(),
                        b.type_name()
                    );
                    Err(self.raise("TypeError", &message))
                }
            },
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        let local = self.frames.last().and_then(|f| f.locals.get(name));
        local.or_else(|| self.frames.first().and_then(|f| f.locals.get(name)))
    }

    fn name_error(&self, name: &str) -> Unwind {
        self.raise("NameError", &format!("name '{}' is not defined", name))
    }

    fn raise(&self, kind: &str, message: &str) -> Unwind {
        Unwind::Raised(Exception {
            kind: kind.to_string(),
            message: message.to_string(),
            frames: self.frames.iter().map(|f| (f.name.clone(), f.line)).collect(),
        })
    }
}
