//! Guard expression language for conditional observation text.
//!
//! Expressions are parsed once into a small tree and evaluated against a
//! typed context. The grammar is deliberately flat: `" and "` splits before
//! `" or "`, so mixed operators nest as and-of-ors and must be written
//! unambiguously. A malformed or unresolvable expression evaluates to false
//! rather than erroring.
use std::fmt;

/// A dotted lookup path such as `species.10.present`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path(pub Vec<String>);

impl Path {
    fn parse(s: &str) -> Self {
        Self(s.trim().split('.').map(str::to_owned).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A literal or context-resolved value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Literal parse: booleans, then integers, then floats, then a quoted or
    /// bare string.
    fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Str(s.trim_matches(|c| c == '"' || c == '\'').to_owned())
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Le,
    Eq,
    Ne,
    Gt,
    Lt,
}

impl CompareOp {
    /// Probe order matters: two-character operators must match before their
    /// one-character prefixes.
    const PROBES: [(&'static str, CompareOp); 6] = [
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
    ];

    fn apply(self, lhs: &Value, rhs: &Value) -> bool {
        // String pairs compare lexically; anything else compares numerically.
        // Incomparable pairs are simply false.
        if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
            return match self {
                CompareOp::Ge => a >= b,
                CompareOp::Le => a <= b,
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                CompareOp::Gt => a > b,
                CompareOp::Lt => a < b,
            };
        }
        let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
            return matches!(self, CompareOp::Ne);
        };
        match self {
            CompareOp::Ge => a >= b,
            CompareOp::Le => a <= b,
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Gt => a > b,
            CompareOp::Lt => a < b,
        }
    }
}

/// Parsed guard expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    In { path: Path, items: Vec<String> },
    Compare { path: Path, op: CompareOp, value: Value },
    Truthy(Path),
    Never,
}

/// Anything able to resolve dotted paths to values.
pub trait Resolve {
    fn resolve(&self, path: &Path) -> Option<Value>;
}

impl Condition {
    /// Parse a guard string. Parsing never fails; unrecognizable input
    /// becomes a condition that evaluates to false.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Condition::Never;
        }
        if input.contains(" and ") {
            return Condition::And(input.split(" and ").map(Condition::parse).collect());
        }
        if input.contains(" or ") {
            return Condition::Or(input.split(" or ").map(Condition::parse).collect());
        }

        if let Some(cond) = parse_membership(input) {
            return cond;
        }
        for (probe, op) in CompareOp::PROBES {
            if let Some((left, right)) = input.split_once(probe) {
                return Condition::Compare {
                    path: Path::parse(left),
                    op,
                    value: Value::parse(right),
                };
            }
        }
        Condition::Truthy(Path::parse(input))
    }

    /// Evaluate against a resolver. Unresolvable paths are falsy, except as
    /// the left side of a comparison where they count as 0.
    pub fn eval(&self, ctx: &dyn Resolve) -> bool {
        match self {
            Condition::And(parts) => parts.iter().all(|p| p.eval(ctx)),
            Condition::Or(parts) => parts.iter().any(|p| p.eval(ctx)),
            Condition::In { path, items } => match ctx.resolve(path) {
                Some(Value::Str(s)) => items.iter().any(|i| *i == s),
                _ => false,
            },
            Condition::Compare { path, op, value } => {
                let lhs = ctx.resolve(path).unwrap_or(Value::Int(0));
                op.apply(&lhs, value)
            }
            Condition::Truthy(path) => ctx.resolve(path).is_some_and(|v| v.truthy()),
            Condition::Never => false,
        }
    }
}

/// `path in [a, b, c]`; items are stripped of surrounding quotes.
fn parse_membership(input: &str) -> Option<Condition> {
    let (left, rest) = input.split_once(" in ")?;
    let rest = rest.trim();
    let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
    let items = inner
        .split(',')
        .map(|i| i.trim().trim_matches(|c| c == '"' || c == '\'').to_owned())
        .collect();
    Some(Condition::In {
        path: Path::parse(left),
        items,
    })
}
