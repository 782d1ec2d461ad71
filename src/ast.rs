/*!
The abstract syntax of a parsed pattern.

Expressions live in an arena owned by the [`Ast`] and refer to each other
with [`ExprId`] indices rather than heap pointers. The arena is built by
the parser, handed to the compiler whole, and dropped as one allocation
when compilation finishes.
*/

use core::fmt;

use crate::input::Look;
use crate::interval::ByteClass;

/// An index into an [`Ast`] arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ExprId(u32);

impl ExprId {
    pub(crate) fn new(index: usize) -> ExprId {
        assert!(index <= u32::MAX as usize, "too many expressions");
        ExprId(index as u32)
    }

    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A single node of the expression tree.
#[derive(Clone, Debug)]
pub(crate) enum Expr {
    /// Matches the empty string unconditionally. Produced only for an
    /// empty pattern or an empty repetition bound.
    Empty,
    /// Matches one specific byte.
    Literal(u8),
    /// `.`: matches any byte except `\n`.
    Dot,
    /// A byte class in canonical range-set form.
    Class(ByteClass),
    /// A zero-width assertion.
    Assert(Look),
    /// A group. Capturing groups are assigned slot pairs by the compiler;
    /// `(?:…)` groups only affect precedence.
    Group { expr: ExprId, capturing: bool },
    /// A bounded or unbounded repetition of a single operand.
    Repeat { expr: ExprId, min: usize, max: Option<usize>, greedy: bool },
    /// An ordered sequence with at least two children.
    Concat(Vec<ExprId>),
    /// Ordered alternatives with at least two children.
    Alternate(Vec<ExprId>),
    /// A parser-internal marker for an unclosed `(`. Never present in a
    /// finished tree.
    OpenGroup { capturing: bool },
}

/// A parsed pattern: the expression arena plus its root.
#[derive(Clone, Debug)]
pub(crate) struct Ast {
    nodes: Vec<Expr>,
    root: ExprId,
}

impl Ast {
    pub(crate) fn new(nodes: Vec<Expr>, root: ExprId) -> Ast {
        Ast { nodes, root }
    }

    pub(crate) fn root(&self) -> ExprId {
        self.root
    }

    pub(crate) fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.as_usize()]
    }
}

/// Canonical pattern syntax for a tree. Parsing the rendered pattern
/// produces the same tree again, which the parser tests rely on.
impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_expr(f, self, self.root)
    }
}

fn write_expr(f: &mut fmt::Formatter, ast: &Ast, id: ExprId) -> fmt::Result {
    match *ast.get(id) {
        Expr::Empty => Ok(()),
        Expr::Literal(byte) => write_literal(f, byte),
        Expr::Dot => write!(f, "."),
        Expr::Class(ref set) => {
            write!(f, "[")?;
            for range in set.ranges() {
                write_class_byte(f, range.min)?;
                if range.min != range.max {
                    write!(f, "-")?;
                    write_class_byte(f, range.max)?;
                }
            }
            write!(f, "]")
        }
        Expr::Assert(look) => match look {
            Look::StartLine | Look::StartText => write!(f, "^"),
            Look::EndLine | Look::EndText => write!(f, "$"),
            Look::WordAscii => write!(f, r"\b"),
            Look::WordAsciiNegate => write!(f, r"\B"),
        },
        Expr::Group { expr, capturing } => {
            write!(f, "{}", if capturing { "(" } else { "(?:" })?;
            write_expr(f, ast, expr)?;
            write!(f, ")")
        }
        Expr::Repeat { expr, min, max, greedy } => {
            write_expr(f, ast, expr)?;
            match (min, max) {
                (0, None) => write!(f, "*")?,
                (1, None) => write!(f, "+")?,
                (0, Some(1)) => write!(f, "?")?,
                (m, None) => write!(f, "{{{},}}", m)?,
                (m, Some(n)) if m == n => write!(f, "{{{}}}", m)?,
                (m, Some(n)) => write!(f, "{{{},{}}}", m, n)?,
            }
            if !greedy {
                write!(f, "?")?;
            }
            Ok(())
        }
        Expr::Concat(ref children) => {
            for &child in children {
                write_expr(f, ast, child)?;
            }
            Ok(())
        }
        Expr::Alternate(ref children) => {
            for (i, &child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, "|")?;
                }
                write_expr(f, ast, child)?;
            }
            Ok(())
        }
        Expr::OpenGroup { .. } => {
            unreachable!("open-group marker in finished tree")
        }
    }
}

fn write_literal(f: &mut fmt::Formatter, byte: u8) -> fmt::Result {
    if crate::parse::is_punctuation(byte) {
        write!(f, "\\{}", byte as char)
    } else if byte.is_ascii_graphic() || byte == b' ' {
        write!(f, "{}", byte as char)
    } else {
        write!(f, "\\x{:02x}", byte)
    }
}

fn write_class_byte(f: &mut fmt::Formatter, byte: u8) -> fmt::Result {
    match byte {
        b']' | b'^' | b'-' | b'\\' => write!(f, "\\{}", byte as char),
        b if b.is_ascii_graphic() || b == b' ' => write!(f, "{}", b as char),
        b => write!(f, "\\x{:02x}", b),
    }
}
