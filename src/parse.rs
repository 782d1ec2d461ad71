/*!
A parser for the pattern surface syntax.

The parser is iterative: instead of recursing into groups and alternations
it keeps an explicit stack of in-progress expressions, with marker nodes for
open groups. Deeply nested patterns therefore cannot overflow the call
stack. The grammar it accepts:

- literals, `.`, `^`, `$`
- escapes: punctuation, `\a \f \n \r \t \v`, classes `\d \D \s \S \w \W`,
  word boundaries `\b \B`, octal (`\123`) and hex (`\x7f`, `\x{7f}`)
- classes `[...]` / `[^...]` with ranges, a literal leading `]` and the
  usual `-` corner cases
- groups `(...)` and `(?:...)`
- repetition `* + ?` and counted forms `{m}`, `{m,}`, `{m,n}`, all with a
  `?` suffix for non-greedy matching
- alternation `|`
*/

use core::fmt;

use crate::ast::{Ast, Expr, ExprId};
use crate::input::Look;
use crate::interval::{ByteClass, Interval};

/// The default bound on repetition counts, shared by `min` and `max` of any
/// counted repetition. Large counts are rejected at parse time since every
/// repetition is unrolled into the compiled program.
pub const DEFAULT_MAX_REPEAT: usize = 1000;

/// The kind of an error that can occur while parsing a pattern.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// A repetition operator with nothing repeatable before it, e.g. `*a`.
    MissingRepeatOperand,
    /// A counted repetition without a count, e.g. `a{}`.
    MissingRepeatArgument,
    /// A counted repetition with a malformed count, e.g. `a{1x}`.
    InvalidRepeatArgument,
    /// An alternation branch with no expression, e.g. `a||b`.
    EmptyAlternate,
    /// A `)` that closes an alternation with no matching `(`.
    UnbalancedParentheses,
    /// A `)` with no matching `(`.
    UnopenedParentheses,
    /// A `(` that is never closed.
    UnclosedParentheses,
    /// A group with no body, `()`.
    EmptyCaptureGroup,
    /// A stray `]`, or a class range with inverted bounds.
    UnmatchedByteClass,
    /// A counted repetition with `max < min`, e.g. `a{5,2}`.
    InvalidRepeatRange,
    /// A counted repetition that is never closed, e.g. `a{5`.
    UnclosedRepeat,
    /// A class that is never closed, e.g. `[a-z`.
    UnclosedBrackets,
    /// A repetition count beyond the configured bound.
    ExcessiveRepeatCount,
    /// A `\` at the end of the pattern.
    OpenEscapeCode,
    /// A `\x{...}` escape that is never closed.
    UnclosedHexCharacterCode,
    /// A non-hex digit in a hex escape, or a hex value beyond one byte.
    InvalidHexDigit,
    /// A non-octal digit starting an octal escape, or an octal value
    /// beyond one byte.
    InvalidOctalDigit,
    /// An escape code this engine does not recognise.
    UnrecognizedEscapeCode,
    /// A `(?...)` modifier this engine does not implement.
    UnimplementedModifier,
    /// The parser stack was empty where an expression was required. This
    /// indicates a bug in the parser itself.
    StackUnderflow,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ParseErrorKind::*;
        let msg = match *self {
            MissingRepeatOperand => "repetition operator missing an operand",
            MissingRepeatArgument => "counted repetition missing its count",
            InvalidRepeatArgument => "malformed counted repetition",
            EmptyAlternate => "empty alternation branch",
            UnbalancedParentheses => "unbalanced parenthesis",
            UnopenedParentheses => "unopened parenthesis",
            UnclosedParentheses => "unclosed parenthesis",
            EmptyCaptureGroup => "empty group",
            UnmatchedByteClass => "unmatched or invalid byte class",
            InvalidRepeatRange => "repetition upper bound below lower bound",
            UnclosedRepeat => "unclosed counted repetition",
            UnclosedBrackets => "unclosed byte class",
            ExcessiveRepeatCount => "repetition count too large",
            OpenEscapeCode => "incomplete escape sequence",
            UnclosedHexCharacterCode => "unclosed hex escape",
            InvalidHexDigit => "invalid hex escape",
            InvalidOctalDigit => "invalid octal escape",
            UnrecognizedEscapeCode => "unrecognized escape code",
            UnimplementedModifier => "unsupported group modifier",
            StackUnderflow => "internal parser stack underflow",
        };
        f.write_str(msg)
    }
}

/// An error returned when a pattern fails to parse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    kind: ParseErrorKind,
    offset: usize,
}

impl ParseError {
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// The byte offset in the pattern at which parsing stopped.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "error at byte offset {}: {}", self.offset, self.kind)
    }
}

impl std::error::Error for ParseError {}

/// A parser for converting a pattern into an [`Ast`].
///
/// The parser itself only holds configuration. Each call to
/// [`Parser::parse`] runs on fresh state, so one parser may be reused for
/// any number of patterns.
#[derive(Clone, Debug)]
pub(crate) struct Parser {
    max_repeat: usize,
}

impl Parser {
    pub(crate) fn new() -> Parser {
        Parser { max_repeat: DEFAULT_MAX_REPEAT }
    }

    /// Set the maximum permitted repetition count.
    pub(crate) fn max_repeat(mut self, max_repeat: usize) -> Parser {
        self.max_repeat = max_repeat;
        self
    }

    pub(crate) fn parse(&self, pattern: &[u8]) -> Result<Ast, ParseError> {
        ParserI::new(self, pattern).parse()
    }
}

/// Returns true for bytes with syntactic meaning, all of which may be
/// escaped to produce their literal selves.
pub(crate) fn is_punctuation(byte: u8) -> bool {
    matches!(
        byte,
        b'\\' | b'.' | b'+' | b'*' | b'?' | b'(' | b')' | b'|' | b'[' | b']'
            | b'{' | b'}' | b'^' | b'$' | b'-'
    )
}

/// The value of one escape sequence.
enum Escape {
    Byte(u8),
    Class(ByteClass),
    Look(Look),
}

/// One item inside a byte class.
enum ClassItem {
    Byte(u8),
    Set(ByteClass),
}

/// A classification of a stack entry, used while folding groups and
/// alternations.
enum StackEntry {
    Marker { capturing: bool },
    Alternation,
    Expression,
}

/// The stateful part of the parser, tied to a single pattern.
struct ParserI<'p> {
    parser: &'p Parser,
    pattern: &'p [u8],
    pos: usize,
    nodes: Vec<Expr>,
    stack: Vec<ExprId>,
}

impl<'p> ParserI<'p> {
    fn new(parser: &'p Parser, pattern: &'p [u8]) -> ParserI<'p> {
        ParserI { parser, pattern, pos: 0, nodes: vec![], stack: vec![] }
    }

    fn parse(mut self) -> Result<Ast, ParseError> {
        while let Some(byte) = self.bump() {
            match byte {
                b'*' => self.repeat_operator(0, None)?,
                b'+' => self.repeat_operator(1, None)?,
                b'?' => self.repeat_operator(0, Some(1))?,
                b'{' => self.counted_repeat()?,
                b'(' => self.open_group()?,
                b')' => self.close_group()?,
                b'|' => self.alternate()?,
                b'[' => self.class()?,
                b']' => {
                    return Err(self.error(ParseErrorKind::UnmatchedByteClass))
                }
                b'^' => self.push_expr(Expr::Assert(Look::StartLine)),
                b'$' => self.push_expr(Expr::Assert(Look::EndLine)),
                b'.' => self.push_expr(Expr::Dot),
                b'\\' => match self.escape()? {
                    Escape::Byte(b) => self.push_expr(Expr::Literal(b)),
                    Escape::Class(set) => self.push_expr(Expr::Class(set)),
                    Escape::Look(look) => self.push_expr(Expr::Assert(look)),
                },
                b => self.push_expr(Expr::Literal(b)),
            }
        }
        self.finish()
    }

    /// Fold whatever remains on the stack into the final tree.
    fn finish(mut self) -> Result<Ast, ParseError> {
        let mut concat = vec![];
        loop {
            let Some(id) = self.stack.pop() else {
                let root = if concat.is_empty() {
                    self.push_node(Expr::Empty)
                } else {
                    self.concat_expr(concat)
                };
                return Ok(Ast::new(self.nodes, root));
            };
            match self.classify(id) {
                StackEntry::Marker { .. } => {
                    return Err(
                        self.error(ParseErrorKind::UnclosedParentheses)
                    );
                }
                StackEntry::Alternation => {
                    let branch = self.branch_expr(concat)?;
                    self.push_branch(id, branch);
                    return match self.stack.pop() {
                        None => Ok(Ast::new(self.nodes, id)),
                        Some(below) => match self.classify(below) {
                            StackEntry::Marker { .. } => Err(self.error(
                                ParseErrorKind::UnclosedParentheses,
                            )),
                            _ => Err(
                                self.error(ParseErrorKind::StackUnderflow)
                            ),
                        },
                    };
                }
                StackEntry::Expression => concat.push(id),
            }
        }
    }

    /// Handle `*`, `+` and `?`, including a trailing `?` for laziness.
    fn repeat_operator(
        &mut self,
        min: usize,
        max: Option<usize>,
    ) -> Result<(), ParseError> {
        let greedy = !self.bump_if(b'?');
        self.push_repeat(min, max, greedy)
    }

    /// Handle `{m}`, `{m,}` and `{m,n}` after the `{` has been consumed.
    /// Spaces around the counts are permitted.
    fn counted_repeat(&mut self) -> Result<(), ParseError> {
        self.skip_spaces();
        let min = self.repeat_count()?;
        self.skip_spaces();
        let max = match self.peek() {
            Some(b'}') => {
                self.bump();
                Some(min)
            }
            Some(b',') => {
                self.bump();
                self.skip_spaces();
                match self.peek() {
                    Some(b'}') => {
                        self.bump();
                        None
                    }
                    Some(b'0'..=b'9') => {
                        let max = self.repeat_count()?;
                        self.skip_spaces();
                        match self.peek() {
                            Some(b'}') => {
                                self.bump();
                                Some(max)
                            }
                            Some(_) => {
                                return Err(self.error(
                                    ParseErrorKind::InvalidRepeatArgument,
                                ))
                            }
                            None => {
                                return Err(self
                                    .error(ParseErrorKind::UnclosedRepeat))
                            }
                        }
                    }
                    Some(_) => {
                        return Err(
                            self.error(ParseErrorKind::InvalidRepeatArgument)
                        )
                    }
                    None => {
                        return Err(self.error(ParseErrorKind::UnclosedRepeat))
                    }
                }
            }
            Some(_) => {
                return Err(self.error(ParseErrorKind::InvalidRepeatArgument))
            }
            None => return Err(self.error(ParseErrorKind::UnclosedRepeat)),
        };
        let greedy = !self.bump_if(b'?');
        self.push_repeat(min, max, greedy)
    }

    /// Parse a decimal repetition count, rejecting values beyond the
    /// configured bound before they can overflow.
    fn repeat_count(&mut self) -> Result<usize, ParseError> {
        let mut value: usize = 0;
        let mut digits = 0;
        while let Some(d @ b'0'..=b'9') = self.peek() {
            self.bump();
            digits += 1;
            value = value * 10 + usize::from(d - b'0');
            if value > self.parser.max_repeat {
                return Err(self.error(ParseErrorKind::ExcessiveRepeatCount));
            }
        }
        if digits == 0 {
            return Err(self.error(ParseErrorKind::MissingRepeatArgument));
        }
        Ok(value)
    }

    fn push_repeat(
        &mut self,
        min: usize,
        max: Option<usize>,
        greedy: bool,
    ) -> Result<(), ParseError> {
        if min > self.parser.max_repeat
            || max.map_or(false, |m| m > self.parser.max_repeat)
        {
            return Err(self.error(ParseErrorKind::ExcessiveRepeatCount));
        }
        if max.map_or(false, |m| m < min) {
            return Err(self.error(ParseErrorKind::InvalidRepeatRange));
        }
        let operand = match self.stack.last() {
            Some(&id) if self.is_repeatable(id) => self.stack.pop().unwrap(),
            _ => {
                return Err(self.error(ParseErrorKind::MissingRepeatOperand))
            }
        };
        let id =
            self.push_node(Expr::Repeat { expr: operand, min, max, greedy });
        self.stack.push(id);
        Ok(())
    }

    /// Only single-unit expressions may be repeated directly. Anything
    /// larger must be wrapped in a group first.
    fn is_repeatable(&self, id: ExprId) -> bool {
        matches!(
            self.nodes[id.as_usize()],
            Expr::Literal(_) | Expr::Class(_) | Expr::Dot | Expr::Group { .. }
        )
    }

    fn open_group(&mut self) -> Result<(), ParseError> {
        let capturing = if self.peek() == Some(b'?') {
            if self.peek_at(1) == Some(b':') {
                self.bump();
                self.bump();
                false
            } else {
                return Err(
                    self.error(ParseErrorKind::UnimplementedModifier)
                );
            }
        } else {
            true
        };
        let id = self.push_node(Expr::OpenGroup { capturing });
        self.stack.push(id);
        Ok(())
    }

    /// Pop the current concatenation, fold it into an open alternation if
    /// one exists at this level, wrap the result in a group node and push
    /// that back.
    fn close_group(&mut self) -> Result<(), ParseError> {
        let mut concat = vec![];
        loop {
            let Some(id) = self.stack.pop() else {
                return Err(self.error(ParseErrorKind::UnopenedParentheses));
            };
            match self.classify(id) {
                StackEntry::Marker { capturing } => {
                    if concat.is_empty() {
                        return Err(
                            self.error(ParseErrorKind::EmptyCaptureGroup)
                        );
                    }
                    let body = self.concat_expr(concat);
                    let group =
                        self.push_node(Expr::Group { expr: body, capturing });
                    self.stack.push(group);
                    return Ok(());
                }
                StackEntry::Alternation => {
                    let branch = self.branch_expr(concat)?;
                    self.push_branch(id, branch);
                    let Some(marker) = self.stack.pop() else {
                        return Err(
                            self.error(ParseErrorKind::UnbalancedParentheses)
                        );
                    };
                    let StackEntry::Marker { capturing } =
                        self.classify(marker)
                    else {
                        return Err(
                            self.error(ParseErrorKind::UnbalancedParentheses)
                        );
                    };
                    let group =
                        self.push_node(Expr::Group { expr: id, capturing });
                    self.stack.push(group);
                    return Ok(());
                }
                StackEntry::Expression => concat.push(id),
            }
        }
    }

    /// Fold the current concatenation into the alternation at this nesting
    /// level, creating the alternation if this is the first `|` seen here.
    /// There is never more than one alternation per open group level.
    fn alternate(&mut self) -> Result<(), ParseError> {
        let mut concat = vec![];
        loop {
            match self.stack.last().copied() {
                None => {
                    let branch = self.branch_expr(concat)?;
                    let alt = self.push_node(Expr::Alternate(vec![branch]));
                    self.stack.push(alt);
                    return Ok(());
                }
                Some(id) => match self.classify(id) {
                    StackEntry::Marker { .. } => {
                        let branch = self.branch_expr(concat)?;
                        let alt =
                            self.push_node(Expr::Alternate(vec![branch]));
                        self.stack.push(alt);
                        return Ok(());
                    }
                    StackEntry::Alternation => {
                        let branch = self.branch_expr(concat)?;
                        self.push_branch(id, branch);
                        return Ok(());
                    }
                    StackEntry::Expression => {
                        concat.push(self.stack.pop().unwrap());
                    }
                },
            }
        }
    }

    /// Parse a byte class after the `[` has been consumed.
    fn class(&mut self) -> Result<(), ParseError> {
        let negated = self.bump_if(b'^');
        let mut set = ByteClass::new();
        // A `]` immediately after the opening bracket is a literal.
        if self.bump_if(b']') {
            set.add_range(Interval::point(b']'));
        }
        loop {
            if self.is_eof() {
                return Err(self.error(ParseErrorKind::UnclosedBrackets));
            }
            if self.bump_if(b']') {
                break;
            }
            let lo = match self.class_item()? {
                ClassItem::Set(template) => {
                    set.merge(&template);
                    // A `-` directly after a class template is a literal,
                    // never a range operator.
                    if self.bump_if(b'-') {
                        set.add_range(Interval::point(b'-'));
                    }
                    continue;
                }
                ClassItem::Byte(b) => b,
            };
            let is_range = self.peek() == Some(b'-')
                && self.peek_at(1).map_or(false, |b| b != b']');
            if is_range {
                self.bump();
                let hi = match self.class_item()? {
                    ClassItem::Byte(b) => b,
                    ClassItem::Set(_) => {
                        return Err(self
                            .error(ParseErrorKind::UnrecognizedEscapeCode))
                    }
                };
                if lo > hi {
                    return Err(
                        self.error(ParseErrorKind::UnmatchedByteClass)
                    );
                }
                set.add_range(Interval::new(lo, hi));
            } else {
                set.add_range(Interval::point(lo));
            }
        }
        if negated {
            set.negate();
        }
        self.push_expr(Expr::Class(set));
        Ok(())
    }

    fn class_item(&mut self) -> Result<ClassItem, ParseError> {
        match self.bump() {
            None => Err(self.error(ParseErrorKind::UnclosedBrackets)),
            Some(b'\\') => match self.escape()? {
                Escape::Byte(b) => Ok(ClassItem::Byte(b)),
                Escape::Class(set) => Ok(ClassItem::Set(set)),
                Escape::Look(_) => {
                    Err(self.error(ParseErrorKind::UnrecognizedEscapeCode))
                }
            },
            Some(b) => Ok(ClassItem::Byte(b)),
        }
    }

    /// Parse one escape sequence after the `\` has been consumed.
    fn escape(&mut self) -> Result<Escape, ParseError> {
        let Some(byte) = self.bump() else {
            return Err(self.error(ParseErrorKind::OpenEscapeCode));
        };
        match byte {
            b if is_punctuation(b) => Ok(Escape::Byte(b)),
            b'a' => Ok(Escape::Byte(0x07)),
            b'f' => Ok(Escape::Byte(0x0C)),
            b'n' => Ok(Escape::Byte(b'\n')),
            b'r' => Ok(Escape::Byte(b'\r')),
            b't' => Ok(Escape::Byte(b'\t')),
            b'v' => Ok(Escape::Byte(0x0B)),
            b'd' => Ok(Escape::Class(ByteClass::digits())),
            b'D' => Ok(Escape::Class(negated(ByteClass::digits()))),
            b's' => Ok(Escape::Class(ByteClass::whitespace())),
            b'S' => Ok(Escape::Class(negated(ByteClass::whitespace()))),
            b'w' => Ok(Escape::Class(ByteClass::word_bytes())),
            b'W' => Ok(Escape::Class(negated(ByteClass::word_bytes()))),
            b'b' => Ok(Escape::Look(Look::WordAscii)),
            b'B' => Ok(Escape::Look(Look::WordAsciiNegate)),
            b'0'..=b'9' => self.octal_escape(byte),
            b'x' => self.hex_escape(),
            _ => Err(self.error(ParseErrorKind::UnrecognizedEscapeCode)),
        }
    }

    /// An octal escape of up to three digits, leading digit included.
    fn octal_escape(&mut self, first: u8) -> Result<Escape, ParseError> {
        if first > b'7' {
            return Err(self.error(ParseErrorKind::InvalidOctalDigit));
        }
        let mut value = u32::from(first - b'0');
        let mut digits = 1;
        while digits < 3 {
            match self.peek() {
                Some(d @ b'0'..=b'7') => {
                    self.bump();
                    value = value * 8 + u32::from(d - b'0');
                    digits += 1;
                }
                _ => break,
            }
        }
        if value > 0xFF {
            return Err(self.error(ParseErrorKind::InvalidOctalDigit));
        }
        Ok(Escape::Byte(value as u8))
    }

    /// `\xHH` with up to two digits, or `\x{H...}` with digits up to the
    /// closing brace.
    fn hex_escape(&mut self) -> Result<Escape, ParseError> {
        if self.bump_if(b'{') {
            let mut value: u32 = 0;
            let mut digits = 0;
            loop {
                match self.bump() {
                    None => {
                        return Err(self
                            .error(ParseErrorKind::UnclosedHexCharacterCode))
                    }
                    Some(b'}') => break,
                    Some(d) => {
                        let Some(d) = hex_digit(d) else {
                            return Err(
                                self.error(ParseErrorKind::InvalidHexDigit)
                            );
                        };
                        digits += 1;
                        value = value * 16 + u32::from(d);
                        // Reject early so long escapes cannot overflow.
                        if value > 0xFF {
                            return Err(
                                self.error(ParseErrorKind::InvalidHexDigit)
                            );
                        }
                    }
                }
            }
            if digits == 0 {
                return Err(self.error(ParseErrorKind::InvalidHexDigit));
            }
            Ok(Escape::Byte(value as u8))
        } else {
            let Some(first) = self.peek().and_then(hex_digit) else {
                return Err(self.error(ParseErrorKind::InvalidHexDigit));
            };
            self.bump();
            let mut value = u32::from(first);
            if let Some(second) = self.peek().and_then(hex_digit) {
                self.bump();
                value = value * 16 + u32::from(second);
            }
            Ok(Escape::Byte(value as u8))
        }
    }

    /// Build a concatenation from entries popped off the stack. The stack
    /// is LIFO, so the collected children are in reverse order.
    fn concat_expr(&mut self, mut concat: Vec<ExprId>) -> ExprId {
        debug_assert!(!concat.is_empty());
        concat.reverse();
        if concat.len() == 1 {
            concat[0]
        } else {
            self.push_node(Expr::Concat(concat))
        }
    }

    /// Like `concat_expr`, but an empty branch is a syntax error.
    fn branch_expr(
        &mut self,
        concat: Vec<ExprId>,
    ) -> Result<ExprId, ParseError> {
        if concat.is_empty() {
            return Err(self.error(ParseErrorKind::EmptyAlternate));
        }
        Ok(self.concat_expr(concat))
    }

    fn push_branch(&mut self, alternation: ExprId, branch: ExprId) {
        match self.nodes[alternation.as_usize()] {
            Expr::Alternate(ref mut branches) => branches.push(branch),
            ref other => unreachable!("expected alternation, got {:?}", other),
        }
    }

    fn classify(&self, id: ExprId) -> StackEntry {
        match self.nodes[id.as_usize()] {
            Expr::OpenGroup { capturing } => StackEntry::Marker { capturing },
            Expr::Alternate(_) => StackEntry::Alternation,
            _ => StackEntry::Expression,
        }
    }

    fn push_node(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(self.nodes.len());
        self.nodes.push(expr);
        id
    }

    fn push_expr(&mut self, expr: Expr) {
        let id = self.push_node(expr);
        self.stack.push(id);
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError { kind, offset: self.pos }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.pattern.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn bump_if(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_spaces(&mut self) {
        while self.bump_if(b' ') {}
    }
}

fn negated(mut set: ByteClass) -> ByteClass {
    set.negate();
    set
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pattern: &str) -> Ast {
        Parser::new().parse(pattern.as_bytes()).unwrap()
    }

    fn parse_err(pattern: &str) -> ParseErrorKind {
        *Parser::new().parse(pattern.as_bytes()).unwrap_err().kind()
    }

    /// Walk the finished tree and assert structural invariants: no marker
    /// nodes reachable, concatenations and alternations have at least two
    /// children, repetition bounds are ordered.
    fn assert_well_formed(ast: &Ast) {
        let mut work = vec![ast.root()];
        while let Some(id) = work.pop() {
            match *ast.get(id) {
                Expr::OpenGroup { .. } => {
                    panic!("marker node in finished tree")
                }
                Expr::Concat(ref children) => {
                    assert!(children.len() >= 2);
                    work.extend(children);
                }
                Expr::Alternate(ref children) => {
                    assert!(children.len() >= 2);
                    work.extend(children);
                }
                Expr::Group { expr, .. } => work.push(expr),
                Expr::Repeat { expr, min, max, .. } => {
                    assert!(max.map_or(true, |m| m >= min));
                    work.push(expr);
                }
                Expr::Empty
                | Expr::Literal(_)
                | Expr::Dot
                | Expr::Class(_)
                | Expr::Assert(_) => {}
            }
        }
    }

    #[test]
    fn literals_concatenate() {
        let ast = parse("abc");
        assert_well_formed(&ast);
        match *ast.get(ast.root()) {
            Expr::Concat(ref children) => assert_eq!(children.len(), 3),
            ref other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn single_literal_is_not_wrapped() {
        let ast = parse("a");
        assert!(matches!(*ast.get(ast.root()), Expr::Literal(b'a')));
    }

    #[test]
    fn empty_pattern() {
        let ast = parse("");
        assert!(matches!(*ast.get(ast.root()), Expr::Empty));
    }

    #[test]
    fn repeat_operators() {
        for (pattern, min, max, greedy) in [
            ("a*", 0, None, true),
            ("a+", 1, None, true),
            ("a?", 0, Some(1), true),
            ("a*?", 0, None, false),
            ("a+?", 1, None, false),
            ("a??", 0, Some(1), false),
            ("a{3}", 3, Some(3), true),
            ("a{3,}", 3, None, true),
            ("a{3,5}", 3, Some(5), true),
            ("a{3,5}?", 3, Some(5), false),
            ("a{ 3 , 5 }", 3, Some(5), true),
        ] {
            let ast = parse(pattern);
            match *ast.get(ast.root()) {
                Expr::Repeat { min: m, max: x, greedy: g, .. } => {
                    assert_eq!((m, x, g), (min, max, greedy), "{}", pattern);
                }
                ref other => panic!("{}: expected repeat, got {:?}", pattern, other),
            }
        }
    }

    #[test]
    fn repeat_requires_single_unit_operand() {
        assert_eq!(parse_err("*"), ParseErrorKind::MissingRepeatOperand);
        assert_eq!(parse_err("a**"), ParseErrorKind::MissingRepeatOperand);
        assert_eq!(parse_err("^*"), ParseErrorKind::MissingRepeatOperand);
        assert_eq!(parse_err("\\b+"), ParseErrorKind::MissingRepeatOperand);
        // Groups are fine.
        let ast = parse("(ab)*");
        assert!(matches!(*ast.get(ast.root()), Expr::Repeat { .. }));
    }

    #[test]
    fn counted_repeat_errors() {
        assert_eq!(parse_err("a{5"), ParseErrorKind::UnclosedRepeat);
        assert_eq!(parse_err("a{5,"), ParseErrorKind::UnclosedRepeat);
        assert_eq!(parse_err("a{}"), ParseErrorKind::MissingRepeatArgument);
        assert_eq!(parse_err("a{x}"), ParseErrorKind::MissingRepeatArgument);
        assert_eq!(parse_err("a{1x}"), ParseErrorKind::InvalidRepeatArgument);
        assert_eq!(parse_err("a{1,x}"), ParseErrorKind::InvalidRepeatArgument);
        assert_eq!(parse_err("a{5,2}"), ParseErrorKind::InvalidRepeatRange);
        assert_eq!(
            parse_err("a{1,999999999999}"),
            ParseErrorKind::ExcessiveRepeatCount
        );
        assert_eq!(parse_err("a{1001}"), ParseErrorKind::ExcessiveRepeatCount);
    }

    #[test]
    fn max_repeat_is_configurable() {
        let parser = Parser::new().max_repeat(10);
        assert!(parser.parse(b"a{10}").is_ok());
        assert_eq!(
            *parser.parse(b"a{11}").unwrap_err().kind(),
            ParseErrorKind::ExcessiveRepeatCount
        );
    }

    #[test]
    fn groups() {
        let ast = parse("(a)");
        match *ast.get(ast.root()) {
            Expr::Group { capturing, .. } => assert!(capturing),
            ref other => panic!("expected group, got {:?}", other),
        }
        let ast = parse("(?:a)");
        match *ast.get(ast.root()) {
            Expr::Group { capturing, .. } => assert!(!capturing),
            ref other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn group_errors() {
        assert_eq!(parse_err("("), ParseErrorKind::UnclosedParentheses);
        assert_eq!(parse_err("(a"), ParseErrorKind::UnclosedParentheses);
        assert_eq!(parse_err("(a|b"), ParseErrorKind::UnclosedParentheses);
        assert_eq!(parse_err(")"), ParseErrorKind::UnopenedParentheses);
        assert_eq!(parse_err("a)"), ParseErrorKind::UnopenedParentheses);
        assert_eq!(parse_err("a|b)"), ParseErrorKind::UnbalancedParentheses);
        assert_eq!(parse_err("()"), ParseErrorKind::EmptyCaptureGroup);
        assert_eq!(parse_err("(?P<n>a)"), ParseErrorKind::UnimplementedModifier);
        assert_eq!(parse_err("(?i)a"), ParseErrorKind::UnimplementedModifier);
    }

    #[test]
    fn alternation_folds_per_level() {
        let ast = parse("a|b|c");
        assert_well_formed(&ast);
        match *ast.get(ast.root()) {
            Expr::Alternate(ref branches) => assert_eq!(branches.len(), 3),
            ref other => panic!("expected alternation, got {:?}", other),
        }

        let ast = parse("ab|cd(e|f)g");
        assert_well_formed(&ast);
    }

    #[test]
    fn alternation_errors() {
        assert_eq!(parse_err("|a"), ParseErrorKind::EmptyAlternate);
        assert_eq!(parse_err("a|"), ParseErrorKind::EmptyAlternate);
        assert_eq!(parse_err("a||b"), ParseErrorKind::EmptyAlternate);
        assert_eq!(parse_err("(|a)"), ParseErrorKind::EmptyAlternate);
    }

    #[test]
    fn class_basics() {
        let ast = parse("[a-cx]");
        match *ast.get(ast.root()) {
            Expr::Class(ref set) => {
                assert!(set.contains(b'a'));
                assert!(set.contains(b'c'));
                assert!(set.contains(b'x'));
                assert!(!set.contains(b'd'));
            }
            ref other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn class_negation() {
        let ast = parse("[^a-z]");
        match *ast.get(ast.root()) {
            Expr::Class(ref set) => {
                assert!(!set.contains(b'm'));
                assert!(set.contains(b'A'));
                assert!(set.contains(0xFF));
            }
            ref other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn class_leading_bracket_is_literal() {
        let ast = parse("[]a]");
        match *ast.get(ast.root()) {
            Expr::Class(ref set) => {
                assert!(set.contains(b']'));
                assert!(set.contains(b'a'));
            }
            ref other => panic!("expected class, got {:?}", other),
        }
        let ast = parse("[^]]");
        match *ast.get(ast.root()) {
            Expr::Class(ref set) => {
                assert!(!set.contains(b']'));
                assert!(set.contains(b'a'));
            }
            ref other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn class_trailing_dash_is_literal() {
        let ast = parse("[a-]");
        match *ast.get(ast.root()) {
            Expr::Class(ref set) => {
                assert!(set.contains(b'a'));
                assert!(set.contains(b'-'));
                assert!(!set.contains(b'b'));
            }
            ref other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn class_template_merge() {
        let ast = parse(r"[\d-x]");
        match *ast.get(ast.root()) {
            Expr::Class(ref set) => {
                assert!(set.contains(b'5'));
                assert!(set.contains(b'-'));
                assert!(set.contains(b'x'));
                assert!(!set.contains(b'w'));
            }
            ref other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn class_errors() {
        assert_eq!(parse_err("["), ParseErrorKind::UnclosedBrackets);
        assert_eq!(parse_err("[a-z"), ParseErrorKind::UnclosedBrackets);
        assert_eq!(parse_err("[]"), ParseErrorKind::UnclosedBrackets);
        assert_eq!(parse_err("]"), ParseErrorKind::UnmatchedByteClass);
        assert_eq!(parse_err("[z-a]"), ParseErrorKind::UnmatchedByteClass);
    }

    #[test]
    fn escapes() {
        for (pattern, byte) in [
            (r"\n", b'\n'),
            (r"\t", b'\t'),
            (r"\a", 0x07u8),
            (r"\v", 0x0B),
            (r"\f", 0x0C),
            (r"\r", b'\r'),
            (r"\.", b'.'),
            (r"\\", b'\\'),
            (r"\-", b'-'),
            (r"\x41", b'A'),
            (r"\x7", 0x07),
            (r"\x{41}", b'A'),
            (r"\x{7f}", 0x7F),
            (r"\101", b'A'),
            (r"\0", 0),
            (r"\12", 0o12),
        ] {
            let ast = parse(pattern);
            match *ast.get(ast.root()) {
                Expr::Literal(b) => assert_eq!(b, byte, "{}", pattern),
                ref other => {
                    panic!("{}: expected literal, got {:?}", pattern, other)
                }
            }
        }
    }

    #[test]
    fn escape_classes_and_anchors() {
        let ast = parse(r"\d");
        assert!(matches!(*ast.get(ast.root()), Expr::Class(_)));
        let ast = parse(r"\b");
        assert!(matches!(*ast.get(ast.root()), Expr::Assert(Look::WordAscii)));
        let ast = parse(r"\B");
        assert!(matches!(
            *ast.get(ast.root()),
            Expr::Assert(Look::WordAsciiNegate)
        ));
        let ast = parse("^a$");
        assert_well_formed(&ast);
    }

    #[test]
    fn escape_errors() {
        assert_eq!(parse_err("\\"), ParseErrorKind::OpenEscapeCode);
        assert_eq!(parse_err(r"\q"), ParseErrorKind::UnrecognizedEscapeCode);
        assert_eq!(parse_err(r"\x{41"), ParseErrorKind::UnclosedHexCharacterCode);
        assert_eq!(parse_err(r"\x{zz}"), ParseErrorKind::InvalidHexDigit);
        assert_eq!(parse_err(r"\x{}"), ParseErrorKind::InvalidHexDigit);
        assert_eq!(parse_err(r"\x{100}"), ParseErrorKind::InvalidHexDigit);
        assert_eq!(parse_err(r"\xz"), ParseErrorKind::InvalidHexDigit);
        assert_eq!(parse_err(r"\8"), ParseErrorKind::InvalidOctalDigit);
        assert_eq!(parse_err(r"\777"), ParseErrorKind::InvalidOctalDigit);
        assert_eq!(parse_err(r"[\b]"), ParseErrorKind::UnrecognizedEscapeCode);
    }

    #[test]
    fn trees_are_well_formed() {
        for pattern in [
            "a", "abc", "a|b", "(a|b)*c", "a(b(c(d)))", "[a-z]+",
            r"\d{2,4}", "(?:ab)+?", "a.b|c.d", "^hello world$",
            r"\bx\b", "x{3,}", "a{0,3}",
        ] {
            assert_well_formed(&parse(pattern));
        }
    }

    #[test]
    fn display_round_trips() {
        for pattern in [
            "abc",
            "a|b|c",
            "(a|b)*c",
            "[a-z]+",
            r"\d{2,4}",
            "(?:ab)+?",
            "a.b",
            "^hello world$",
            r"\bx\B",
            "x{3,}?",
            "[]a-]",
            r"\x07",
            "a??",
        ] {
            let first = parse(pattern).to_string();
            let second = parse(&first).to_string();
            assert_eq!(first, second, "pattern: {}", pattern);
        }
    }

    quickcheck::quickcheck! {
        fn prop_parse_never_panics(pattern: Vec<u8>) -> bool {
            let _ = Parser::new().parse(&pattern);
            true
        }
    }
}
