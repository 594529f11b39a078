//! Constant Expression Evaluator
//!
//! Folds annotation argument syntax to a value at generation time. Only
//! literal forms, `nameof`, string concatenation and references to other
//! `const` fields are understood; anything else is `Unspecified`. Failure to
//! fold is never an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::syntax::{Token, TokenKind};

/// Bound on nested constant references.
const MAX_REFERENCE_DEPTH: usize = 32;
/// Bound on parenthesis and negation nesting, counted across references.
const MAX_NESTING: usize = 128;
/// Longer folded strings are unspecified.
const MAX_STRING_LENGTH: usize = 64 * 1024;

/// A referenced constant, identified by the address and length of its
/// initializer tokens. The tokens outlive one evaluation.
type ExpressionKey = (usize, usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Constant {
    /// Not constant-foldable, or not supplied.
    Unspecified,
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Constant {
    pub fn is_specified(&self) -> bool {
        !matches!(self, Constant::Unspecified)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Constant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Constant::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Text of the value when concatenated onto a string.
    fn concat_text(&self) -> Option<String> {
        match self {
            Constant::Unspecified => None,
            Constant::Null => Some(String::new()),
            Constant::Bool(true) => Some("True".to_string()),
            Constant::Bool(false) => Some("False".to_string()),
            Constant::Int(i) => Some(i.to_string()),
            Constant::Str(s) => Some(s.clone()),
        }
    }
}

/// Resolves references to other constants.
///
/// The returned lookup is the context the referenced constant's own
/// expression must be evaluated in (its declaring type).
pub trait ConstantLookup<'a>: Sized {
    fn find_constant(&self, path: &[String]) -> Option<(&'a [Token], Self)>;
}

/// Each referenced constant is folded at most once per call; a reference
/// back to a constant still being folded is unspecified.
pub fn evaluate<'a, L: ConstantLookup<'a>>(tokens: &[Token], lookup: &L) -> Constant {
    let mut resolved = HashMap::new();
    evaluate_nested(tokens, lookup, 0, 0, &mut resolved)
}

fn evaluate_nested<'a, L: ConstantLookup<'a>>(
    tokens: &[Token],
    lookup: &L,
    depth: usize,
    nesting: usize,
    resolved: &mut HashMap<ExpressionKey, Constant>,
) -> Constant {
    if depth > MAX_REFERENCE_DEPTH || tokens.is_empty() {
        return Constant::Unspecified;
    }
    let mut evaluator = Evaluator {
        tokens,
        pos: 0,
        lookup,
        depth,
        nesting,
        resolved,
    };
    let value = evaluator.sum();
    if evaluator.pos != tokens.len() {
        return Constant::Unspecified;
    }
    value
}

struct Evaluator<'t, 'l, 'r, L> {
    tokens: &'t [Token],
    pos: usize,
    lookup: &'l L,
    depth: usize,
    nesting: usize,
    resolved: &'r mut HashMap<ExpressionKey, Constant>,
}

impl<'a, L: ConstantLookup<'a>> Evaluator<'_, '_, '_, L> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(p)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn sum(&mut self) -> Constant {
        let mut acc = self.term();
        while self.eat_punct("+") {
            let rhs = self.term();
            acc = add(acc, rhs);
        }
        acc
    }

    fn term(&mut self) -> Constant {
        let token = match self.peek() {
            Some(t) => t.clone(),
            None => return Constant::Unspecified,
        };

        let nests = token.is_punct("(") || token.is_punct("-");
        if nests && self.nesting >= MAX_NESTING {
            return Constant::Unspecified;
        }

        if token.is_punct("(") {
            self.pos += 1;
            self.nesting += 1;
            let inner = self.sum();
            self.nesting -= 1;
            if !self.eat_punct(")") {
                return Constant::Unspecified;
            }
            return inner;
        }

        if token.is_punct("-") {
            self.pos += 1;
            self.nesting += 1;
            let operand = self.term();
            self.nesting -= 1;
            return match operand {
                Constant::Int(i) => i.checked_neg().map_or(Constant::Unspecified, Constant::Int),
                _ => Constant::Unspecified,
            };
        }

        match token.kind {
            TokenKind::Str => {
                self.pos += 1;
                decode_string_literal(&token.text).map_or(Constant::Unspecified, Constant::Str)
            }
            TokenKind::Number => {
                self.pos += 1;
                parse_integer(&token.text).map_or(Constant::Unspecified, Constant::Int)
            }
            TokenKind::Ident => self.identifier(),
            _ => {
                self.pos += 1;
                Constant::Unspecified
            }
        }
    }

    fn identifier(&mut self) -> Constant {
        let first = match self.peek() {
            Some(t) => t.clone(),
            None => return Constant::Unspecified,
        };
        match first.text.as_str() {
            "true" => {
                self.pos += 1;
                return Constant::Bool(true);
            }
            "false" => {
                self.pos += 1;
                return Constant::Bool(false);
            }
            "null" => {
                self.pos += 1;
                return Constant::Null;
            }
            "nameof" if self.tokens.get(self.pos + 1).is_some_and(|t| t.is_punct("(")) => {
                self.pos += 2;
                let path = self.dotted_path();
                if !self.eat_punct(")") {
                    return Constant::Unspecified;
                }
                return path.last().cloned().map_or(Constant::Unspecified, Constant::Str);
            }
            _ => {}
        }

        let path = self.dotted_path();
        if path.is_empty() {
            self.pos += 1;
            return Constant::Unspecified;
        }
        match self.lookup.find_constant(&path) {
            Some((expression, scope)) => self.reference(expression, &scope),
            None => Constant::Unspecified,
        }
    }

    fn reference(&mut self, expression: &[Token], scope: &L) -> Constant {
        let key = (expression.as_ptr() as usize, expression.len());
        if let Some(value) = self.resolved.get(&key) {
            return value.clone();
        }
        // Placeholder while folding; a cycle reads it back.
        self.resolved.insert(key, Constant::Unspecified);
        let value = evaluate_nested(expression, scope, self.depth + 1, self.nesting, self.resolved);
        self.resolved.insert(key, value.clone());
        value
    }

    /// `A.B.C` with an optional `global::` prefix; generic arguments are dropped.
    fn dotted_path(&mut self) -> Vec<String> {
        let mut path = Vec::new();
        if self.peek().is_some_and(|t| t.is_keyword("global"))
            && self.tokens.get(self.pos + 1).is_some_and(|t| t.is_punct("::"))
        {
            self.pos += 2;
        }
        while let Some(token) = self.peek() {
            if !token.is_ident() {
                break;
            }
            path.push(token.ident_name().to_string());
            self.pos += 1;
            if self.peek().is_some_and(|t| t.is_punct("<")) {
                self.skip_generic_arguments();
            }
            if self.peek().is_some_and(|t| t.is_punct("."))
                && self.tokens.get(self.pos + 1).is_some_and(Token::is_ident)
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        path
    }

    fn skip_generic_arguments(&mut self) {
        let mut depth = 0;
        while let Some(token) = self.peek() {
            if token.is_punct("<") {
                depth += 1;
            } else if token.is_punct(">") {
                depth -= 1;
                if depth == 0 {
                    self.pos += 1;
                    return;
                }
            }
            self.pos += 1;
        }
    }
}

fn add(lhs: Constant, rhs: Constant) -> Constant {
    match (&lhs, &rhs) {
        (Constant::Int(a), Constant::Int(b)) => a.checked_add(*b).map_or(Constant::Unspecified, Constant::Int),
        (Constant::Str(_), _) | (_, Constant::Str(_)) => match (lhs.concat_text(), rhs.concat_text()) {
            (Some(a), Some(b)) if a.len() + b.len() <= MAX_STRING_LENGTH => Constant::Str(a + &b),
            _ => Constant::Unspecified,
        },
        _ => Constant::Unspecified,
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let digits = lower.trim_end_matches(&['u', 'l'][..]);
    if let Some(hex) = digits.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = digits.strip_prefix("0b") {
        return i64::from_str_radix(bin, 2).ok();
    }
    digits.parse::<i64>().ok()
}

/// Decode a string literal token to its value. Interpolated strings and
/// UTF-8 literals are not constant strings.
pub fn decode_string_literal(text: &str) -> Option<String> {
    if text.starts_with('$') || text.ends_with("u8") || text.ends_with("U8") {
        return None;
    }
    if let Some(body) = text.strip_prefix('@') {
        let inner = body.strip_prefix('"')?.strip_suffix('"')?;
        return Some(inner.replace("\"\"", "\""));
    }

    let quotes = text.chars().take_while(|c| *c == '"').count();
    if quotes >= 3 {
        let inner = text.get(quotes..text.len().checked_sub(quotes)?)?;
        return Some(decode_raw(inner));
    }

    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    unescape(inner)
}

fn decode_raw(inner: &str) -> String {
    if !inner.contains('\n') {
        return inner.to_string();
    }
    let normalized = inner.replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();
    // First line is the opening delimiter's remainder, last line the closing indentation.
    let indent = lines.pop().unwrap_or_default().to_string();
    if !lines.is_empty() {
        lines.remove(0);
    }
    lines
        .iter()
        .map(|line| line.strip_prefix(indent.as_str()).unwrap_or(line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            '0' => result.push('\0'),
            'a' => result.push('\u{7}'),
            'b' => result.push('\u{8}'),
            'f' => result.push('\u{c}'),
            'v' => result.push('\u{b}'),
            '\\' => result.push('\\'),
            '"' => result.push('"'),
            '\'' => result.push('\''),
            'u' => result.push(read_hex(&mut chars, 4, 4)?),
            'U' => result.push(read_hex(&mut chars, 8, 8)?),
            'x' => result.push(read_hex(&mut chars, 1, 4)?),
            _ => return None,
        }
    }

    Some(result)
}

fn read_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, min: usize, max: usize) -> Option<char> {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    if digits.len() < min {
        return None;
    }
    char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
}
