//! Syntax Module for the web component generator
//!
//! A tolerant declaration-level parser for C#-family source units. It only
//! recovers what the analysis needs: using directives, namespaces, class
//! declarations with their base lists, attribute lists, properties and
//! `const` fields. Method bodies, initializers and every other member are
//! skipped by bracket matching. Malformed input never fails; the parser
//! skips what it cannot read and keeps going.

use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::model::{ContainingType, DeclarationShape, TypeKeyword};

// ═══════════════════════════════════════════════════════════════════════════════
// TOKENS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Str,
    Char,
    Number,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: String) -> Self {
        Self { kind, text }
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Keyword check. `@class` is an identifier, not the keyword.
    pub fn is_keyword(&self, k: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == k
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    /// Identifier value with the verbatim `@` prefix removed.
    pub fn ident_name(&self) -> &str {
        self.text.strip_prefix('@').unwrap_or(&self.text)
    }
}

const TWO_CHAR_PUNCT: [&str; 7] = ["::", "=>", "==", "!=", "&&", "||", "??"];

/// State of one open `#if` region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    /// Lines of the current branch are read.
    Active,
    /// No branch taken yet (`#if false`).
    Pending,
    /// A branch was already taken; the rest are dropped.
    Done,
}

/// Conditional regions keep a single branch: the first one whose condition is
/// not the literal `false`. Symbols are not evaluated.
fn apply_directive(directive: &str, regions: &mut Vec<Branch>) {
    let directive = directive.trim_start();
    let keyword_len = directive
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(directive.len());
    let (keyword, condition) = directive.split_at(keyword_len);
    let condition = condition.split("//").next().unwrap_or_default().trim();
    let opens = condition != "false";

    match keyword {
        "if" => regions.push(if opens { Branch::Active } else { Branch::Pending }),
        "elif" => {
            if let Some(top) = regions.last_mut() {
                *top = match *top {
                    Branch::Pending if opens => Branch::Active,
                    Branch::Pending => Branch::Pending,
                    Branch::Active | Branch::Done => Branch::Done,
                };
            }
        }
        "else" => {
            if let Some(top) = regions.last_mut() {
                *top = match *top {
                    Branch::Pending => Branch::Active,
                    Branch::Active | Branch::Done => Branch::Done,
                };
            }
        }
        "endif" => {
            regions.pop();
        }
        _ => {}
    }
}

/// Split source text into tokens, dropping whitespace, comments, preprocessor
/// lines (`#pragma`, `#line`, `#nullable`, ...) and untaken `#if` branches.
pub fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line_start = true;
    let mut regions: Vec<Branch> = Vec::new();

    while i < len {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            line_start = true;
            i += 1;
            continue;
        }
        if c.is_whitespace() || c == '\u{feff}' {
            i += 1;
            continue;
        }
        if c == '#' && line_start {
            let start = i + 1;
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            let directive: String = chars[start..i].iter().collect();
            apply_directive(&directive, &mut regions);
            continue;
        }
        if regions.iter().any(|branch| *branch != Branch::Active) {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        line_start = false;

        if c == '/' && next == Some('/') {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && next == Some('*') {
            i += 2;
            while i < len && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i = (i + 2).min(len);
            continue;
        }

        if let Some(end) = scan_string(&chars, i) {
            tokens.push(Token::new(TokenKind::Str, chars[i..end].iter().collect()));
            i = end;
            continue;
        }

        if c == '\'' {
            let mut j = i + 1;
            while j < len && chars[j] != '\'' && chars[j] != '\n' {
                if chars[j] == '\\' {
                    j += 1;
                }
                j += 1;
            }
            let end = (j + 1).min(len);
            tokens.push(Token::new(TokenKind::Char, chars[i..end].iter().collect()));
            i = end;
            continue;
        }

        if c.is_ascii_digit() {
            let mut j = i;
            while j < len && (chars[j].is_ascii_alphanumeric() || chars[j] == '_' || chars[j] == '.')
            {
                // `1.ToString()` style member access on integers
                if chars[j] == '.' && !chars.get(j + 1).is_some_and(|d| d.is_ascii_digit()) {
                    break;
                }
                j += 1;
            }
            tokens.push(Token::new(TokenKind::Number, chars[i..j].iter().collect()));
            i = j;
            continue;
        }

        let ident_start = c == '_' || c.is_alphabetic();
        let verbatim_ident = c == '@' && next.is_some_and(|n| n == '_' || n.is_alphabetic());
        if ident_start || verbatim_ident {
            let mut j = i + 1;
            while j < len && (chars[j] == '_' || chars[j].is_alphanumeric()) {
                j += 1;
            }
            tokens.push(Token::new(TokenKind::Ident, chars[i..j].iter().collect()));
            i = j;
            continue;
        }

        if let Some(n) = next {
            let pair: String = [c, n].iter().collect();
            if TWO_CHAR_PUNCT.contains(&pair.as_str()) {
                tokens.push(Token::new(TokenKind::Punct, pair));
                i += 2;
                continue;
            }
        }

        tokens.push(Token::new(TokenKind::Punct, c.to_string()));
        i += 1;
    }

    tokens
}

/// Returns the end offset of a string literal starting at `start`, if any.
/// Handles regular, verbatim (`@"`), interpolated (`$"`) and raw (`"""`) forms.
fn scan_string(chars: &[char], start: usize) -> Option<usize> {
    let len = chars.len();
    let mut j = start;
    let mut verbatim = false;
    while j < len && (chars[j] == '$' || chars[j] == '@') {
        verbatim |= chars[j] == '@';
        j += 1;
    }
    if j >= len || chars[j] != '"' {
        return None;
    }

    let end = if verbatim {
        let mut k = j + 1;
        loop {
            if k >= len {
                break len;
            }
            if chars[k] == '"' {
                if chars.get(k + 1) == Some(&'"') {
                    k += 2;
                    continue;
                }
                break k + 1;
            }
            k += 1;
        }
    } else {
        let mut quotes = 0;
        while j + quotes < len && chars[j + quotes] == '"' {
            quotes += 1;
        }
        if quotes >= 3 {
            let mut k = j + quotes;
            loop {
                if k >= len {
                    break len;
                }
                if chars[k] == '"' {
                    let mut run = 0;
                    while k + run < len && chars[k + run] == '"' {
                        run += 1;
                    }
                    if run >= quotes {
                        break k + run;
                    }
                    k += run;
                    continue;
                }
                k += 1;
            }
        } else if quotes == 2 {
            j + 2
        } else {
            let mut k = j + 1;
            while k < len && chars[k] != '"' && chars[k] != '\n' {
                if chars[k] == '\\' {
                    k += 1;
                }
                k += 1;
            }
            (k + 1).min(len)
        }
    };

    let mut end = end;
    if chars.get(end).is_some_and(|c| *c == 'u' || *c == 'U') && chars.get(end + 1) == Some(&'8') {
        end += 2;
    }
    Some(end)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTAX TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsingDirective {
    Namespace(String),
    Static(String),
    Alias { alias: String, target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSyntax {
    /// `Name = value` (attribute property assignment)
    pub name_equals: Option<String>,
    /// `name: value` (named constructor parameter)
    pub name_colon: Option<String>,
    pub expression: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSyntax {
    /// Name as written, e.g. `Slot` or `global::Lib.SlotAttribute`.
    pub name: String,
    pub arguments: Vec<ArgumentSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySyntax {
    pub name: String,
    pub type_text: String,
    pub attributes: Vec<AttributeSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantSyntax {
    pub name: String,
    pub expression: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSyntax {
    pub keyword: TypeKeyword,
    pub name: String,
    pub namespace: String,
    /// Enclosing types, outermost first.
    pub containing_types: Vec<ContainingType>,
    pub type_parameters: Vec<String>,
    pub base_list: Vec<String>,
    pub attributes: Vec<AttributeSyntax>,
    pub properties: Vec<PropertySyntax>,
    pub constants: Vec<ConstantSyntax>,
    /// Usings in scope at the declaration, outermost first.
    pub usings: Vec<UsingDirective>,
}

impl ClassSyntax {
    /// Enclosing type names followed by the own name.
    pub fn type_path_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = self.containing_types.iter().map(|outer| outer.name.clone()).collect();
        parts.push(self.name.clone());
        parts
    }

    /// `Outer.Inner` for nested declarations, `Name` otherwise.
    pub fn type_path(&self) -> String {
        self.type_path_parts().join(".")
    }

    pub fn shape(&self) -> DeclarationShape {
        DeclarationShape {
            keyword: self.keyword,
            type_parameters: self.type_parameters.clone(),
            containing_types: self.containing_types.clone(),
        }
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.type_path())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationUnitSyntax {
    /// `global using` directives; they apply to every unit of the compilation.
    pub global_usings: Vec<UsingDirective>,
    pub classes: Vec<ClassSyntax>,
}

pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref MODIFIERS: HashSet<&'static str> = [
        "public", "private", "protected", "internal", "static", "readonly", "sealed",
        "abstract", "virtual", "override", "partial", "new", "async", "extern", "unsafe",
        "volatile", "const", "required", "file", "ref", "fixed", "scoped",
    ]
    .into_iter()
    .collect();
    static ref SKIPPED_TYPE_KEYWORDS: HashSet<&'static str> =
        ["struct", "interface", "enum"].into_iter().collect();
}

/// Namespace and class bodies nested deeper than this are skipped unread.
const MAX_NESTING: usize = 128;

pub fn parse_unit(source: &str) -> CompilationUnitSyntax {
    let mut parser = Parser {
        tokens: tokenize(source),
        pos: 0,
        nesting: 0,
    };
    let mut unit = CompilationUnitSyntax::default();
    let mut usings = Vec::new();
    parser.parse_members("", &mut usings, &mut unit, false);
    unit
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

struct Head {
    tokens: Vec<Token>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    fn at_keyword(&self, k: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(k))
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Namespace or class body members.
    fn parse_members(
        &mut self,
        namespace: &str,
        usings: &mut Vec<UsingDirective>,
        unit: &mut CompilationUnitSyntax,
        until_close: bool,
    ) {
        let mut namespace = namespace.to_string();
        let mut pending_attributes = Vec::new();

        while !self.at_end() {
            if self.at_punct("}") {
                self.pos += 1;
                if until_close {
                    return;
                }
                continue;
            }

            if self.at_keyword("global") && self.peek_at(1).is_some_and(|t| t.is_keyword("using")) {
                self.pos += 1;
                if let Some(directive) = self.parse_using() {
                    unit.global_usings.push(directive);
                }
                continue;
            }
            if self.at_keyword("using") {
                if let Some(directive) = self.parse_using() {
                    usings.push(directive);
                }
                continue;
            }

            if self.at_keyword("namespace") {
                self.pos += 1;
                let name = self.parse_dotted_name();
                let nested = qualify(&namespace, &name);
                if self.eat_punct(";") {
                    namespace = nested;
                } else if self.at_punct("{") && self.nesting >= MAX_NESTING {
                    self.skip_balanced("{", "}");
                } else if self.eat_punct("{") {
                    let mut scoped = usings.clone();
                    self.nesting += 1;
                    self.parse_members(&nested, &mut scoped, unit, true);
                    self.nesting -= 1;
                } else {
                    self.skip_statement();
                }
                continue;
            }

            if self.at_punct("[") {
                pending_attributes.extend(self.parse_attribute_list());
                continue;
            }

            if self.peek().is_some_and(|t| t.is_ident() && MODIFIERS.contains(t.text.as_str())) {
                self.pos += 1;
                continue;
            }

            if self.at_class_keyword() {
                let attributes = std::mem::take(&mut pending_attributes);
                self.parse_class(attributes, &namespace, &[], &usings[..], unit);
                continue;
            }

            pending_attributes.clear();
            if self.at_type_keyword() {
                self.skip_type_declaration();
            } else {
                self.skip_statement();
            }
        }
    }

    fn at_class_keyword(&self) -> bool {
        if self.at_keyword("class") {
            return true;
        }
        if self.at_keyword("record") {
            return !self.peek_at(1).is_some_and(|t| t.is_keyword("struct"));
        }
        false
    }

    fn at_type_keyword(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.is_ident() && SKIPPED_TYPE_KEYWORDS.contains(t.text.as_str()))
            || self.at_keyword("record")
    }

    fn parse_using(&mut self) -> Option<UsingDirective> {
        self.pos += 1; // using
        if self.at_punct("(") {
            // using statement, not a directive
            self.skip_statement();
            return None;
        }
        let is_static = if self.at_keyword("static") {
            self.pos += 1;
            true
        } else {
            false
        };

        let directive = if self.peek().is_some_and(Token::is_ident)
            && self.peek_at(1).is_some_and(|t| t.is_punct("="))
        {
            let alias = self.bump().map(|t| t.ident_name().to_string())?;
            self.pos += 1;
            let target = self.collect_type_text(&[";"]);
            UsingDirective::Alias { alias, target }
        } else {
            let name = self.parse_dotted_name();
            if is_static {
                UsingDirective::Static(name)
            } else {
                UsingDirective::Namespace(name)
            }
        };
        self.skip_statement();
        Some(directive)
    }

    /// `A.B.C`, with an optional leading `global::`.
    fn parse_dotted_name(&mut self) -> String {
        let mut parts = Vec::new();
        if self.at_keyword("global") && self.peek_at(1).is_some_and(|t| t.is_punct("::")) {
            self.pos += 2;
        }
        while let Some(token) = self.peek() {
            if !token.is_ident() {
                break;
            }
            parts.push(token.ident_name().to_string());
            self.pos += 1;
            if self.at_punct(".") && self.peek_at(1).is_some_and(Token::is_ident) {
                self.pos += 1;
            } else {
                break;
            }
        }
        parts.join(".")
    }

    fn parse_class(
        &mut self,
        attributes: Vec<AttributeSyntax>,
        namespace: &str,
        containing_types: &[ContainingType],
        usings: &[UsingDirective],
        unit: &mut CompilationUnitSyntax,
    ) {
        // class | record | record class
        let keyword = if self.at_keyword("record") {
            self.pos += 1;
            if self.at_keyword("class") {
                self.pos += 1;
            }
            TypeKeyword::Record
        } else {
            self.pos += 1;
            TypeKeyword::Class
        };

        let name = match self.peek() {
            Some(t) if t.is_ident() => t.ident_name().to_string(),
            _ => return,
        };
        self.pos += 1;

        let mut type_parameters = Vec::new();
        if self.at_punct("<") {
            self.pos += 1;
            let mut depth = 1;
            while let Some(token) = self.bump() {
                if token.is_punct("<") {
                    depth += 1;
                } else if token.is_punct(">") {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                } else if depth == 1 && token.is_ident() && !token.is_keyword("in") && !token.is_keyword("out") {
                    type_parameters.push(token.ident_name().to_string());
                }
            }
        }

        // Primary constructor parameters
        if self.at_punct("(") {
            self.skip_balanced("(", ")");
        }

        let mut base_list = Vec::new();
        if self.eat_punct(":") {
            loop {
                let text = self.collect_type_text(&[",", "{", ";", "("]);
                if !text.is_empty() {
                    base_list.push(text);
                }
                if self.at_punct("(") {
                    self.skip_balanced("(", ")");
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }

        // Constraint clauses
        while !self.at_end() && !self.at_punct("{") && !self.at_punct(";") {
            if self.at_punct("(") {
                self.skip_balanced("(", ")");
            } else {
                self.pos += 1;
            }
        }

        let mut class = ClassSyntax {
            keyword,
            name,
            namespace: namespace.to_string(),
            containing_types: containing_types.to_vec(),
            type_parameters,
            base_list,
            attributes,
            properties: Vec::new(),
            constants: Vec::new(),
            usings: usings.to_vec(),
        };

        if self.eat_punct(";") || self.at_end() {
            unit.classes.push(class);
            return;
        }

        if self.nesting >= MAX_NESTING {
            self.skip_balanced("{", "}");
            return;
        }

        self.pos += 1; // {
        let slot_index = unit.classes.len();
        unit.classes.push(class.clone());

        let mut nested_path = containing_types.to_vec();
        nested_path.push(ContainingType {
            keyword: class.keyword,
            name: class.name.clone(),
            type_parameters: class.type_parameters.clone(),
        });
        self.nesting += 1;
        self.parse_class_body(&mut class, &nested_path, usings, unit);
        self.nesting -= 1;
        unit.classes[slot_index] = class;

        // Optional trailing semicolon
        self.eat_punct(";");
    }

    fn parse_class_body(
        &mut self,
        class: &mut ClassSyntax,
        nested_path: &[ContainingType],
        usings: &[UsingDirective],
        unit: &mut CompilationUnitSyntax,
    ) {
        let mut pending_attributes: Vec<AttributeSyntax> = Vec::new();
        let mut is_const = false;

        while !self.at_end() {
            if self.eat_punct("}") {
                return;
            }
            if self.at_punct("[") {
                pending_attributes.extend(self.parse_attribute_list());
                continue;
            }
            if let Some(token) = self.peek() {
                if token.is_ident() && MODIFIERS.contains(token.text.as_str()) {
                    is_const |= token.text == "const";
                    self.pos += 1;
                    continue;
                }
            }

            let attributes = std::mem::take(&mut pending_attributes);
            let member_is_const = std::mem::replace(&mut is_const, false);

            if self.at_class_keyword() {
                let namespace = class.namespace.clone();
                self.parse_class(attributes, &namespace, nested_path, usings, unit);
                continue;
            }
            if self.at_type_keyword() {
                self.skip_type_declaration();
                continue;
            }
            if self.at_keyword("delegate") || self.at_keyword("event") || self.at_punct("~") {
                self.skip_member();
                continue;
            }
            if self.at_punct(";") {
                self.pos += 1;
                continue;
            }

            self.parse_member(class, attributes, member_is_const);
        }
    }

    fn parse_member(&mut self, class: &mut ClassSyntax, attributes: Vec<AttributeSyntax>, is_const: bool) {
        let head = self.collect_head();
        let stop = match self.peek() {
            Some(t) => t.clone(),
            None => return,
        };
        let named = head.tokens.len() >= 2 && head.tokens.last().is_some_and(Token::is_ident);

        if stop.is_punct("(") {
            self.skip_method_rest();
        } else if stop.is_punct("{") {
            self.skip_balanced("{", "}");
            if named {
                class.properties.extend(head.property(attributes));
            }
            if self.eat_punct("=") {
                self.skip_statement();
            }
        } else if stop.is_punct("=>") {
            self.skip_statement();
            if named {
                class.properties.extend(head.property(attributes));
            }
        } else if is_const && named {
            self.parse_const_declarators(class, &head);
        } else {
            self.skip_statement();
        }
    }

    fn parse_const_declarators(&mut self, class: &mut ClassSyntax, head: &Head) {
        let mut name = head.tokens.last().map(|t| t.ident_name().to_string());
        loop {
            let expression = if self.eat_punct("=") {
                self.collect_until_depth0(&[",", ";"])
            } else {
                Vec::new()
            };
            if let Some(n) = name.take() {
                class.constants.push(ConstantSyntax { name: n, expression });
            }
            if self.eat_punct(",") {
                name = self.bump().filter(Token::is_ident).map(|t| t.ident_name().to_string());
                continue;
            }
            self.eat_punct(";");
            break;
        }
    }

    /// Tokens of a member declaration up to the first `{`, `;`, `=`, `=>`, `(`
    /// outside of generic argument brackets.
    fn collect_head(&mut self) -> Head {
        let mut tokens = Vec::new();
        loop {
            let before = tokens.len();
            self.collect_head_tokens(&mut tokens);
            // A leading tuple type `(int, string) Name { get; }` stops at `(`
            // with nothing collected; fold it into the head.
            if tokens.len() == before && self.at_punct("(") {
                let start = self.pos;
                self.skip_balanced("(", ")");
                tokens.extend(self.tokens[start..self.pos].iter().cloned());
                continue;
            }
            return Head { tokens };
        }
    }

    fn collect_head_tokens(&mut self, tokens: &mut Vec<Token>) {
        let mut angle = 0i32;
        let mut bracket = 0i32;
        while let Some(token) = self.peek() {
            if angle == 0 && bracket == 0 {
                let stop = ["{", ";", "=", "=>", "(", "}"].iter().any(|p| token.is_punct(p));
                if stop {
                    break;
                }
            }
            if token.is_punct("<") {
                angle += 1;
            } else if token.is_punct(">") {
                angle = (angle - 1).max(0);
            } else if token.is_punct("[") {
                bracket += 1;
            } else if token.is_punct("]") {
                bracket = (bracket - 1).max(0);
            } else if token.is_punct("(") && angle > 0 {
                // tuple inside generic arguments
                let start = self.pos;
                self.skip_balanced("(", ")");
                tokens.extend(self.tokens[start..self.pos].iter().cloned());
                continue;
            }
            tokens.push(token.clone());
            self.pos += 1;
        }
    }

    fn collect_until_depth0(&mut self, stops: &[&str]) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut depth = 0i32;
        while let Some(token) = self.peek() {
            if depth == 0 && stops.iter().any(|s| token.is_punct(s)) {
                break;
            }
            if depth == 0 && token.is_punct("}") {
                break;
            }
            if ["(", "[", "{"].iter().any(|p| token.is_punct(p)) {
                depth += 1;
            } else if [")", "]", "}"].iter().any(|p| token.is_punct(p)) {
                depth -= 1;
            }
            tokens.push(token.clone());
            self.pos += 1;
        }
        tokens
    }

    /// Type text up to one of `stops` at generic depth zero.
    fn collect_type_text(&mut self, stops: &[&str]) -> String {
        let mut tokens = Vec::new();
        let mut angle = 0i32;
        while let Some(token) = self.peek() {
            if angle == 0 && stops.iter().any(|s| token.is_punct(s)) {
                break;
            }
            if angle == 0 && token.is_keyword("where") {
                break;
            }
            if token.is_punct("<") {
                angle += 1;
            } else if token.is_punct(">") {
                angle -= 1;
            } else if token.is_punct("(") && angle > 0 {
                let start = self.pos;
                self.skip_balanced("(", ")");
                tokens.extend(self.tokens[start..self.pos].iter().cloned());
                continue;
            }
            tokens.push(token.clone());
            self.pos += 1;
        }
        join_type_tokens(&tokens)
    }

    /// One `[...]` attribute list. Assembly and module targeted lists are dropped.
    fn parse_attribute_list(&mut self) -> Vec<AttributeSyntax> {
        self.pos += 1; // [
        let mut attributes = Vec::new();
        let mut keep = true;

        if self.peek().is_some_and(Token::is_ident) && self.peek_at(1).is_some_and(|t| t.is_punct(":")) {
            let target = self.bump().map(|t| t.text).unwrap_or_default();
            keep = target != "assembly" && target != "module";
            self.pos += 1;
        }

        while !self.at_end() {
            if self.eat_punct("]") {
                break;
            }
            if self.eat_punct(",") {
                continue;
            }
            let name = self.collect_type_text(&["(", ",", "]"]);
            if name.is_empty() {
                // Unexpected token inside the list; skip it.
                self.pos += 1;
                continue;
            }
            let arguments = if self.at_punct("(") {
                self.parse_attribute_arguments()
            } else {
                Vec::new()
            };
            attributes.push(AttributeSyntax { name, arguments });
        }

        if keep {
            attributes
        } else {
            Vec::new()
        }
    }

    fn parse_attribute_arguments(&mut self) -> Vec<ArgumentSyntax> {
        self.pos += 1; // (
        let mut arguments = Vec::new();
        loop {
            if self.at_end() || self.eat_punct(")") {
                break;
            }
            let mut name_equals = None;
            let mut name_colon = None;
            if let (Some(first), Some(second)) = (self.peek(), self.peek_at(1)) {
                if first.is_ident() && second.is_punct("=") {
                    name_equals = Some(first.ident_name().to_string());
                    self.pos += 2;
                } else if first.is_ident() && second.is_punct(":") {
                    name_colon = Some(first.ident_name().to_string());
                    self.pos += 2;
                }
            }
            let expression = self.collect_until_depth0(&[",", ")"]);
            arguments.push(ArgumentSyntax {
                name_equals,
                name_colon,
                expression,
            });
            if !self.eat_punct(",") {
                self.eat_punct(")");
                break;
            }
        }
        arguments
    }

    fn skip_balanced(&mut self, open: &str, close: &str) {
        if !self.eat_punct(open) {
            return;
        }
        let mut depth = 1;
        while let Some(token) = self.bump() {
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    /// Skip to the end of the current statement: a `;` at depth zero, or the
    /// close of a top-level `{ ... }` block.
    fn skip_statement(&mut self) {
        let mut depth = 0i32;
        while let Some(token) = self.peek() {
            if depth == 0 && token.is_punct(";") {
                self.pos += 1;
                return;
            }
            if depth == 0 && token.is_punct("}") {
                return;
            }
            if token.is_punct("{") && depth == 0 {
                self.skip_balanced("{", "}");
                if !self.at_punct(";") && !self.at_punct(")") && !self.at_punct(",") && !self.at_punct(".") {
                    return;
                }
                continue;
            }
            if token.is_punct("(") || token.is_punct("[") || token.is_punct("{") {
                depth += 1;
            } else if token.is_punct(")") || token.is_punct("]") || token.is_punct("}") {
                depth -= 1;
            }
            self.pos += 1;
        }
    }

    fn skip_member(&mut self) {
        while !self.at_end() {
            if self.eat_punct(";") {
                return;
            }
            if self.at_punct("{") {
                self.skip_balanced("{", "}");
                return;
            }
            if self.at_punct("}") {
                return;
            }
            if self.at_punct("(") {
                self.skip_balanced("(", ")");
                continue;
            }
            self.pos += 1;
        }
    }

    /// After a method name: parameters, constraints / ctor initializer, body.
    fn skip_method_rest(&mut self) {
        self.skip_balanced("(", ")");
        while !self.at_end() {
            if self.eat_punct(";") {
                return;
            }
            if self.at_punct("{") {
                self.skip_balanced("{", "}");
                return;
            }
            if self.at_punct("=>") {
                self.skip_statement();
                return;
            }
            if self.at_punct("}") {
                return;
            }
            if self.at_punct("(") {
                self.skip_balanced("(", ")");
                continue;
            }
            self.pos += 1;
        }
    }

    fn skip_type_declaration(&mut self) {
        while !self.at_end() {
            if self.eat_punct(";") {
                return;
            }
            if self.at_punct("{") {
                self.skip_balanced("{", "}");
                self.eat_punct(";");
                return;
            }
            if self.at_punct("(") {
                self.skip_balanced("(", ")");
                continue;
            }
            if self.at_punct("}") {
                return;
            }
            self.pos += 1;
        }
    }
}

impl Head {
    fn property(&self, attributes: Vec<AttributeSyntax>) -> Option<PropertySyntax> {
        let (name_token, type_tokens) = self.tokens.split_last()?;
        Some(PropertySyntax {
            name: name_token.ident_name().to_string(),
            type_text: join_type_tokens(type_tokens),
            attributes,
        })
    }
}

/// Render type tokens back to compact source text: `global::A.B<int, string>?`.
pub fn join_type_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut previous: Option<&Token> = None;
    for token in tokens {
        if let Some(prev) = previous {
            let word_gap = prev.is_ident() && token.is_ident();
            if word_gap || prev.is_punct(",") {
                out.push(' ');
            }
        }
        out.push_str(&token.text);
        previous = Some(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_skips_comments_and_directives() {
        let tokens = tokenize("#pragma checksum \"a\"\n// note\nclass /* x */ A {}");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["class", "A", "{", "}"]);
    }

    #[test]
    fn test_tokenize_string_forms() {
        let tokens = tokenize(r#"x("a\"b", @"c""d", """raw "q" text""", 'z')"#);
        let strings: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Str)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(strings, vec![r#""a\"b""#, r#"@"c""d""#, r#""""raw "q" text""""#]);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Char));
    }

    #[test]
    fn test_block_namespace_with_inner_usings() {
        let unit = parse_unit(
            r#"
            using System;
            namespace App.Widgets
            {
                using Lib.Components;
                public partial class Toast : WebComponentBase, IDisposable { }
            }
            "#,
        );
        assert_eq!(unit.classes.len(), 1);
        let class = &unit.classes[0];
        assert_eq!(class.full_name(), "App.Widgets.Toast");
        assert_eq!(class.base_list, vec!["WebComponentBase", "IDisposable"]);
        assert_eq!(
            class.usings,
            vec![
                UsingDirective::Namespace("System".to_string()),
                UsingDirective::Namespace("Lib.Components".to_string()),
            ]
        );
    }

    #[test]
    fn test_file_scoped_namespace_and_attributes() {
        let unit = parse_unit(
            r#"
            namespace App;

            [CustomElement(Extends = "button")]
            public partial class Toast : global::Lib.WebComponentBase
            {
                [Parameter, Slot("title", RootElement = "h2")]
                public string Title { get; set; } = "";

                public const string Prefix = "x-";

                public void Show() { if (true) { } }

                [Slot(slotName: Prefix + "body", IsTemplated = true)]
                public RenderFragment<Item>? Body => null;
            }
            "#,
        );
        let class = &unit.classes[0];
        assert_eq!(class.namespace, "App");
        assert_eq!(class.base_list, vec!["global::Lib.WebComponentBase"]);
        assert_eq!(class.attributes[0].name, "CustomElement");
        assert_eq!(class.attributes[0].arguments[0].name_equals.as_deref(), Some("Extends"));

        assert_eq!(class.properties.len(), 2);
        let title = &class.properties[0];
        assert_eq!(title.name, "Title");
        assert_eq!(title.type_text, "string");
        assert_eq!(title.attributes.len(), 2);
        let positional = &title.attributes[1].arguments[0];
        assert!(positional.name_equals.is_none() && positional.name_colon.is_none());

        let body = &class.properties[1];
        assert_eq!(body.type_text, "RenderFragment<Item>?");
        assert_eq!(body.attributes[0].arguments[0].name_colon.as_deref(), Some("slotName"));

        assert_eq!(class.constants.len(), 1);
        assert_eq!(class.constants[0].name, "Prefix");
    }

    #[test]
    fn test_nested_and_generic_classes() {
        let unit = parse_unit(
            r#"
            namespace App
            {
                public class Outer<T> : Base<T> where T : class
                {
                    private int _count = 0;
                    public Outer(int x) : base(x) { }
                    public partial class Inner : WebComponentBase { }
                }
            }
            "#,
        );
        assert_eq!(unit.classes.len(), 2);
        assert_eq!(unit.classes[0].type_parameters, vec!["T"]);
        assert_eq!(unit.classes[0].base_list, vec!["Base<T>"]);
        assert_eq!(unit.classes[0].keyword, TypeKeyword::Class);
        assert_eq!(
            unit.classes[1].containing_types,
            vec![ContainingType {
                keyword: TypeKeyword::Class,
                name: "Outer".to_string(),
                type_parameters: vec!["T".to_string()],
            }]
        );
        assert_eq!(unit.classes[1].full_name(), "App.Outer.Inner");
    }

    #[test]
    fn test_record_keyword_is_kept() {
        let unit = parse_unit("partial record Host(int Id) { partial record class Item : Base { } }");
        assert_eq!(unit.classes.len(), 2);
        assert_eq!(unit.classes[0].keyword, TypeKeyword::Record);
        let item = &unit.classes[1];
        assert_eq!(item.keyword, TypeKeyword::Record);
        assert_eq!(item.containing_types[0].keyword, TypeKeyword::Record);
        assert_eq!(item.type_path(), "Host.Item");
    }

    #[test]
    fn test_conditional_regions_keep_one_branch() {
        let source = "
            class A
            {
            #if DEBUG
                [Slot(\"debug\")]
                public string Title { get; set; }
            #elif TRACE
                public string Traced { get; set; }
            #else
                public string Title { get; set; }
            #endif
            #if false
                public string Dead { get; set; }
            #else
                public string Live { get; set; }
            #endif
            }";
        let unit = parse_unit(source);
        let names: Vec<&str> = unit.classes[0].properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Title", "Live"]);
        assert_eq!(unit.classes[0].properties[0].attributes.len(), 1);
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let depth = 20_000;
        let classes = format!("{}{}class After {{ }}", "class C { ".repeat(depth), "} ".repeat(depth));
        let unit = parse_unit(&classes);
        assert_eq!(unit.classes.len(), MAX_NESTING + 1);
        assert_eq!(unit.classes.last().map(|class| class.name.as_str()), Some("After"));

        let namespaces = format!("{}{}class After {{ }}", "namespace N { ".repeat(depth), "} ".repeat(depth));
        let unit = parse_unit(&namespaces);
        assert_eq!(unit.classes.len(), 1);
        assert_eq!(unit.classes[0].full_name(), "After");

        let tuples = format!("class T {{ {}Name {{ get; }} }}", "(int, int) ".repeat(depth));
        assert_eq!(parse_unit(&tuples).classes[0].properties[0].name, "Name");
    }

    #[test]
    fn test_global_and_alias_usings() {
        let unit = parse_unit(
            "global using Lib.Components;\nusing Wc = Lib.WebComponents;\nclass A : Wc.WebComponentBase {}",
        );
        assert_eq!(
            unit.global_usings,
            vec![UsingDirective::Namespace("Lib.Components".to_string())]
        );
        assert_eq!(
            unit.classes[0].usings,
            vec![UsingDirective::Alias {
                alias: "Wc".to_string(),
                target: "Lib.WebComponents".to_string()
            }]
        );
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        let unit = parse_unit("namespace { class [ ( } ] ) Foo : { ");
        assert!(unit.classes.len() <= 1);
        let unit = parse_unit("class A { public string X { get; ");
        assert_eq!(unit.classes.len(), 1);
    }
}
