//! Semantic Model
//!
//! Compilation-wide view over every parsed unit of a pass: a type index that
//! merges partial fragments, name resolution through namespaces and using
//! directives, the base-type chain walk and the marker registry that turns a
//! chain into a capability.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::{unit_hash, Memo};
use crate::constant::ConstantLookup;
use crate::model::{Capability, SyntaxUnit};
use crate::options::GeneratorOptions;
use crate::path::original_path;
use crate::syntax::{parse_unit, tokenize, ClassSyntax, CompilationUnitSyntax, Token, UsingDirective};

const BUILTIN_TYPES: [&str; 18] = [
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "nint",
    "nuint", "long", "ulong", "short", "ushort", "object", "string", "dynamic",
];

/// One parsed syntax unit of the current pass.
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    pub path: String,
    pub original_path: String,
    /// Content hash of `(path, text)`.
    pub hash: String,
    pub syntax: Arc<CompilationUnitSyntax>,
}

impl ParsedUnit {
    /// Syntax already in `parsed` under the unit's content hash is reused.
    pub fn parse(unit: &SyntaxUnit, options: &GeneratorOptions, parsed: &Memo<Arc<CompilationUnitSyntax>>) -> Self {
        let hash = unit_hash(&unit.path, &unit.text);
        let syntax = match parsed.get(&hash) {
            Some(syntax) => syntax.clone(),
            None => Arc::new(parse_unit(&unit.text)),
        };
        Self {
            path: unit.path.clone(),
            original_path: original_path(&unit.path, &unit.text, options),
            hash,
            syntax,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKER REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Known marker base types and the capability each one grants.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    entries: Vec<(String, Capability)>,
}

impl MarkerRegistry {
    pub fn new(options: &GeneratorOptions) -> Self {
        Self {
            entries: vec![
                (options.web_component_base.clone(), Capability::WebComponent),
                (options.custom_element_base.clone(), Capability::CustomElement),
            ],
        }
    }

    pub fn lookup(&self, full_name: &str) -> Option<Capability> {
        self.entries
            .iter()
            .find(|(name, _)| name == full_name)
            .map(|(_, capability)| *capability)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.lookup(full_name).is_some()
    }

    /// Capability of the first chain entry that is a marker; the chain is
    /// ordered from the immediate base outward.
    pub fn classify<S: AsRef<str>>(&self, chain: &[S]) -> Capability {
        chain
            .iter()
            .find_map(|base| self.lookup(base.as_ref()))
            .unwrap_or(Capability::None)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE REFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Parsed type text. Shapes the resolver does not understand (tuples,
/// pointers, nested generic qualifiers) stay verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeRef {
    Named {
        global: bool,
        name: String,
        args: Vec<TypeRef>,
        suffix: String,
    },
    Verbatim(String),
}

impl TypeRef {
    fn parse(text: &str) -> TypeRef {
        let tokens = tokenize(text);
        let mut pos = 0;
        match parse_named(&tokens, &mut pos) {
            Some(named) if pos == tokens.len() => named,
            _ => TypeRef::Verbatim(text.trim().to_string()),
        }
    }
}

fn parse_named(tokens: &[Token], pos: &mut usize) -> Option<TypeRef> {
    let mut global = false;
    if tokens.get(*pos).is_some_and(|t| t.is_keyword("global"))
        && tokens.get(*pos + 1).is_some_and(|t| t.is_punct("::"))
    {
        global = true;
        *pos += 2;
    }

    let mut parts = Vec::new();
    loop {
        let token = tokens.get(*pos).filter(|t| t.is_ident())?;
        parts.push(token.ident_name().to_string());
        *pos += 1;
        let dotted = tokens.get(*pos).is_some_and(|t| t.is_punct(".") || t.is_punct("::"));
        if dotted && tokens.get(*pos + 1).is_some_and(Token::is_ident) {
            *pos += 1;
        } else {
            break;
        }
    }

    let mut args = Vec::new();
    if tokens.get(*pos).is_some_and(|t| t.is_punct("<")) {
        *pos += 1;
        loop {
            args.push(parse_named(tokens, pos)?);
            if tokens.get(*pos).is_some_and(|t| t.is_punct(",")) {
                *pos += 1;
                continue;
            }
            if tokens.get(*pos).is_some_and(|t| t.is_punct(">")) {
                *pos += 1;
                break;
            }
            return None;
        }
    }

    let mut suffix = String::new();
    while let Some(token) = tokens.get(*pos) {
        if ["?", "[", "]", ","].iter().any(|p| token.is_punct(p)) {
            // A `,` directly after a generic argument belongs to the caller.
            if token.is_punct(",") && !suffix.ends_with('[') && !suffix.ends_with(',') {
                break;
            }
            suffix.push_str(&token.text);
            *pos += 1;
        } else {
            break;
        }
    }

    Some(TypeRef::Named {
        global,
        name: parts.join("."),
        args,
        suffix,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Compilation<'a> {
    options: &'a GeneratorOptions,
    registry: MarkerRegistry,
    /// Full name → partial fragments in discovery order.
    classes: HashMap<String, Vec<&'a ClassSyntax>>,
    well_known: HashSet<&'a str>,
    global_usings: Vec<&'a UsingDirective>,
}

impl<'a> Compilation<'a> {
    pub fn new(units: &'a [ParsedUnit], options: &'a GeneratorOptions) -> Self {
        let mut classes: HashMap<String, Vec<&'a ClassSyntax>> = HashMap::new();
        let mut global_usings = Vec::new();
        for unit in units {
            global_usings.extend(unit.syntax.global_usings.iter());
            for class in &unit.syntax.classes {
                classes.entry(class.full_name()).or_default().push(class);
            }
        }

        Self {
            options,
            registry: MarkerRegistry::new(options),
            classes,
            well_known: options.well_known_types().into_iter().collect(),
            global_usings,
        }
    }

    pub fn is_declared(&self, full_name: &str) -> bool {
        self.classes.contains_key(full_name)
    }

    fn is_known(&self, full_name: &str) -> bool {
        self.is_declared(full_name) || self.well_known.contains(full_name)
    }

    /// Hash of everything resolution depends on. Extraction results stay
    /// valid while this is unchanged.
    pub fn shape_hash(&self) -> String {
        let mut names: Vec<&String> = self.classes.keys().collect();
        names.sort();
        let mut hasher = Sha256::new();
        for name in names {
            hasher.update(name.as_bytes());
            for class in &self.classes[name] {
                hasher.update(format!("{:?}|{:?}|{:?}", class.base_list, class.usings, class.constants));
            }
        }
        hasher.update(format!("{:?}", self.global_usings));
        format!("{:x}", hasher.finalize())
    }

    // ─── Name resolution ────────────────────────────────────────────────────

    /// Resolve a dotted type name (no generic arguments) as seen from `context`.
    pub fn resolve_name(&self, name: &str, context: &ClassSyntax) -> Option<String> {
        let mut in_scope_parameters = context
            .type_parameters
            .iter()
            .chain(context.containing_types.iter().flat_map(|outer| outer.type_parameters.iter()));
        if name.is_empty() || in_scope_parameters.any(|p| p == name) {
            return None;
        }

        let (first, rest) = match name.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };

        // Nested types of the enclosing types, innermost first.
        let mut enclosing = context.type_path_parts();
        while !enclosing.is_empty() {
            let outer = crate::syntax::qualify(&context.namespace, &enclosing.join("."));
            let candidate = format!("{}.{}", outer, name);
            if self.is_known(&candidate) {
                return Some(candidate);
            }
            enclosing.pop();
        }

        // Enclosing namespaces, innermost first.
        let mut namespace = context.namespace.as_str();
        while !namespace.is_empty() {
            let candidate = format!("{}.{}", namespace, name);
            if self.is_known(&candidate) {
                return Some(candidate);
            }
            namespace = namespace.rsplit_once('.').map_or("", |(outer, _)| outer);
        }

        let usings = context.usings.iter().chain(self.global_usings.iter().copied());
        for directive in usings.clone() {
            if let UsingDirective::Alias { alias, target } = directive {
                if alias == first {
                    let target = target.trim_start_matches("global::");
                    let candidate = match rest {
                        Some(rest) => format!("{}.{}", target, rest),
                        None => target.to_string(),
                    };
                    if self.is_known(&candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
        for directive in usings {
            if let UsingDirective::Namespace(ns) | UsingDirective::Static(ns) = directive {
                let candidate = format!("{}.{}", ns, name);
                if self.is_known(&candidate) {
                    return Some(candidate);
                }
            }
        }

        if self.is_known(name) {
            return Some(name.to_string());
        }
        None
    }

    /// Resolve type text (`global::`, nullable and generic arguments allowed)
    /// to the full name of its original definition.
    pub fn resolve_type(&self, type_text: &str, context: &ClassSyntax) -> Option<String> {
        match TypeRef::parse(type_text) {
            TypeRef::Named { global: true, name, .. } => {
                self.is_known(&name).then_some(name)
            }
            TypeRef::Named { name, .. } => self.resolve_name(&name, context),
            TypeRef::Verbatim(_) => None,
        }
    }

    /// Attribute names resolve with or without the `Attribute` suffix.
    pub fn resolve_attribute(&self, name: &str, context: &ClassSyntax) -> Option<String> {
        let suffixed = format!("{}Attribute", name);
        self.resolve_type(&suffixed, context)
            .or_else(|| self.resolve_type(name, context))
    }

    /// True when `type_text` names exactly the non-generic `full_name`.
    pub fn is_type(&self, type_text: &str, context: &ClassSyntax, full_name: &str) -> bool {
        match TypeRef::parse(type_text) {
            TypeRef::Named { args, suffix, .. } if args.is_empty() && suffix.trim_end_matches('?').is_empty() => {
                self.resolve_type(type_text, context).as_deref() == Some(full_name)
            }
            _ => false,
        }
    }

    /// Type text usable from generated code: resolved names become
    /// `global::`-qualified, keywords and unknown names stay as written.
    pub fn display_type(&self, type_text: &str, context: &ClassSyntax) -> String {
        self.display_ref(&TypeRef::parse(type_text), context)
    }

    fn display_ref(&self, type_ref: &TypeRef, context: &ClassSyntax) -> String {
        match type_ref {
            TypeRef::Verbatim(text) => text.clone(),
            TypeRef::Named { global, name, args, suffix } => {
                let head = if BUILTIN_TYPES.contains(&name.as_str()) {
                    name.clone()
                } else if *global {
                    format!("global::{}", name)
                } else {
                    match self.resolve_name(name, context) {
                        Some(full) => format!("global::{}", full),
                        None => name.clone(),
                    }
                };
                let args = if args.is_empty() {
                    String::new()
                } else {
                    let rendered: Vec<String> = args.iter().map(|a| self.display_ref(a, context)).collect();
                    format!("<{}>", rendered.join(", "))
                };
                format!("{}{}{}", head, args, suffix)
            }
        }
    }

    // ─── Inheritance ────────────────────────────────────────────────────────

    /// Base class of a declared type. Any fragment may carry the base list;
    /// the first entry naming a declared class or a marker is the base.
    pub fn base_type(&self, full_name: &str) -> Option<String> {
        let fragments = self.classes.get(full_name)?;
        fragments.iter().find_map(|fragment| {
            fragment.base_list.iter().find_map(|entry| {
                self.resolve_type(entry, fragment)
                    .filter(|base| self.is_declared(base) || self.registry.contains(base))
            })
        })
    }

    /// Base types from the immediate base outward. Stops at the first type
    /// that is not declared in this compilation, or on a cycle.
    pub fn base_chain(&self, full_name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(full_name.to_string());
        let mut current = self.base_type(full_name);
        while let Some(base) = current {
            if !visited.insert(base.clone()) {
                break;
            }
            current = self.base_type(&base);
            chain.push(base);
        }
        chain
    }

    pub fn classify(&self, class: &ClassSyntax) -> Capability {
        self.registry.classify(&self.base_chain(&class.full_name()))
    }

    pub fn constants_in(&'a self, class: &'a ClassSyntax) -> ConstantContext<'a> {
        ConstantContext {
            compilation: self,
            class,
        }
    }

    fn fragments(&self, full_name: &str) -> &[&'a ClassSyntax] {
        self.classes.get(full_name).map_or(&[], Vec::as_slice)
    }

    fn find_constant_in(&'a self, full_name: &str, name: &str) -> Option<(&'a [Token], ConstantContext<'a>)> {
        self.fragments(full_name).iter().find_map(|&fragment| {
            fragment
                .constants
                .iter()
                .find(|c| c.name == name)
                .map(|c| (c.expression.as_slice(), self.constants_in(fragment)))
        })
    }

    pub fn options(&self) -> &GeneratorOptions {
        self.options
    }
}

/// Constant resolution from inside one class declaration.
#[derive(Clone, Copy)]
pub struct ConstantContext<'a> {
    compilation: &'a Compilation<'a>,
    class: &'a ClassSyntax,
}

impl<'a> ConstantLookup<'a> for ConstantContext<'a> {
    fn find_constant(&self, path: &[String]) -> Option<(&'a [Token], Self)> {
        let (name, qualifier) = path.split_last()?;
        let compilation = self.compilation;

        if qualifier.is_empty() {
            // Own type, then enclosing types, then `using static` imports.
            let mut enclosing = self.class.type_path_parts();
            while !enclosing.is_empty() {
                let owner = crate::syntax::qualify(&self.class.namespace, &enclosing.join("."));
                if let Some(found) = compilation.find_constant_in(&owner, name) {
                    return Some(found);
                }
                enclosing.pop();
            }
            return self.class.usings.iter().find_map(|directive| match directive {
                UsingDirective::Static(owner) => compilation.find_constant_in(owner, name),
                _ => None,
            });
        }

        let owner = compilation.resolve_name(&qualifier.join("."), self.class)?;
        compilation.find_constant_in(&owner, name)
    }
}
