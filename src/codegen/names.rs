//! Name Resolution Pass
//!
//! Maps every qualified Avro name of a namespace to the Rust identifier and
//! module file it is generated into. Two definitions landing on the same file
//! is an error rather than something to disambiguate silently: generated
//! filenames must be derivable from the type name alone.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::namespace::{Namespace, TypeDefinition};

/// Name of the per-unit scaffold module
pub const SCAFFOLD_MODULE: &str = "mod";

/// Extension of generated files
pub const GENERATED_EXTENSION: &str = "rs";

/// Appended to a record's identifier to name its codec
pub const CODEC_SUFFIX: &str = "Codec";

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "abstract", "become", "box", "do", "final", "macro", "override",
    "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/// Identifiers that cannot be raw identifiers either
const NON_RAW_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

/// Generated identity of one definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Rust type identifier, PascalCase
    pub type_ident: String,
    /// Module name, snake_case (also the file stem)
    pub module: String,
}

impl ResolvedName {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.module, GENERATED_EXTENSION)
    }

    /// Module name as it must be written in a `mod` declaration
    pub fn module_ident(&self) -> String {
        escape_keyword(&self.module)
    }
}

/// Qualified name -> generated identity, for one namespace
#[derive(Debug, Clone)]
pub struct NameTable {
    resolved: BTreeMap<String, ResolvedName>,
}

impl NameTable {
    /// Resolve every definition of `namespace`, failing on file collisions
    pub fn build(namespace: &Namespace) -> Result<Self> {
        let mut resolved = BTreeMap::new();
        let mut by_module: HashMap<String, String> = HashMap::new();
        by_module.insert(SCAFFOLD_MODULE.to_string(), format!("{}.{}", SCAFFOLD_MODULE, GENERATED_EXTENSION));
        // Every identifier the scaffold exports, aliases and record codecs included
        let mut by_ident: HashMap<String, String> = HashMap::new();

        for definition in namespace.definitions() {
            let type_ident = to_pascal_case(definition.short_name());
            let module = to_snake_case(&type_ident);

            let mut idents = vec![type_ident.clone()];
            if let TypeDefinition::Record { .. } = definition {
                idents.push(format!("{}{}", type_ident, CODEC_SUFFIX));
            }
            for ident in idents {
                if let Some(first) = by_ident.get(&ident) {
                    return Err(Error::TypeNameCollision {
                        unit: namespace.unit().to_string(),
                        ident,
                        first: first.clone(),
                        second: definition.name().to_string(),
                    });
                }
                by_ident.insert(ident, definition.name().to_string());
            }

            // Aliases live in the scaffold and claim no file of their own
            if definition.is_composite() {
                if let Some(first) = by_module.get(&module) {
                    return Err(Error::FileNameCollision {
                        unit: namespace.unit().to_string(),
                        file: format!("{}.{}", module, GENERATED_EXTENSION),
                        first: first.clone(),
                        second: definition.name().to_string(),
                    });
                }
                by_module.insert(module.clone(), definition.name().to_string());
            }

            resolved.insert(definition.name().to_string(), ResolvedName { type_ident, module });
        }

        Ok(Self { resolved })
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedName> {
        self.resolved.get(name)
    }

    /// Rust identifier for `name`, falling back to its PascalCase short name
    pub fn type_ident(&self, name: &str) -> String {
        self.get(name)
            .map(|r| r.type_ident.clone())
            .unwrap_or_else(|| to_pascal_case(crate::namespace::short_name(name)))
    }
}

/// Convert to snake_case, splitting on separators and case boundaries.
///
/// Runs of capitals are kept together as one word: `HTTPRequest` -> `http_request`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '.' || c == '_' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            continue;
        }

        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map_or(false, |n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }

    let trimmed = result.trim_end_matches('_');
    if trimmed.is_empty() {
        return "_".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{}", trimmed);
    }
    trimmed.to_string()
}

/// Convert to PascalCase.
///
/// Names without separators that already start upper-case are kept as is;
/// otherwise each word is capitalized and the rest lower-cased.
pub fn to_pascal_case(s: &str) -> String {
    let has_separator = s.contains(&['_', '-', ' ', '.'][..]);
    let all_upper = s.chars().all(|c| !c.is_lowercase());

    if !has_separator && !all_upper {
        let mut chars = s.chars();
        let pascal: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        return prefix_digit(pascal);
    }

    let pascal: String = s
        .split(&['_', '-', ' ', '.'][..])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    prefix_digit(pascal)
}

fn prefix_digit(name: String) -> String {
    if name.is_empty() {
        "_".to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", name)
    } else {
        name
    }
}

pub fn is_keyword(ident: &str) -> bool {
    KEYWORDS.contains(&ident)
}

/// Escape an identifier that collides with a Rust keyword
pub fn escape_keyword(ident: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&ident) {
        format!("{}_", ident)
    } else if is_keyword(ident) {
        format!("r#{}", ident)
    } else {
        ident.to_string()
    }
}
