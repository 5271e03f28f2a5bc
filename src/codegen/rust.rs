//! Rust Code Emitter
//!
//! Generates Rust source for the definitions of one namespace.
//!
//! Key constraints:
//! - Every type file refers to sibling types through `super::`, which the
//!   scaffold makes valid by re-exporting each generated type
//! - Inline references that close a cycle are boxed, using the context's
//!   SCC analysis
//! - Unions other than `[null, T]` become untagged enums emitted next to the
//!   type that uses them

use std::fmt::Write;

use crate::namespace::{Primitive, TypeDefinition, TypeRef};

use super::names::{escape_keyword, to_pascal_case, to_snake_case, CODEC_SUFFIX};
use super::CodegenContext;

/// Largest fixed size still emitted as an array (serde's array impl limit)
const MAX_ARRAY_FIXED: usize = 32;

const SERDE_IMPORT: &str = "use serde::{Deserialize, Serialize};\n";

// =============================================================================
// Type Rendering
// =============================================================================

/// Renders type references for one owning definition, collecting the union
/// enums it needs along the way
struct TypeRenderer<'c, 'ns> {
    ctx: &'c CodegenContext<'ns>,
    /// Qualified name of the definition being emitted
    owner: &'c str,
    /// Path prefix for sibling types
    prefix: &'static str,
    unions: Vec<String>,
}

impl<'c, 'ns> TypeRenderer<'c, 'ns> {
    fn new(ctx: &'c CodegenContext<'ns>, owner: &'c str, prefix: &'static str) -> Self {
        Self {
            ctx,
            owner,
            prefix,
            unions: Vec::new(),
        }
    }

    /// `hint` names any union enum this reference needs; `inline` is false
    /// once the reference sits behind a Vec or HashMap
    fn render(&mut self, ty: &TypeRef, hint: &str, inline: bool) -> String {
        match ty {
            TypeRef::Primitive { kind, .. } => primitive_type(*kind).to_string(),
            TypeRef::Named(name) => {
                let ident = format!("{}{}", self.prefix, self.ctx.names().type_ident(name));
                if inline && self.ctx.cycles().needs_boxing(self.owner, name) {
                    format!("Box<{}>", ident)
                } else {
                    ident
                }
            }
            TypeRef::Array(items) => {
                format!("Vec<{}>", self.render(items, &format!("{}Item", hint), false))
            }
            TypeRef::Map(values) => format!(
                "std::collections::HashMap<String, {}>",
                self.render(values, &format!("{}Value", hint), false)
            ),
            TypeRef::Union(members) => self.render_union(members, hint, inline),
        }
    }

    fn render_union(&mut self, members: &[TypeRef], hint: &str, inline: bool) -> String {
        let has_null = members.iter().any(is_null);
        let non_null: Vec<&TypeRef> = members.iter().filter(|m| !is_null(m)).collect();

        let inner = match non_null.as_slice() {
            [] => return "()".to_string(),
            [single] => self.render(single, hint, inline),
            many => {
                self.emit_union_enum(hint, many, inline);
                hint.to_string()
            }
        };

        if has_null {
            format!("Option<{}>", inner)
        } else {
            inner
        }
    }

    fn emit_union_enum(&mut self, ident: &str, members: &[&TypeRef], inline: bool) {
        let mut variants: Vec<String> = Vec::with_capacity(members.len());
        let mut body = String::new();

        for member in members {
            let mut variant = self.variant_name(member);
            if variants.contains(&variant) {
                variant = format!("{}{}", variant, variants.len());
            }
            let ty = self.render(member, &format!("{}{}", ident, variant), inline);
            let _ = writeln!(body, "    {}({}),", variant, ty);
            variants.push(variant);
        }

        let mut out = String::new();
        out.push('\n');
        out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        out.push_str("#[serde(untagged)]\n");
        let _ = writeln!(out, "pub enum {} {{", ident);
        out.push_str(&body);
        out.push_str("}\n");
        self.unions.push(out);
    }

    fn variant_name(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Primitive { kind, .. } => to_pascal_case(kind.name()),
            TypeRef::Named(name) => self.ctx.names().type_ident(name),
            TypeRef::Array(_) => "Array".to_string(),
            TypeRef::Map(_) => "Map".to_string(),
            TypeRef::Union(_) => "Union".to_string(),
        }
    }

    fn finish(self) -> String {
        self.unions.concat()
    }
}

fn is_null(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Primitive { kind: Primitive::Null, .. })
}

fn primitive_type(kind: Primitive) -> &'static str {
    match kind {
        Primitive::Null => "()",
        Primitive::Boolean => "bool",
        Primitive::Int => "i32",
        Primitive::Long => "i64",
        Primitive::Float => "f32",
        Primitive::Double => "f64",
        Primitive::Bytes => "Vec<u8>",
        Primitive::String => "String",
    }
}

fn push_doc(out: &mut String, doc: Option<&str>, indent: &str) {
    if let Some(doc) = doc {
        for line in doc.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                let _ = writeln!(out, "{}///", indent);
            } else {
                let _ = writeln!(out, "{}/// {}", indent, line);
            }
        }
    }
}

/// Serde rename for an identifier that does not serialize as `schema_name`.
/// Raw identifiers serialize without their `r#` prefix.
fn push_rename(out: &mut String, ident: &str, schema_name: &str) {
    if ident.strip_prefix("r#").unwrap_or(ident) != schema_name {
        let _ = writeln!(out, "    #[serde(rename = {:?})]", schema_name);
    }
}

fn push_schema_name(out: &mut String, name: &str) {
    out.push_str("    /// Fully qualified schema name\n");
    let _ = writeln!(out, "    pub const SCHEMA_NAME: &'static str = {:?};", name);
}

// =============================================================================
// Record Emission
// =============================================================================

/// Emit a record as a serde struct plus its JSON codec
pub fn emit_record(definition: &TypeDefinition, ctx: &CodegenContext) -> String {
    let TypeDefinition::Record { name, doc, fields } = definition else {
        return String::new();
    };
    let ident = ctx.names().type_ident(name);
    let mut renderer = TypeRenderer::new(ctx, name, "super::");

    let mut body = String::new();
    for field in fields {
        let field_ident = escape_keyword(&to_snake_case(&field.name));
        let hint = format!("{}{}", ident, to_pascal_case(&field.name));
        let ty = renderer.render(&field.ty, &hint, true);

        push_doc(&mut body, field.doc.as_deref(), "    ");
        push_rename(&mut body, &field_ident, &field.name);
        let _ = writeln!(body, "    pub {}: {},", field_ident, ty);
    }
    let unions = renderer.finish();

    let mut out = String::new();
    out.push_str(ctx.header());
    out.push('\n');
    out.push_str(SERDE_IMPORT);
    out.push('\n');
    push_doc(&mut out, doc.as_deref(), "");
    out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
    let _ = writeln!(out, "pub struct {} {{", ident);
    out.push_str(&body);
    out.push_str("}\n\n");

    let _ = writeln!(out, "impl {} {{", ident);
    push_schema_name(&mut out, name);
    out.push_str("}\n\n");

    emit_codec(&mut out, &ident);
    out.push_str(&unions);
    out
}

fn emit_codec(out: &mut String, ident: &str) {
    let _ = writeln!(out, "/// JSON codec for [`{}`]", ident);
    out.push_str("#[derive(Debug, Clone, Copy, Default)]\n");
    let _ = writeln!(out, "pub struct {}{};\n", ident, CODEC_SUFFIX);
    let _ = writeln!(out, "impl {}{} {{", ident, CODEC_SUFFIX);
    let _ = writeln!(
        out,
        "    pub fn encode(&self, value: &{}) -> Result<Vec<u8>, serde_json::Error> {{",
        ident
    );
    out.push_str("        serde_json::to_vec(value)\n");
    out.push_str("    }\n\n");
    let _ = writeln!(
        out,
        "    pub fn decode(&self, data: &[u8]) -> Result<{}, serde_json::Error> {{",
        ident
    );
    out.push_str("        serde_json::from_slice(data)\n");
    out.push_str("    }\n");
    out.push_str("}\n");
}

// =============================================================================
// Enum Emission
// =============================================================================

pub fn emit_enum(definition: &TypeDefinition, ctx: &CodegenContext) -> String {
    let TypeDefinition::Enum { name, doc, symbols } = definition else {
        return String::new();
    };
    let ident = ctx.names().type_ident(name);

    let mut out = String::new();
    out.push_str(ctx.header());
    out.push('\n');
    out.push_str(SERDE_IMPORT);
    out.push('\n');
    push_doc(&mut out, doc.as_deref(), "");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]\n");
    let _ = writeln!(out, "pub enum {} {{", ident);
    for symbol in symbols {
        let variant = escape_keyword(&to_pascal_case(symbol));
        push_rename(&mut out, &variant, symbol);
        let _ = writeln!(out, "    {},", variant);
    }
    out.push_str("}\n\n");

    let _ = writeln!(out, "impl {} {{", ident);
    push_schema_name(&mut out, name);
    out.push('\n');
    out.push_str("    /// Symbols in declaration order\n");
    let quoted: Vec<String> = symbols.iter().map(|s| format!("{:?}", s)).collect();
    let _ = writeln!(
        out,
        "    pub const SYMBOLS: &'static [&'static str] = &[{}];",
        quoted.join(", ")
    );
    out.push_str("}\n");
    out
}

// =============================================================================
// Fixed Emission
// =============================================================================

pub fn emit_fixed(definition: &TypeDefinition, ctx: &CodegenContext) -> String {
    let TypeDefinition::Fixed { name, doc, size } = definition else {
        return String::new();
    };
    let ident = ctx.names().type_ident(name);

    let mut out = String::new();
    out.push_str(ctx.header());
    out.push('\n');
    out.push_str(SERDE_IMPORT);
    out.push('\n');
    push_doc(&mut out, doc.as_deref(), "");
    if *size <= MAX_ARRAY_FIXED {
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]\n");
        let _ = writeln!(out, "pub struct {}(pub [u8; {}]);\n", ident, size);
    } else {
        out.push_str("#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]\n");
        let _ = writeln!(out, "pub struct {}(pub Vec<u8>);\n", ident);
    }

    let _ = writeln!(out, "impl {} {{", ident);
    push_schema_name(&mut out, name);
    out.push('\n');
    out.push_str("    /// Size in bytes\n");
    let _ = writeln!(out, "    pub const SIZE: usize = {};", size);
    out.push_str("}\n");
    out
}

// =============================================================================
// Scaffold Emission
// =============================================================================

/// Emit the unit's `mod.rs`: module declarations, re-exports and aliases
pub fn emit_scaffold(ctx: &CodegenContext) -> String {
    let namespace = ctx.namespace();
    let unit = namespace.unit();

    let mut modules = String::new();
    let mut exports = String::new();
    let mut aliases = String::new();
    let mut unions = String::new();

    for definition in namespace.definitions() {
        let Some(resolved) = ctx.names().get(definition.name()) else {
            continue;
        };
        let ident = &resolved.type_ident;

        match definition {
            TypeDefinition::Record { .. } => {
                let _ = writeln!(modules, "pub mod {};", resolved.module_ident());
                let _ = writeln!(
                    exports,
                    "pub use {}::{{{}, {}{}}};",
                    resolved.module_ident(),
                    ident,
                    ident,
                    CODEC_SUFFIX
                );
            }
            TypeDefinition::Enum { .. } | TypeDefinition::Fixed { .. } => {
                let _ = writeln!(modules, "pub mod {};", resolved.module_ident());
                let _ = writeln!(exports, "pub use {}::{};", resolved.module_ident(), ident);
            }
            TypeDefinition::PrimitiveAlias { name, target } => {
                let mut renderer = TypeRenderer::new(ctx, name, "");
                let ty = renderer.render(target, &format!("{}Union", ident), true);
                let _ = writeln!(aliases, "pub type {} = {};", ident, ty);
                unions.push_str(&renderer.finish());
            }
        }
    }

    let mut out = String::new();
    out.push_str(ctx.header());
    out.push('\n');
    let _ = writeln!(out, "//! Generated bindings for the `{}` unit.\n", unit);
    out.push_str("/// Output unit these bindings were generated for\n");
    let _ = writeln!(out, "pub const PACKAGE: &str = {:?};", unit);

    for section in [&modules, &exports, &aliases] {
        if !section.is_empty() {
            out.push('\n');
            out.push_str(section);
        }
    }
    if !unions.is_empty() {
        out.push('\n');
        out.push_str("use serde::{Deserialize, Serialize};\n");
        out.push_str(&unions);
    }
    out
}
