//! Namespace Construction
//!
//! Parses every schema text of one output unit into a single shared set of
//! named type definitions. A field in one file may name a type that only
//! another file of the same unit defines; references are resolved once all
//! texts are registered, so file order never matters for resolution.
//!
//! Re-registering a name with an identical shape is a no-op. Re-registering it
//! with a different shape is an [`Error::IncompatibleDefinition`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::codegen::names::to_pascal_case;
use crate::error::{Error, Result};
use crate::store::SourceSchema;

/// Appended to an alias name that a named type already generates
const ALIAS_SUFFIX: &str = "Schema";

/// Avro primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bytes" => Self::Bytes,
            "string" => Self::String,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
        }
    }
}

/// The type of a field or alias target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Primitive {
        kind: Primitive,
        logical: Option<String>,
    },
    /// Fully qualified name of a definition in the namespace
    Named(String),
    Array(Box<TypeRef>),
    Map(Box<TypeRef>),
    Union(Vec<TypeRef>),
}

impl TypeRef {
    pub fn primitive(kind: Primitive) -> Self {
        TypeRef::Primitive { kind, logical: None }
    }

    /// Named types reachable without passing through an array or map
    pub fn direct_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(false, &mut names);
        names
    }

    /// Every named type mentioned anywhere in this reference
    pub fn all_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(true, &mut names);
        names
    }

    fn collect_names<'a>(&'a self, through_containers: bool, out: &mut Vec<&'a str>) {
        match self {
            TypeRef::Primitive { .. } => {}
            TypeRef::Named(name) => out.push(name),
            TypeRef::Array(inner) | TypeRef::Map(inner) => {
                if through_containers {
                    inner.collect_names(through_containers, out);
                }
            }
            TypeRef::Union(members) => {
                for member in members {
                    member.collect_names(through_containers, out);
                }
            }
        }
    }

    fn resolve_names(&mut self, resolve: &mut impl FnMut(&str) -> Option<String>) -> std::result::Result<(), String> {
        match self {
            TypeRef::Primitive { .. } => Ok(()),
            TypeRef::Named(name) => match resolve(name.as_str()) {
                Some(resolved) => {
                    *name = resolved;
                    Ok(())
                }
                None => Err(name.clone()),
            },
            TypeRef::Array(inner) | TypeRef::Map(inner) => inner.resolve_names(&mut *resolve),
            TypeRef::Union(members) => {
                for member in members {
                    member.resolve_names(&mut *resolve)?;
                }
                Ok(())
            }
        }
    }
}

/// A record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub doc: Option<String>,
    pub ty: TypeRef,
}

/// A named entry of the namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    Record {
        name: String,
        doc: Option<String>,
        fields: Vec<Field>,
    },
    Enum {
        name: String,
        doc: Option<String>,
        symbols: Vec<String>,
    },
    Fixed {
        name: String,
        doc: Option<String>,
        size: usize,
    },
    /// Name given to a top-level schema that is not itself a named type
    PrimitiveAlias { name: String, target: TypeRef },
}

impl TypeDefinition {
    /// Fully qualified name
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Record { name, .. }
            | TypeDefinition::Enum { name, .. }
            | TypeDefinition::Fixed { name, .. }
            | TypeDefinition::PrimitiveAlias { name, .. } => name,
        }
    }

    /// Name without its namespace
    pub fn short_name(&self) -> &str {
        short_name(self.name())
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            TypeDefinition::Record { doc, .. }
            | TypeDefinition::Enum { doc, .. }
            | TypeDefinition::Fixed { doc, .. } => doc.as_deref(),
            TypeDefinition::PrimitiveAlias { .. } => None,
        }
    }

    pub fn kind(&self) -> DefinitionKind {
        match self {
            TypeDefinition::Record { .. } => DefinitionKind::Record,
            TypeDefinition::Enum { .. } => DefinitionKind::Enum,
            TypeDefinition::Fixed { .. } => DefinitionKind::Fixed,
            TypeDefinition::PrimitiveAlias { .. } => DefinitionKind::PrimitiveAlias,
        }
    }

    /// Whether this definition gets its own generated file
    pub fn is_composite(&self) -> bool {
        !matches!(self, TypeDefinition::PrimitiveAlias { .. })
    }

    /// Same kind and same structure. Documentation does not count.
    pub fn same_shape(&self, other: &TypeDefinition) -> bool {
        match (self, other) {
            (
                TypeDefinition::Record { name: a, fields: fa, .. },
                TypeDefinition::Record { name: b, fields: fb, .. },
            ) => {
                a == b
                    && fa.len() == fb.len()
                    && fa.iter().zip(fb).all(|(x, y)| x.name == y.name && x.ty == y.ty)
            }
            (
                TypeDefinition::Enum { name: a, symbols: sa, .. },
                TypeDefinition::Enum { name: b, symbols: sb, .. },
            ) => a == b && sa == sb,
            (
                TypeDefinition::Fixed { name: a, size: sa, .. },
                TypeDefinition::Fixed { name: b, size: sb, .. },
            ) => a == b && sa == sb,
            (
                TypeDefinition::PrimitiveAlias { name: a, target: ta },
                TypeDefinition::PrimitiveAlias { name: b, target: tb },
            ) => a == b && ta == tb,
            _ => false,
        }
    }

    /// Every type reference held by this definition
    pub fn type_refs(&self) -> Vec<&TypeRef> {
        match self {
            TypeDefinition::Record { fields, .. } => fields.iter().map(|f| &f.ty).collect(),
            TypeDefinition::PrimitiveAlias { target, .. } => vec![target],
            TypeDefinition::Enum { .. } | TypeDefinition::Fixed { .. } => Vec::new(),
        }
    }

    fn type_refs_mut(&mut self) -> Vec<&mut TypeRef> {
        match self {
            TypeDefinition::Record { fields, .. } => fields.iter_mut().map(|f| &mut f.ty).collect(),
            TypeDefinition::PrimitiveAlias { target, .. } => vec![target],
            TypeDefinition::Enum { .. } | TypeDefinition::Fixed { .. } => Vec::new(),
        }
    }
}

/// Definition kinds, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Record,
    Enum,
    Fixed,
    PrimitiveAlias,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefinitionKind::Record => "record",
            DefinitionKind::Enum => "enum",
            DefinitionKind::Fixed => "fixed",
            DefinitionKind::PrimitiveAlias => "alias",
        })
    }
}

/// Resolved, immutable set of type definitions for one output unit
#[derive(Debug, Clone)]
pub struct Namespace {
    unit: String,
    sources: Vec<String>,
    types: BTreeMap<String, TypeDefinition>,
}

impl Namespace {
    /// Output unit this namespace belongs to
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Bare filenames of the contributing schemas, in the order they were read
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// All definitions, ordered by qualified name
    pub fn definitions(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Build the namespace for `unit` from its schema texts.
///
/// Texts are registered in the given order; the returned namespace records
/// their filenames in that same order.
pub fn build_namespace(unit: &str, schemas: &[SourceSchema]) -> Result<Namespace> {
    let mut registrar = Registrar::new(unit);

    for schema in schemas {
        debug!(unit, file = %schema.file_name, "registering schema");
        let json: Value = serde_json::from_str(&schema.text).map_err(|e| Error::SchemaParse {
            file: schema.file_name.clone(),
            message: e.to_string(),
        })?;
        registrar.register_top_level(&schema.file_name, &json)?;
    }

    registrar.define_aliases()?;
    let types = registrar.resolve()?;
    Ok(Namespace {
        unit: unit.to_string(),
        sources: schemas.iter().map(|s| s.file_name.clone()).collect(),
        types,
    })
}

/// Mutable state while a unit's texts are being registered
struct Registrar<'u> {
    unit: &'u str,
    types: BTreeMap<String, TypeDefinition>,
    /// Qualified candidate -> name as written, for references that were unqualified
    unqualified: HashMap<String, String>,
    /// Top-level non-named schemas, by file stem, named once every file is in
    aliases: Vec<(String, TypeRef)>,
}

impl<'u> Registrar<'u> {
    fn new(unit: &'u str) -> Self {
        Self {
            unit,
            types: BTreeMap::new(),
            unqualified: HashMap::new(),
            aliases: Vec::new(),
        }
    }

    fn register_top_level(&mut self, file: &str, json: &Value) -> Result<()> {
        let mut parser = Parser { file, registrar: self };
        let ty = parser.parse_type(json, None)?;

        let declares_named = matches!(
            json.get("type").and_then(Value::as_str),
            Some("record" | "error" | "enum" | "fixed")
        );
        if let (TypeRef::Named(name), true) = (&ty, declares_named) {
            // Already registered while parsing
            debug!(unit = self.unit, file, name = %name, "top-level named type");
            return Ok(());
        }

        let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
        self.aliases.push((stem.to_string(), ty));
        Ok(())
    }

    /// Name each top-level alias after its file stem, suffixed with `Schema`
    /// when a named type of the unit already generates that identifier
    fn define_aliases(&mut self) -> Result<()> {
        for (stem, target) in std::mem::take(&mut self.aliases) {
            let mut name = to_pascal_case(&stem);
            while self.ident_taken(&name) {
                name.push_str(ALIAS_SUFFIX);
            }

            debug!(unit = self.unit, stem = %stem, name = %name, "top-level alias");
            self.define(TypeDefinition::PrimitiveAlias { name, target })?;
        }
        Ok(())
    }

    fn ident_taken(&self, ident: &str) -> bool {
        self.types.contains_key(ident)
            || self
                .types
                .values()
                .any(|d| d.is_composite() && to_pascal_case(d.short_name()) == ident)
    }

    fn define(&mut self, definition: TypeDefinition) -> Result<()> {
        match self.types.get(definition.name()) {
            Some(existing) if existing.same_shape(&definition) => Ok(()),
            Some(_) => Err(Error::IncompatibleDefinition {
                name: definition.name().to_string(),
                unit: self.unit.to_string(),
            }),
            None => {
                self.types.insert(definition.name().to_string(), definition);
                Ok(())
            }
        }
    }

    /// Rewrite every reference to a defined qualified name
    fn resolve(self) -> Result<BTreeMap<String, TypeDefinition>> {
        let Registrar { unit, mut types, unqualified, .. } = self;
        let defined: Vec<String> = types.keys().cloned().collect();
        let is_defined = |name: &str| defined.binary_search_by(|d| d.as_str().cmp(name)).is_ok();

        let mut resolve = |name: &str| -> Option<String> {
            if is_defined(name) {
                return Some(name.to_string());
            }
            unqualified
                .get(name)
                .filter(|bare| is_defined(bare.as_str()))
                .cloned()
        };

        for definition in types.values_mut() {
            for ty in definition.type_refs_mut() {
                ty.resolve_names(&mut resolve).map_err(|name| Error::UnresolvedReference {
                    name,
                    unit: unit.to_string(),
                })?;
            }
        }

        Ok(types)
    }
}

/// Walks one schema document, registering named types as it meets them
struct Parser<'a, 'u> {
    file: &'a str,
    registrar: &'a mut Registrar<'u>,
}

impl Parser<'_, '_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::SchemaParse {
            file: self.file.to_string(),
            message: message.into(),
        }
    }

    fn parse_type(&mut self, json: &Value, namespace: Option<&str>) -> Result<TypeRef> {
        match json {
            Value::String(name) => Ok(self.reference(name, namespace)),
            Value::Array(members) => {
                let members = members
                    .iter()
                    .map(|m| self.parse_type(m, namespace))
                    .collect::<Result<Vec<_>>>()?;
                if members.is_empty() {
                    return Err(self.error("union has no members"));
                }
                Ok(TypeRef::Union(members))
            }
            Value::Object(obj) => self.parse_object(obj, namespace),
            other => Err(self.error(format!("unexpected schema value {}", other))),
        }
    }

    fn reference(&mut self, name: &str, namespace: Option<&str>) -> TypeRef {
        if let Some(kind) = Primitive::from_name(name) {
            return TypeRef::primitive(kind);
        }
        match namespace {
            Some(ns) if !name.contains('.') => {
                let candidate = format!("{}.{}", ns, name);
                self.registrar
                    .unqualified
                    .insert(candidate.clone(), name.to_string());
                TypeRef::Named(candidate)
            }
            _ => TypeRef::Named(name.to_string()),
        }
    }

    fn parse_object(&mut self, obj: &Map<String, Value>, namespace: Option<&str>) -> Result<TypeRef> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| self.error("schema object has no \"type\""))?;

        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            nested => return self.parse_type(nested, namespace),
        };

        match type_name {
            "record" | "error" => self.parse_record(obj, namespace),
            "enum" => self.parse_enum(obj, namespace),
            "fixed" => self.parse_fixed(obj, namespace),
            "array" => {
                let items = obj.get("items").ok_or_else(|| self.error("array has no \"items\""))?;
                Ok(TypeRef::Array(Box::new(self.parse_type(items, namespace)?)))
            }
            "map" => {
                let values = obj.get("values").ok_or_else(|| self.error("map has no \"values\""))?;
                Ok(TypeRef::Map(Box::new(self.parse_type(values, namespace)?)))
            }
            other => match Primitive::from_name(other) {
                Some(kind) => Ok(TypeRef::Primitive {
                    kind,
                    logical: obj.get("logicalType").and_then(Value::as_str).map(String::from),
                }),
                None => Ok(self.reference(other, namespace)),
            },
        }
    }

    /// Full name and namespace for a named type declared inside `enclosing`
    fn full_name(&self, obj: &Map<String, Value>, enclosing: Option<&str>) -> Result<(String, Option<String>)> {
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| self.error("named type has no \"name\""))?;

        if let Some((ns, _)) = name.rsplit_once('.') {
            return Ok((name.to_string(), Some(ns.to_string())));
        }

        let namespace = match obj.get("namespace") {
            Some(Value::String(ns)) if ns.is_empty() => None,
            Some(Value::String(ns)) => Some(ns.clone()),
            Some(Value::Null) | None => enclosing.map(String::from),
            Some(_) => return Err(self.error(format!("namespace of {} is not a string", name))),
        };

        let full = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.to_string(),
        };
        Ok((full, namespace))
    }

    fn parse_record(&mut self, obj: &Map<String, Value>, enclosing: Option<&str>) -> Result<TypeRef> {
        let (name, namespace) = self.full_name(obj, enclosing)?;
        let raw_fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| self.error(format!("record {} has no \"fields\" array", name)))?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let field_name = raw
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| self.error(format!("field of {} has no \"name\"", name)))?;
            let field_type = raw
                .get("type")
                .ok_or_else(|| self.error(format!("field {}.{} has no \"type\"", name, field_name)))?;

            fields.push(Field {
                name: field_name.to_string(),
                doc: doc_of(raw.as_object()),
                ty: self.parse_type(field_type, namespace.as_deref())?,
            });
        }

        self.registrar.define(TypeDefinition::Record {
            name: name.clone(),
            doc: doc_of(Some(obj)),
            fields,
        })?;
        Ok(TypeRef::Named(name))
    }

    fn parse_enum(&mut self, obj: &Map<String, Value>, enclosing: Option<&str>) -> Result<TypeRef> {
        let (name, _) = self.full_name(obj, enclosing)?;
        let symbols = obj
            .get("symbols")
            .and_then(Value::as_array)
            .and_then(|symbols| {
                symbols
                    .iter()
                    .map(|s| s.as_str().map(String::from))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| self.error(format!("enum {} needs a \"symbols\" array of strings", name)))?;

        self.registrar.define(TypeDefinition::Enum {
            name: name.clone(),
            doc: doc_of(Some(obj)),
            symbols,
        })?;
        Ok(TypeRef::Named(name))
    }

    fn parse_fixed(&mut self, obj: &Map<String, Value>, enclosing: Option<&str>) -> Result<TypeRef> {
        let (name, _) = self.full_name(obj, enclosing)?;
        let size = obj
            .get("size")
            .and_then(Value::as_u64)
            .and_then(|s| usize::try_from(s).ok())
            .ok_or_else(|| self.error(format!("fixed {} needs a non-negative \"size\"", name)))?;

        self.registrar.define(TypeDefinition::Fixed {
            name: name.clone(),
            doc: doc_of(Some(obj)),
            size,
        })?;
        Ok(TypeRef::Named(name))
    }
}

fn doc_of(obj: Option<&Map<String, Value>>) -> Option<String> {
    obj?.get("doc").and_then(Value::as_str).map(String::from)
}

/// Portion of a qualified name after the last dot
pub fn short_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, short)| short)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(file: &str, text: &str) -> SourceSchema {
        SourceSchema {
            file_name: file.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_single_record() {
        let ns = build_namespace(
            "orders",
            &[source(
                "orders.avsc",
                r#"{"type":"record","name":"Order","namespace":"shop","fields":[
                    {"name":"id","type":"int"},
                    {"name":"total","type":"double"}]}"#,
            )],
        )
        .unwrap();

        assert_eq!(ns.len(), 1);
        assert_eq!(ns.sources(), ["orders.avsc"]);
        match ns.get("shop.Order").unwrap() {
            TypeDefinition::Record { fields, .. } => {
                assert_eq!(fields[0].name, "id");
                assert_eq!(fields[0].ty, TypeRef::primitive(Primitive::Int));
                assert_eq!(fields[1].ty, TypeRef::primitive(Primitive::Double));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_types_inherit_namespace() {
        let ns = build_namespace(
            "cards",
            &[source(
                "cards.avsc",
                r#"{"type":"record","name":"Card","namespace":"deck","fields":[
                    {"name":"suit","type":{"type":"enum","name":"Suit","symbols":["SPADES","HEARTS"]}},
                    {"name":"hash","type":{"type":"fixed","name":"Hash","namespace":"crypto","size":16}},
                    {"name":"next","type":["null","Card"]},
                    {"name":"tags","type":{"type":"map","values":{"type":"array","items":"string"}}}]}"#,
            )],
        )
        .unwrap();

        let names: Vec<_> = ns.definitions().map(|d| d.name()).collect();
        assert_eq!(names, vec!["crypto.Hash", "deck.Card", "deck.Suit"]);

        match ns.get("deck.Card").unwrap() {
            TypeDefinition::Record { fields, .. } => {
                assert_eq!(
                    fields[2].ty,
                    TypeRef::Union(vec![
                        TypeRef::primitive(Primitive::Null),
                        TypeRef::Named("deck.Card".to_string()),
                    ])
                );
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_cross_file_reference_in_any_order() {
        let event = r#"{"type":"record","name":"Event","namespace":"audit","fields":[{"name":"actor","type":"Actor"}]}"#;
        let actor = r#"{"type":"record","name":"Actor","namespace":"audit","fields":[{"name":"id","type":"string"}]}"#;

        for order in [[event, actor], [actor, event]] {
            let ns = build_namespace("events", &[source("a.avsc", order[0]), source("b.avsc", order[1])]).unwrap();
            assert_eq!(ns.len(), 2);
            assert_eq!(
                ns.get("audit.Event").unwrap().type_refs()[0],
                &TypeRef::Named("audit.Actor".to_string())
            );
        }
    }

    #[test]
    fn test_unqualified_reference_falls_back_to_null_namespace() {
        let ns = build_namespace(
            "events",
            &[
                source("event.avsc", r#"{"type":"record","name":"Event","namespace":"audit","fields":[{"name":"actor","type":"Actor"}]}"#),
                source("actor.avsc", r#"{"type":"record","name":"Actor","fields":[]}"#),
            ],
        )
        .unwrap();
        assert_eq!(
            ns.get("audit.Event").unwrap().type_refs()[0],
            &TypeRef::Named("Actor".to_string())
        );
    }

    #[test]
    fn test_identical_redefinition_is_kept_once() {
        let foo = r#"{"type":"record","name":"Foo","fields":[{"name":"a","type":"int","doc":"first"}]}"#;
        let foo_again = r#"{"type":"record","name":"Foo","doc":"same shape","fields":[{"name":"a","type":"int"}]}"#;
        let ns = build_namespace("u", &[source("one.avsc", foo), source("two.avsc", foo_again)]).unwrap();
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.get("Foo").unwrap().doc(), None);
        assert_eq!(ns.sources(), ["one.avsc", "two.avsc"]);
    }

    #[test]
    fn test_conflicting_redefinition_fails() {
        let foo = r#"{"type":"record","name":"Foo","fields":[{"name":"a","type":"int"}]}"#;
        let other_foo = r#"{"type":"record","name":"Foo","fields":[{"name":"a","type":"long"}]}"#;
        let reordered = r#"{"type":"record","name":"Foo","fields":[{"name":"b","type":"int"},{"name":"a","type":"int"}]}"#;
        let as_enum = r#"{"type":"enum","name":"Foo","symbols":["A"]}"#;

        for conflicting in [other_foo, reordered, as_enum] {
            match build_namespace("u", &[source("one.avsc", foo), source("two.avsc", conflicting)]) {
                Err(Error::IncompatibleDefinition { name, unit }) => {
                    assert_eq!(name, "Foo");
                    assert_eq!(unit, "u");
                }
                other => panic!("expected IncompatibleDefinition, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unresolved_reference() {
        let err = build_namespace(
            "u",
            &[source("a.avsc", r#"{"type":"record","name":"A","namespace":"x","fields":[{"name":"b","type":"B"}]}"#)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { ref name, .. } if name == "x.B"));
    }

    #[test]
    fn test_top_level_primitive_becomes_alias() {
        let ns = build_namespace(
            "ids",
            &[source("user_id.avsc", r#"{"type":"string","logicalType":"uuid"}"#)],
        )
        .unwrap();
        match ns.get("UserId").unwrap() {
            TypeDefinition::PrimitiveAlias { target, .. } => assert_eq!(
                target,
                &TypeRef::Primitive {
                    kind: Primitive::String,
                    logical: Some("uuid".to_string())
                }
            ),
            other => panic!("expected alias, got {:?}", other),
        }
    }

    #[test]
    fn test_alias_gives_way_to_record_of_same_name() {
        let nullable = r#"["null",{"type":"record","name":"Order","fields":[{"name":"id","type":"int"}]}]"#;
        let ns = build_namespace("order", &[source("order.avsc", nullable)]).unwrap();

        assert!(matches!(ns.get("Order"), Some(TypeDefinition::Record { .. })));
        match ns.get("OrderSchema").unwrap() {
            TypeDefinition::PrimitiveAlias { target, .. } => assert_eq!(
                target,
                &TypeRef::Union(vec![
                    TypeRef::primitive(Primitive::Null),
                    TypeRef::Named("Order".to_string()),
                ])
            ),
            other => panic!("expected alias, got {:?}", other),
        }
    }

    #[test]
    fn test_alias_gives_way_to_namespaced_record_in_later_file() {
        let ns = build_namespace(
            "order",
            &[
                source("order.avsc", r#"["null","shop.Order"]"#),
                source("z_order.avsc", r#"{"type":"record","name":"Order","namespace":"shop","fields":[]}"#),
            ],
        )
        .unwrap();

        let names: Vec<_> = ns.definitions().map(|d| d.name()).collect();
        assert_eq!(names, vec!["OrderSchema", "shop.Order"]);
    }

    #[test]
    fn test_malformed_schemas() {
        let cases = [
            "{not json",
            r#"{"name":"NoType"}"#,
            r#"{"type":"record","name":"R"}"#,
            r#"{"type":"enum","name":"E","symbols":[1]}"#,
            r#"{"type":"fixed","name":"F","size":-1}"#,
            r#"{"type":"array"}"#,
            "[]",
            "42",
        ];
        for text in cases {
            match build_namespace("u", &[source("bad.avsc", text)]) {
                Err(Error::SchemaParse { file, .. }) => assert_eq!(file, "bad.avsc"),
                other => panic!("expected SchemaParse for {}, got {:?}", text, other),
            }
        }
    }
}
