//! Data types: types tagged `# data: name=..., ver=...`.
//!
//! A data type gets a wire identity and a schema. Boxed data types are
//! tuples or records of serializable types; union data types need every
//! case to be a data type as well. Generic data types are not supported.

use std::collections::BTreeMap;

use fjord_common::Symbol;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::builtins::{ARRAY, BOOL, BYTES, FLOAT, INT, LIST, MAYBE, STRING};
use crate::error::{KmdError, KmdErrorKind};
use crate::ty::{ordered_fields, GenericType, Type, TypeDef, TypeRegistry, TypeRepr};

const PRIMITIVES: &[&str] = &[BOOL, FLOAT, INT, STRING, BYTES, "Int32", "Uint32", "Int64", "Uint64"];

/// The wire identity of a data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DataId {
    pub name: String,
    pub version: String,
}

impl std::fmt::Display for DataId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// How a value of some type goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataType {
    Primitive { name: String },
    Array { element: Box<DataType> },
    Optional { element: Box<DataType> },
    /// Another data type, by identity.
    Ref { id: DataId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSchema {
    Tuple { elements: Vec<DataType> },
    Record { fields: BTreeMap<String, DataType> },
    /// Case identities, in case order.
    Union { cases: Vec<DataId> },
}

/// Identities and schemas of all data types of a registry.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    pub ids: BTreeMap<Symbol, DataId>,
    pub schemas: BTreeMap<DataId, DataSchema>,
}

impl DataTable {
    pub fn schema_of(&self, name: &Symbol) -> Option<&DataSchema> {
        self.schemas.get(self.ids.get(name)?)
    }
}

/// Check every data-tagged type of `registry` and derive its schema.
/// Errors come with the type they were found on.
pub fn check_data_types(registry: &TypeRegistry) -> (DataTable, Vec<(Symbol, KmdError)>) {
    let mut table = DataTable::default();
    let mut errors = Vec::new();
    let mut owners: FxHashMap<DataId, &Symbol> = FxHashMap::default();
    let tagged: Vec<(&Symbol, &GenericType)> = registry
        .sorted()
        .into_iter()
        .filter(|(_, g)| g.tags.data.is_some())
        .collect();

    for (name, g) in &tagged {
        let Some(config) = &g.tags.data else { continue };
        if matches!(g.def, TypeDef::Native) {
            errors.push(((*name).clone(), KmdError::new(KmdErrorKind::OnNative, g.span)));
            continue;
        }
        if !g.params.is_empty() {
            errors.push(((*name).clone(), KmdError::new(KmdErrorKind::OnGeneric, g.span)));
            continue;
        }
        let id = DataId {
            name: config.name.clone(),
            version: config.version.clone(),
        };
        if owners.insert(id.clone(), name).is_some() {
            let err = KmdError::new(KmdErrorKind::DuplicateType { id: id.to_string() }, g.span);
            errors.push(((*name).clone(), err));
            continue;
        }
        table.ids.insert((*name).clone(), id);
    }

    for (name, g) in &tagged {
        let Some(id) = table.ids.get(*name).cloned() else { continue };
        match schema_of(g, &table.ids) {
            Ok(schema) => {
                tracing::trace!(%name, %id, "data schema derived");
                table.schemas.insert(id, schema);
            }
            Err(kind) => errors.push(((*name).clone(), KmdError::new(kind, g.span))),
        }
    }
    (table, errors)
}

fn schema_of(g: &GenericType, ids: &BTreeMap<Symbol, DataId>) -> Result<DataSchema, KmdErrorKind> {
    match &g.def {
        TypeDef::Boxed(boxed) => match &boxed.inner {
            Type::Anonymous(TypeRepr::Unit) => Ok(DataSchema::Tuple { elements: vec![] }),
            Type::Anonymous(TypeRepr::Tuple(elements)) => {
                let elements = elements
                    .iter()
                    .enumerate()
                    .map(|(index, t)| {
                        data_type(t, ids).ok_or(KmdErrorKind::ElementNotSerializable { index })
                    })
                    .collect::<Result<_, _>>()?;
                Ok(DataSchema::Tuple { elements })
            }
            Type::Anonymous(TypeRepr::Bundle(fields)) => {
                let fields = ordered_fields(fields)
                    .into_iter()
                    .map(|(name, field)| {
                        data_type(&field.ty, ids)
                            .map(|t| (name.clone(), t))
                            .ok_or_else(|| KmdErrorKind::FieldNotSerializable { name: name.clone() })
                    })
                    .collect::<Result<_, _>>()?;
                Ok(DataSchema::Record { fields })
            }
            // Any other inner type is a one-element tuple.
            other => {
                let element =
                    data_type(other, ids).ok_or(KmdErrorKind::ElementNotSerializable { index: 0 })?;
                Ok(DataSchema::Tuple { elements: vec![element] })
            }
        },
        TypeDef::Union(cases) => {
            let cases = cases
                .iter()
                .map(|c| {
                    ids.get(&c.name).cloned().ok_or_else(|| KmdErrorKind::CaseNotSerializable {
                        name: c.name.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?;
            Ok(DataSchema::Union { cases })
        }
        TypeDef::Native => Err(KmdErrorKind::OnNative),
    }
}

/// The wire form of `t`, if it has one.
pub fn data_type(t: &Type, ids: &BTreeMap<Symbol, DataId>) -> Option<DataType> {
    let Type::Named { name, args } = t else {
        return None;
    };
    if name.is_core() && args.is_empty() && PRIMITIVES.contains(&name.name.as_str()) {
        return Some(DataType::Primitive {
            name: name.name.clone(),
        });
    }
    if name.is_core() && args.len() == 1 {
        let element = Box::new(data_type(&args[0], ids)?);
        match name.name.as_str() {
            LIST | ARRAY => return Some(DataType::Array { element }),
            MAYBE => return Some(DataType::Optional { element }),
            _ => return None,
        }
    }
    if !args.is_empty() {
        return None;
    }
    ids.get(name).map(|id| DataType::Ref { id: id.clone() })
}

#[cfg(test)]
mod tests {
    use fjord_ast::build::*;
    use fjord_ast::item::Module;

    use super::*;
    use crate::builtins::core_module;
    use crate::config::Limits;
    use crate::declare::declare_types;

    fn check(m: Module) -> (DataTable, Vec<String>) {
        let declared = declare_types(&[&core_module(), &m], &Limits::default());
        assert!(declared.errors.is_empty(), "{:?}", declared.errors);
        let (table, errors) = check_data_types(&declared.registry);
        (table, errors.iter().map(|(_, e)| e.to_string()).collect())
    }

    #[test]
    fn records_and_unions() {
        let m = module("Net")
            .with_type(
                boxed(
                    "Point",
                    vec![],
                    bundle_ty(vec![("x", ty("Float")), ("tags", ty_args("List", vec![ty("String")]))]),
                )
                .tagged("# data: name=point, ver=v1"),
            )
            .with_type(
                union(
                    "Msg",
                    vec![],
                    vec![
                        boxed("Move", vec![], ty("Point")).tagged("# data: name=move, ver=v1"),
                        unit_boxed("Stop").tagged("# data: name=stop, ver=v1"),
                    ],
                )
                .tagged("# data: name=msg, ver=v1"),
            );
        let (table, errors) = check(m);
        assert!(errors.is_empty(), "{:?}", errors);
        let point = table.schema_of(&Symbol::new("Net", "Point")).unwrap();
        insta::assert_snapshot!(
            serde_json::to_string(point).unwrap(),
            @r#"{"kind":"record","fields":{"tags":{"kind":"array","element":{"kind":"primitive","name":"String"}},"x":{"kind":"primitive","name":"Float"}}}"#
        );
        match table.schema_of(&Symbol::new("Net", "Msg")).unwrap() {
            DataSchema::Union { cases } => {
                let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["move", "stop"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejected_declarations() {
        let m = module("Net")
            .with_type(native("Socket", vec![]).tagged("# data: name=socket, ver=v1"))
            .with_type(boxed("Box", vec![param("T")], ty("T")).tagged("# data: name=box, ver=v1"))
            .with_type(unit_boxed("A").tagged("# data: name=same, ver=v1"))
            .with_type(unit_boxed("B").tagged("# data: name=same, ver=v1"));
        let (_, errors) = check(m);
        assert_eq!(
            errors,
            vec![
                "duplicate data type id: same:v1",
                "generic type cannot be a data type",
                "native type cannot be a data type",
            ]
        );
    }

    #[test]
    fn contents_must_be_serializable() {
        let m = module("Net")
            .with_type(unit_boxed("Plain"))
            .with_type(
                boxed("Pair", vec![], tuple_ty(vec![ty("Int"), ty("Plain")]))
                    .tagged("# data: name=pair, ver=v1"),
            )
            .with_type(
                boxed("Rec", vec![], bundle_ty(vec![("f", func_ty(ty("Int"), ty("Int")))]))
                    .tagged("# data: name=rec, ver=v1"),
            )
            .with_type(
                union(
                    "Either",
                    vec![],
                    vec![unit_boxed("L"), unit_boxed("R").tagged("# data: name=r, ver=v1")],
                )
                .tagged("# data: name=either, ver=v1"),
            );
        let (_, errors) = check(m);
        assert_eq!(
            errors,
            vec![
                "case type Net::L is not a data type",
                "tuple element #1 is not serializable",
                "field f is not serializable",
            ]
        );
    }
}
