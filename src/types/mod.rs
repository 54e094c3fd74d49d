//! Type descriptions for values crossing the engine boundary.
//!
//! [`Type`] is the resolved form used in signatures and introspection;
//! [`TypeExpr`] is the small user-facing DSL a host writes when declaring
//! function arguments or aliases. A [`TypeRegistry`] turns one into the
//! other and owns the alias table.

pub mod registry;


pub use registry::TypeRegistry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The shape a value must have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Str,
    Bool,
    Num,
    Time,
    /// An unresolved generic placeholder.
    Var(String),
    List(Box<Type>),
    Record {
        /// Open records tolerate fields beyond the declared ones; closed
        /// records permit only what is declared. Independent of per-field
        /// optionality.
        extensible: bool,
        fields: BTreeMap<String, Field>,
    },
    Block {
        params: Vec<Type>,
        ret: Box<Type>,
    },
}

/// One declared field of a record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub optional: bool,
    pub ty: Type,
}

/// A user-supplied type description, resolved by a [`TypeRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A primitive name (`"string"`, `"boolean"`, `"number"`, `"time"`,
    /// `"date"`) or a previously defined alias. Case-sensitive.
    Name(String),
    Var(String),
    List(Box<TypeExpr>),
    Record {
        extensible: bool,
        fields: Vec<(String, FieldExpr)>,
    },
    Block {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
}

/// A field description inside a record expression. Plain values convert to
/// required non-optional fields; wrap with [`optional`] to relax that.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    pub optional: bool,
    pub expr: TypeExpr,
}

impl From<&str> for TypeExpr {
    fn from(name: &str) -> Self {
        TypeExpr::Name(name.to_owned())
    }
}

impl From<String> for TypeExpr {
    fn from(name: String) -> Self {
        TypeExpr::Name(name)
    }
}

impl From<TypeExpr> for FieldExpr {
    fn from(expr: TypeExpr) -> Self {
        FieldExpr {
            optional: false,
            expr,
        }
    }
}

impl From<&str> for FieldExpr {
    fn from(name: &str) -> Self {
        FieldExpr::from(TypeExpr::from(name))
    }
}

impl From<String> for FieldExpr {
    fn from(name: String) -> Self {
        FieldExpr::from(TypeExpr::from(name))
    }
}

/// A homogeneous list of `elem`.
pub fn list_of(elem: impl Into<TypeExpr>) -> TypeExpr {
    TypeExpr::List(Box::new(elem.into()))
}

/// A named type variable.
pub fn variable(name: &str) -> TypeExpr {
    TypeExpr::Var(name.to_owned())
}

/// A callback type taking `params` and returning `ret`.
pub fn block(
    params: impl IntoIterator<Item = TypeExpr>,
    ret: impl Into<TypeExpr>,
) -> TypeExpr {
    TypeExpr::Block {
        params: params.into_iter().collect(),
        ret: Box::new(ret.into()),
    }
}

/// A closed record with the given fields.
pub fn record<K, F>(fields: impl IntoIterator<Item = (K, F)>) -> TypeExpr
where
    K: Into<String>,
    F: Into<FieldExpr>,
{
    TypeExpr::Record {
        extensible: false,
        fields: fields
            .into_iter()
            .map(|(k, f)| (k.into(), f.into()))
            .collect(),
    }
}

/// An open record: declared fields plus whatever else shows up.
pub fn open_record<K, F>(fields: impl IntoIterator<Item = (K, F)>) -> TypeExpr
where
    K: Into<String>,
    F: Into<FieldExpr>,
{
    TypeExpr::Record {
        extensible: true,
        fields: fields
            .into_iter()
            .map(|(k, f)| (k.into(), f.into()))
            .collect(),
    }
}

/// Mark a record field as optional.
pub fn optional(expr: impl Into<TypeExpr>) -> FieldExpr {
    FieldExpr {
        optional: true,
        expr: expr.into(),
    }
}

/// Mark a record field as required. Plain field values already default to
/// this; the marker exists for symmetry with [`optional`].
pub fn required(expr: impl Into<TypeExpr>) -> FieldExpr {
    FieldExpr {
        optional: false,
        expr: expr.into(),
    }
}
