//! Per-namespace type alias registry and expression resolver.

use std::collections::{BTreeMap, HashMap};

use super::{Field, Type, TypeExpr};
use crate::errors::Error;

/// Resolves user-supplied type descriptions into engine [`Type`]s and owns
/// the alias table for one namespace.
///
/// Aliases expand eagerly at definition time, not lazily on lookup, so alias
/// chains must be defined in dependency order. Each registry instance is
/// independent: two namespaces may define the same alias name without
/// interfering.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    aliases: HashMap<String, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a named alias for use in later type expressions.
    ///
    /// Fails with [`Error::DuplicateAlias`] if the name already exists in
    /// this registry.
    pub fn define(&mut self, name: &str, expr: impl Into<TypeExpr>) -> Result<(), Error> {
        if self.aliases.contains_key(name) {
            return Err(Error::DuplicateAlias(name.to_owned()));
        }
        let ty = self.resolve(&expr.into())?;
        self.aliases.insert(name.to_owned(), ty);
        Ok(())
    }

    /// Resolve a type expression into a fully expanded [`Type`].
    ///
    /// Names are case-sensitive; a name that is neither a primitive nor a
    /// defined alias fails with [`Error::UnknownType`].
    pub fn resolve(&self, expr: &TypeExpr) -> Result<Type, Error> {
        Ok(match expr {
            TypeExpr::Name(name) => match name.as_str() {
                "string" => Type::Str,
                "boolean" => Type::Bool,
                "number" => Type::Num,
                "time" | "date" => Type::Time,
                other => self
                    .aliases
                    .get(other)
                    .cloned()
                    .ok_or_else(|| Error::UnknownType(other.to_owned()))?,
            },
            TypeExpr::Var(name) => Type::Var(name.clone()),
            TypeExpr::List(elem) => Type::List(Box::new(self.resolve(elem)?)),
            TypeExpr::Record { extensible, fields } => {
                let mut resolved = BTreeMap::new();
                for (name, field) in fields {
                    resolved.insert(
                        name.clone(),
                        Field {
                            optional: field.optional,
                            ty: self.resolve(&field.expr)?,
                        },
                    );
                }
                Type::Record {
                    extensible: *extensible,
                    fields: resolved,
                }
            }
            TypeExpr::Block { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Type::Block {
                    params,
                    ret: Box::new(self.resolve(ret)?),
                }
            }
        })
    }
}
