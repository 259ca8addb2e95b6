use std::collections::BTreeMap;
use std::fmt::Formatter;

use crate::catalog::{DatabaseOid, NamespaceOid, TableOid};
use crate::error::OptResult;
use crate::expression::{AnnotatedExpression, ExprRef};
use crate::operator::{
    DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
};
use crate::optimizer::Optimizer;

/// Logical read of a bound base table.
///
/// A get with [`TableOid::INVALID`] has no backing table and implements to a
/// table-free scan (`SELECT` without `FROM`).
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Get {
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
    predicates: Vec<AnnotatedExpression>,
    table_alias: String,
    is_for_update: bool,
}

impl Get {
    pub fn new<S: Into<String>>(
        database_oid: DatabaseOid,
        namespace_oid: NamespaceOid,
        table_oid: TableOid,
        predicates: Vec<AnnotatedExpression>,
        table_alias: S,
        is_for_update: bool,
    ) -> Self {
        Self {
            database_oid,
            namespace_oid,
            table_oid,
            predicates,
            table_alias: table_alias.into(),
            is_for_update,
        }
    }

    pub fn table_free() -> Self {
        Self::new(
            DatabaseOid(0),
            NamespaceOid(0),
            TableOid::INVALID,
            vec![],
            "",
            false,
        )
    }

    pub fn database_oid(&self) -> DatabaseOid {
        self.database_oid
    }

    pub fn namespace_oid(&self) -> NamespaceOid {
        self.namespace_oid
    }

    pub fn table_oid(&self) -> TableOid {
        self.table_oid
    }

    pub fn predicates(&self) -> &[AnnotatedExpression] {
        &self.predicates
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    pub fn is_for_update(&self) -> bool {
        self.is_for_update
    }

    pub fn is_table_free(&self) -> bool {
        self.table_oid == TableOid::INVALID
    }
}

impl DisplayFields for Get {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("");
        s.field("table", &self.table_alias);
        if !self.predicates.is_empty() {
            s.field("predicates", &self.predicates);
        }
        if self.is_for_update {
            s.field("for_update", &self.is_for_update);
        }
        s.finish()
    }
}

/// Logical read of a derived relation (subquery in FROM).
///
/// `alias_to_exprs` maps each visible output name to the underlying
/// expression of the derived query that produces it.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DerivedGet {
    table_alias: String,
    alias_to_exprs: BTreeMap<String, ExprRef>,
}

impl DerivedGet {
    pub fn new<S: Into<String>>(table_alias: S, alias_to_exprs: BTreeMap<String, ExprRef>) -> Self {
        Self {
            table_alias: table_alias.into(),
            alias_to_exprs,
        }
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    pub fn alias_to_exprs(&self) -> &BTreeMap<String, ExprRef> {
        &self.alias_to_exprs
    }

    pub fn expr_of(&self, output_name: &str) -> Option<&ExprRef> {
        self.alias_to_exprs.get(output_name)
    }
}

/// Physical counterpart (QueryDerivedScan): output requirements are
/// forwarded to the single child unchanged.
impl PhysicalOperatorTrait for DerivedGet {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_required(
            context.required_prop,
        )])
    }
}

impl DisplayFields for DerivedGet {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("alias", &self.table_alias)
            .field("outputs", &self.alias_to_exprs.keys().collect::<Vec<_>>())
            .finish()
    }
}
