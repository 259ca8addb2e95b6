use std::fmt::Formatter;

use crate::catalog::{DatabaseOid, NamespaceOid, TableOid};
use crate::error::OptResult;
use crate::expression::ExprRef;
use crate::operator::{
    DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
};
use crate::optimizer::Optimizer;

/// Insert of literal value rows. Shared by the logical and physical sets.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Insert {
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
    columns: Vec<String>,
    values: Vec<Vec<ExprRef>>,
}

impl Insert {
    pub fn new(
        database_oid: DatabaseOid,
        namespace_oid: NamespaceOid,
        table_oid: TableOid,
        columns: Vec<String>,
        values: Vec<Vec<ExprRef>>,
    ) -> Self {
        Self {
            database_oid,
            namespace_oid,
            table_oid,
            columns,
            values,
        }
    }

    pub fn table_oid(&self) -> TableOid {
        self.table_oid
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Vec<ExprRef>] {
        &self.values
    }
}

impl PhysicalOperatorTrait for Insert {
    /// Literal-row insert has no children; it trivially claims whatever is
    /// required of it.
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult {
            output_prop: context.required_prop.clone(),
            input_required_props: vec![],
        }])
    }
}

impl DisplayFields for Insert {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table_oid)
            .field("rows", &self.values.len())
            .finish()
    }
}

/// Insert fed by a query child.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct InsertSelect {
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
}

impl InsertSelect {
    pub fn new(database_oid: DatabaseOid, namespace_oid: NamespaceOid, table_oid: TableOid) -> Self {
        Self {
            database_oid,
            namespace_oid,
            table_oid,
        }
    }

    pub fn table_oid(&self) -> TableOid {
        self.table_oid
    }
}

impl PhysicalOperatorTrait for InsertSelect {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_required(
            context.required_prop,
        )])
    }
}

impl DisplayFields for InsertSelect {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("").field("table", &self.table_oid).finish()
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Update {
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
    table_alias: String,
    /// `SET column = expr` clauses.
    updates: Vec<(String, ExprRef)>,
}

impl Update {
    pub fn new<S: Into<String>>(
        database_oid: DatabaseOid,
        namespace_oid: NamespaceOid,
        table_oid: TableOid,
        table_alias: S,
        updates: Vec<(String, ExprRef)>,
    ) -> Self {
        Self {
            database_oid,
            namespace_oid,
            table_oid,
            table_alias: table_alias.into(),
            updates,
        }
    }

    pub fn table_oid(&self) -> TableOid {
        self.table_oid
    }

    pub fn updates(&self) -> &[(String, ExprRef)] {
        &self.updates
    }
}

impl PhysicalOperatorTrait for Update {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_required(
            context.required_prop,
        )])
    }
}

impl DisplayFields for Update {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("table", &self.table_alias)
            .field(
                "set",
                &self
                    .updates
                    .iter()
                    .map(|(c, e)| format!("{} = {}", c, e))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Delete {
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
    table_alias: String,
}

impl Delete {
    pub fn new<S: Into<String>>(
        database_oid: DatabaseOid,
        namespace_oid: NamespaceOid,
        table_oid: TableOid,
        table_alias: S,
    ) -> Self {
        Self {
            database_oid,
            namespace_oid,
            table_oid,
            table_alias: table_alias.into(),
        }
    }

    pub fn table_oid(&self) -> TableOid {
        self.table_oid
    }
}

impl PhysicalOperatorTrait for Delete {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_required(
            context.required_prop,
        )])
    }
}

impl DisplayFields for Delete {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("").field("table", &self.table_alias).finish()
    }
}
