use std::fmt::Formatter;

use crate::catalog::{CatalogAccessor, DatabaseOid, IndexOid, NamespaceOid, TableOid};
use crate::error::OptResult;
use crate::expression::AnnotatedExpression;
use crate::index_util;
use crate::operator::{
    DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
};
use crate::optimizer::Optimizer;

/// Physical sequential scan of a base table.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SeqScan {
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
    predicates: Vec<AnnotatedExpression>,
    table_alias: String,
    is_for_update: bool,
    /// Plan annotation copied from the session settings.
    is_parallel: bool,
}

impl SeqScan {
    pub fn new<S: Into<String>>(
        database_oid: DatabaseOid,
        namespace_oid: NamespaceOid,
        table_oid: TableOid,
        predicates: Vec<AnnotatedExpression>,
        table_alias: S,
        is_for_update: bool,
        is_parallel: bool,
    ) -> Self {
        Self {
            database_oid,
            namespace_oid,
            table_oid,
            predicates,
            table_alias: table_alias.into(),
            is_for_update,
            is_parallel,
        }
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

    pub fn is_parallel(&self) -> bool {
        self.is_parallel
    }
}

impl PhysicalOperatorTrait for SeqScan {
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        // A sequential scan provides no properties.
        Ok(vec![DerivePropResult::passthrough_none(0)])
    }
}

impl DisplayFields for SeqScan {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("");
        s.field("table", &self.table_alias);
        if !self.predicates.is_empty() {
            s.field("predicates", &self.predicates);
        }
        s.finish()
    }
}

/// Physical index scan.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct IndexScan {
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
    index_oid: IndexOid,
    predicates: Vec<AnnotatedExpression>,
    table_alias: String,
    is_for_update: bool,
    is_parallel: bool,
}

impl IndexScan {
    #[allow(clippy::too_many_arguments)]
    pub fn new<S: Into<String>>(
        database_oid: DatabaseOid,
        namespace_oid: NamespaceOid,
        table_oid: TableOid,
        index_oid: IndexOid,
        predicates: Vec<AnnotatedExpression>,
        table_alias: S,
        is_for_update: bool,
        is_parallel: bool,
    ) -> Self {
        Self {
            database_oid,
            namespace_oid,
            table_oid,
            index_oid,
            predicates,
            table_alias: table_alias.into(),
            is_for_update,
            is_parallel,
        }
    }

    pub fn table_oid(&self) -> TableOid {
        self.table_oid
    }

    pub fn index_oid(&self) -> IndexOid {
        self.index_oid
    }

    pub fn predicates(&self) -> &[AnnotatedExpression] {
        &self.predicates
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    pub fn is_parallel(&self) -> bool {
        self.is_parallel
    }
}

impl PhysicalOperatorTrait for IndexScan {
    /// An index scan can claim a required sort if some index on the scanned
    /// table delivers it; otherwise it provides nothing, like a sequential
    /// scan.
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        let catalog = &context.optimizer.context().catalog;
        let indexes = catalog.indexes(self.table_oid);

        let mut output = Vec::new();
        for property in context.required_prop.properties() {
            let sort = property.as_sort();
            if !index_util::check_sort_property(sort) {
                continue;
            }

            if indexes
                .iter()
                .any(|index| index_util::satisfies_sort_with_index(sort, index))
            {
                output.push(DerivePropResult {
                    output_prop: context.required_prop.clone(),
                    input_required_props: vec![],
                });
                break;
            }
        }

        if output.is_empty() {
            output.push(DerivePropResult::passthrough_none(0));
        }
        Ok(output)
    }
}

impl DisplayFields for IndexScan {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("");
        s.field("table", &self.table_alias)
            .field("index", &self.index_oid);
        if !self.predicates.is_empty() {
            s.field("predicates", &self.predicates);
        }
        s.finish()
    }
}

/// Scan without a backing table, e.g. `SELECT 1`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Default)]
pub struct TableFreeScan {}

impl TableFreeScan {
    pub fn new() -> Self {
        Self {}
    }
}

impl PhysicalOperatorTrait for TableFreeScan {
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_none(0)])
    }
}

impl DisplayFields for TableFreeScan {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("").finish()
    }
}
