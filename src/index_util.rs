//! Checks whether an index can satisfy a sort requirement.

use crate::catalog::IndexSchema;
use crate::properties::{SortDirection, SortSpec};

/// An index can only deliver a sort over plain ascending column references.
pub fn check_sort_property(sort: &SortSpec) -> bool {
    sort.sort_directions()
        .iter()
        .all(|d| *d == SortDirection::Ascending)
        && sort
            .sort_exprs()
            .iter()
            .all(|e| e.column_name().is_some())
}

/// True when the sort columns are a prefix of the index key columns.
pub fn satisfies_sort_with_index(sort: &SortSpec, index: &IndexSchema) -> bool {
    if sort.len() > index.key_columns.len() {
        return false;
    }

    sort.sort_exprs()
        .iter()
        .zip(&index.key_columns)
        .all(|(expr, key)| expr.column_name() == Some(key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IndexOid, IndexSchema, TableOid};
    use crate::expression::ScalarExpr;

    fn index_on(keys: &[&str]) -> IndexSchema {
        IndexSchema {
            oid: IndexOid(1),
            name: "idx".to_string(),
            table_oid: TableOid(1),
            key_columns: keys.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    fn sort_on(columns: &[&str], direction: SortDirection) -> SortSpec {
        SortSpec::new(
            columns
                .iter()
                .map(|c| ScalarExpr::column("t", *c).into_ref())
                .collect(),
            vec![direction; columns.len()],
        )
    }

    #[test]
    fn test_descending_sort_rejected() {
        let sort = sort_on(&["c1"], SortDirection::Descending);
        assert!(!check_sort_property(&sort));
    }

    #[test]
    fn test_prefix_match() {
        let sort = sort_on(&["c1"], SortDirection::Ascending);
        assert!(check_sort_property(&sort));
        assert!(satisfies_sort_with_index(&sort, &index_on(&["c1", "c2"])));
        assert!(!satisfies_sort_with_index(&sort, &index_on(&["c2", "c1"])));

        let longer = sort_on(&["c1", "c2"], SortDirection::Ascending);
        assert!(!satisfies_sort_with_index(&longer, &index_on(&["c1"])));
    }
}
