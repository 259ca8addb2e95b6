use crate::expression::ExprRef;
use crate::properties::PhysicalProp;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordering specification: parallel lists of sort expressions and directions.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Default)]
pub struct SortSpec {
    sort_exprs: Vec<ExprRef>,
    sort_directions: Vec<SortDirection>,
}

impl SortSpec {
    pub fn new(sort_exprs: Vec<ExprRef>, sort_directions: Vec<SortDirection>) -> Self {
        debug_assert_eq!(sort_exprs.len(), sort_directions.len());
        Self {
            sort_exprs,
            sort_directions,
        }
    }

    /// All columns ascending, used by sort based aggregation.
    pub fn all_ascending(sort_exprs: Vec<ExprRef>) -> Self {
        let sort_directions = vec![SortDirection::Ascending; sort_exprs.len()];
        Self {
            sort_exprs,
            sort_directions,
        }
    }

    pub fn sort_exprs(&self) -> &[ExprRef] {
        &self.sort_exprs
    }

    pub fn sort_directions(&self) -> &[SortDirection] {
        &self.sort_directions
    }

    pub fn len(&self) -> usize {
        self.sort_exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sort_exprs.is_empty()
    }
}

impl PhysicalProp for SortSpec {
    /// Sort fulfillment is prefix equality including direction: data ordered
    /// by `(a, b)` satisfies a requirement on `(a)`, never the reverse.
    fn satisfies(&self, required: &SortSpec) -> bool {
        required.len() <= self.len()
            && required
                .sort_exprs
                .iter()
                .zip(&self.sort_exprs)
                .all(|(r, p)| r == p)
            && required
                .sort_directions
                .iter()
                .zip(&self.sort_directions)
                .all(|(r, p)| r == p)
    }
}
