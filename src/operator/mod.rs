//! Relational operators.
//!
//! Operators are classified into two categories: logical and physical. They
//! live in two enums since they implement different derivations: physical
//! operators derive output/child property requirements, logical operators
//! drive statistics derivation. Both are closed tagged variants, so adding an
//! operator forces every match table to be revisited.

mod logical;
pub use logical::*;
mod physical;
pub use physical::*;
mod get;
pub use get::*;
mod filter;
pub use filter::*;
mod join;
pub use join::*;
mod aggregate;
pub use aggregate::*;
mod limit;
pub use limit::*;
mod scan;
pub use scan::*;
mod dml;
pub use dml::*;
mod external;
pub use external::*;

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;

use crate::expression::ExprSet;
use crate::operator::Operator::{Logical, Physical};

#[derive(Clone, Debug, Hash, Eq, PartialEq, EnumAsInner)]
pub enum Operator {
    Logical(LogicalOperator),
    Physical(PhysicalOperator),
}

/// Payload rendering shared by plan explain and memo dumps. The operator
/// name itself comes from the enum variant.
#[enum_dispatch(LogicalOperator, PhysicalOperator)]
pub trait DisplayFields {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result;
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Logical(op) => write!(f, "{}", op),
            Physical(op) => write!(f, "{}", op),
        }
    }
}

impl Operator {
    /// Expected child count, checked when a bound tree is ingested into the
    /// memo. `None` means the operator accepts any child count.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Logical(op) => op.arity(),
            Physical(_) => None,
        }
    }

    /// Covered table-alias set of an expression with this operator at the
    /// root, given the alias sets of its child groups. Scans seed the set,
    /// everything else unions its children.
    pub fn derive_table_aliases(&self, children: &[&BTreeSet<String>]) -> BTreeSet<String> {
        let own_alias = match self {
            Logical(LogicalOperator::LogicalGet(get)) => Some(get.table_alias().to_string()),
            Logical(LogicalOperator::LogicalDerivedGet(get)) => {
                return [get.table_alias().to_string()].into_iter().collect();
            }
            Physical(PhysicalOperator::SeqScan(scan)) => Some(scan.table_alias().to_string()),
            Physical(PhysicalOperator::IndexScan(scan)) => Some(scan.table_alias().to_string()),
            Physical(PhysicalOperator::QueryDerivedScan(get)) => {
                return [get.table_alias().to_string()].into_iter().collect();
            }
            _ => None,
        };

        let mut aliases: BTreeSet<String> = children.iter().flat_map(|c| c.iter().cloned()).collect();
        if let Some(alias) = own_alias {
            aliases.insert(alias);
        }
        aliases
    }

    /// Columns referenced by this operator's payload, the seed of a
    /// statistics derivation for its group.
    pub fn referenced_columns(&self) -> ExprSet {
        let mut out = ExprSet::new();
        match self {
            Logical(op) => op.collect_referenced_columns(&mut out),
            Physical(_) => {}
        }
        out
    }
}
