//! Logical and physical plan properties.
//!
//! Logical properties are shared by all members of a group, e.g. the covered
//! table-alias set. Physical properties are requirements a parent places on
//! an operator's output, currently sort order only.

mod logical;
pub use logical::*;
mod sort;
pub use sort::*;

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// Tests whether one property instance satisfies another of the same kind.
pub trait PhysicalProp: Debug + Hash {
    fn satisfies(&self, required: &Self) -> bool;
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Property {
    Sort(SortSpec),
}

impl Property {
    pub fn satisfies(&self, required: &Property) -> bool {
        match (self, required) {
            (Property::Sort(provided), Property::Sort(required)) => provided.satisfies(required),
        }
    }

    pub fn as_sort(&self) -> &SortSpec {
        match self {
            Property::Sort(sort) => sort,
        }
    }
}

/// An unordered collection of physical properties.
///
/// Equality and hashing follow set semantics: two property sets holding the
/// same properties in different order are the same key in the winner table.
#[derive(Clone, Debug, Default)]
pub struct PropertySet {
    properties: Vec<Property>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self { properties: vec![] }
    }

    pub fn with_property(property: Property) -> Self {
        Self {
            properties: vec![property],
        }
    }

    pub fn add_property(&mut self, property: Property) {
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// First sort property in the set, if any.
    pub fn sort_prop(&self) -> Option<&SortSpec> {
        self.properties.iter().map(Property::as_sort).next()
    }

    /// True when every property in `required` is satisfied by some property
    /// in this set.
    pub fn fulfills(&self, required: &PropertySet) -> bool {
        required
            .properties
            .iter()
            .all(|r| self.properties.iter().any(|p| p.satisfies(r)))
    }
}

impl PartialEq for PropertySet {
    fn eq(&self, other: &Self) -> bool {
        self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|p| other.properties.contains(p))
    }
}

impl Eq for PropertySet {}

impl Hash for PropertySet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order insensitive: combine element hashes commutatively.
        let mut acc = 0u64;
        for property in &self.properties {
            let mut hasher = DefaultHasher::new();
            property.hash(&mut hasher);
            acc = acc.wrapping_add(hasher.finish());
        }
        state.write_u64(acc);
        state.write_usize(self.properties.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ScalarExpr;
    use std::collections::HashMap;

    fn sort_on(columns: &[(&str, SortDirection)]) -> Property {
        Property::Sort(SortSpec::new(
            columns
                .iter()
                .map(|(c, _)| ScalarExpr::column("t", *c).into_ref())
                .collect(),
            columns.iter().map(|(_, d)| *d).collect(),
        ))
    }

    #[test]
    fn test_empty_set_fulfilled_by_any() {
        let empty = PropertySet::new();
        let sorted = PropertySet::with_property(sort_on(&[("c1", SortDirection::Ascending)]));

        assert!(sorted.fulfills(&empty));
        assert!(empty.fulfills(&empty));
        assert!(!empty.fulfills(&sorted));
    }

    #[test]
    fn test_sort_prefix_fulfillment() {
        let short = PropertySet::with_property(sort_on(&[("c1", SortDirection::Ascending)]));
        let long = PropertySet::with_property(sort_on(&[
            ("c1", SortDirection::Ascending),
            ("c2", SortDirection::Descending),
        ]));
        let wrong_direction =
            PropertySet::with_property(sort_on(&[("c1", SortDirection::Descending)]));

        assert!(long.fulfills(&short));
        assert!(!short.fulfills(&long));
        assert!(!wrong_direction.fulfills(&short));
    }

    #[test]
    fn test_set_equality_is_order_insensitive() {
        let a = {
            let mut set = PropertySet::new();
            set.add_property(sort_on(&[("c1", SortDirection::Ascending)]));
            set.add_property(sort_on(&[("c2", SortDirection::Ascending)]));
            set
        };
        let b = {
            let mut set = PropertySet::new();
            set.add_property(sort_on(&[("c2", SortDirection::Ascending)]));
            set.add_property(sort_on(&[("c1", SortDirection::Ascending)]));
            set
        };

        assert_eq!(a, b);

        let mut winners = HashMap::new();
        winners.insert(a, 1);
        assert_eq!(Some(&1), winners.get(&b));
    }
}
