use std::collections::BTreeSet;

/// Properties shared by every member of a group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogicalProperty {
    /// Union of the table aliases reachable beneath the group. Root scans
    /// seed it with their own alias.
    table_aliases: BTreeSet<String>,
}

impl LogicalProperty {
    pub fn new(table_aliases: BTreeSet<String>) -> Self {
        Self { table_aliases }
    }

    pub fn table_aliases(&self) -> &BTreeSet<String> {
        &self.table_aliases
    }
}
