/// Cost model strategy selector.
///
/// `Trivial` charges unit cost per operator and is useful for plan-shape
/// tests; `Cardinality` charges by estimated row counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CostModelVariant {
    Trivial,
    Cardinality,
}

/// Settings recognized by one optimization call.
///
/// There is no global settings singleton: the caller passes a value of this
/// struct into the optimizer context.
#[derive(Clone, Debug)]
pub struct OptimizerSettings {
    /// Only affects physical plan annotation: scan operators emitted by
    /// implementation rules carry this flag.
    pub parallel_execution: bool,
    /// Gates the `Get -> IndexScan` implementation rule.
    pub enable_index_scan: bool,
    /// Maximum number of base relations before join-order exploration rules
    /// are excluded from the rule set.
    pub join_order_threshold: usize,
    pub cost_model_variant: CostModelVariant,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            parallel_execution: false,
            enable_index_scan: true,
            join_order_threshold: 10,
            cost_model_variant: CostModelVariant::Cardinality,
        }
    }
}
