use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::{CatalogAccessor, MemoryCatalog, NamespaceOid};
use crate::error::OptResult;
use crate::operator::Operator;
use crate::plan::Plan;
use crate::properties::LogicalProperty;
use crate::settings::OptimizerSettings;
use crate::stats::StatsStorage;

/// Context for one optimization call: catalog and statistics capabilities,
/// session settings, and the cooperative termination signals. There is no
/// global mutable state; everything the search needs is carried here.
#[derive(Clone)]
pub struct OptimizerContext {
    pub catalog: Arc<dyn CatalogAccessor>,
    pub stats: Arc<StatsStorage>,
    pub settings: OptimizerSettings,
    abort: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Default for OptimizerContext {
    fn default() -> Self {
        Self::new(
            Arc::new(MemoryCatalog::new(NamespaceOid(1))),
            Arc::new(StatsStorage::new()),
            OptimizerSettings::default(),
        )
    }
}

impl OptimizerContext {
    pub fn new(
        catalog: Arc<dyn CatalogAccessor>,
        stats: Arc<StatsStorage>,
        settings: OptimizerSettings,
    ) -> Self {
        Self {
            catalog,
            stats,
            settings,
            abort: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Shared flag the caller can raise to abort the running optimization at
    /// the next task boundary.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.map(|d| Instant::now() > d).unwrap_or(false)
    }
}

/// Optimizer interface.
///
/// The concepts of `group` and `group expression` are borrowed from the
/// cascades framework: a group holds logically equivalent expressions. Rules
/// are written against this trait rather than a concrete optimizer, so they
/// only see handles and never manipulate the memo directly.
pub trait Optimizer: Sized {
    type GroupHandle: OptGroupHandle<O = Self>;
    type ExprHandle: OptExprHandle<O = Self>;
    type Group: OptGroup;
    type Expr: OptExpr<O = Self, InputHandle = Self::GroupHandle>;

    fn context(&self) -> &OptimizerContext;
    fn group_at(&self, group_handle: Self::GroupHandle) -> &Self::Group;
    fn expr_at(&self, expr_handle: Self::ExprHandle) -> &Self::Expr;

    /// Entry point to drive the optimization process.
    fn find_best_plan(self) -> OptResult<Plan>;
}

pub trait OptExpr {
    type O: Optimizer;
    type InputHandle: OptGroupHandle;

    fn operator(&self) -> &Operator;
    fn inputs_len(&self, opt: &Self::O) -> usize;
    fn input_at(&self, idx: usize, opt: &Self::O) -> Self::InputHandle;
}

pub trait OptGroup {
    fn logical_prop(&self) -> &LogicalProperty;
}

pub trait OptExprHandle: Clone + Debug + PartialEq + Eq {
    type O: Optimizer<ExprHandle = Self>;
}

pub trait OptGroupHandle: Clone + Debug + PartialEq + Eq {
    type O: Optimizer<GroupHandle = Self>;
}
