//! ## Background
//!
//! This crate implements the core of a cost based query optimizer for a
//! relational database. It accepts a bound logical query plan and outputs a
//! physical plan with the lowest estimated cost among the alternatives it
//! explored, subject to a set of required physical properties such as a sort
//! order.
//!
//! The search strategy follows the cascades framework [1]: logically
//! equivalent sub-plans are grouped in a memo, transformation and
//! implementation rules expand each group, and a top-down task driver picks
//! the cheapest implementation per required property set using dynamic
//! programming with cost upper-bound pruning.
//!
//! ## Design
//!
//! * [`cascades`] Memo, rule binding and the task based search driver.
//! * [`operator`] Logical and physical relational operators, including the
//!   per-operator property derivations.
//! * [`expression`] Scalar expression trees embedded in operator payloads.
//! * [`properties`] Logical and physical plan properties.
//! * [`rules`] Optimization rule definitions and implementations.
//! * [`stats`] Table/column statistics, their storage and derivation.
//! * [`cost`] The cost model.
//! * [`catalog`] The read-only catalog capability the optimizer consumes.
//!
//! ## Reference
//!
//! 1. Graefe, G., 1995. The cascades framework for query optimization. IEEE
//! Data Eng. Bull., 18(3), pp.19-29.
//! 2. Xu, Y., 1998. Efficiency in the Columbia database query optimizer.
//! Portland State University.

#[macro_use]
extern crate lazy_static;

pub mod cascades;
pub mod catalog;
pub mod cost;
pub mod error;
pub mod expression;
pub mod index_util;
pub mod operator;
pub mod optimizer;
pub mod plan;
pub mod properties;
pub mod rules;
pub mod settings;
pub mod stats;
pub mod test_utils;

pub use cascades::optimize;
