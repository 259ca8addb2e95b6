//! Cost model.
//!
//! Cost is a nonnegative real; lower is better. The cost of a physical
//! group expression is its operator-local cost plus the costs of the chosen
//! child winners, accumulated by the search driver.

mod model;
pub use model::*;

use derive_more::{Add, AddAssign, Sub, SubAssign, Sum};

pub const INF: Cost = Cost(f64::INFINITY);

#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Add, Sub, Sum, AddAssign, SubAssign)]
pub struct Cost(f64);

impl Cost {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Cost {
    fn from(c: f64) -> Self {
        Cost(c)
    }
}
