//! 预算：持久化接口 + 串行化的跟踪器

pub mod store;
pub mod tracker;

pub use store::{BudgetRecord, BudgetScope, BudgetStore, InMemoryBudgetStore};
pub use tracker::{BudgetTracker, BudgetWarning, Reservation};
