//! Account-distribution engine
//!
//! Serves credential records from pools under one of three distribution
//! policies. Draws against one pool are strictly serialized through a
//! per-pool lock spanning the whole load-mutate-persist cycle; draws
//! against different pools never block each other.
//!
//! Draw lifecycle:
//! 1. The caller resolves which pool and policy apply to a request
//! 2. The engine acquires the pool's lock and loads current records
//! 3. Policy dispatch: `consume` removes the pick and persists,
//!    `random_repeat` reuses the pool untouched, `round_robin` advances
//!    the pool's rotation cursor
//! 4. An empty pool reports out-of-stock as a normal outcome, never an error

pub mod engine;
pub mod error;
pub mod policy;

pub use engine::Engine;
pub use error::{Error, Result};
pub use policy::Policy;
