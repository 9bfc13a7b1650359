//! Route legs and cumulative distance accumulation

mod accumulator;
mod leg;

pub use accumulator::*;
pub use leg::*;
