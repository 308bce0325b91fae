//! Allocation engine: pure, persistence-free implementation of the daily
//! supply-allocation algorithms (spec §4). Every module takes its
//! dimensions through a borrowed `allocation_domain::Context` and returns
//! plain record vectors; the binary crate owns I/O and wires this crate's
//! `driver::run` to the persistence layer.

pub mod driver;
pub mod harvest_allocator;
pub mod harvest_ledger;
pub mod harvest_unallocated;
pub mod inventory_allocator;
pub mod inventory_ledger;
pub mod prior_day_allocator;
pub mod stop_sell;
pub mod transfer_planner;
pub mod yield_converter;

pub use driver::{run, PassOutput, RunInputs};
