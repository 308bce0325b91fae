//! Postgres-backed persistence for the allocation engine: dimension/fact
//! readers that assemble a run's `Context` and `RunInputs`, fact writers
//! implementing the §6 append-only CDC contract, and a `RunGate`
//! implementation over the inventory-status log table. The binary crate
//! owns wiring this crate's types to `allocation_engine_lib::driver::run`.

pub mod dimension_reader;
pub mod fact_writer;
pub mod run_gate;

pub use dimension_reader::{load_run_inputs, DimensionReader, PostgresDimensionReader};
pub use fact_writer::{FactWriter, PostgresFactWriter};
pub use run_gate::PostgresRunGate;
