//! Builder: compiles a frozen source snapshot across the optimization and
//! variant matrix and emits a single authoritative build receipt.
//!
//! Submodules:
//! - `snapshot`: validated, content-addressed source input.
//! - `policy`: compile policy (base flags, link libs, variant deltas).
//! - `subprocess`: timeout-bounded command invocation.
//! - `receipt`: the receipt schema.
//! - `run`: the matrix executor.

pub mod policy;
pub mod receipt;
pub mod run;
pub mod snapshot;
pub mod subprocess;

pub use policy::CompilePolicy;
pub use receipt::BuildReceipt;
pub use run::{run_build, BuildError, BuildOptions};
pub use snapshot::{SnapshotInput, SourceSnapshot};
