pub mod binaries;
pub mod build;
pub mod decompile;
pub mod join;
pub mod oracle;
pub mod util;

pub use binaries::*;
pub use build::*;
pub use decompile::*;
pub use join::*;
pub use oracle::*;
pub use util::*;
