pub mod error;
pub mod memory;
pub mod mode;
pub mod isa;
pub mod trace;
pub mod loader;
pub mod machine;
pub mod disasm;
pub mod batch;

pub use error::{Error, Fault, Result};
pub use loader::{load, load_file};
pub use machine::{Machine, RunConfig, State};
pub use memory::Memory;
pub use mode::AddressMode;
