//! Save/load boundary to the form store

mod file;
mod memory;
mod traits;

pub use file::FileFormStore;
pub use memory::MemoryFormStore;
pub use traits::{FormRef, FormStore, FormSummary, SaveReceipt};

#[cfg(test)]
pub use traits::MockFormStore;
