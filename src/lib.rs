//! Form Studio - schema and conditional rule engine for multi-page
//! appraisal forms
//!
//! A form is a tree of pages, sections and fields. The [`editor`] mutates
//! the tree, [`layout`] packs fields onto a 12-column grid, and [`rules`]
//! derives each field's effective state from the current values. An
//! [`EditorSession`] ties these together behind the async [`FormStore`]
//! boundary.

pub mod config;
pub mod editor;
pub mod error;
pub mod layout;
pub mod rules;
pub mod schema;
pub mod session;
pub mod store;
pub mod validation;

pub use config::StudioConfig;
pub use editor::{CommandOutcome, EditCommand, Editor};
pub use error::{FormError, NodeKind, Result};
pub use session::{EditorSession, ResolvedView};
pub use store::{FileFormStore, FormRef, FormStore, MemoryFormStore};
