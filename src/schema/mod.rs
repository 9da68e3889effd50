//! Form schema model
//!
//! Typed tree of pages, sections and fields. Position in each sequence is the
//! render order. Read accessors are public; every mutation goes through
//! [`crate::editor::Editor`].

mod field;
mod form;
mod ids;

pub use field::{ChoiceOption, Field, FieldType, FieldValue, FieldWidth, Validator, GRID_COLUMNS};
pub use form::{FieldLocation, Form, Page, Section};
pub use ids::{FieldId, FormId, PageId, RuleId, SectionId};
