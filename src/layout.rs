//! Grid placement for section fields
//!
//! Each section lays its fields out on a 12-column grid. Fields are packed
//! greedily in order: a field that does not fit in what is left of the
//! current row starts the next one.
//!
//! # Layout
//!
//! ```text
//! [half ][half ]          row 0: 6 + 6 = 12
//! [third][two_thirds  ]   row 1: 4 + 8 = 12
//! [quarter]               row 2: 3
//! ```

use crate::rules::Evaluation;
use crate::schema::{Field, FieldId, Form, SectionId, GRID_COLUMNS};
use serde::Serialize;
use std::collections::BTreeMap;

/// Derived grid position of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutSlot {
    pub field_id: FieldId,
    pub column_span: u8,
    /// Zero-based first column
    pub column_start: u8,
    pub row: usize,
}

impl LayoutSlot {
    /// One past the last occupied column
    pub fn column_end(&self) -> u8 {
        self.column_start + self.column_span
    }
}

/// Pack `fields` into rows, preserving their order
pub fn resolve_section<'a>(fields: impl IntoIterator<Item = &'a Field>) -> Vec<LayoutSlot> {
    let mut slots = Vec::new();
    let mut row = 0;
    let mut used: u8 = 0;
    for field in fields {
        let span = field.width().column_span();
        if used > 0 && used + span > GRID_COLUMNS {
            row += 1;
            used = 0;
        }
        slots.push(LayoutSlot {
            field_id: field.id(),
            column_span: span,
            column_start: used,
            row,
        });
        used += span;
    }
    slots
}

/// Pack only the fields the evaluation leaves visible
pub fn resolve_section_visible<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
    evaluation: &Evaluation,
) -> Vec<LayoutSlot> {
    resolve_section(
        fields
            .into_iter()
            .filter(|f| evaluation.is_visible(f.id())),
    )
}

/// Slots for every section of the form
pub fn resolve_form(form: &Form) -> BTreeMap<SectionId, Vec<LayoutSlot>> {
    form.sections()
        .map(|s| (s.id(), resolve_section(s.fields())))
        .collect()
}

/// Number of rows a packed section occupies
pub fn row_count(slots: &[LayoutSlot]) -> usize {
    slots.last().map_or(0, |s| s.row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use crate::rules::{evaluate, Condition, Effect, EvaluationOptions};
    use crate::schema::{FieldType, FieldValue, FieldWidth};

    fn section_with(widths: &[FieldWidth]) -> (Form, SectionId) {
        let mut form = Form::new("Layout");
        let mut editor = Editor::new(&mut form);
        let page = editor.add_page("P").unwrap();
        let section = editor.add_section(page, "S").unwrap();
        for w in widths {
            editor
                .add_field(section, FieldType::Text, *w, "f")
                .unwrap();
        }
        (form, section)
    }

    fn rows(form: &Form, section: SectionId) -> Vec<usize> {
        resolve_section(form.section(section).unwrap().fields())
            .iter()
            .map(|s| s.row)
            .collect()
    }

    #[test]
    fn test_half_half_third_wraps_third() {
        use FieldWidth::*;
        let (form, section) = section_with(&[Half, Half, Third]);
        assert_eq!(rows(&form, section), vec![0, 0, 1]);
    }

    #[test]
    fn test_third_half_half_packs_by_running_total() {
        use FieldWidth::*;
        let (form, section) = section_with(&[Third, Half, Half]);
        // 4 + 6 = 10, the next 6 would make 16
        assert_eq!(rows(&form, section), vec![0, 0, 1]);
    }

    #[test]
    fn test_column_starts_and_ends() {
        use FieldWidth::*;
        let (form, section) = section_with(&[Quarter, Quarter, Half, ThreeQuarters]);
        let slots = resolve_section(form.section(section).unwrap().fields());
        let starts: Vec<u8> = slots.iter().map(|s| s.column_start).collect();
        assert_eq!(starts, vec![0, 3, 6, 0]);
        assert_eq!(slots[2].column_end(), 12);
        assert_eq!(row_count(&slots), 2);
    }

    #[test]
    fn test_no_row_exceeds_grid() {
        use FieldWidth::*;
        let (form, section) =
            section_with(&[TwoThirds, Third, ThreeQuarters, Half, Full, Quarter, Third, Half]);
        let slots = resolve_section(form.section(section).unwrap().fields());
        for slot in &slots {
            assert!(slot.column_end() <= GRID_COLUMNS);
        }
        let mut per_row: BTreeMap<usize, u8> = BTreeMap::new();
        for slot in &slots {
            *per_row.entry(slot.row).or_default() += slot.column_span;
        }
        assert!(per_row.values().all(|total| *total <= GRID_COLUMNS));
    }

    #[test]
    fn test_full_width_fields_each_take_a_row() {
        use FieldWidth::*;
        let (form, section) = section_with(&[Full, Full, Full]);
        assert_eq!(rows(&form, section), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_section() {
        let (form, section) = section_with(&[]);
        let slots = resolve_section(form.section(section).unwrap().fields());
        assert!(slots.is_empty());
        assert_eq!(row_count(&slots), 0);
    }

    #[test]
    fn test_resolve_form_covers_every_section() {
        let (mut form, _) = section_with(&[FieldWidth::Half]);
        let page = form.pages()[0].id();
        Editor::new(&mut form).add_section(page, "Second").unwrap();
        let layout = resolve_form(&form);
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_visible_layout_skips_hidden_fields() {
        use FieldWidth::*;
        let (mut form, section) = section_with(&[Half, Half, Half]);
        let ids: Vec<FieldId> = form.section(section).unwrap().fields().iter().map(|f| f.id()).collect();
        let mut editor = Editor::new(&mut form);
        editor
            .add_rule(ids[0], Condition::equals("hide"), ids[1], Effect::Hide)
            .unwrap();
        editor
            .set_field_value(ids[0], FieldValue::Text("hide".into()))
            .unwrap();

        let evaluation = evaluate(&form, &EvaluationOptions::default()).unwrap();
        let slots = resolve_section_visible(form.section(section).unwrap().fields(), &evaluation);
        let placed: Vec<FieldId> = slots.iter().map(|s| s.field_id).collect();
        assert_eq!(placed, vec![ids[0], ids[2]]);
        assert_eq!(slots[1].row, 0);
    }
}
