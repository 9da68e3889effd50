//! Structural editor
//!
//! The only write path into a [`Form`]. Every operation checks its
//! preconditions before touching the tree, so a returned error means nothing
//! changed.

mod command;

pub use command::{CommandOutcome, EditCommand};

use crate::error::{FormError, NodeKind, Result};
use crate::rules::{Condition, Effect, Rule, RuleGraph};
use crate::schema::{
    ChoiceOption, Field, FieldId, FieldType, FieldValue, FieldWidth, Form, Page, PageId, RuleId,
    Section, SectionId, Validator,
};

/// Swap `items[index]` with its neighbour; false when already at the boundary
fn transpose<T>(items: &mut [T], index: usize, toward_start: bool) -> bool {
    let other = if toward_start {
        index.checked_sub(1)
    } else {
        Some(index + 1).filter(|i| *i < items.len())
    };
    match other {
        Some(other) => {
            items.swap(index, other);
            true
        }
        None => false,
    }
}

/// Mutating view over one form
pub struct Editor<'a> {
    form: &'a mut Form,
}

impl<'a> Editor<'a> {
    pub fn new(form: &'a mut Form) -> Self {
        Self { form }
    }

    pub fn form(&self) -> &Form {
        &*self.form
    }

    pub fn set_form_title(&mut self, title: &str) {
        self.form.set_title(title);
    }

    // Pages

    pub fn add_page(&mut self, title: &str) -> Result<PageId> {
        let page = Page::new(title);
        let id = page.id();
        self.form.pages_mut().push(page);
        tracing::debug!(page = %id, "added page");
        Ok(id)
    }

    pub fn rename_page(&mut self, page: PageId, title: &str) -> Result<()> {
        self.form.page_mut(page)?.set_title(title);
        Ok(())
    }

    /// Remove a page with all its sections, fields and their rules
    pub fn delete_page(&mut self, page: PageId) -> Result<Page> {
        let index = self
            .form
            .pages()
            .iter()
            .position(|p| p.id() == page)
            .ok_or_else(|| FormError::not_found(NodeKind::Page, page))?;
        let doomed: Vec<FieldId> = self.form.pages()[index]
            .sections()
            .iter()
            .flat_map(|s| s.fields())
            .map(Field::id)
            .collect();
        self.drop_rules_for(&doomed);
        let removed = self.form.pages_mut().remove(index);
        tracing::debug!(page = %page, fields = doomed.len(), "deleted page");
        Ok(removed)
    }

    // Sections

    /// Append an empty section to the page
    pub fn add_section(&mut self, page: PageId, title: &str) -> Result<SectionId> {
        let page = self.form.page_mut(page)?;
        let section = Section::new(title);
        let id = section.id();
        page.sections_mut().push(section);
        tracing::debug!(section = %id, "added section");
        Ok(id)
    }

    pub fn rename_section(&mut self, section: SectionId, title: &str) -> Result<()> {
        self.form.section_mut(section)?.set_title(title);
        Ok(())
    }

    pub fn delete_section(&mut self, section: SectionId) -> Result<Section> {
        let page = self.form.page_of(section)?.id();
        let doomed: Vec<FieldId> = self
            .form
            .section(section)?
            .fields()
            .iter()
            .map(Field::id)
            .collect();
        self.drop_rules_for(&doomed);
        let page = self.form.page_mut(page)?;
        let index = page
            .position_of(section)
            .ok_or_else(|| FormError::not_found(NodeKind::Section, section))?;
        let removed = page.sections_mut().remove(index);
        tracing::debug!(section = %section, fields = doomed.len(), "deleted section");
        Ok(removed)
    }

    pub fn move_section_up(&mut self, section: SectionId) -> Result<bool> {
        self.move_section(section, true)
    }

    pub fn move_section_down(&mut self, section: SectionId) -> Result<bool> {
        self.move_section(section, false)
    }

    fn move_section(&mut self, section: SectionId, up: bool) -> Result<bool> {
        let page = self.form.page_of(section)?.id();
        let page = self.form.page_mut(page)?;
        let index = page
            .position_of(section)
            .ok_or_else(|| FormError::not_found(NodeKind::Section, section))?;
        Ok(transpose(page.sections_mut(), index, up))
    }

    // Fields

    /// Append a field holding the default value for its type
    pub fn add_field(
        &mut self,
        section: SectionId,
        field_type: FieldType,
        width: FieldWidth,
        label: &str,
    ) -> Result<FieldId> {
        let section = self.form.section_mut(section)?;
        let field = Field::new(field_type, width, label);
        let id = field.id();
        section.fields_mut().push(field);
        tracing::debug!(field = %id, field_type = field_type.name(), width = width.name(), "added field");
        Ok(id)
    }

    /// [`Editor::add_field`] for type and width given by name
    pub fn add_field_named(
        &mut self,
        section: SectionId,
        field_type: &str,
        width: &str,
        label: &str,
    ) -> Result<FieldId> {
        let field_type: FieldType = field_type.parse()?;
        let width: FieldWidth = width.parse()?;
        self.add_field(section, field_type, width, label)
    }

    /// Remove a field and every rule that names it
    pub fn delete_field(&mut self, field: FieldId) -> Result<Field> {
        let location = self.form.locate_field(field)?;
        let dropped = self.drop_rules_for(&[field]);
        let removed = self
            .form
            .section_mut(location.section)?
            .fields_mut()
            .remove(location.index);
        tracing::debug!(field = %field, rules = dropped, "deleted field");
        Ok(removed)
    }

    /// Swap with the previous field; no-op on the first one
    pub fn move_field_up(&mut self, field: FieldId) -> Result<bool> {
        self.move_field(field, true)
    }

    /// Swap with the next field; no-op on the last one
    pub fn move_field_down(&mut self, field: FieldId) -> Result<bool> {
        self.move_field(field, false)
    }

    fn move_field(&mut self, field: FieldId, up: bool) -> Result<bool> {
        let location = self.form.locate_field(field)?;
        let section = self.form.section_mut(location.section)?;
        let moved = transpose(section.fields_mut(), location.index, up);
        if !moved {
            tracing::debug!(field = %field, "field already at boundary");
        }
        Ok(moved)
    }

    /// Move a field to `new_index` within its section, clamped to the end.
    /// Returns the index it landed on.
    pub fn reorder_within_section(
        &mut self,
        section: SectionId,
        field: FieldId,
        new_index: usize,
    ) -> Result<usize> {
        let section = self.form.section_mut(section)?;
        let index = section
            .position_of(field)
            .ok_or_else(|| FormError::not_found(NodeKind::Field, field))?;
        let fields = section.fields_mut();
        let moving = fields.remove(index);
        let at = new_index.min(fields.len());
        fields.insert(at, moving);
        Ok(at)
    }

    pub fn set_field_label(&mut self, field: FieldId, label: &str) -> Result<()> {
        self.form.field_mut(field)?.set_label(label);
        Ok(())
    }

    pub fn set_field_width(&mut self, field: FieldId, width: FieldWidth) -> Result<()> {
        self.form.field_mut(field)?.set_width(width);
        Ok(())
    }

    pub fn set_field_value(&mut self, field: FieldId, value: FieldValue) -> Result<()> {
        self.form.field_mut(field)?.set_value(value)
    }

    pub fn set_field_options(&mut self, field: FieldId, options: Vec<ChoiceOption>) -> Result<()> {
        self.form.field_mut(field)?.set_options(options)
    }

    pub fn set_field_validators(&mut self, field: FieldId, validators: Vec<Validator>) -> Result<()> {
        self.form.field_mut(field)?.set_validators(validators);
        Ok(())
    }

    // Rules

    /// Add a rule after checking both endpoints exist, the condition fits the
    /// source type and the graph stays acyclic
    pub fn add_rule(
        &mut self,
        source: FieldId,
        condition: Condition,
        target: FieldId,
        effect: Effect,
    ) -> Result<RuleId> {
        let source_type = self.form.field(source)?.field_type();
        self.form.field(target)?;
        condition
            .check_source(source_type)
            .map_err(|reason| FormError::InvalidValue {
                field: source.to_string(),
                reason,
            })?;
        if RuleGraph::from_rules(self.form.rules()).would_cycle(source, target) {
            tracing::warn!(source = %source, target = %target, "rejected cyclic rule");
            return Err(FormError::CyclicRuleGraph {
                fields: vec![source.to_string(), target.to_string()],
            });
        }
        let id = self.form.rules_mut().insert(source, condition, target, effect);
        self.form.field_mut(target)?.rule_refs_mut().insert(id);
        tracing::debug!(rule = %id, "added rule");
        Ok(id)
    }

    pub fn remove_rule(&mut self, rule: RuleId) -> Result<Rule> {
        let removed = self
            .form
            .rules_mut()
            .remove(rule)
            .ok_or_else(|| FormError::not_found(NodeKind::Rule, rule))?;
        if let Ok(target) = self.form.field_mut(removed.target) {
            target.rule_refs_mut().remove(&removed.id);
        }
        Ok(removed)
    }

    /// Remove all rules naming any of `fields`, keeping `rule_refs` in step
    fn drop_rules_for(&mut self, fields: &[FieldId]) -> usize {
        let mut count = 0;
        for field in fields {
            for rule in self.form.rules_mut().remove_referencing(*field) {
                if let Ok(target) = self.form.field_mut(rule.target) {
                    target.rule_refs_mut().remove(&rule.id);
                }
                count += 1;
            }
        }
        count
    }
}
