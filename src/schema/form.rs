//! Form tree: pages, sections and fields in render order

use super::field::Field;
use super::ids::{FieldId, FormId, PageId, SectionId};
use crate::error::{FormError, NodeKind, Result};
use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Group of fields laid out together on one grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    id: SectionId,
    title: String,
    #[serde(default)]
    fields: Vec<Field>,
}

impl Section {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            id: SectionId::new(),
            title: title.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Fields in render order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn position_of(&self, field: FieldId) -> Option<usize> {
        self.fields.iter().position(|f| f.id() == field)
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }
}

/// One page of a multi-page form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    id: PageId,
    title: String,
    #[serde(default)]
    sections: Vec<Section>,
}

impl Page {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            id: PageId::new(),
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn position_of(&self, section: SectionId) -> Option<usize> {
        self.sections.iter().position(|s| s.id() == section)
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub(crate) fn sections_mut(&mut self) -> &mut Vec<Section> {
        &mut self.sections
    }
}

/// Where a field sits in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLocation {
    pub page: PageId,
    pub section: SectionId,
    /// Index within the section's field sequence
    pub index: usize,
}

/// Root aggregate: owns every page and the rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    id: FormId,
    title: String,
    #[serde(default)]
    pages: Vec<Page>,
    #[serde(default)]
    rules: RuleSet,
}

impl Form {
    /// Create a new, empty form
    pub fn new(title: &str) -> Self {
        Self {
            id: FormId::new(),
            title: title.to_string(),
            pages: Vec::new(),
            rules: RuleSet::default(),
        }
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// All sections, page by page
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.pages.iter().flat_map(|p| p.sections.iter())
    }

    /// All fields in document order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections().flat_map(|s| s.fields.iter())
    }

    pub fn page(&self, id: PageId) -> Result<&Page> {
        self.pages
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| FormError::not_found(NodeKind::Page, id))
    }

    pub fn section(&self, id: SectionId) -> Result<&Section> {
        self.sections()
            .find(|s| s.id == id)
            .ok_or_else(|| FormError::not_found(NodeKind::Section, id))
    }

    pub fn field(&self, id: FieldId) -> Result<&Field> {
        self.fields()
            .find(|f| f.id() == id)
            .ok_or_else(|| FormError::not_found(NodeKind::Field, id))
    }

    pub fn contains_field(&self, id: FieldId) -> bool {
        self.fields().any(|f| f.id() == id)
    }

    /// Page that owns `section`
    pub fn page_of(&self, section: SectionId) -> Result<&Page> {
        self.pages
            .iter()
            .find(|p| p.position_of(section).is_some())
            .ok_or_else(|| FormError::not_found(NodeKind::Section, section))
    }

    pub fn locate_field(&self, id: FieldId) -> Result<FieldLocation> {
        self.pages
            .iter()
            .flat_map(|p| p.sections.iter().map(move |s| (p, s)))
            .find_map(|(p, s)| {
                s.position_of(id).map(|index| FieldLocation {
                    page: p.id,
                    section: s.id,
                    index,
                })
            })
            .ok_or_else(|| FormError::not_found(NodeKind::Field, id))
    }

    /// Decode a document and verify its invariants
    pub fn from_json(json: &str) -> Result<Self> {
        let form: Form = serde_json::from_str(json)?;
        form.check_integrity()?;
        Ok(form)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Verify tree and rule invariants.
    ///
    /// Checks id uniqueness across the tree, that every stored value fits its
    /// field's type and options, that every rule names existing distinct
    /// fields, and that each field's `rule_refs` equals the set of rules
    /// targeting it. Rule cycles are left to evaluation.
    pub fn check_integrity(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for page in &self.pages {
            if !seen.insert(*page.id.as_uuid()) {
                return Err(FormError::DuplicateId(page.id.to_string()));
            }
            for section in &page.sections {
                if !seen.insert(*section.id.as_uuid()) {
                    return Err(FormError::DuplicateId(section.id.to_string()));
                }
                for field in &section.fields {
                    if !seen.insert(*field.id().as_uuid()) {
                        return Err(FormError::DuplicateId(field.id().to_string()));
                    }
                    field.check_value(field.value())?;
                }
            }
        }

        for rule in self.rules.iter() {
            for endpoint in [rule.source, rule.target] {
                if !self.contains_field(endpoint) {
                    return Err(FormError::OrphanRuleReference {
                        rule: rule.id.to_string(),
                        field: endpoint.to_string(),
                    });
                }
            }
            if rule.source == rule.target {
                return Err(FormError::CyclicRuleGraph {
                    fields: vec![rule.source.to_string()],
                });
            }
        }

        for field in self.fields() {
            let expected = self.rules.target_ids(field.id());
            if let Some(stray) = field
                .rule_refs()
                .symmetric_difference(&expected)
                .next()
            {
                return Err(FormError::OrphanRuleReference {
                    rule: stray.to_string(),
                    field: field.id().to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub(crate) fn pages_mut(&mut self) -> &mut Vec<Page> {
        &mut self.pages
    }

    pub(crate) fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    pub(crate) fn page_mut(&mut self, id: PageId) -> Result<&mut Page> {
        self.pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| FormError::not_found(NodeKind::Page, id))
    }

    pub(crate) fn section_mut(&mut self, id: SectionId) -> Result<&mut Section> {
        self.pages
            .iter_mut()
            .flat_map(|p| p.sections.iter_mut())
            .find(|s| s.id == id)
            .ok_or_else(|| FormError::not_found(NodeKind::Section, id))
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> Result<&mut Field> {
        self.pages
            .iter_mut()
            .flat_map(|p| p.sections.iter_mut())
            .flat_map(|s| s.fields.iter_mut())
            .find(|f| f.id() == id)
            .ok_or_else(|| FormError::not_found(NodeKind::Field, id))
    }
}
