//! Field Catalog
//!
//! Reconciles scanned placeholder descriptors against the persisted catalog
//! of field definitions. Runs inside the same unit of work as form creation,
//! so a failure anywhere rolls back the form, new fields and links together.

use crate::store::DbState;
use chrono::Utc;
use formflow_models::{FieldDefinition, FormFieldLink, PlaceholderDescriptor};
use tracing::debug;
use uuid::Uuid;

/// Create-or-reuse each descriptor's field definition and link it to the
/// form. Existing definitions are reused unmodified; a later scan of a
/// different document never overwrites catalog metadata. Returns the number
/// of definitions created.
pub fn reconcile(db: &mut DbState, form_id: Uuid, descriptors: &[PlaceholderDescriptor]) -> usize {
    let now = Utc::now();
    let mut created = 0;

    for descriptor in descriptors {
        let field_id = match db.find_field_by_name(&descriptor.name) {
            Some(existing) => existing.id,
            None => {
                let field = FieldDefinition {
                    id: Uuid::new_v4(),
                    name: descriptor.name.clone(),
                    field_type: descriptor.field_type,
                    description: descriptor.description.clone(),
                    is_required: descriptor.is_required,
                    is_upper_case: descriptor.is_upper_case,
                    created_at: now,
                };
                let id = field.id;
                db.fields.insert(id, field);
                created += 1;
                id
            }
        };

        // One link per descriptor even when the definition is reused.
        let link = FormFieldLink {
            id: Uuid::new_v4(),
            form_id,
            field_id,
            formula: descriptor.formula.clone(),
            created_at: now,
        };
        db.links.insert(link.id, link);
    }

    debug!(form_id = %form_id, total = descriptors.len(), created, "field catalog reconciled");
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_models::FieldType;

    fn descriptor(name: &str, formula: &str) -> PlaceholderDescriptor {
        PlaceholderDescriptor {
            name: name.to_string(),
            field_type: FieldType::Text,
            description: name.to_string(),
            is_required: false,
            is_upper_case: false,
            formula: formula.to_string(),
        }
    }

    #[test]
    fn test_creates_new_definitions_and_links() {
        let mut db = DbState::default();
        let form_id = Uuid::new_v4();

        let created = reconcile(
            &mut db,
            form_id,
            &[descriptor("Name", "{t_Name}"), descriptor("Date", "[d_Date]")],
        );

        assert_eq!(created, 2);
        assert_eq!(db.fields.len(), 2);
        assert_eq!(db.links_for_form(form_id).len(), 2);
    }

    #[test]
    fn test_reuses_definition_across_forms() {
        let mut db = DbState::default();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let created_a = reconcile(&mut db, first, &[descriptor("Name", "{t_Name}")]);
        let created_b = reconcile(&mut db, second, &[descriptor("name", "{t_name}")]);

        assert_eq!(created_a, 1);
        assert_eq!(created_b, 0);
        // One shared definition, one link per form.
        assert_eq!(db.fields.len(), 1);
        assert_eq!(db.links_for_form(first).len(), 1);
        assert_eq!(db.links_for_form(second).len(), 1);
    }

    #[test]
    fn test_reuse_never_overwrites_metadata() {
        let mut db = DbState::default();
        reconcile(&mut db, Uuid::new_v4(), &[descriptor("Name", "{t_Name}")]);

        let mut changed = descriptor("Name", "{t_Name*}");
        changed.is_required = true;
        changed.field_type = FieldType::Textarea;
        reconcile(&mut db, Uuid::new_v4(), &[changed]);

        let field = db.find_field_by_name("Name").unwrap();
        assert!(!field.is_required);
        assert_eq!(field.field_type, FieldType::Text);
    }

    #[test]
    fn test_link_carries_raw_formula() {
        let mut db = DbState::default();
        let form_id = Uuid::new_v4();
        reconcile(&mut db, form_id, &[descriptor("Purser", "{c_Purser}")]);

        assert_eq!(db.links_for_form(form_id)[0].formula, "{c_Purser}");
    }
}
