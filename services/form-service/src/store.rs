//! In-memory persistence with an atomic unit of work.
//!
//! Every table lives behind one lock so a transaction can touch forms,
//! fields and links together. `begin` takes the write lock and clones the
//! state; mutations hit the working copy; `commit` swaps it back. Dropping
//! the unit of work without committing leaves the shared state untouched,
//! which is the rollback path.

use formflow_models::{
    Category, FieldDefinition, Form, FormFieldLink, FormSubmission, SubmissionHistory, User,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock, RwLockReadGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct DbState {
    pub forms: HashMap<Uuid, Form>,
    pub fields: HashMap<Uuid, FieldDefinition>,
    pub links: HashMap<Uuid, FormFieldLink>,
    pub submissions: HashMap<Uuid, FormSubmission>,
    pub history: HashMap<Uuid, SubmissionHistory>,
    pub users: HashMap<Uuid, User>,
    pub categories: HashMap<Uuid, Category>,
}

impl DbState {
    /// Field lookup by display name, case-insensitive.
    pub fn find_field_by_name(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .values()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Links for a form in creation order.
    pub fn links_for_form(&self, form_id: Uuid) -> Vec<&FormFieldLink> {
        let mut links: Vec<_> = self
            .links
            .values()
            .filter(|l| l.form_id == form_id)
            .collect();
        links.sort_by_key(|l| l.created_at);
        links
    }

    /// Most recent submission for a form across all users, last-write-wins
    /// by timestamp.
    pub fn latest_submission_for_form(&self, form_id: Uuid) -> Option<&FormSubmission> {
        self.submissions
            .values()
            .filter(|s| s.form_id == form_id)
            .max_by_key(|s| s.last_updated)
    }

    pub fn submission_for(&self, form_id: Uuid, user_id: Uuid) -> Option<&FormSubmission> {
        self.submissions
            .values()
            .find(|s| s.form_id == form_id && s.user_id == user_id)
    }

    /// Resolve a category by name or create it, returning its id.
    pub fn ensure_category(&mut self, name: &str) -> Uuid {
        if let Some(existing) = self
            .categories
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
        {
            return existing.id;
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id: None,
        };
        let id = category.id;
        self.categories.insert(id, category);
        id
    }
}

#[derive(Clone, Default)]
pub struct Store {
    state: Arc<RwLock<DbState>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, DbState> {
        self.state.read().await
    }

    /// Start a transaction. The write lock is held until commit or drop, so
    /// transactions serialize and commits are all-or-nothing.
    pub async fn begin(&self) -> UnitOfWork {
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        UnitOfWork { guard, working }
    }

    /// Convenience for seeding outside a transaction.
    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }
}

pub struct UnitOfWork {
    guard: OwnedRwLockWriteGuard<DbState>,
    working: DbState,
}

impl UnitOfWork {
    pub fn state(&self) -> &DbState {
        &self.working
    }

    pub fn state_mut(&mut self) -> &mut DbState {
        &mut self.working
    }

    /// Publish the working copy. Not calling this (dropping instead) rolls
    /// back.
    pub fn commit(mut self) {
        *self.guard = self.working;
    }
}
