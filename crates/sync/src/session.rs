//! Form sessions
//!
//! A [`FormSession`] is one open create/edit form: its cascade controller,
//! its values and errors, and the mount that guards every async result. It
//! is the glue between the pure form model and the shared cache:
//!
//! - level options load through the cache, scoped by the parent's value
//! - submit validates locally first (disabled levels skipped) and reaches
//!   the network only when the form is valid
//! - a failed submit keeps every entered value and shows the server message
//! - closing the form drops results that arrive afterwards

use crate::cache::{MutationIntent, QuerySnapshot, ResourceQueryCache};
use campus_core::{ConsoleError, ConsoleResult, Entity, EntityId, Mount, Resource, ResourceApi};
use campus_forms::{
    CascadingSelectionController, ErrorMap, FormContext, FormKind, FormValue, FormValues, RuleSet,
    SelectionEvent, SelectionSeed, SelectionState, rules_for, validate_ignoring,
    write_only_fields,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct SessionState {
    controller: CascadingSelectionController,
    values: FormValues,
    errors: ErrorMap,
    editing: Option<EntityId>,
}

/// One open form
pub struct FormSession<A> {
    kind: FormKind,
    cache: Arc<ResourceQueryCache<A>>,
    rules: RuleSet,
    /// Rules once a record is loaded or created; write-only fields optional
    edit_rules: RuleSet,
    options_limit: u32,
    mount: Mount,
    state: Mutex<SessionState>,
}

impl<A: ResourceApi> FormSession<A> {
    /// A blank create form
    pub fn new(
        kind: FormKind,
        cache: Arc<ResourceQueryCache<A>>,
        options_limit: u32,
    ) -> ConsoleResult<Self> {
        Ok(Self {
            kind,
            cache,
            rules: rules_for(kind, &FormContext::Create)?,
            edit_rules: rules_for(kind, &FormContext::Edit)?,
            options_limit,
            mount: Mount::new(),
            state: Mutex::new(SessionState {
                controller: CascadingSelectionController::new(kind),
                values: FormValues::new(),
                errors: ErrorMap::new(),
                editing: None,
            }),
        })
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn values(&self) -> FormValues {
        self.lock().values.clone()
    }

    pub fn errors(&self) -> ErrorMap {
        self.lock().errors.clone()
    }

    pub fn selection(&self) -> SelectionState {
        self.lock().controller.state().clone()
    }

    /// Id of the record being edited, `None` in create mode
    pub fn editing(&self) -> Option<EntityId> {
        self.lock().editing
    }

    pub fn mount_handle(&self) -> &Mount {
        &self.mount
    }

    /// Create form opened from a parent's page; the parent's levels are locked
    pub async fn open_scoped(&self, scope: Resource, parent_id: EntityId) -> ConsoleResult<()> {
        self.mount.retarget();
        let token = self.mount.token();
        let parent = self.cache.get(scope, parent_id).await?;
        let seed = SelectionSeed::scoped(self.kind, scope, &parent)?;

        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.controller.apply_if_active(&token, SelectionEvent::Seed(seed)) {
            return Err(ConsoleError::Cancelled);
        }
        state.values = FormValues::new();
        state.controller.state().write_into(&mut state.values);
        state.errors = ErrorMap::new();
        state.editing = None;
        Ok(())
    }

    /// Load a record into the form
    pub async fn open_edit(&self, id: EntityId) -> ConsoleResult<()> {
        self.mount.retarget();
        let token = self.mount.token();
        let entity = self.cache.get(self.kind.resource(), id).await?;
        let seed = SelectionSeed::from_entity(self.kind, &entity);

        let mut state = self.lock();
        if !state.controller.apply_if_active(&token, SelectionEvent::Seed(seed)) {
            return Err(ConsoleError::Cancelled);
        }
        state.values = FormValues::from_entity(&entity);
        state.errors = ErrorMap::new();
        state.editing = Some(id);
        tracing::debug!(form = %self.kind, id, "loaded record for editing");
        Ok(())
    }

    /// Pick a cascade level's value; every level below is cleared
    pub fn select(&self, index: usize, value: Option<EntityId>) -> ConsoleResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.controller.set_level(index, value)?;
        state.controller.state().write_into(&mut state.values);
        let field = state.controller.levels()[index].field;
        let rules = self.active_rules(state.editing);
        state.errors.revalidate_field(&state.values, rules, field);
        Ok(())
    }

    /// Options of a cascade level; `None` while its parent is empty
    pub async fn options(&self, index: usize) -> ConsoleResult<Option<QuerySnapshot>> {
        let query = self.lock().controller.options_query(index, self.options_limit)?;
        let Some(query) = query else {
            return Ok(None);
        };
        let token = self.mount.token();
        let snapshot = self.cache.fetch(&query).await?;
        if !token.is_active() {
            return Err(ConsoleError::Cancelled);
        }
        Ok(Some(snapshot))
    }

    /// Set a plain field and recompute the errors it affects
    pub fn set_value(&self, field: &str, value: impl Into<FormValue>) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.values.set(field, value);
        let rules = self.active_rules(state.editing);
        state.errors.revalidate_field(&state.values, rules, field);
    }

    /// Validate without submitting
    pub fn check(&self) -> ErrorMap {
        let mut state = self.lock();
        let disabled = state.controller.disabled_fields();
        let rules = self.active_rules(state.editing);
        let errors = validate_ignoring(&state.values, rules, &disabled);
        state.errors = errors.clone();
        errors
    }

    /// Validate, then create or update the record
    ///
    /// Invalid forms never reach the network. On failure the entered values
    /// stay as they are and the error is merged into [`errors`](Self::errors).
    pub async fn submit(&self) -> ConsoleResult<Entity> {
        let errors = self.check();
        if !errors.is_valid() {
            return Err(ConsoleError::validation(errors.into_inner()));
        }

        let (intent, token) = {
            let state = self.lock();
            let disabled = state.controller.disabled_fields();
            let mut payload = state.values.to_payload();
            payload.retain(|field, _| !disabled.iter().any(|d| *d == field.as_str()));
            if state.editing.is_some() {
                // A blank write-only field keeps the stored value
                for field in write_only_fields(self.kind) {
                    if state.values.get(field).is_blank() {
                        payload.remove(*field);
                    }
                }
            }
            let resource = self.kind.resource();
            let intent = match state.editing {
                Some(id) => MutationIntent::update(resource, id, payload),
                None => MutationIntent::create(resource, payload),
            };
            (intent, self.mount.token())
        };

        let result = self.cache.mutate(intent).await;
        if !token.is_active() {
            tracing::warn!(form = %self.kind, "form closed before submit resolved");
            return Err(ConsoleError::Cancelled);
        }

        let mut state = self.lock();
        match result {
            Ok(Some(entity)) => {
                state.editing = Some(entity.id);
                Ok(entity)
            }
            Ok(None) => Err(ConsoleError::internal("save returned no record")),
            Err(err) => {
                state.errors.merge_server(&err);
                Err(err)
            }
        }
    }

    /// Close the form; results arriving later are dropped
    pub fn close(&self) {
        self.mount.dispose();
    }

    fn active_rules(&self, editing: Option<EntityId>) -> &RuleSet {
        match editing {
            Some(_) => &self.edit_rules,
            None => &self.rules,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================
