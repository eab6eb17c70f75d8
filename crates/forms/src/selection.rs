//! Cascading selection
//!
//! The selection state of a form is one slot per cascade level. Every write
//! goes through [`reduce`], a pure `(state, event) -> state` function, so the
//! "changing a level clears every level below it" rule lives in exactly one
//! place. [`CascadingSelectionController`] owns the state of one form
//! instance and adds the option-query and mount-guard plumbing around it.

use crate::hierarchy::{FormContext, FormKind, LevelSpec, locked_levels};
use crate::values::{FormValue, FormValues};
use campus_core::{
    ConsoleError, ConsoleResult, Entity, EntityId, MountToken, Pagination, QueryFilters, QueryKey,
    Resource,
};

// ============================================================================
// State
// ============================================================================

/// One level of the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSlot {
    pub spec: LevelSpec,
    pub value: Option<EntityId>,
    /// Pre-selected from the parent page and read-only
    pub locked: bool,
}

/// Selection state of one form instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub kind: FormKind,
    pub levels: Vec<LevelSlot>,
}

impl SelectionState {
    /// Every level empty and unlocked
    pub fn blank(kind: FormKind) -> Self {
        Self {
            kind,
            levels: kind
                .levels()
                .iter()
                .map(|spec| LevelSlot {
                    spec: *spec,
                    value: None,
                    locked: false,
                })
                .collect(),
        }
    }

    pub fn value(&self, index: usize) -> Option<EntityId> {
        self.levels.get(index).and_then(|slot| slot.value)
    }

    /// Whether the level accepts input: its ancestors all hold a value and it
    /// is not locked
    pub fn is_enabled(&self, index: usize) -> bool {
        let Some(slot) = self.levels.get(index) else {
            return false;
        };
        if slot.locked {
            return false;
        }
        let mut parent = slot.spec.parent;
        while let Some(p) = parent {
            if self.value(p).is_none() {
                return false;
            }
            parent = self.levels.get(p).and_then(|s| s.spec.parent);
        }
        true
    }

    /// Copy the selected ids into the form values
    pub fn write_into(&self, values: &mut FormValues) {
        for slot in &self.levels {
            values.set(slot.spec.field, FormValue::from(slot.value));
        }
    }
}

/// Input to the selection reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Replace the whole state; no cascade resets
    Seed(SelectionSeed),
    /// A user picked (or cleared) a level's value
    Set {
        index: usize,
        value: Option<EntityId>,
    },
    /// Back to a blank form, keeping locked levels
    Clear,
}

/// Apply one event to a selection state
///
/// Setting a level to its current value, or setting a disabled or unknown
/// level, returns the state unchanged.
pub fn reduce(state: &SelectionState, event: &SelectionEvent) -> SelectionState {
    let mut next = state.clone();
    match event {
        SelectionEvent::Seed(seed) => {
            for (index, slot) in next.levels.iter_mut().enumerate() {
                slot.value = seed.values.get(index).copied().flatten();
                slot.locked = seed.locked.get(index).copied().unwrap_or(false);
            }
        }
        SelectionEvent::Set { index, value } => {
            let index = *index;
            if !state.is_enabled(index) || state.value(index) == *value {
                return next;
            }
            next.levels[index].value = *value;
            for slot in next.levels.iter_mut().skip(index + 1) {
                slot.value = None;
            }
        }
        SelectionEvent::Clear => {
            for slot in next.levels.iter_mut().filter(|slot| !slot.locked) {
                slot.value = None;
            }
        }
    }
    next
}

// ============================================================================
// Seeds
// ============================================================================

/// Initial values and locks of a selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSeed {
    pub values: Vec<Option<EntityId>>,
    pub locked: Vec<bool>,
}

impl SelectionSeed {
    /// Nothing selected, nothing locked
    pub fn blank() -> Self {
        Self::default()
    }

    /// Edit mode: read each level's id field from the record
    pub fn from_entity(kind: FormKind, entity: &Entity) -> Self {
        Self {
            values: kind
                .levels()
                .iter()
                .map(|level| entity.id_field(level.field))
                .collect(),
            locked: Vec::new(),
        }
    }

    /// Create mode opened from a parent's page
    ///
    /// The level backed by `parent`'s resource takes the parent's id; the
    /// levels above it are read from the parent's own id fields. All of them
    /// are locked.
    pub fn scoped(kind: FormKind, scope: Resource, parent: &Entity) -> ConsoleResult<Self> {
        let locked = locked_levels(kind, &FormContext::ScopedCreate { scope })?;
        let values = kind
            .levels()
            .iter()
            .zip(&locked)
            .map(|(level, locked)| match (*locked, level.resource == scope) {
                (true, true) => Some(parent.id),
                (true, false) => parent.id_field(level.field),
                (false, _) => None,
            })
            .collect();
        Ok(Self { values, locked })
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Owns the selection state of one form instance
#[derive(Debug, Clone)]
pub struct CascadingSelectionController {
    state: SelectionState,
}

impl CascadingSelectionController {
    pub fn new(kind: FormKind) -> Self {
        Self {
            state: SelectionState::blank(kind),
        }
    }

    pub fn kind(&self) -> FormKind {
        self.state.kind
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn levels(&self) -> &'static [LevelSpec] {
        self.state.kind.levels()
    }

    /// Seed the state (edit mode or scoped create); no cascade resets
    pub fn initialize(&mut self, seed: SelectionSeed) -> &SelectionState {
        self.state = reduce(&self.state, &SelectionEvent::Seed(seed));
        &self.state
    }

    /// Set a level's value and clear every level below it
    pub fn set_level(
        &mut self,
        index: usize,
        value: Option<EntityId>,
    ) -> ConsoleResult<&SelectionState> {
        self.check_index(index)?;
        let next = reduce(&self.state, &SelectionEvent::Set { index, value });
        if next != self.state {
            let cleared = self.levels().len() - index - 1;
            tracing::debug!(
                form = %self.kind(),
                level = self.levels()[index].name,
                ?value,
                cleared,
                "selection changed"
            );
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Index of a level by name (`"program"`) or field (`"program_id"`)
    pub fn level_index(&self, name: &str) -> ConsoleResult<usize> {
        self.levels()
            .iter()
            .position(|level| level.name == name || level.field == name)
            .ok_or_else(|| self.unknown_level(name))
    }

    pub fn is_level_enabled(&self, index: usize) -> bool {
        self.state.is_enabled(index)
    }

    /// Query that loads the options of a level
    ///
    /// `None` while the scoping parent is empty: there is nothing to list yet.
    pub fn options_query(&self, index: usize, limit: u32) -> ConsoleResult<Option<QueryKey>> {
        self.check_index(index)?;
        let level = &self.levels()[index];
        let mut filters = QueryFilters::none();
        if let (Some(parent), Some(param)) = (level.parent, level.scope_param) {
            match self.state.value(parent) {
                Some(id) => filters = filters.with_scope(param, id),
                None => return Ok(None),
            }
        }
        Ok(Some(QueryKey::new(
            level.resource,
            Pagination::first(limit)?,
            filters,
        )))
    }

    /// Fields of the levels that currently accept no input
    ///
    /// Locked levels are excluded: their pre-selected values are submitted and
    /// still validated.
    pub fn disabled_fields(&self) -> Vec<&'static str> {
        self.state
            .levels
            .iter()
            .enumerate()
            .filter(|(index, slot)| !slot.locked && !self.state.is_enabled(*index))
            .map(|(_, slot)| slot.spec.field)
            .collect()
    }

    /// Apply an event that resolved asynchronously, unless its mount has
    /// since been closed or retargeted
    pub fn apply_if_active(&mut self, token: &MountToken, event: SelectionEvent) -> bool {
        if !token.is_active() {
            tracing::warn!(
                mount = %token.mount_id(),
                form = %self.kind(),
                "dropping stale selection result"
            );
            return false;
        }
        self.state = reduce(&self.state, &event);
        true
    }

    fn check_index(&self, index: usize) -> ConsoleResult<()> {
        if index < self.levels().len() {
            Ok(())
        } else {
            Err(self.unknown_level(&index.to_string()))
        }
    }

    fn unknown_level(&self, level: &str) -> ConsoleError {
        ConsoleError::UnknownLevel {
            form: self.kind().name().to_string(),
            level: level.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
