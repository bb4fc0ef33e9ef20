//! Read-only views over [`ConsoleState`]. Nothing here is cached; every call
//! is a handful of map lookups.

use shared::{
    domain::{Entity, EntityId, EntityType, ViewKey},
    error::ApiError,
};

use crate::{
    inline_edit::PendingRow,
    reducer::ConsoleState,
    view::ViewState,
};

pub fn get_entity<'a>(
    state: &'a ConsoleState,
    entity_type: &EntityType,
    id: &EntityId,
) -> Option<&'a Entity> {
    state.entities().get(entity_type, id)
}

/// One slot per requested id, in request order. Missing ids yield `None`.
pub fn get_entities<'a>(
    state: &'a ConsoleState,
    entity_type: &EntityType,
    ids: &[EntityId],
) -> Vec<Option<&'a Entity>> {
    ids.iter()
        .map(|id| state.entities().get(entity_type, id))
        .collect()
}

pub fn get_view_state<'a>(state: &'a ConsoleState, view_key: &ViewKey) -> Option<&'a ViewState> {
    state.view(view_key)
}

pub fn is_loading(state: &ConsoleState, view_key: &ViewKey) -> bool {
    state.view(view_key).is_some_and(|view| view.loading)
}

pub fn view_error<'a>(state: &'a ConsoleState, view_key: &ViewKey) -> Option<&'a ApiError> {
    state.view(view_key)?.error.as_ref()
}

/// Rows of a view resolved against the store, skipping ids that no longer
/// resolve.
pub fn view_entities<'a>(state: &'a ConsoleState, view_key: &ViewKey) -> Vec<&'a Entity> {
    let Some(view) = state.view(view_key) else {
        return Vec::new();
    };
    let Some(entity_type) = view.entity_type.as_ref() else {
        return Vec::new();
    };
    view.ids
        .iter()
        .filter_map(|id| state.entities().get(entity_type, id))
        .collect()
}

pub fn editing_id<'a>(state: &'a ConsoleState, view_key: &ViewKey) -> Option<&'a EntityId> {
    state.edits(view_key)?.editing_id()
}

pub fn pending_rows<'a>(state: &'a ConsoleState, view_key: &ViewKey) -> Vec<&'a PendingRow> {
    state
        .edits(view_key)
        .map(|edits| edits.pending.iter().collect())
        .unwrap_or_default()
}

/// `(processed, total)` of the current or last bulk run.
pub fn bulk_progress(state: &ConsoleState) -> Option<(usize, usize)> {
    state
        .bulk()
        .map(|run| (run.processed_count, run.total_count))
}

pub fn bulk_running(state: &ConsoleState) -> bool {
    state.bulk().is_some_and(|run| run.running)
}
