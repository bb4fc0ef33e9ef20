use im::HashMap;
use shared::domain::{Entity, EntityType, ViewKey};

use crate::{
    bulk::BulkActionRun,
    inline_edit::InlineEditState,
    session::SessionSnapshot,
    store::EntityStore,
    transition::Transition,
    view::ViewState,
};

/// Aggregate console state. Cloning is cheap; transitions never touch a state
/// that has already been handed out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleState {
    entities: EntityStore,
    views: HashMap<ViewKey, ViewState>,
    edits: HashMap<ViewKey, InlineEditState>,
    bulk: Option<BulkActionRun>,
}

impl ConsoleState {
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn view(&self, view_key: &ViewKey) -> Option<&ViewState> {
        self.views.get(view_key)
    }

    pub fn views(&self) -> impl Iterator<Item = (&ViewKey, &ViewState)> {
        self.views.iter()
    }

    pub fn edits(&self, view_key: &ViewKey) -> Option<&InlineEditState> {
        self.edits.get(view_key)
    }

    pub fn bulk(&self) -> Option<&BulkActionRun> {
        self.bulk.as_ref()
    }

    /// Consumes the state and returns its successor.
    pub fn apply(mut self, transition: Transition) -> Self {
        self.apply_in_place(transition);
        self
    }

    fn view_mut(&mut self, view_key: &ViewKey) -> &mut ViewState {
        self.views
            .entry(view_key.clone())
            .or_insert_with(ViewState::default)
    }

    fn edits_mut(&mut self, view_key: &ViewKey) -> &mut InlineEditState {
        self.edits
            .entry(view_key.clone())
            .or_insert_with(InlineEditState::default)
    }

    fn apply_in_place(&mut self, transition: Transition) {
        match transition {
            Transition::RequestCollection { view_key, query } => {
                let view = self.view_mut(&view_key);
                view.generation += 1;
                view.loading = true;
                view.query = Some(query);
                view.error = None;
            }
            Transition::ReceiveCollection {
                view_key,
                entity_type,
                entities,
                total,
                query,
                generation,
            } => {
                if self.view_mut(&view_key).is_stale(generation) {
                    return;
                }
                let ids: Vec<_> = entities.iter().map(|entity| entity.id.clone()).collect();
                for entity in entities {
                    self.entities.upsert(&entity_type, entity);
                }
                let view = self.view_mut(&view_key);
                view.replace_ids(ids);
                view.entity_type = Some(entity_type);
                view.query = Some(query);
                view.total = Some(total);
                view.loading = false;
                view.error = None;
            }
            Transition::RequestSingle { view_key, id: _ } => {
                let view = self.view_mut(&view_key);
                view.loading = true;
                view.error = None;
            }
            Transition::ReceiveSingle {
                view_key,
                entity_type,
                entity,
            } => {
                self.merge_into_view(&view_key, &entity_type, entity);
                self.view_mut(&view_key).loading = false;
            }
            Transition::ReceiveError {
                view_key,
                error,
                generation,
            } => {
                let view = self.view_mut(&view_key);
                if view.is_stale(generation) {
                    return;
                }
                view.loading = false;
                view.error = Some(error);
            }
            Transition::DeleteEntity { entity_type, id } => {
                self.entities.remove(&entity_type, &id);
                for (view_key, view) in self.views.iter_mut() {
                    if !view.shows(&entity_type) {
                        continue;
                    }
                    view.remove_id(&id);
                    if let Some(edits) = self.edits.get_mut(view_key) {
                        if edits.editing_id() == Some(&id) {
                            edits.take_editing();
                        }
                    }
                }
            }
            Transition::ClearCollection {
                entity_type,
                view_key,
            } => {
                self.entities.clear_type(&entity_type);
                let view = self.view_mut(&view_key);
                view.ids = Default::default();
                view.total = Some(0);
            }
            Transition::StartEdit { view_key, id } => {
                self.edits_mut(&view_key).start(id);
            }
            Transition::UpdateScratch {
                view_key,
                field,
                value,
            } => {
                self.edits_mut(&view_key).set_scratch(field, value);
            }
            Transition::CancelEdit { view_key } => {
                self.edits_mut(&view_key).take_editing();
            }
            Transition::ApplyEdit {
                view_key,
                entity_type,
                id,
            } => {
                let edits = self.edits_mut(&view_key);
                if edits.editing_id() != Some(&id) {
                    return;
                }
                let Some(session) = edits.take_editing() else {
                    return;
                };
                let entity = Entity {
                    id: session.id,
                    fields: session.scratch,
                };
                self.merge_into_view(&view_key, &entity_type, entity);
            }
            Transition::AddPending {
                view_key,
                placeholder_id,
                draft,
            } => {
                self.edits_mut(&view_key).add_pending(placeholder_id, draft);
            }
            Transition::UpdatePending {
                view_key,
                placeholder_id,
                field,
                value,
            } => {
                self.edits_mut(&view_key)
                    .set_pending_field(&placeholder_id, field, value);
            }
            Transition::RemovePending {
                view_key,
                placeholder_id,
            } => {
                self.edits_mut(&view_key).remove_pending(&placeholder_id);
            }
            Transition::ConfirmPending {
                view_key,
                placeholder_id,
                entity_type,
                entity,
            } => {
                self.edits_mut(&view_key).remove_pending(&placeholder_id);
                self.view_mut(&view_key).remove_id(&placeholder_id);
                self.merge_into_view(&view_key, &entity_type, entity);
            }
            Transition::BulkStart { action, count } => {
                self.bulk = Some(BulkActionRun::start(action, count));
            }
            Transition::BulkAdvance { outcome } => {
                if let Some(run) = self.bulk.as_mut() {
                    run.advance(outcome);
                }
            }
            Transition::BulkStop => {
                if let Some(run) = self.bulk.as_mut() {
                    run.stop();
                }
            }
            Transition::Rehydrate { snapshot } => self.rehydrate(snapshot),
        }
    }

    fn merge_into_view(&mut self, view_key: &ViewKey, entity_type: &EntityType, entity: Entity) {
        let id = entity.id.clone();
        self.entities.merge(entity_type, entity);
        let view = self.view_mut(view_key);
        if !view.shows(entity_type) {
            return;
        }
        if view.entity_type.is_none() {
            view.entity_type = Some(entity_type.clone());
        }
        view.push_id(id);
    }

    fn rehydrate(&mut self, snapshot: SessionSnapshot) {
        for (view_key, persisted) in snapshot.views {
            if let Some(query) = persisted.query {
                self.view_mut(&view_key).query = Some(query);
            }
        }
    }
}

/// The console's state transition function.
pub fn reduce(state: &ConsoleState, transition: Transition) -> ConsoleState {
    state.clone().apply(transition)
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
