use im::Vector;
use shared::{
    domain::{EntityId, EntityType},
    error::ApiError,
    protocol::CollectionQuery,
};

/// Monotonic per-view counter bumped by every collection request.
pub type Generation = u64;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub ids: Vector<EntityId>,
    pub entity_type: Option<EntityType>,
    pub query: Option<CollectionQuery>,
    pub loading: bool,
    pub total: Option<u64>,
    pub error: Option<ApiError>,
    pub generation: Generation,
}

impl ViewState {
    /// A response tagged with an older generation than the latest request
    /// belongs to a superseded fetch. Untagged responses are never stale.
    pub fn is_stale(&self, generation: Option<Generation>) -> bool {
        matches!(generation, Some(generation) if generation < self.generation)
    }

    pub fn shows(&self, entity_type: &EntityType) -> bool {
        self.entity_type.as_ref().map_or(true, |own| own == entity_type)
    }

    pub(crate) fn push_id(&mut self, id: EntityId) {
        if !self.ids.contains(&id) {
            self.ids.push_back(id);
        }
    }

    pub(crate) fn replace_ids(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.ids = Vector::new();
        for id in ids {
            self.push_id(id);
        }
    }

    pub(crate) fn remove_id(&mut self, id: &EntityId) {
        self.ids.retain(|existing| existing != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_ids_dedups_keeping_first_position() {
        let mut view = ViewState::default();
        view.replace_ids(["u2", "u1", "u2"].map(EntityId::from));
        assert_eq!(
            view.ids.iter().cloned().collect::<Vec<_>>(),
            vec![EntityId::from("u2"), EntityId::from("u1")]
        );
    }

    #[test]
    fn staleness_only_applies_to_older_tagged_responses() {
        let view = ViewState {
            generation: 3,
            ..ViewState::default()
        };
        assert!(view.is_stale(Some(2)));
        assert!(!view.is_stale(Some(3)));
        assert!(!view.is_stale(None));
    }
}
