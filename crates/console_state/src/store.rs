use im::HashMap;
use shared::domain::{Entity, EntityId, EntityType};

type Bucket = HashMap<EntityId, Entity>;

/// One live snapshot per `(type, id)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    by_type: HashMap<EntityType, Bucket>,
}

impl EntityStore {
    pub fn get(&self, entity_type: &EntityType, id: &EntityId) -> Option<&Entity> {
        self.by_type.get(entity_type)?.get(id)
    }

    pub fn contains(&self, entity_type: &EntityType, id: &EntityId) -> bool {
        self.get(entity_type, id).is_some()
    }

    pub fn count(&self, entity_type: &EntityType) -> usize {
        self.by_type.get(entity_type).map_or(0, |bucket| bucket.len())
    }

    pub fn types(&self) -> impl Iterator<Item = &EntityType> {
        self.by_type.keys()
    }

    /// Replaces whatever was stored under the entity's id.
    pub(crate) fn upsert(&mut self, entity_type: &EntityType, entity: Entity) {
        self.bucket_mut(entity_type)
            .insert(entity.id.clone(), entity);
    }

    /// Deep-merges into the stored record, or inserts when absent.
    pub(crate) fn merge(&mut self, entity_type: &EntityType, entity: Entity) {
        let bucket = self.bucket_mut(entity_type);
        match bucket.get_mut(&entity.id) {
            Some(existing) => existing.merge_from(&entity.fields),
            None => {
                bucket.insert(entity.id.clone(), entity);
            }
        }
    }

    pub(crate) fn remove(&mut self, entity_type: &EntityType, id: &EntityId) -> Option<Entity> {
        self.by_type.get_mut(entity_type)?.remove(id)
    }

    pub(crate) fn clear_type(&mut self, entity_type: &EntityType) {
        self.by_type.insert(entity_type.clone(), Bucket::new());
    }

    fn bucket_mut(&mut self, entity_type: &EntityType) -> &mut Bucket {
        self.by_type
            .entry(entity_type.clone())
            .or_insert_with(Bucket::new)
    }
}
