use serde_json::{Map, Value};
use shared::{
    domain::{Entity, EntityId, EntityType, ViewKey},
    error::ApiError,
    protocol::CollectionQuery,
};

use crate::{
    bulk::{BulkAction, UnitOutcome},
    session::SessionSnapshot,
    view::Generation,
};

/// Every state change the console can make. Applied by [`crate::reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    RequestCollection {
        view_key: ViewKey,
        query: CollectionQuery,
    },
    ReceiveCollection {
        view_key: ViewKey,
        entity_type: EntityType,
        entities: Vec<Entity>,
        total: u64,
        query: CollectionQuery,
        generation: Option<Generation>,
    },
    RequestSingle {
        view_key: ViewKey,
        id: EntityId,
    },
    ReceiveSingle {
        view_key: ViewKey,
        entity_type: EntityType,
        entity: Entity,
    },
    ReceiveError {
        view_key: ViewKey,
        error: ApiError,
        generation: Option<Generation>,
    },
    DeleteEntity {
        entity_type: EntityType,
        id: EntityId,
    },
    ClearCollection {
        entity_type: EntityType,
        view_key: ViewKey,
    },
    StartEdit {
        view_key: ViewKey,
        id: EntityId,
    },
    UpdateScratch {
        view_key: ViewKey,
        field: String,
        value: Value,
    },
    CancelEdit {
        view_key: ViewKey,
    },
    /// Commits the saved scratch of `id`. If another row is being edited by
    /// the time the save lands, that session is left open.
    ApplyEdit {
        view_key: ViewKey,
        entity_type: EntityType,
        id: EntityId,
    },
    AddPending {
        view_key: ViewKey,
        placeholder_id: EntityId,
        draft: Map<String, Value>,
    },
    UpdatePending {
        view_key: ViewKey,
        placeholder_id: EntityId,
        field: String,
        value: Value,
    },
    RemovePending {
        view_key: ViewKey,
        placeholder_id: EntityId,
    },
    ConfirmPending {
        view_key: ViewKey,
        placeholder_id: EntityId,
        entity_type: EntityType,
        entity: Entity,
    },
    BulkStart {
        action: BulkAction,
        count: usize,
    },
    BulkAdvance {
        outcome: UnitOutcome,
    },
    BulkStop,
    Rehydrate {
        snapshot: SessionSnapshot,
    },
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestCollection { .. } => "request_collection",
            Self::ReceiveCollection { .. } => "receive_collection",
            Self::RequestSingle { .. } => "request_single",
            Self::ReceiveSingle { .. } => "receive_single",
            Self::ReceiveError { .. } => "receive_error",
            Self::DeleteEntity { .. } => "delete_entity",
            Self::ClearCollection { .. } => "clear_collection",
            Self::StartEdit { .. } => "start_edit",
            Self::UpdateScratch { .. } => "update_scratch",
            Self::CancelEdit { .. } => "cancel_edit",
            Self::ApplyEdit { .. } => "apply_edit",
            Self::AddPending { .. } => "add_pending",
            Self::UpdatePending { .. } => "update_pending",
            Self::RemovePending { .. } => "remove_pending",
            Self::ConfirmPending { .. } => "confirm_pending",
            Self::BulkStart { .. } => "bulk_start",
            Self::BulkAdvance { .. } => "bulk_advance",
            Self::BulkStop => "bulk_stop",
            Self::Rehydrate { .. } => "rehydrate",
        }
    }

    /// View the transition is scoped to, if any.
    pub fn view_key(&self) -> Option<&ViewKey> {
        match self {
            Self::RequestCollection { view_key, .. }
            | Self::ReceiveCollection { view_key, .. }
            | Self::RequestSingle { view_key, .. }
            | Self::ReceiveSingle { view_key, .. }
            | Self::ReceiveError { view_key, .. }
            | Self::ClearCollection { view_key, .. }
            | Self::StartEdit { view_key, .. }
            | Self::UpdateScratch { view_key, .. }
            | Self::CancelEdit { view_key }
            | Self::ApplyEdit { view_key, .. }
            | Self::AddPending { view_key, .. }
            | Self::UpdatePending { view_key, .. }
            | Self::RemovePending { view_key, .. }
            | Self::ConfirmPending { view_key, .. } => Some(view_key),
            Self::DeleteEntity { .. }
            | Self::BulkStart { .. }
            | Self::BulkAdvance { .. }
            | Self::BulkStop
            | Self::Rehydrate { .. } => None,
        }
    }
}

pub fn request_collection(view_key: impl Into<ViewKey>, query: CollectionQuery) -> Transition {
    Transition::RequestCollection {
        view_key: view_key.into(),
        query,
    }
}

pub fn receive_collection(
    view_key: impl Into<ViewKey>,
    entity_type: impl Into<EntityType>,
    entities: Vec<Entity>,
    total: u64,
    query: CollectionQuery,
) -> Transition {
    Transition::ReceiveCollection {
        view_key: view_key.into(),
        entity_type: entity_type.into(),
        entities,
        total,
        query,
        generation: None,
    }
}

/// Like [`receive_collection`] but dropped if a newer request was issued for
/// the view after `generation`.
pub fn receive_collection_for(
    view_key: impl Into<ViewKey>,
    entity_type: impl Into<EntityType>,
    entities: Vec<Entity>,
    total: u64,
    query: CollectionQuery,
    generation: Generation,
) -> Transition {
    Transition::ReceiveCollection {
        view_key: view_key.into(),
        entity_type: entity_type.into(),
        entities,
        total,
        query,
        generation: Some(generation),
    }
}

pub fn request_single(view_key: impl Into<ViewKey>, id: impl Into<EntityId>) -> Transition {
    Transition::RequestSingle {
        view_key: view_key.into(),
        id: id.into(),
    }
}

pub fn receive_single(
    view_key: impl Into<ViewKey>,
    entity_type: impl Into<EntityType>,
    entity: Entity,
) -> Transition {
    Transition::ReceiveSingle {
        view_key: view_key.into(),
        entity_type: entity_type.into(),
        entity,
    }
}

pub fn receive_error(view_key: impl Into<ViewKey>, error: ApiError) -> Transition {
    Transition::ReceiveError {
        view_key: view_key.into(),
        error,
        generation: None,
    }
}

pub fn receive_error_for(
    view_key: impl Into<ViewKey>,
    error: ApiError,
    generation: Generation,
) -> Transition {
    Transition::ReceiveError {
        view_key: view_key.into(),
        error,
        generation: Some(generation),
    }
}

pub fn delete_entity(entity_type: impl Into<EntityType>, id: impl Into<EntityId>) -> Transition {
    Transition::DeleteEntity {
        entity_type: entity_type.into(),
        id: id.into(),
    }
}

pub fn clear_collection(
    entity_type: impl Into<EntityType>,
    view_key: impl Into<ViewKey>,
) -> Transition {
    Transition::ClearCollection {
        entity_type: entity_type.into(),
        view_key: view_key.into(),
    }
}

pub fn start_edit(view_key: impl Into<ViewKey>, id: impl Into<EntityId>) -> Transition {
    Transition::StartEdit {
        view_key: view_key.into(),
        id: id.into(),
    }
}

pub fn update_scratch(
    view_key: impl Into<ViewKey>,
    field: impl Into<String>,
    value: impl Into<Value>,
) -> Transition {
    Transition::UpdateScratch {
        view_key: view_key.into(),
        field: field.into(),
        value: value.into(),
    }
}

pub fn cancel_edit(view_key: impl Into<ViewKey>) -> Transition {
    Transition::CancelEdit {
        view_key: view_key.into(),
    }
}

pub fn apply_edit(
    view_key: impl Into<ViewKey>,
    entity_type: impl Into<EntityType>,
    id: impl Into<EntityId>,
) -> Transition {
    Transition::ApplyEdit {
        view_key: view_key.into(),
        entity_type: entity_type.into(),
        id: id.into(),
    }
}

pub fn add_pending(
    view_key: impl Into<ViewKey>,
    placeholder_id: EntityId,
    draft: Map<String, Value>,
) -> Transition {
    Transition::AddPending {
        view_key: view_key.into(),
        placeholder_id,
        draft,
    }
}

pub fn update_pending(
    view_key: impl Into<ViewKey>,
    placeholder_id: EntityId,
    field: impl Into<String>,
    value: impl Into<Value>,
) -> Transition {
    Transition::UpdatePending {
        view_key: view_key.into(),
        placeholder_id,
        field: field.into(),
        value: value.into(),
    }
}

pub fn remove_pending(view_key: impl Into<ViewKey>, placeholder_id: EntityId) -> Transition {
    Transition::RemovePending {
        view_key: view_key.into(),
        placeholder_id,
    }
}

pub fn confirm_pending(
    view_key: impl Into<ViewKey>,
    placeholder_id: EntityId,
    entity_type: impl Into<EntityType>,
    entity: Entity,
) -> Transition {
    Transition::ConfirmPending {
        view_key: view_key.into(),
        placeholder_id,
        entity_type: entity_type.into(),
        entity,
    }
}

pub fn bulk_start(action: BulkAction, count: usize) -> Transition {
    Transition::BulkStart { action, count }
}

pub fn bulk_advance(outcome: UnitOutcome) -> Transition {
    Transition::BulkAdvance { outcome }
}

pub fn bulk_stop() -> Transition {
    Transition::BulkStop
}

pub fn rehydrate(snapshot: SessionSnapshot) -> Transition {
    Transition::Rehydrate { snapshot }
}
