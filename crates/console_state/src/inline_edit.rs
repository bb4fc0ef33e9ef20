use im::Vector;
use serde_json::{Map, Value};
use shared::domain::EntityId;

#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub id: EntityId,
    pub scratch: Map<String, Value>,
}

/// A row added in the grid that the server has not accepted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub id: EntityId,
    pub draft: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Clean,
    Editing,
    Pending,
}

/// Inline-edit bookkeeping of one view. At most one row is being edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineEditState {
    pub editing: Option<EditSession>,
    pub pending: Vector<PendingRow>,
}

impl InlineEditState {
    pub fn editing_id(&self) -> Option<&EntityId> {
        self.editing.as_ref().map(|session| &session.id)
    }

    pub fn is_pending(&self, id: &EntityId) -> bool {
        self.pending.iter().any(|row| &row.id == id)
    }

    pub fn status_of(&self, id: &EntityId) -> RowStatus {
        if self.is_pending(id) {
            RowStatus::Pending
        } else if self.editing_id() == Some(id) {
            RowStatus::Editing
        } else {
            RowStatus::Clean
        }
    }

    pub fn is_idle(&self) -> bool {
        self.editing.is_none() && self.pending.is_empty()
    }

    /// Starting an edit drops whatever scratch the previous edit had.
    pub(crate) fn start(&mut self, id: EntityId) {
        if self.is_pending(&id) {
            return;
        }
        self.editing = Some(EditSession {
            id,
            scratch: Map::new(),
        });
    }

    pub(crate) fn set_scratch(&mut self, field: String, value: Value) {
        if let Some(session) = self.editing.as_mut() {
            session.scratch.insert(field, value);
        }
    }

    pub(crate) fn take_editing(&mut self) -> Option<EditSession> {
        self.editing.take()
    }

    pub(crate) fn add_pending(&mut self, id: EntityId, draft: Map<String, Value>) {
        match self.pending.iter_mut().find(|row| row.id == id) {
            Some(row) => row.draft = draft,
            None => self.pending.push_back(PendingRow { id, draft }),
        }
    }

    pub(crate) fn set_pending_field(&mut self, id: &EntityId, field: String, value: Value) {
        if let Some(row) = self.pending.iter_mut().find(|row| &row.id == id) {
            row.draft.insert(field, value);
        }
    }

    pub(crate) fn remove_pending(&mut self, id: &EntityId) -> Option<PendingRow> {
        let index = self.pending.iter().position(|row| &row.id == id)?;
        Some(self.pending.remove(index))
    }
}
