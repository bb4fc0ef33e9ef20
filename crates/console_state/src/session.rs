use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::{domain::ViewKey, protocol::CollectionQuery};

use crate::reducer::ConsoleState;

pub const SESSION_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<CollectionQuery>,
}

/// The slices of console state that survive a reload: the active query of
/// each whitelisted view. Entities are always refetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub views: BTreeMap<ViewKey, PersistedView>,
}

fn current_version() -> u32 {
    SESSION_SNAPSHOT_VERSION
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            version: SESSION_SNAPSHOT_VERSION,
            views: BTreeMap::new(),
        }
    }
}

impl SessionSnapshot {
    pub fn capture(state: &ConsoleState, whitelist: &[ViewKey]) -> Self {
        let views = whitelist
            .iter()
            .filter_map(|view_key| {
                let view = state.view(view_key)?;
                Some((
                    view_key.clone(),
                    PersistedView {
                        query: view.query.clone(),
                    },
                ))
            })
            .collect();
        Self {
            version: SESSION_SNAPSHOT_VERSION,
            views,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn to_blob(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_blob(blob: &str) -> serde_json::Result<Self> {
        serde_json::from_str(blob)
    }
}
