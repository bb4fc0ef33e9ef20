//! Pure state for the admin console: normalized entity store, per-view query
//! state, inline-edit rows and the bulk action run, all advanced by a single
//! reducer.
//!
//! Every transition produces a new [`ConsoleState`]. The maps inside are
//! persistent (`im`), so cloning a state is cheap and earlier snapshots stay
//! valid while later transitions are applied.

pub mod bulk;
pub mod inline_edit;
pub mod reducer;
pub mod selectors;
pub mod session;
pub mod store;
pub mod transition;
pub mod view;

pub use bulk::{BulkAction, BulkActionRun, BulkFailure, BulkSummary, UnitOutcome};
pub use inline_edit::{EditSession, InlineEditState, PendingRow, RowStatus};
pub use reducer::{reduce, ConsoleState};
pub use session::{PersistedView, SessionSnapshot};
pub use store::EntityStore;
pub use transition::Transition;
pub use view::{Generation, ViewState};
