//! Event reconciliation
//!
//! Applies small patches to the loaded discussion list in response to
//! domain events and decides whether a refetch is still needed. Patches are
//! a latency optimization: the next refresh is always the source of truth.

mod reconciler;

pub use reconciler::{
    PendingSelection, ReconcileContext, ReconcileError, ReconcileOutcome, RefreshKind,
    SelectionDirective, reconcile,
};
