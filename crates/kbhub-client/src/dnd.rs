//! Drag-and-drop validation for folders and sources.
//!
//! ```text
//! Idle ──start──▶ Dragging ──hover──▶ Over(target, verdict) ──drop──▶ Dropped
//!   ▲                 │                      │                          │
//!   └────cancel───────┴──────cancel / invalid drop─────────────────────┘ (reset)
//! ```
//!
//! Verdicts are computed against a [`FolderIndex`] of the cached views, so
//! the controller never yields a [`DropAction`] the server would refuse for
//! hierarchy reasons.

use kbhub_core::types::FolderId;
use kbhub_entity::folder::{Ancestry, FolderIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragItem {
    /// A single folder.
    Folder(FolderId),
    /// One or more sources taken from the same folder (`None` for the root).
    Sources {
        source_ids: Vec<String>,
        from: Option<FolderId>,
    },
}

/// Whether dropping on the hovered target is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropVerdict {
    Allowed,
    /// The folder would be dropped on itself.
    OntoSelf,
    /// The folder would land inside its own subtree.
    IntoDescendant,
    /// The item already lives in the target.
    AlreadyThere,
    /// The resulting hierarchy would exceed the depth limit.
    TooDeep,
    /// The target or the dragged folder is not in the index.
    Unknown,
}

impl DropVerdict {
    /// True only for [`DropVerdict::Allowed`].
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

/// The mutation a valid drop asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropAction {
    MoveFolder {
        folder_id: FolderId,
        new_parent_id: Option<FolderId>,
    },
    MoveSources {
        source_ids: Vec<String>,
        folder_id: Option<FolderId>,
    },
}

/// Controller state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragItem),
    /// Hovering `target` (`None` is the root drop zone).
    Over {
        item: DragItem,
        target: Option<FolderId>,
        verdict: DropVerdict,
    },
    Dropped(DropAction),
}

/// Drag-and-drop state machine.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_) | DragState::Over { .. })
    }

    /// Begin dragging `item`, abandoning any previous drag.
    pub fn start(&mut self, item: DragItem) {
        debug!(?item, "Drag started");
        self.state = DragState::Dragging(item);
    }

    /// Hover over `target` and judge it. Returns `None` when nothing is
    /// being dragged.
    pub fn hover(&mut self, target: Option<FolderId>, index: &FolderIndex) -> Option<DropVerdict> {
        let item = match std::mem::take(&mut self.state) {
            DragState::Dragging(item) | DragState::Over { item, .. } => item,
            other => {
                self.state = other;
                return None;
            }
        };
        let verdict = judge(&item, target, index);
        self.state = DragState::Over {
            item,
            target,
            verdict,
        };
        Some(verdict)
    }

    /// Leave the hovered target without dropping.
    pub fn leave(&mut self) {
        if let DragState::Over { item, .. } = std::mem::take(&mut self.state) {
            self.state = DragState::Dragging(item);
        }
    }

    /// Drop on the hovered target.
    ///
    /// The verdict is recomputed against `index` in case the views changed
    /// while hovering. A valid drop moves to `Dropped` and returns the
    /// action; anything else returns to `Idle`.
    pub fn drop(&mut self, index: &FolderIndex) -> Option<DropAction> {
        let DragState::Over { item, target, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        let verdict = judge(&item, target, index);
        if !verdict.is_allowed() {
            debug!(?verdict, "Drop rejected");
            return None;
        }

        let action = match item {
            DragItem::Folder(folder_id) => DropAction::MoveFolder {
                folder_id,
                new_parent_id: target,
            },
            DragItem::Sources { source_ids, .. } => DropAction::MoveSources {
                source_ids,
                folder_id: target,
            },
        };
        self.state = DragState::Dropped(action.clone());
        Some(action)
    }

    /// Abandon the drag.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Return to `Idle` after a drop has been handled.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }
}

fn judge(item: &DragItem, target: Option<FolderId>, index: &FolderIndex) -> DropVerdict {
    if let Some(target) = target
        && !index.contains(target)
    {
        return DropVerdict::Unknown;
    }

    match item {
        DragItem::Folder(folder) => {
            if !index.contains(*folder) {
                return DropVerdict::Unknown;
            }
            if target == Some(*folder) {
                return DropVerdict::OntoSelf;
            }
            if index.parent_of(*folder) == target {
                return DropVerdict::AlreadyThere;
            }
            match index.check_reparent(*folder, target) {
                Ancestry::Cycle => DropVerdict::IntoDescendant,
                Ancestry::DepthExceeded => DropVerdict::TooDeep,
                Ancestry::Clear => DropVerdict::Allowed,
            }
        }
        DragItem::Sources { source_ids, from } => {
            if source_ids.is_empty() {
                DropVerdict::Unknown
            } else if *from == target {
                DropVerdict::AlreadyThere
            } else {
                DropVerdict::Allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::fixture;

    fn sources(from: Option<FolderId>) -> DragItem {
        DragItem::Sources {
            source_ids: vec!["s1".into()],
            from,
        }
    }

    #[test]
    fn test_folder_verdicts() {
        let f = fixture();
        let index = f.cache.index();
        let mut dnd = DragController::new();
        dnd.start(DragItem::Folder(f.rust));

        assert_eq!(dnd.hover(Some(f.rust), &index), Some(DropVerdict::OntoSelf));
        assert_eq!(
            dnd.hover(Some(f.async_), &index),
            Some(DropVerdict::IntoDescendant)
        );
        assert_eq!(dnd.hover(Some(f.docs), &index), Some(DropVerdict::AlreadyThere));
        assert_eq!(
            dnd.hover(Some(FolderId::new()), &index),
            Some(DropVerdict::Unknown)
        );
        assert_eq!(dnd.hover(Some(f.notes), &index), Some(DropVerdict::Allowed));
        assert_eq!(dnd.hover(None, &index), Some(DropVerdict::Allowed));
    }

    #[test]
    fn test_invalid_drop_yields_nothing() {
        let f = fixture();
        let index = f.cache.index();
        let mut dnd = DragController::new();

        dnd.start(DragItem::Folder(f.docs));
        dnd.hover(Some(f.async_), &index);
        assert_eq!(dnd.drop(&index), None);
        assert_eq!(dnd.state(), &DragState::Idle);
    }

    #[test]
    fn test_valid_folder_drop() {
        let f = fixture();
        let index = f.cache.index();
        let mut dnd = DragController::new();

        dnd.start(DragItem::Folder(f.async_));
        dnd.hover(None, &index);
        let action = dnd.drop(&index).unwrap();
        assert_eq!(
            action,
            DropAction::MoveFolder {
                folder_id: f.async_,
                new_parent_id: None
            }
        );
        assert!(matches!(dnd.state(), DragState::Dropped(_)));
        dnd.reset();
        assert!(!dnd.is_dragging());
    }

    #[test]
    fn test_source_drops() {
        let f = fixture();
        let index = f.cache.index();
        let mut dnd = DragController::new();

        dnd.start(sources(Some(f.rust)));
        assert_eq!(dnd.hover(Some(f.rust), &index), Some(DropVerdict::AlreadyThere));
        assert_eq!(dnd.drop(&index), None);

        dnd.start(sources(Some(f.rust)));
        dnd.hover(None, &index);
        assert_eq!(
            dnd.drop(&index),
            Some(DropAction::MoveSources {
                source_ids: vec!["s1".into()],
                folder_id: None
            })
        );
    }

    #[test]
    fn test_hover_without_drag_and_leave() {
        let f = fixture();
        let index = f.cache.index();
        let mut dnd = DragController::new();
        assert_eq!(dnd.hover(Some(f.docs), &index), None);
        assert_eq!(dnd.drop(&index), None);

        dnd.start(sources(None));
        dnd.hover(Some(f.docs), &index);
        dnd.leave();
        assert_eq!(dnd.state(), &DragState::Dragging(sources(None)));
        assert_eq!(dnd.drop(&index), None);
        assert_eq!(dnd.state(), &DragState::Idle);
        dnd.cancel();
        assert!(!dnd.is_dragging());
    }
}
