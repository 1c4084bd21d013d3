use crate::types::Selection;
use tokio::sync::watch;

/// Result of clicking a municipality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Selected(Selection),
    Cleared,
}

/// The single shared "which municipality is active" slot.
///
/// Map and chart handlers hold the same store; writers replace the value
/// wholesale and subscribers see the latest one.
#[derive(Debug)]
pub struct SelectionStore {
    tx: watch::Sender<Option<Selection>>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn get(&self) -> Option<Selection> {
        self.tx.borrow().clone()
    }

    pub fn set(&self, selection: Selection) {
        self.tx.send_replace(Some(selection));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Selection>> {
        self.tx.subscribe()
    }

    /// Clears when `ags` is already selected, otherwise selects it.
    pub fn toggle(&self, ags: &str, gen: &str) -> Toggle {
        let mut outcome = Toggle::Cleared;
        self.tx.send_modify(|current| {
            if current.as_ref().is_some_and(|s| s.ags == ags) {
                *current = None;
            } else {
                let selection = Selection { ags: ags.to_string(), gen: gen.to_string() };
                outcome = Toggle::Selected(selection.clone());
                *current = Some(selection);
            }
        });
        outcome
    }
}
