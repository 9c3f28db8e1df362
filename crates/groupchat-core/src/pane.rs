use thiserror::Error;

use crate::types::{PaneItem, PaneOp};

/// Errors that can occur while applying pane operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaneMergeError {
    /// A removal referenced a key that is not present in the pane.
    #[error("pane item with key '{0}' was not found")]
    MissingItem(String),
}

/// Rendered message pane with bounded item retention.
#[derive(Debug, Clone)]
pub struct MessagePane {
    items: Vec<PaneItem>,
    max_items: usize,
}

impl MessagePane {
    /// Create a pane with an item cap (`max_items >= 1`).
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            max_items: max_items.max(1),
        }
    }

    /// Current items in display order.
    pub fn items(&self) -> &[PaneItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.key.as_deref() == Some(key))
    }

    /// Apply pane operations in order.
    pub fn apply_ops(&mut self, ops: &[PaneOp]) -> Result<(), PaneMergeError> {
        for op in ops {
            match op {
                PaneOp::Append(item) => self.items.push(item.clone()),
                PaneOp::Remove { key } => {
                    let idx = self
                        .items
                        .iter()
                        .position(|it| it.key.as_deref() == Some(key.as_str()))
                        .ok_or_else(|| PaneMergeError::MissingItem(key.clone()))?;
                    self.items.remove(idx);
                }
                PaneOp::Clear => self.items.clear(),
            }
            self.trim_to_max();
        }

        Ok(())
    }

    fn trim_to_max(&mut self) {
        if self.items.len() <= self.max_items {
            return;
        }

        let excess = self.items.len() - self.max_items;
        self.items.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LOADING_INDICATOR_KEY, PaneItemKind};

    #[test]
    fn applies_echo_loading_reply_sequence() {
        let mut pane = MessagePane::new(50);
        pane.apply_ops(&[
            PaneOp::Append(PaneItem::user_echo("hello", None)),
            PaneOp::Append(PaneItem::loading()),
        ])
        .expect("ops should be valid");
        assert!(pane.contains_key(LOADING_INDICATOR_KEY));

        pane.apply_ops(&[
            PaneOp::Remove {
                key: LOADING_INDICATOR_KEY.into(),
            },
            PaneOp::Append(PaneItem::assistant_reply("hi there")),
        ])
        .expect("reply ops should be valid");

        assert_eq!(pane.len(), 2);
        assert!(!pane.contains_key(LOADING_INDICATOR_KEY));
        assert_eq!(pane.items()[1].text, "hi there");
        assert_eq!(pane.items()[1].kind, PaneItemKind::Message);
    }

    #[test]
    fn fails_when_removed_key_is_missing() {
        let mut pane = MessagePane::new(10);
        let err = pane
            .apply_ops(&[PaneOp::Remove {
                key: "welcome-message".into(),
            }])
            .expect_err("should reject removal of unknown keys");
        assert_eq!(err, PaneMergeError::MissingItem("welcome-message".into()));
    }

    #[test]
    fn trims_oldest_when_over_max_items() {
        let mut pane = MessagePane::new(2);
        pane.apply_ops(&[
            PaneOp::Append(PaneItem::user_echo("one", None)),
            PaneOp::Append(PaneItem::user_echo("two", None)),
            PaneOp::Append(PaneItem::user_echo("three", None)),
        ])
        .expect("append should work");

        let texts: Vec<_> = pane.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn clear_empties_the_pane() {
        let mut pane = MessagePane::new(10);
        pane.apply_ops(&[PaneOp::Append(PaneItem::no_chats()), PaneOp::Clear])
            .expect("clear should work");
        assert!(pane.is_empty());
    }
}
