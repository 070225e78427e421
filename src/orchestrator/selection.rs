//! Keyboard selection over the flattened result list / 结果选择

use serde::Serialize;

/// Clamped cursor over `total` rows.
///
/// The cursor goes back to 0 whenever the row count changes, and stays at 0
/// while there are no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    index: usize,
    total: usize,
    #[serde(skip)]
    page_step: usize,
}

impl Selection {
    pub fn new(page_step: usize) -> Self {
        Self { index: 0, total: 0, page_step: page_step.max(1) }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Track a new result count; returns true if the cursor was reset
    pub fn sync(&mut self, total: usize) -> bool {
        if total == self.total {
            return false;
        }
        self.total = total;
        self.index = 0;
        true
    }

    pub fn next(&mut self) {
        if self.index + 1 < self.total {
            self.index += 1;
        }
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Move down by `min(page_step, rows below)`
    pub fn page_down(&mut self) {
        let remaining = self.total.saturating_sub(1).saturating_sub(self.index);
        self.index += self.page_step.min(remaining);
    }

    /// Move up by `min(page_step, rows above)`
    pub fn page_up(&mut self) {
        self.index -= self.page_step.min(self.index);
    }

    pub fn first(&mut self) {
        self.index = 0;
    }

    pub fn last(&mut self) {
        self.index = self.total.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_is_bounded() {
        let mut sel = Selection::new(5);
        sel.sync(3);
        sel.previous();
        assert_eq!(sel.index(), 0);
        sel.next();
        sel.next();
        sel.next();
        assert_eq!(sel.index(), 2);
    }

    #[test]
    fn test_page_step_uses_remaining_rows() {
        let mut sel = Selection::new(5);
        sel.sync(8);
        sel.page_down();
        assert_eq!(sel.index(), 5);
        sel.page_down();
        assert_eq!(sel.index(), 7);
        sel.page_up();
        assert_eq!(sel.index(), 2);
        sel.page_up();
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn test_home_end_and_reset() {
        let mut sel = Selection::new(5);
        sel.sync(4);
        sel.last();
        assert_eq!(sel.index(), 3);
        assert!(!sel.sync(4));
        assert_eq!(sel.index(), 3);

        assert!(sel.sync(6));
        assert_eq!(sel.index(), 0);
        sel.first();
        assert_eq!(sel.index(), 0);
    }

    #[test]
    fn test_empty_results_pin_cursor() {
        let mut sel = Selection::new(5);
        sel.sync(0);
        sel.next();
        sel.page_down();
        sel.last();
        assert_eq!(sel.index(), 0);
    }
}
