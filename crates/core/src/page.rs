//! Offset pagination for ledger queries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Apply the page window to an already ordered sequence.
    pub fn slice<T>(self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_skips_then_takes() {
        assert_eq!(Page::new(2, 2).slice(1..=5), vec![3, 4]);
        assert_eq!(Page::new(10, 2).slice(1..=5), Vec::<i32>::new());
    }
}
