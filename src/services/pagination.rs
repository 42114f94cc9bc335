use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// How navigation behaves at either end of the results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingPolicy {
    /// Paged grid: moving past the first or last page does nothing
    #[default]
    Clamped,
    /// Carousel: moving past either end wraps around
    Wrapping,
}

/// Cursor over a result list, `page_size` items at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: NonZeroUsize,
    current: usize,
    policy: PagingPolicy,
}

impl Pager {
    /// Creates a pager on the first page
    pub fn new(page_size: NonZeroUsize, policy: PagingPolicy) -> Self {
        Self {
            page_size,
            current: 0,
            policy,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    pub fn policy(&self) -> PagingPolicy {
        self.policy
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size.get())
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Pulls the cursor back onto the last page after the list shrank
    pub fn clamp(&mut self, total: usize) {
        let last = self.page_count(total).saturating_sub(1);
        self.current = self.current.min(last);
    }

    /// Moves the cursor to the page holding `index`
    pub fn focus(&mut self, index: usize, total: usize) {
        self.current = index / self.page_size.get();
        self.clamp(total);
    }

    /// Moves forward one page; returns whether the cursor moved
    pub fn next(&mut self, total: usize) -> bool {
        let pages = self.page_count(total);
        let target = match self.policy {
            PagingPolicy::Clamped if self.current + 1 < pages => self.current + 1,
            PagingPolicy::Clamped => self.current,
            PagingPolicy::Wrapping if pages == 0 => 0,
            PagingPolicy::Wrapping => (self.current + 1) % pages,
        };
        let moved = target != self.current;
        self.current = target;
        moved
    }

    /// Moves back one page; returns whether the cursor moved
    pub fn prev(&mut self, total: usize) -> bool {
        let pages = self.page_count(total);
        let target = match self.policy {
            PagingPolicy::Clamped => self.current.saturating_sub(1),
            PagingPolicy::Wrapping if pages == 0 => 0,
            PagingPolicy::Wrapping => (self.current + pages - 1) % pages,
        };
        let moved = target != self.current;
        self.current = target;
        moved
    }

    /// The visible window of `items`
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let size = self.page_size.get();
        let start = (self.current * size).min(items.len());
        let end = (start + size).min(items.len());
        &items[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_page_count() {
        let pager = Pager::new(size(4), PagingPolicy::Clamped);
        assert_eq!(pager.page_count(0), 0);
        assert_eq!(pager.page_count(4), 1);
        assert_eq!(pager.page_count(5), 2);
    }

    #[test]
    fn test_clamped_navigation_stops_at_ends() {
        let mut pager = Pager::new(size(2), PagingPolicy::Clamped);
        assert!(!pager.prev(5));
        assert!(pager.next(5));
        assert!(pager.next(5));
        assert_eq!(pager.current(), 2);
        assert!(!pager.next(5));
        assert_eq!(pager.current(), 2);
    }

    #[test]
    fn test_wrapping_navigation() {
        let mut pager = Pager::new(size(1), PagingPolicy::Wrapping);
        assert!(pager.prev(3));
        assert_eq!(pager.current(), 2);
        assert!(pager.next(3));
        assert_eq!(pager.current(), 0);
    }

    #[test]
    fn test_navigation_on_empty_list() {
        let mut clamped = Pager::new(size(4), PagingPolicy::Clamped);
        let mut wrapping = Pager::new(size(1), PagingPolicy::Wrapping);
        assert!(!clamped.next(0));
        assert!(!wrapping.next(0));
        assert!(!wrapping.prev(0));
    }

    #[test]
    fn test_slice() {
        let items = [1, 2, 3, 4, 5];
        let mut pager = Pager::new(size(4), PagingPolicy::Clamped);
        assert_eq!(pager.slice(&items), &[1, 2, 3, 4]);
        pager.next(items.len());
        assert_eq!(pager.slice(&items), &[5]);
    }

    #[test]
    fn test_focus() {
        let mut pager = Pager::new(size(1), PagingPolicy::Wrapping);
        pager.focus(1, 3);
        assert_eq!(pager.current(), 1);

        pager.focus(1, 1);
        assert_eq!(pager.current(), 0);

        let mut grid = Pager::new(size(4), PagingPolicy::Clamped);
        grid.focus(5, 10);
        assert_eq!(grid.current(), 1);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut pager = Pager::new(size(2), PagingPolicy::Clamped);
        pager.next(3);
        assert_eq!(pager.current(), 1);

        pager.clamp(2);
        assert_eq!(pager.current(), 0);

        pager.clamp(0);
        assert_eq!(pager.current(), 0);
        assert!(pager.slice::<i32>(&[]).is_empty());
    }
}
