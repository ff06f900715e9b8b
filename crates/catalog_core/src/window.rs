use crate::Id;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    Accept,
    Skip,
    Stop,
}

/// Offset/limit window counted in distinct, complete roots.
#[derive(Clone, Debug)]
pub struct PaginationWindow {
    offset: u64,
    limit: u64,
    emitted: u64,
    skipped: Option<Id>,
}

impl PaginationWindow {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            emitted: 0,
            skipped: None,
        }
    }

    /// A window that accepts every root.
    pub fn unbounded() -> Self {
        Self::new(0, u64::MAX)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offer(&mut self, root: Id) -> Offer {
        if self.skipped == Some(root) {
            return Offer::Skip;
        }
        if self.emitted < self.offset {
            self.emitted += 1;
            self.skipped = Some(root);
            return Offer::Skip;
        }
        if self.emitted - self.offset >= self.limit {
            return Offer::Stop;
        }
        self.emitted += 1;
        Offer::Accept
    }

    pub fn is_full(&self) -> bool {
        self.emitted >= self.offset && self.emitted - self.offset >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::{Offer, PaginationWindow};
    use crate::Id;

    #[test]
    fn skips_then_accepts_then_stops() {
        let ids: Vec<Id> = (0..4).map(|_| Id::new()).collect();
        let mut window = PaginationWindow::new(1, 2);
        assert_eq!(window.offer(ids[0]), Offer::Skip);
        assert_eq!(window.offer(ids[1]), Offer::Accept);
        assert!(!window.is_full());
        assert_eq!(window.offer(ids[2]), Offer::Accept);
        assert!(window.is_full());
        assert_eq!(window.offer(ids[3]), Offer::Stop);
    }

    #[test]
    fn late_duplicate_of_skipped_root_does_not_count() {
        let skipped = Id::new();
        let next = Id::new();
        let mut window = PaginationWindow::new(1, 1);
        assert_eq!(window.offer(skipped), Offer::Skip);
        assert_eq!(window.offer(skipped), Offer::Skip);
        assert_eq!(window.offer(next), Offer::Accept);
    }

    #[test]
    fn zero_limit_is_full_immediately_after_offset() {
        let window = PaginationWindow::new(0, 0);
        assert!(window.is_full());
        let window = PaginationWindow::new(2, 0);
        assert!(!window.is_full());
    }

    #[test]
    fn unbounded_never_fills() {
        let mut window = PaginationWindow::unbounded();
        for _ in 0..100 {
            assert_eq!(window.offer(Id::new()), Offer::Accept);
        }
        assert!(!window.is_full());
    }
}
