use serde::Serialize;

/// One page of a paginated listing. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.per_page) < self.total
    }

    pub fn pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, per_page: u32, total: u64) -> Page<()> {
        Page { items: vec![], page, per_page, total }
    }

    #[test]
    fn navigation_flags() {
        let first = page(1, 2, 5);
        assert!(!first.has_prev());
        assert!(first.has_next());
        assert_eq!(first.pages(), 3);

        let last = page(3, 2, 5);
        assert!(last.has_prev());
        assert!(!last.has_next());
    }

    #[test]
    fn exact_fit_has_no_next() {
        assert!(!page(2, 2, 4).has_next());
        assert!(!page(1, 25, 0).has_next());
        assert_eq!(page(1, 25, 0).pages(), 0);
    }
}
