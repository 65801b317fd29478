use serde::{Deserialize, Serialize};

/// One page of a listing. `page` is zero-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn empty(page: u64, size: u64) -> Self {
        Self {
            content: Vec::new(),
            page,
            size,
            total_elements: 0,
            total_pages: 0,
        }
    }
}

/// Row offset of `page`, or `None` when it overflows a signed 64-bit offset.
pub fn checked_offset(page: u64, size: u64) -> Option<u64> {
    page.checked_mul(size).filter(|offset| i64::try_from(*offset).is_ok())
}

#[cfg(test)]
mod tests {
    use super::checked_offset;

    #[test]
    fn offsets_past_i64_are_rejected() {
        assert_eq!(checked_offset(3, 10), Some(30));
        assert_eq!(checked_offset(u64::MAX, 10), None);
        assert_eq!(checked_offset(i64::MAX as u64, 2), None);
        assert_eq!(checked_offset(i64::MAX as u64, 1), Some(i64::MAX as u64));
    }
}
