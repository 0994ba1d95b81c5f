//! # Buffer Pool
//!
//! Bounded LIFO free list of reusable objects.

/// A bounded free list.
///
/// Objects are handed out with [`acquire`](Self::acquire) and handed back
/// with [`release`](Self::release). The most recently released object is
/// reused first, so its storage is the most likely to still be warm.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Keep it behind the lock that guards its
/// owner.
///
/// # Example
///
/// ```rust
/// use eai_core::BufferPool;
///
/// let mut pool: BufferPool<Vec<f32>> = BufferPool::new(4);
/// assert!(pool.acquire().is_none());
///
/// assert!(pool.release(Vec::with_capacity(16)));
/// let reused = pool.acquire().unwrap();
/// assert!(reused.capacity() >= 16);
/// ```
#[derive(Debug)]
pub struct BufferPool<T> {
    /// Idle objects, most recently released last.
    free_list: Vec<T>,
    /// Maximum number of idle objects retained.
    max_idle: usize,
}

impl<T> BufferPool<T> {
    /// Creates an empty pool retaining at most `max_idle` objects.
    ///
    /// A pool with `max_idle == 0` never retains anything.
    ///
    /// # Arguments
    ///
    /// * `max_idle` - Maximum number of idle objects
    #[must_use]
    pub fn new(max_idle: usize) -> Self {
        Self {
            free_list: Vec::new(),
            max_idle,
        }
    }

    /// Maximum number of idle objects retained.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_idle
    }

    /// Number of idle objects.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.free_list.len()
    }

    /// Returns true when no idle object is available.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free_list.is_empty()
    }

    /// Takes an idle object, if any. O(1).
    #[inline]
    pub fn acquire(&mut self) -> Option<T> {
        self.free_list.pop()
    }

    /// Returns an object to the pool. O(1).
    ///
    /// # Returns
    ///
    /// `false` if the pool was full and the object was dropped.
    pub fn release(&mut self, value: T) -> bool {
        if self.free_list.len() >= self.max_idle {
            return false;
        }
        self.free_list.push(value);
        true
    }

    /// Drops every idle object and frees the free-list storage.
    pub fn clear(&mut self) {
        self.free_list = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_acquire_release() {
        let mut pool: BufferPool<u32> = BufferPool::new(10);
        assert!(pool.acquire().is_none());

        assert!(pool.release(42));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.acquire(), Some(42));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_full() {
        let mut pool: BufferPool<u8> = BufferPool::new(2);

        assert!(pool.release(1));
        assert!(pool.release(2));
        assert!(!pool.release(3));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pool_reuse_is_lifo() {
        let mut pool: BufferPool<u32> = BufferPool::new(4);
        pool.release(1);
        pool.release(2);

        assert_eq!(pool.acquire(), Some(2));
        assert_eq!(pool.acquire(), Some(1));
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut pool: BufferPool<u32> = BufferPool::new(0);
        assert!(!pool.release(1));
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_clear() {
        let mut pool: BufferPool<String> = BufferPool::new(4);
        pool.release(String::from("a"));
        pool.release(String::from("b"));

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), 4);
    }
}
