//! Request id allocation.

/// Ids wrap modulo this value, so `u32::MAX` is never issued.
const ID_MODULUS: u64 = u32::MAX as u64;

/// Per-session sequence of request ids.
///
/// Issues 1, 2, ..., 2^32 - 2 and then starts again at 1. Zero is never
/// returned.
#[derive(Debug, Clone)]
pub struct RequestIdAllocator {
    next: u32,
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdAllocator {
    /// Creates an allocator whose first id is 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    #[cfg(test)]
    fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Returns the current id and advances the counter.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u32 {
        let id = self.next;
        let advanced = ((id as u64 + 1) % ID_MODULUS) as u32;
        self.next = if advanced == 0 { 1 } else { advanced };
        id
    }

    /// Id the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> u32 {
        self.next
    }
}
