//! Time source trait

/// Monotonic millisecond clock
///
/// Values wrap at `u32::MAX`; compare timestamps with `wrapping_sub`.
pub trait Clock {
    /// Milliseconds since boot
    fn now_ms(&self) -> u32;
}

/// Milliseconds elapsed from `since` to `now`, tolerating wraparound
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_wraps() {
        assert_eq!(elapsed_ms(100, 40), 60);
        assert_eq!(elapsed_ms(5, u32::MAX - 4), 10);
    }
}
