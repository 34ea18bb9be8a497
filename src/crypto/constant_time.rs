// Constant-time comparison: `constant_time_eq(a, b)`.

use subtle::ConstantTimeEq;

/// Compare two byte slices without leaking timing information about where
/// (or whether) they differ. Different lengths are always unequal, but the
/// length check itself is not secret-dependent (lengths are never secret).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_buffers() {
        let a = [0x42u8; 32];
        let b = [0x42u8; 32];
        assert!(constant_time_eq(&a, &b));
    }

    #[test]
    fn test_unequal_buffers() {
        let a = [0x42u8; 32];
        let b = [0x43u8; 32];
        assert!(!constant_time_eq(&a, &b));
    }

    #[test]
    fn test_different_lengths() {
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2]));
    }
}
