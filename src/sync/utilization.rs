//! Address utilization of a cloud subnet.

use crate::models::{usable_hosts, CidrError, Ipv4};

/// Addresses AWS and Azure keep for themselves in every subnet.
pub const DEFAULT_RESERVED_ADDRESSES: u32 = 5;

/// `(total - available) / total * 100`, where `total` is the block size minus
/// the provider's `reserved` addresses. Zero when nothing is addressable.
///
/// ```
/// use cloud_subnet_sync::sync::utilization_percent;
/// assert_eq!(utilization_percent(24, 251, 5), 0.0);
/// ```
pub fn utilization_percent(prefix_len: u8, available: i64, reserved: u32) -> f64 {
    let total = usable_hosts(prefix_len, reserved);
    if total <= 0 {
        return 0.0;
    }
    (total - available) as f64 / total as f64 * 100.0
}

/// [`utilization_percent`] for a CIDR string.
pub fn utilization_for_cidr(cidr: &str, available: i64, reserved: u32) -> Result<f64, CidrError> {
    let block = Ipv4::new(cidr)?;
    Ok(utilization_percent(block.mask, available, reserved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slash24() {
        assert_eq!(utilization_percent(24, 251, DEFAULT_RESERVED_ADDRESSES), 0.0);
    }

    #[test]
    fn test_nearly_full_slash24() {
        let u = utilization_percent(24, 1, DEFAULT_RESERVED_ADDRESSES);
        assert!((u - 99.6).abs() < 0.01, "got {u}");
        assert!((u - 250.0 / 251.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_slash28() {
        assert_eq!(utilization_percent(28, 0, 5), 100.0);
    }

    #[test]
    fn test_nothing_addressable_is_zero() {
        assert_eq!(utilization_percent(30, 0, 5), 0.0);
        assert_eq!(utilization_percent(32, 0, 1), 0.0);
    }

    #[test]
    fn test_from_cidr() {
        let u = utilization_for_cidr("10.0.0.0/24", 126, 5).unwrap();
        assert!((u - 125.0 / 251.0 * 100.0).abs() < 1e-9);
        assert!(utilization_for_cidr("10.0.0.0", 1, 5).is_err());
    }
}
