//! Human-readable byte sizes for progress messages.

const UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];
const THRESHOLD: f64 = 1024.0;

/// Formats `bytes` with binary units and one decimal, e.g. `1.5 KiB`.
///
/// Values below 1024 are printed as plain bytes (`512 B`).
pub fn bytes_to_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    value /= THRESHOLD;
    // carry over when rounding to one decimal would print 1024.0
    while (value * 10.0).round() / 10.0 >= THRESHOLD && unit < UNITS.len() - 1 {
        value /= THRESHOLD;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_are_bytes() {
        assert_eq!(bytes_to_size(0), "0 B");
        assert_eq!(bytes_to_size(200), "200 B");
        assert_eq!(bytes_to_size(1023), "1023 B");
    }

    #[test]
    fn test_binary_units() {
        assert_eq!(bytes_to_size(1024), "1.0 KiB");
        assert_eq!(bytes_to_size(1536), "1.5 KiB");
        assert_eq!(bytes_to_size(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(bytes_to_size(3_221_225_472), "3.0 GiB");
    }

    #[test]
    fn test_rounding_carries_to_next_unit() {
        assert_eq!(bytes_to_size(1024 * 1024 - 1), "1.0 MiB");
    }
}
