//! Human-readable sizes and rates for labels and axis captions.

use crate::types::NetUnit;

const SIZE_UNITS: [&str; 5] = ["bytes", "KiB", "MiB", "GiB", "TiB"];
const BYTE_RATE_UNITS: [&str; 5] = ["B/s", "KiB/s", "MiB/s", "GiB/s", "TiB/s"];
const BIT_UNITS: [&str; 5] = ["bits", "kbit", "Mbit", "Gbit", "Tbit"];
const BIT_RATE_UNITS: [&str; 5] = ["bit/s", "kbit/s", "Mbit/s", "Gbit/s", "Tbit/s"];

/// Largest power of `base` not above `value`, with its index into a unit table.
fn band(value: u64, base: u64, len: usize) -> (u64, usize) {
    let mut divisor = 1u64;
    let mut index = 0;
    while index + 1 < len && value / divisor >= base {
        divisor *= base;
        index += 1;
    }
    (divisor, index)
}

fn scaled(value: u64, band_of: u64, base: u64, units: &[&'static str]) -> String {
    let (divisor, index) = band(band_of, base, units.len());
    if divisor == 1 {
        format!("{} {}", value, units[index])
    } else {
        format!("{:.1} {}", value as f64 / divisor as f64, units[index])
    }
}

/// `"540.0 MiB"`, `"12 bytes"`.
pub fn format_size(bytes: u64) -> String {
    scaled(bytes, bytes, 1024, &SIZE_UNITS)
}

/// A cumulative network total in the chosen unit.
pub fn format_network(bytes: u64, unit: NetUnit) -> String {
    match unit {
        NetUnit::Bytes => format_size(bytes),
        NetUnit::Bits => {
            let bits = bytes.saturating_mul(8);
            scaled(bits, bits, 1000, &BIT_UNITS)
        }
    }
}

/// A rate in bytes per second, rendered in the unit band of `band_of`
/// (or of `rate` itself when `None`) so a column of captions shares a unit.
pub fn format_network_rate(rate: u64, band_of: Option<u64>, unit: NetUnit) -> String {
    let band_of = band_of.unwrap_or(rate);
    match unit {
        NetUnit::Bytes => scaled(rate, band_of, 1024, &BYTE_RATE_UNITS),
        NetUnit::Bits => scaled(
            rate.saturating_mul(8),
            band_of.saturating_mul(8),
            1000,
            &BIT_RATE_UNITS,
        ),
    }
}

/// A rate maximum split into a value and a unit string, for axis titles.
pub fn display_max(max: u64, unit: NetUnit) -> (f64, &'static str) {
    let (value, base, units) = match unit {
        NetUnit::Bytes => (max, 1024, &BYTE_RATE_UNITS),
        NetUnit::Bits => (max.saturating_mul(8), 1000, &BIT_RATE_UNITS),
    };
    let (divisor, index) = band(value, base, units.len());
    (value as f64 / divisor as f64, units[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_pick_binary_units() {
        assert_eq!(format_size(12), "12 bytes");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(540 * 1024 * 1024), "540.0 MiB");
        assert_eq!(format_size(1 << 30), "1.0 GiB");
    }

    #[test]
    fn totals_in_bits_use_decimal_units() {
        assert_eq!(format_network(100, NetUnit::Bits), "800 bits");
        assert_eq!(format_network(125_000, NetUnit::Bits), "1.0 Mbit");
        assert_eq!(format_network(2048, NetUnit::Bytes), "2.0 KiB");
    }

    #[test]
    fn rates_follow_their_own_band_by_default() {
        assert_eq!(format_network_rate(1000, None, NetUnit::Bytes), "1000 B/s");
        assert_eq!(format_network_rate(1024, None, NetUnit::Bytes), "1.0 KiB/s");
        assert_eq!(format_network_rate(125, None, NetUnit::Bits), "1.0 kbit/s");
    }

    #[test]
    fn captions_share_the_band_of_the_maximum() {
        let max = 5 * 1024 * 1024;
        assert_eq!(
            format_network_rate(1024 * 1024, Some(max), NetUnit::Bytes),
            "1.0 MiB/s"
        );
        assert_eq!(format_network_rate(0, Some(max), NetUnit::Bytes), "0.0 MiB/s");
    }

    #[test]
    fn display_max_splits_value_and_unit() {
        assert_eq!(display_max(5120, NetUnit::Bytes), (5.0, "KiB/s"));
        assert_eq!(display_max(625, NetUnit::Bits), (5.0, "kbit/s"));
        assert_eq!(display_max(3 << 30, NetUnit::Bytes), (3.0, "GiB/s"));
    }
}
