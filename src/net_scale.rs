//! Turns cumulative network byte counters into graph fractions and keeps the
//! graph's vertical scale on round numbers as traffic comes and goes.

use chrono::{DateTime, Utc};
use log::debug;

use crate::format;
use crate::ring::SampleRing;
use crate::types::{NetUnit, NetworkStats};

/// Headroom added on top of the observed peak before rounding.
const HEADROOM: f64 = 1.1;

/// Smallest axis maximum in bytes mode: 1 KiB/s.
pub const MIN_MAX_BYTES: u64 = 1024;
/// Smallest axis maximum in bits mode: 1 kbit/s, i.e. 125 B/s.
pub const MIN_MAX_BITS: u64 = 125;

/// Rounds a peak rate (bytes/s) up to an axis maximum with one significant
/// digit in its unit band and a mantissa divisible by `num_bars`, so every
/// horizontal gridline lands on a round number.
///
/// Bytes mode works in 1024-based bands (KiB/s, MiB/s, ...); bits mode works
/// in 1000-based bands of bits (kbit/s, Mbit/s, ...) and converts back to
/// bytes exactly. Never returns less than `peak`.
pub fn round_max(peak: u64, unit: NetUnit, num_bars: u32) -> u64 {
    let (per_byte, base, floor) = match unit {
        NetUnit::Bytes => (1, 1024, MIN_MAX_BYTES),
        NetUnit::Bits => (8, 1000, MIN_MAX_BITS * 8),
    };

    let observed = peak.saturating_mul(per_byte);
    let inflated = ((observed as f64 * HEADROOM).ceil() as u64).max(floor);

    // inflated = coef * band, band a power of base and coef < base
    let mut band = 1u64;
    while inflated / band >= base {
        band *= base;
    }
    let coef = inflated.div_ceil(band);

    // keep a single significant digit
    let factor10 = 10u64.pow(coef.ilog10());
    let mut coef = coef.div_ceil(factor10) * factor10;

    let bars = u64::from(num_bars.max(1));
    if coef % bars != 0 {
        coef += bars - coef % bars;
    }

    let rounded = coef.saturating_mul(band).div_ceil(per_byte);
    if rounded < peak {
        debug!("overflow detected: peak={} rounded={}", peak, rounded);
        peak
    } else {
        rounded
    }
}

/// What one network tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetSample {
    /// Bytes per second received since the previous tick.
    pub rate_in: u64,
    /// Bytes per second transmitted since the previous tick.
    pub rate_out: u64,
    /// `rate_in` over the maximum in effect when the sample arrived.
    pub fraction_in: f32,
    pub fraction_out: f32,
    /// `(old_max, new_max)` when this tick committed a new maximum.
    pub rescaled: Option<(u64, u64)>,
}

#[derive(Debug, Clone)]
pub struct NetworkRateScaler {
    unit: NetUnit,
    num_bars: u32,
    max: u64,
    last_in: u64,
    last_out: u64,
    last_time: Option<DateTime<Utc>>,
    history: SampleRing<u64>,
}

impl NetworkRateScaler {
    /// `points` is the length of the graph window the rolling maximum covers.
    pub fn new(points: usize, unit: NetUnit, num_bars: u32) -> Self {
        Self {
            unit,
            num_bars,
            max: round_max(0, unit, num_bars),
            last_in: 0,
            last_out: 0,
            last_time: None,
            history: SampleRing::new(points, 1, 0),
        }
    }

    /// Current axis maximum in bytes per second.
    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn unit(&self) -> NetUnit {
        self.unit
    }

    /// Switches the display unit and re-rounds the maximum for it right away,
    /// rescaling `series` to match. Returns `(old_max, new_max)` when the
    /// maximum moved.
    pub fn set_unit(
        &mut self,
        unit: NetUnit,
        series: &mut SampleRing<f32>,
    ) -> Option<(u64, u64)> {
        if unit == self.unit {
            return None;
        }
        self.unit = unit;
        let new_max = round_max(self.peak(), unit, self.num_bars);
        if new_max == self.max {
            return None;
        }
        Some(self.apply_max(new_max, series))
    }

    pub fn set_num_bars(&mut self, num_bars: u32) {
        self.num_bars = num_bars.max(1);
    }

    /// The maximum as `(value, unit)` for axis titles, e.g. `(5.0, "KiB/s")`.
    pub fn display_max(&self) -> (f64, &'static str) {
        format::display_max(self.max, self.unit)
    }

    /// Computes this tick's rates, appends their fractions to `series`
    /// (in, out) and commits a new maximum if the recent peak calls for one,
    /// rescaling everything already in `series` to match.
    ///
    /// The first tick, and any tick where a counter went backwards (interface
    /// removed or reset), carries no data: both rates are zero, the rolling
    /// peak window still advances by a zero, and the maximum is left alone.
    pub fn update(
        &mut self,
        now: DateTime<Utc>,
        stats: NetworkStats,
        series: &mut SampleRing<f32>,
    ) -> NetSample {
        let rates = self.rates(now, stats);
        let (rate_in, rate_out) = rates.unwrap_or((0, 0));

        let max = self.max as f64;
        let fraction_in = (rate_in as f64 / max) as f32;
        let fraction_out = (rate_out as f64 / max) as f32;
        series.push(&[fraction_in, fraction_out]);

        self.history.push(&[rate_in.max(rate_out)]);
        let rescaled = if rates.is_some() {
            self.rescale(series)
        } else {
            None
        };

        NetSample {
            rate_in,
            rate_out,
            fraction_in,
            fraction_out,
            rescaled,
        }
    }

    /// Keeps the peak window in step with a graph slot pushed without a
    /// sample.
    pub fn skip(&mut self) {
        self.history.push(&[0]);
    }

    fn peak(&self) -> u64 {
        self.history
            .iter()
            .map(|(slot, _)| slot[0])
            .max()
            .unwrap_or(0)
    }

    fn rates(&mut self, now: DateTime<Utc>, stats: NetworkStats) -> Option<(u64, u64)> {
        let NetworkStats {
            received_bytes: bytes_in,
            transmitted_bytes: bytes_out,
        } = stats;

        let elapsed = self
            .last_time
            .and_then(|last| now.signed_duration_since(last).num_microseconds())
            .map(|us| us as f64 / 1_000_000.0)
            .filter(|secs| *secs > 0.0);

        let rates = match elapsed {
            Some(secs) if bytes_in >= self.last_in && bytes_out >= self.last_out => Some((
                ((bytes_in - self.last_in) as f64 / secs) as u64,
                ((bytes_out - self.last_out) as f64 / secs) as u64,
            )),
            _ => None,
        };

        self.last_in = bytes_in;
        self.last_out = bytes_out;
        self.last_time = Some(now);
        rates
    }

    fn rescale(&mut self, series: &mut SampleRing<f32>) -> Option<(u64, u64)> {
        let peak = self.peak();
        let new_max = round_max(peak, self.unit, self.num_bars);

        // same or slightly lower: not worth a visible jump
        if 0.8 * (self.max as f64) < new_max as f64 && new_max <= self.max {
            return None;
        }

        debug!("rescale peak = {} max = {} new_max = {}", peak, self.max, new_max);
        Some(self.apply_max(new_max, series))
    }

    fn apply_max(&mut self, new_max: u64, series: &mut SampleRing<f32>) -> (u64, u64) {
        let old_max = self.max;
        let scale = (old_max as f64 / new_max as f64) as f32;
        for slot in series.slots_mut() {
            if slot.first().is_some_and(|v| *v >= 0.0) {
                slot.iter_mut().for_each(|v| *v *= scale);
            }
        }
        self.max = new_max;
        (old_max, new_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_DATA;
    use chrono::TimeZone;

    const POINTS: usize = 8;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn stats(received_bytes: u64, transmitted_bytes: u64) -> NetworkStats {
        NetworkStats {
            received_bytes,
            transmitted_bytes,
        }
    }

    fn graph(points: usize) -> SampleRing<f32> {
        SampleRing::new(points, 2, NO_DATA)
    }

    #[test]
    fn round_max_keeps_one_digit_and_bar_multiple() {
        // 1000 * 1.1 = 1100 B -> 2 KiB -> next multiple of 5
        assert_eq!(round_max(1000, NetUnit::Bytes, 5), 5 * 1024);
        assert_eq!(round_max(1000, NetUnit::Bytes, 1), 2 * 1024);
        // 100 KiB * 1.1 -> 113 KiB -> 200 KiB
        assert_eq!(round_max(100 * 1024, NetUnit::Bytes, 4), 200 * 1024);
        assert_eq!(round_max(3 << 20, NetUnit::Bytes, 2), 4 << 20);
    }

    #[test]
    fn round_max_floors_at_protocol_minimum() {
        assert_eq!(round_max(0, NetUnit::Bytes, 1), MIN_MAX_BYTES);
        assert_eq!(round_max(0, NetUnit::Bits, 1), MIN_MAX_BITS);
        assert_eq!(round_max(0, NetUnit::Bits, 5), 5 * MIN_MAX_BITS);
    }

    #[test]
    fn round_max_in_bits_uses_decimal_bands() {
        // 1 MB/s = 8 Mbit/s -> 8.8 Mbit/s -> 9 Mbit/s -> 10 Mbit/s for 5 bars
        assert_eq!(round_max(1_000_000, NetUnit::Bits, 5), 10_000_000 / 8);
    }

    #[test]
    fn round_max_never_undercuts_peak() {
        for peak in [1, 999, 4096, 123_456, 9_999_999, u64::MAX / 2, u64::MAX] {
            for bars in [1, 2, 4, 5] {
                assert!(round_max(peak, NetUnit::Bytes, bars) >= peak);
                assert!(round_max(peak, NetUnit::Bits, bars) >= peak);
            }
        }
    }

    #[test]
    fn rate_is_delta_over_elapsed_time() {
        let mut scaler = NetworkRateScaler::new(POINTS, NetUnit::Bytes, 1);
        let mut series = graph(POINTS);
        assert_eq!(scaler.max(), 1024);

        let first = scaler.update(at(0), stats(1000, 0), &mut series);
        assert_eq!((first.rate_in, first.rate_out), (0, 0));
        assert_eq!(first.rescaled, None);

        let sample = scaler.update(at(1), stats(2000, 0), &mut series);
        assert_eq!(sample.rate_in, 1000);
        assert!((sample.fraction_in - 0.977).abs() < 0.001);
    }

    #[test]
    fn counter_reset_reads_as_no_data() {
        let mut scaler = NetworkRateScaler::new(POINTS, NetUnit::Bytes, 1);
        let mut series = graph(POINTS);
        scaler.update(at(0), stats(5000, 5000), &mut series);
        let max = scaler.max();

        let sample = scaler.update(at(1), stats(1000, 6000), &mut series);
        assert_eq!(sample.rate_in, 0);
        assert_eq!(sample.rate_out, 0);
        assert_eq!(sample.rescaled, None);
        assert_eq!(scaler.max(), max);

        // the reset value becomes the new baseline
        let sample = scaler.update(at(2), stats(1500, 6100), &mut series);
        assert_eq!((sample.rate_in, sample.rate_out), (500, 100));
    }

    #[test]
    fn rescale_preserves_proportions() {
        let mut scaler = NetworkRateScaler::new(POINTS, NetUnit::Bytes, 1);
        let mut series = graph(POINTS);
        scaler.update(at(0), stats(0, 0), &mut series);
        let sample = scaler.update(at(1), stats(1000, 0), &mut series);

        assert_eq!(sample.rescaled, Some((1024, 2048)));
        let stored = series.get(0, 0).unwrap();
        assert!((stored - sample.fraction_in * 1024.0 / 2048.0).abs() < 1e-6);
        // older "no data" slot is rescaled only where it holds data
        assert_eq!(series.get(1, 0), Some(0.0));
        assert_eq!(series.get(2, 0), Some(NO_DATA));
    }

    #[test]
    fn burst_grows_scale_and_older_points_shrink() {
        let mut scaler = NetworkRateScaler::new(POINTS, NetUnit::Bytes, 5);
        let mut series = graph(POINTS);
        scaler.update(at(0), stats(0, 0), &mut series);
        scaler.update(at(1), stats(1024, 0), &mut series);
        assert_eq!(scaler.max(), 5 * 1024);
        let before = series.get(0, 0).unwrap();

        let sample = scaler.update(at(2), stats(1024 + 100 * 1024, 0), &mut series);
        assert_eq!(sample.rescaled, Some((5 * 1024, 200 * 1024)));
        let after = series.get(1, 0).unwrap();
        assert!((after - before * 5.0 / 200.0).abs() < 1e-6);
        assert!(series.get(0, 0).unwrap() <= 1.0);
    }

    #[test]
    fn small_decrease_keeps_the_scale() {
        let mut scaler = NetworkRateScaler::new(2, NetUnit::Bytes, 1);
        let mut series = graph(2);
        scaler.update(at(0), stats(0, 0), &mut series);
        scaler.update(at(1), stats(9000, 0), &mut series);
        assert_eq!(scaler.max(), 10 * 1024);

        scaler.update(at(2), stats(17_000, 0), &mut series);
        let sample = scaler.update(at(3), stats(25_000, 0), &mut series);
        // peak is now 8000 -> 9 KiB, within 20% of 10 KiB
        assert_eq!(sample.rescaled, None);
        assert_eq!(scaler.max(), 10 * 1024);
    }

    #[test]
    fn scale_shrinks_once_the_peak_leaves_the_window() {
        let points = 4;
        let mut scaler = NetworkRateScaler::new(points, NetUnit::Bytes, 5);
        let mut series = graph(points);
        scaler.update(at(0), stats(0, 0), &mut series);
        scaler.update(at(1), stats(100 * 1024, 0), &mut series);
        assert_eq!(scaler.max(), 200 * 1024);

        for t in 2..5 {
            let sample = scaler.update(at(t), stats(100 * 1024, 0), &mut series);
            assert_eq!(sample.rescaled, None, "tick {t}");
        }
        let sample = scaler.update(at(5), stats(100 * 1024, 0), &mut series);
        assert_eq!(sample.rescaled, Some((200 * 1024, 5 * 1024)));
    }

    #[test]
    fn unit_switch_rerounds_the_max_right_away() {
        let mut scaler = NetworkRateScaler::new(POINTS, NetUnit::Bytes, 5);
        let mut series = graph(POINTS);
        scaler.update(at(0), stats(0, 0), &mut series);
        assert_eq!(
            scaler.set_unit(NetUnit::Bits, &mut series),
            Some((5 * 1024, 5 * MIN_MAX_BITS))
        );
        assert_eq!(scaler.display_max(), (5.0, "kbit/s"));
        assert_eq!(scaler.set_unit(NetUnit::Bits, &mut series), None);

        let sample = scaler.update(at(1), stats(1_000_000, 0), &mut series);
        assert_eq!(sample.rescaled, Some((5 * MIN_MAX_BITS, 1_250_000)));
        assert_eq!(scaler.display_max(), (10.0, "Mbit/s"));
    }

    #[test]
    fn unit_switch_inside_the_skip_band_still_rerounds() {
        // a 4000 B/s peak keeps a 5 KiB/s axis in bytes; in bits that would
        // read 40.96 kbit/s, so the axis moves to 40 kbit/s
        let mut scaler = NetworkRateScaler::new(POINTS, NetUnit::Bytes, 5);
        let mut series = graph(POINTS);
        scaler.update(at(0), stats(0, 0), &mut series);
        scaler.update(at(1), stats(4000, 0), &mut series);
        assert_eq!(scaler.max(), 5 * 1024);
        let before = series.get(0, 0).unwrap();

        let rescaled = scaler.set_unit(NetUnit::Bits, &mut series);
        assert_eq!(rescaled, Some((5 * 1024, 40_000 / 8)));
        assert_eq!(scaler.display_max(), (40.0, "kbit/s"));
        let after = series.get(0, 0).unwrap();
        assert!((after - before * 5120.0 / 5000.0).abs() < 1e-6);
    }

    #[test]
    fn no_data_ticks_age_the_peak_out_of_the_window() {
        let points = 4;
        let mut scaler = NetworkRateScaler::new(points, NetUnit::Bytes, 5);
        let mut series = graph(points);
        scaler.update(at(0), stats(0, 0), &mut series);
        scaler.update(at(1), stats(100 * 1024, 0), &mut series);
        assert_eq!(scaler.max(), 200 * 1024);

        // counters keep going backwards: no data, max untouched
        for (t, received) in (2..6).zip([90_000, 80_000, 70_000, 60_000]) {
            let sample = scaler.update(at(t), stats(received, 0), &mut series);
            assert_eq!(sample.rescaled, None, "tick {t}");
            assert_eq!(scaler.max(), 200 * 1024);
        }

        // the burst has scrolled off, so the first real sample shrinks the axis
        let sample = scaler.update(at(6), stats(60_000 + 1024, 0), &mut series);
        assert_eq!(sample.rescaled, Some((200 * 1024, 5 * 1024)));
        assert!((series.get(0, 0).unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn skipped_ticks_age_the_peak_out_of_the_window() {
        let points = 4;
        let mut scaler = NetworkRateScaler::new(points, NetUnit::Bytes, 5);
        let mut series = graph(points);
        scaler.update(at(0), stats(0, 0), &mut series);
        scaler.update(at(1), stats(100 * 1024, 0), &mut series);
        for _ in 0..points {
            series.push(&[]);
            scaler.skip();
        }
        let sample = scaler.update(at(6), stats(100 * 1024 + 5 * 1024, 0), &mut series);
        assert_eq!(sample.rate_in, 1024);
        assert_eq!(sample.rescaled, Some((200 * 1024, 5 * 1024)));
    }
}
