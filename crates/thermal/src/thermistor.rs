//! NTC thermistor ADC-code-to-temperature conversion via a monotonic
//! lookup table.
//!
//! The table stores temperature as tenths of a degree (`temp_x10`) so the
//! whole conversion can run in integer arithmetic on the MCU; [`Table::lookup`]
//! does the one division needed for interpolation in `f64` and divides by
//! 10 only at the very end, matching its interpolation formula.

/// One calibration point: a raw ADC code and the temperature it represents,
/// in tenths of a degree Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePoint {
    pub code: u16,
    pub temp_x10: i32,
}

/// Error returned when a table fails its construction-time invariant:
/// ADC codes strictly increasing, temperatures strictly decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotMonotonic;

/// A monotonic thermistor calibration table, ordered by increasing ADC
/// code (and therefore decreasing temperature).
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    points: &'a [TablePoint],
}

impl<'a> Table<'a> {
    /// Builds a table from points already sorted by ascending `code`.
    /// Rejects a table whose codes or temperatures are not strictly
    /// monotonic, or that has fewer than two points (interpolation is
    /// undefined with one point).
    pub fn new(points: &'a [TablePoint]) -> Result<Self, NotMonotonic> {
        if points.len() < 2 {
            return Err(NotMonotonic);
        }
        for w in points.windows(2) {
            if w[1].code <= w[0].code || w[1].temp_x10 >= w[0].temp_x10 {
                return Err(NotMonotonic);
            }
        }
        Ok(Self { points })
    }

    /// Converts a 12-bit ADC code to a temperature in degrees Celsius.
    ///
    /// Codes below the table's first entry clamp to the table's maximum
    /// temperature (lowest code = highest temperature); codes above the
    /// last entry clamp to the minimum. In-range codes are linearly
    /// interpolated between the bracketing table rows, found by binary
    /// search on the largest index whose code is `<= c`.
    pub fn lookup(&self, code: u16) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if code < first.code {
            return first.temp_x10 as f64 / 10.0;
        }
        if code > last.code {
            return last.temp_x10 as f64 / 10.0;
        }

        let i = match self.points.binary_search_by_key(&code, |p| p.code) {
            Ok(exact) => return self.points[exact].temp_x10 as f64 / 10.0,
            Err(insert_at) => insert_at - 1,
        };
        let lo = self.points[i];
        let hi = self.points[i + 1];
        let frac = (code - lo.code) as f64 / (hi.code - lo.code) as f64;
        let temp_x10 = lo.temp_x10 as f64 + frac * (hi.temp_x10 - lo.temp_x10) as f64;
        temp_x10 / 10.0
    }
}

/// A representative NTC 100k/B3950 table for a 12-bit ADC behind a 4.7k
/// pull-up, used as the default hotend/bed thermistor calibration.
pub const NTC_100K_B3950: &[TablePoint] = &[
    TablePoint { code: 32, temp_x10: 3000 },
    TablePoint { code: 356, temp_x10: 2000 },
    TablePoint { code: 852, temp_x10: 1500 },
    TablePoint { code: 1200, temp_x10: 1200 },
    TablePoint { code: 1670, temp_x10: 1000 },
    TablePoint { code: 2400, temp_x10: 600 },
    TablePoint { code: 3084, temp_x10: 250 },
    TablePoint { code: 3828, temp_x10: 0 },
    TablePoint { code: 4095, temp_x10: -200 },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_monotonic_codes() {
        let bad = [
            TablePoint { code: 10, temp_x10: 100 },
            TablePoint { code: 10, temp_x10: 50 },
        ];
        assert_eq!(Table::new(&bad), Err(NotMonotonic));
    }

    #[test]
    fn rejects_non_monotonic_temps() {
        let bad = [
            TablePoint { code: 10, temp_x10: 50 },
            TablePoint { code: 20, temp_x10: 100 },
        ];
        assert_eq!(Table::new(&bad), Err(NotMonotonic));
    }

    #[test]
    fn exact_match_returns_table_value() {
        let t = Table::new(NTC_100K_B3950).unwrap();
        assert_eq!(t.lookup(356), 200.0);
    }

    #[test]
    fn mid_range_row_is_100c() {
        let t = Table::new(NTC_100K_B3950).unwrap();
        let temp = t.lookup(1670);
        assert!((temp - 100.0).abs() <= 2.0);
    }

    #[test]
    fn interpolates_between_rows() {
        let t = Table::new(NTC_100K_B3950).unwrap();
        // Halfway between (356, 200.0) and (852, 150.0).
        let mid_code = 356 + (852 - 356) / 2;
        let temp = t.lookup(mid_code);
        assert!((temp - 175.0).abs() < 1.0);
    }

    #[test]
    fn code_0_clamps_to_max_table_temperature() {
        let t = Table::new(NTC_100K_B3950).unwrap();
        assert_eq!(t.lookup(0), 300.0);
    }

    #[test]
    fn code_4095_clamps_to_min_table_temperature() {
        let t = Table::new(NTC_100K_B3950).unwrap();
        assert_eq!(t.lookup(4095), -20.0);
    }
}
