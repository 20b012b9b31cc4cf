// Rounding precision resolver.
//
// Derives a magnitude-aware number-format policy from the value columns
// of a prepared table. The policy feeds the rendering collaborator's
// number-format mini-language and the unit caption under the axis label.

use tracing::debug;

use crate::data::DataTable;

/// Magnitude bucket and decimal flag for one chart shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundingPrecision {
    pub order_of_magnitude: i32,
    pub decimal_place: u8,
}

impl RoundingPrecision {
    /// The format directive consumed verbatim by the rendering
    /// collaborator: digit "0", optional ".0", one comma per dropped
    /// thousands group. Must be produced bit-exactly.
    pub fn number_format(&self) -> String {
        let mut format = String::from("0");
        if self.decimal_place != 0 {
            format.push_str(".0");
        }
        if self.order_of_magnitude < 3 {
            return format;
        }
        if self.order_of_magnitude < 6 {
            return format + ",";
        }
        if self.order_of_magnitude < 9 {
            return format + ",,";
        }
        format + ",,,"
    }
}

/// Compute the rounding precision over the named value columns.
///
/// Columns whose median is exactly zero are skipped for the magnitude
/// (log10 undefined) and only take part in decimal detection when they
/// are the sole value column. Non-numeric columns contribute nothing.
pub fn resolve(table: &DataTable, value_columns: &[&str]) -> RoundingPrecision {
    let mut order_of_magnitude: i32 = 0;
    let mut included: Vec<usize> = Vec::new();

    for name in value_columns {
        let Some(col) = table.column_index(name) else {
            continue;
        };
        let values = table.numeric_column(col);
        let Some(median) = median(&values) else {
            continue;
        };
        if median == 0.0 {
            debug!(column = %name, "median is zero, skipping column for magnitude");
            continue;
        }
        included.push(col);

        let column_magnitude = median.abs().log10().floor() as i32;
        if column_magnitude > order_of_magnitude {
            order_of_magnitude = column_magnitude;
        }
    }

    // Magnitudes 2, 5, 8 and 11 fall through without a divisor test, so
    // decimal detection is disabled there. Known gap in the policy, kept.
    let divisor = match order_of_magnitude {
        0 | 1 => Some(1.0),
        3 | 4 => Some(1_000.0),
        6 | 7 => Some(1_000_000.0),
        9 | 10 => Some(1_000_000_000.0),
        _ => None,
    };

    let mut decimal_place = 0;
    if let Some(divisor) = divisor {
        let test_columns: Vec<usize> = if included.is_empty() && value_columns.len() == 1 {
            value_columns
                .iter()
                .filter_map(|name| table.column_index(name))
                .collect()
        } else {
            included
        };
        for col in test_columns {
            let remainder_found = table
                .numeric_column(col)
                .iter()
                .any(|v| (v / divisor).fract() != 0.0);
            if remainder_found {
                decimal_place = 1;
            }
        }
    }

    RoundingPrecision {
        order_of_magnitude,
        decimal_place,
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Human-readable scale caption shown beneath the axis label, e.g.
/// "in k EUR". A unit of "none" (quoted or bare) means unitless.
pub fn unit_caption(unit: &str, order_of_magnitude: i32) -> String {
    let scale = match order_of_magnitude {
        3..=5 => "k",
        6..=8 => "mn",
        m if m > 8 => "bn",
        _ => "",
    };

    let lowered = unit.to_lowercase();
    let unit_is_none = lowered == "none" || lowered == "\"none\"";

    match (unit_is_none, scale.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!("in {}", scale),
        (false, true) => format!("in {}", unit),
        (false, false) => format!("in {} {}", scale, unit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table(column: &str, values: &[f64]) -> DataTable {
        DataTable::new(
            vec![column.to_string()],
            values
                .iter()
                .map(|v| vec![crate::data::format_number(*v)])
                .collect(),
        )
    }

    #[test]
    fn test_magnitude_from_median() {
        let table = make_table("v", &[100.0, 200.0, 300.0]);
        let precision = resolve(&table, &["v"]);
        assert_eq!(precision.order_of_magnitude, 2);
    }

    #[test]
    fn test_magnitude_scaling_invariance() {
        let small = resolve(&make_table("v", &[100.0, 200.0, 300.0]), &["v"]);
        let large = resolve(&make_table("v", &[100_000.0, 200_000.0, 300_000.0]), &["v"]);
        assert_eq!(large.order_of_magnitude - small.order_of_magnitude, 3);
    }

    #[test]
    fn test_decimal_place_from_remainder() {
        let with_remainder = resolve(&make_table("v", &[1000.0, 1500.0]), &["v"]);
        assert_eq!(with_remainder.order_of_magnitude, 3);
        assert_eq!(with_remainder.decimal_place, 1);

        let even = resolve(&make_table("v", &[1000.0, 2000.0]), &["v"]);
        assert_eq!(even.decimal_place, 0);
    }

    #[test]
    fn test_decimal_detection_disabled_at_magnitude_two() {
        // Median magnitude 2, values not evenly divisible by anything
        // sensible: the divisor buckets skip magnitude 2 entirely.
        let precision = resolve(&make_table("v", &[150.5, 250.5, 350.5]), &["v"]);
        assert_eq!(precision.order_of_magnitude, 2);
        assert_eq!(precision.decimal_place, 0);
    }

    #[test]
    fn test_zero_median_column_skipped() {
        let table = DataTable::new(
            vec!["a".into(), "b".into()],
            vec![
                vec!["-5".into(), "1000".into()],
                vec!["0".into(), "2000".into()],
                vec!["5".into(), "3000".into()],
            ],
        );
        let precision = resolve(&table, &["a", "b"]);
        assert_eq!(precision.order_of_magnitude, 3);
        assert_eq!(precision.decimal_place, 0);
    }

    #[test]
    fn test_all_columns_skipped_defaults_to_zero() {
        let table = make_table("v", &[0.0, 0.0]);
        let precision = resolve(&table, &["v"]);
        assert_eq!(precision.order_of_magnitude, 0);
    }

    #[test]
    fn test_sole_zero_median_column_still_tests_decimals() {
        let precision = resolve(&make_table("v", &[-1.5, 0.0, 1.5]), &["v"]);
        assert_eq!(precision.order_of_magnitude, 0);
        assert_eq!(precision.decimal_place, 1);
    }

    #[test]
    fn test_number_format_directives() {
        let make = |order_of_magnitude, decimal_place| RoundingPrecision {
            order_of_magnitude,
            decimal_place,
        };
        assert_eq!(make(0, 0).number_format(), "0");
        assert_eq!(make(2, 1).number_format(), "0.0");
        assert_eq!(make(3, 0).number_format(), "0,");
        assert_eq!(make(4, 1).number_format(), "0.0,");
        assert_eq!(make(7, 0).number_format(), "0,,");
        assert_eq!(make(10, 1).number_format(), "0.0,,,");
    }

    #[test]
    fn test_unit_caption() {
        assert_eq!(unit_caption("none", 0), "");
        assert_eq!(unit_caption("\"none\"", 4), "in k");
        assert_eq!(unit_caption("EUR", 1), "in EUR");
        assert_eq!(unit_caption("EUR", 7), "in mn EUR");
        assert_eq!(unit_caption("USD", 9), "in bn USD");
    }
}
