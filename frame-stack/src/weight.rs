//! Utilities to display weights

use crate::tree::Weight;
use std::io;
use strum::{Display, EnumString, IntoStaticStr};

/// One nanosecond, the base time unit of weights
pub const NANOSECOND: Weight = 1.0;
/// One microsecond
pub const MICROSECOND: Weight = 1000.0 * NANOSECOND;
/// One millisecond
pub const MILLISECOND: Weight = 1000.0 * MICROSECOND;
/// One second
pub const SECOND: Weight = 1000.0 * MILLISECOND;
/// One minute
pub const MINUTE: Weight = 60.0 * SECOND;
/// One hour
pub const HOUR: Weight = 60.0 * MINUTE;
/// One day
pub const DAY: Weight = 24.0 * HOUR;

/// Weight of a node as a percentage of a reference node's total weight
///
/// This is 0 when either the weight or the reference is zero, and may exceed
/// 100 when the weight is not part of the reference (e.g. in bottom-up views).
pub fn relative_weight(weight: Weight, reference_total: Weight) -> Weight {
    if weight == 0.0 || reference_total == 0.0 {
        0.0
    } else {
        weight / reference_total * 100.0
    }
}

/// Display a percentage with one decimal
pub fn display_percentage(percentage: Weight) -> String {
    format!("{percentage:.1}%")
}

/// Meaning of the weights of a frame tree
#[derive(Copy, Clone, Debug, Default, Display, EnumString, Eq, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum WeightUnit {
    /// Wall-clock or CPU time, in nanoseconds
    #[default]
    Nanoseconds,

    /// Number of samples
    Samples,
}
//
impl WeightUnit {
    /// Display a weight in a human-readable format
    pub fn display(self, output: impl io::Write, weight: Weight) -> io::Result<()> {
        match self {
            Self::Nanoseconds => display_time_impl(output, weight, None),
            Self::Samples => display_samples(output, weight),
        }
    }

    /// Display a weight into a string
    pub fn format(self, weight: Weight) -> String {
        let mut buffer = Vec::<u8>::new();
        self.display(&mut buffer, weight)
            .expect("Writing to a buffer shouldn't fail");
        String::from_utf8(buffer).expect("Weight display should produce UTF-8 data")
    }
}

/// Display a sample count
fn display_samples(mut output: impl io::Write, samples: Weight) -> io::Result<()> {
    let samples = samples.round();
    if samples == 1.0 {
        write!(output, "1 sample")
    } else {
        write!(output, "{samples} samples")
    }
}

/// Display a nanosecond duration, allowing for HH:MM:SS format
fn display_time_impl(
    mut output: impl io::Write,
    duration: Weight,
    force_hms: Option<ForceHMS>,
) -> io::Result<()> {
    if duration >= 23.0 * HOUR + 59.0 * MINUTE + 59.995 * SECOND {
        let mut days = (duration / DAY).floor();
        let mut remainder = duration - days * DAY;
        if remainder >= 23.0 * HOUR + 59.0 * MINUTE + 59.995 * SECOND {
            days += 1.0;
            remainder = 0.0;
        }
        write!(output, "{days}d ")?;
        display_time_impl(output, remainder, Some(ForceHMS::Hour))
    } else if force_hms == Some(ForceHMS::Hour) || duration >= 59.0 * MINUTE + 59.995 * SECOND {
        let mut hours = (duration / HOUR).floor();
        let mut remainder = duration - hours * HOUR;
        if remainder >= 59.0 * MINUTE + 59.995 * SECOND {
            hours += 1.0;
            remainder = 0.0;
        }
        if force_hms == Some(ForceHMS::Hour) {
            write!(output, "{hours:02}:")?;
        } else {
            write!(output, "{hours}:")?;
        }
        display_time_impl(output, remainder, Some(ForceHMS::Minute))
    } else if force_hms == Some(ForceHMS::Minute) || duration >= 59.995 * SECOND {
        let mut minutes = (duration / MINUTE).floor();
        let mut remainder = duration - minutes * MINUTE;
        if remainder >= 59.995 * SECOND {
            minutes += 1.0;
            remainder = 0.0;
        }
        if force_hms == Some(ForceHMS::Minute) {
            write!(output, "{minutes:02}:")?;
        } else {
            write!(output, "{minutes}:")?;
        }
        display_time_impl(output, remainder, Some(ForceHMS::Second))
    } else if duration >= 0.999995 * SECOND || force_hms == Some(ForceHMS::Second) {
        if force_hms == Some(ForceHMS::Second) {
            write!(output, "{:05.2}", duration / SECOND)?;
        } else {
            write!(output, "{:.2}s", duration / SECOND)?;
        }
        Ok(())
    } else if duration >= 0.999995 * MILLISECOND {
        write!(output, "{:.2}ms", duration / MILLISECOND)
    } else if duration >= 0.999995 * MICROSECOND {
        write!(output, "{:.2}µs", duration / MICROSECOND)
    } else {
        write!(output, "{}ns", duration / NANOSECOND)
    }
}
//
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ForceHMS {
    Hour,
    Minute,
    Second,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn relative_weight() {
        assert_eq!(super::relative_weight(25.0, 100.0), 25.0);
        assert_eq!(display_percentage(super::relative_weight(25.0, 100.0)), "25.0%");
        assert_eq!(super::relative_weight(25.0, 0.0), 0.0);
        assert_eq!(super::relative_weight(0.0, 100.0), 0.0);
        assert_eq!(super::relative_weight(150.0, 100.0), 150.0);
        assert_eq!(display_percentage(100.0 / 3.0), "33.3%");
    }

    #[test]
    fn display_time() {
        let mut buffer = Vec::new();
        let mut check_display = |duration, expected: &str| {
            buffer.clear();
            assert_matches!(WeightUnit::Nanoseconds.display(&mut buffer, duration), Ok(()));
            assert_eq!(
                buffer,
                expected.as_bytes(),
                "Expected {}, got {:?}",
                expected,
                std::str::from_utf8(&buffer)
            );
        };
        check_display(0.0, "0ns");
        check_display(12.0 * NANOSECOND, "12ns");

        check_display(1.0 * MICROSECOND, "1.00µs");
        check_display(4.12345 * MICROSECOND, "4.12µs");

        check_display(1.0 * MILLISECOND, "1.00ms");
        check_display(1.234 * MILLISECOND, "1.23ms");
        check_display(999.994 * MILLISECOND, "999.99ms");

        check_display(999.996 * MILLISECOND, "1.00s");
        check_display(1.6 * SECOND, "1.60s");
        check_display(4.321 * SECOND, "4.32s");
        check_display(59.994 * SECOND, "59.99s");

        check_display(59.995 * SECOND, "1:00.00");
        check_display(3.0 * MINUTE, "3:00.00");
        check_display(59.0 * MINUTE + 59.994 * SECOND, "59:59.99");

        check_display(59.0 * MINUTE + 59.995 * SECOND, "1:00:00.00");
        check_display(
            23.0 * HOUR + 59.0 * MINUTE + 59.995 * SECOND,
            "1d 00:00:00.00",
        );
    }

    #[test]
    fn display_samples() {
        assert_eq!(WeightUnit::Samples.format(1.0), "1 sample");
        assert_eq!(WeightUnit::Samples.format(42.0), "42 samples");
        assert_eq!(WeightUnit::Samples.format(0.0), "0 samples");
        assert_eq!("samples".parse(), Ok(WeightUnit::Samples));
        assert_eq!(WeightUnit::Nanoseconds.to_string(), "nanoseconds");
    }
}
