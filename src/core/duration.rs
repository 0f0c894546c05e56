// src/core/duration.rs

use std::time::Duration;

/// Formats an elapsed time for the final log line.
///
/// Short runs are shown in seconds; longer ones are broken down into hours
/// and minutes with the total in seconds appended.
pub fn duration_str(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    let whole = elapsed.as_secs();
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = total - (hours * 3600 + minutes * 60) as f64;

    if hours > 0 {
        format!("{hours} h {minutes} min {seconds:.3} s (= {total:.3} s)")
    } else if minutes > 0 {
        format!("{minutes} min {seconds:.3} s (= {total:.3} s)")
    } else {
        format!("{total:.3} seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds() {
        assert_eq!(duration_str(Duration::from_millis(3606)), "3.606 seconds");
    }

    #[test]
    fn test_minutes() {
        assert_eq!(
            duration_str(Duration::from_millis(421_881)),
            "7 min 1.881 s (= 421.881 s)"
        );
    }

    #[test]
    fn test_hours() {
        assert_eq!(
            duration_str(Duration::from_millis(7_397_447)),
            "2 h 3 min 17.447 s (= 7397.447 s)"
        );
    }
}
