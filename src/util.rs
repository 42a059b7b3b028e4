//! Small shared helpers.

/// Format a duration in seconds as `mm:ss.t` (minutes and seconds zero-padded,
/// plus tenths of a second), e.g. `02:05.3`.
pub fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0) as u64;
    let secs = seconds % 60.0;
    let tenths = ((secs * 10.0) as u64) % 10;
    format!("{:02}:{:02}.{}", minutes, secs as u64, tenths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00.0");
        assert_eq!(format_time(125.34), "02:05.3");
        assert_eq!(format_time(59.99), "00:59.9");
        assert_eq!(format_time(60.0), "01:00.0");
        assert_eq!(format_time(3599.5), "59:59.5");
    }

    #[test]
    fn test_format_time_zero_pads() {
        assert_eq!(format_time(61.0), "01:01.0");
        assert_eq!(format_time(9.1), "00:09.1");
    }
}
