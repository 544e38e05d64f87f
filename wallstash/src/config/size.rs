//! Human-readable byte sizes.

use super::ConfigError;

/// Format a size in bytes as a human-readable string.
///
/// Units are decimal, matching [`parse_size`], so a formatted size parses
/// back to roughly the same number.
///
/// # Example
///
/// ```
/// use wallstash::config::format_size;
///
/// assert_eq!(format_size(512), "512 bytes");
/// assert_eq!(format_size(2_000_000), "2.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1_000;
    const MB: u64 = 1_000 * KB;
    const GB: u64 = 1_000 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Parse a size such as `2000000`, `2MB`, `1.5 MiB` or `500kb`.
///
/// `KB`/`MB`/`GB` are decimal (powers of 1000) and `KiB`/`MiB`/`GiB` are
/// binary, so `2MB` is exactly the default quality threshold. A bare number
/// is bytes.
pub fn parse_size(input: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSize {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    let text = input.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err(invalid("empty value"));
    }

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        _ => return Err(invalid("unknown unit")),
    };

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("value too large"));
    }

    let value: f64 = number.parse().map_err(|_| invalid("not a number"))?;
    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(invalid("value out of range"));
    }
    Ok(bytes.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(999), "999 bytes");
        assert_eq!(format_size(2_500), "2.50 KB");
        assert_eq!(format_size(3_000_000_000), "3.00 GB");
    }

    #[test]
    fn test_format_agrees_with_parse() {
        assert_eq!(format_size(parse_size("2MB").unwrap()), "2.00 MB");
        assert_eq!(parse_size(&format_size(5_000_000)).unwrap(), 5_000_000);
        assert_eq!(parse_size(&format_size(1_500)).unwrap(), 1_500);
    }

    #[test]
    fn test_parse_plain_bytes() {
        assert_eq!(parse_size("2000000").unwrap(), 2_000_000);
        assert_eq!(parse_size("  42 b ").unwrap(), 42);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_size("2MB").unwrap(), 2_000_000);
        assert_eq!(parse_size("500kb").unwrap(), 500_000);
        assert_eq!(parse_size("1.5 MiB").unwrap(), 1_572_864);
        assert_eq!(parse_size("1GiB").unwrap(), 1 << 30);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("12 parsecs").is_err());
        assert!(parse_size("1.2.3mb").is_err());
        assert!(parse_size("99999999999999999999gb").is_err());
    }
}
