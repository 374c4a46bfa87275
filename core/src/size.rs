/// Bytes per kilobyte, megabyte and gigabyte as printed by the JVM.
pub const KIB: f64 = 1024.0;
pub const MIB: f64 = 1024.0 * 1024.0;
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert a size literal and its unit (`K`, `M`, `G`, optionally suffixed with `B`) to bytes.
///
/// The numeric part is read as a float before scaling, so `"9.304"` + `"GB"` works.
/// An unparsable number yields `0.0`; an unknown unit leaves the value unscaled.
pub fn parse_size(value: &str, unit: &str) -> f64 {
    let val: f64 = value.trim().parse().unwrap_or(0.0);
    match unit.strip_suffix('B').unwrap_or(unit) {
        "G" => val * GIB,
        "M" => val * MIB,
        "K" => val * KIB,
        _ => val,
    }
}

/// Human readable byte count: GB with 3 decimals, MB with 1 decimal, plain bytes otherwise.
pub fn format_bytes(bytes: f64) -> String {
    if bytes >= GIB {
        format!("{:.3} GB", bytes / GIB)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes / MIB)
    } else {
        format!("{} B", bytes)
    }
}
