//! Rendering raw base units as decimal token amounts.

/// Render base units with exactly `decimals` fractional digits.
pub fn to_ui_string(raw: u64, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let digits = format!("{raw:0>width$}", width = decimals as usize + 1);
    let (whole, frac) = digits.split_at(digits.len() - decimals as usize);
    format!("{whole}.{frac}")
}
