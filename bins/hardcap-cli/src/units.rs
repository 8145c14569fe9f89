//! Decimal amounts on the command line.

use anyhow::{bail, Context, Result};
use hardcap_core::types::Amount;

/// Decimals used by both ether and the sale token.
pub const DECIMALS: u32 = 18;

/// Parse a decimal string such as `"1.25"` into base units.
pub fn parse_units(s: &str, decimals: u32) -> Result<Amount> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        bail!("empty amount");
    }
    if frac.len() > decimals as usize {
        bail!("{s}: more than {decimals} decimal places");
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        bail!("{s}: not a decimal number");
    }

    let scale = 10u128.pow(decimals);
    let whole: Amount = if whole.is_empty() { 0 } else { whole.parse().with_context(|| format!("{s}: too large"))? };
    let frac: Amount = if frac.is_empty() {
        0
    } else {
        let digits: Amount = frac.parse().with_context(|| format!("{s}: bad fraction"))?;
        digits * 10u128.pow(decimals - frac.len() as u32)
    };
    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .with_context(|| format!("{s}: too large"))
}

/// Render base units as a decimal string, trimming trailing zeros.
pub fn format_units(amount: Amount, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
