//! Display formatting for derived, never-stored response fields.

/// `1500000000` → `"1.500.000.000 ₫"`
pub fn format_vnd(amount: f64) -> String {
    let rounded = amount.max(0.0).round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{} ₫", grouped)
}

/// Compact price used on listing cards: `"2,5 tỷ"`, `"850 triệu"`.
pub fn format_price_short(amount: f64) -> String {
    const BILLION: f64 = 1_000_000_000.0;
    const MILLION: f64 = 1_000_000.0;
    if amount >= BILLION {
        format!("{} tỷ", trim_decimal(amount / BILLION))
    } else if amount >= MILLION {
        format!("{} triệu", trim_decimal(amount / MILLION))
    } else {
        format_vnd(amount)
    }
}

pub fn format_price_range(min: f64, max: f64) -> String {
    if (max - min).abs() < f64::EPSILON {
        format_price_short(min)
    } else {
        format!("{} - {}", format_price_short(min), format_price_short(max))
    }
}

pub fn format_area_range(min: f64, max: f64) -> String {
    if (max - min).abs() < f64::EPSILON {
        format!("{} m²", trim_decimal(min))
    } else {
        format!("{} - {} m²", trim_decimal(min), trim_decimal(max))
    }
}

/// Whole-number discount between list and sale price; `None` without a discount.
pub fn discount_percent(price: f64, sale_price: Option<f64>) -> Option<u32> {
    let sale = sale_price?;
    if price <= 0.0 || sale >= price || sale < 0.0 {
        return None;
    }
    Some(((price - sale) / price * 100.0).round() as u32)
}

pub fn reading_time_label(minutes: u32) -> String {
    format!("{} phút đọc", minutes.max(1))
}

/// One decimal place, comma as the decimal separator, no trailing `,0`.
fn trim_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    let s = s.strip_suffix(".0").unwrap_or(&s).to_string();
    s.replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_vnd() {
        assert_eq!(format_vnd(0.0), "0 ₫");
        assert_eq!(format_vnd(999.0), "999 ₫");
        assert_eq!(format_vnd(1500000.0), "1.500.000 ₫");
        assert_eq!(format_vnd(1500000000.0), "1.500.000.000 ₫");
    }

    #[test]
    fn test_short_prices() {
        assert_eq!(format_price_short(2_500_000_000.0), "2,5 tỷ");
        assert_eq!(format_price_short(3_000_000_000.0), "3 tỷ");
        assert_eq!(format_price_short(850_000_000.0), "850 triệu");
        assert_eq!(format_price_range(1e9, 1e9), "1 tỷ");
        assert_eq!(format_price_range(9e8, 2e9), "900 triệu - 2 tỷ");
        assert_eq!(format_area_range(45.5, 120.0), "45,5 - 120 m²");
    }

    #[test]
    fn test_discount() {
        assert_eq!(discount_percent(1_000_000.0, Some(800_000.0)), Some(20));
        assert_eq!(discount_percent(1_000_000.0, Some(1_000_000.0)), None);
        assert_eq!(discount_percent(1_000_000.0, None), None);
        assert_eq!(discount_percent(0.0, Some(0.0)), None);
    }
}
