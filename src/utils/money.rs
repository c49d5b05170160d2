/// Currency utility functions for rupee conversions
///
/// All monetary values in the database are stored in paise (1 rupee = 100 paise)
/// to avoid floating-point precision issues. The gateway also bills in paise.

/// Convert rupees to paise (multiply by 100)
pub fn rupees_to_paise(rupees: f64) -> i64 {
    (rupees * 100.0).round() as i64
}

/// Convert paise to rupees (divide by 100)
pub fn paise_to_rupees(paise: i64) -> f64 {
    paise as f64 / 100.0
}

/// Format paise as a rupee string with 2 decimal places
pub fn format_paise_as_rupees(paise: i64) -> String {
    format!("₹{:.2}", paise_to_rupees(paise))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rupees_to_paise() {
        assert_eq!(rupees_to_paise(100.0), 10000);
        assert_eq!(rupees_to_paise(0.50), 50);
        assert_eq!(rupees_to_paise(123.45), 12345);
    }

    #[test]
    fn test_paise_to_rupees() {
        assert_eq!(paise_to_rupees(10000), 100.0);
        assert_eq!(paise_to_rupees(50), 0.50);
        assert_eq!(paise_to_rupees(12345), 123.45);
    }

    #[test]
    fn test_format_paise_as_rupees() {
        assert_eq!(format_paise_as_rupees(10000), "₹100.00");
        assert_eq!(format_paise_as_rupees(50), "₹0.50");
    }
}
