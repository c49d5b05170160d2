use rand::Rng;

/// Generate a receipt reference for gateway orders, e.g. WBR_1724565600_A8F3K2
pub fn generate_receipt_reference() -> String {
    use rand::distr::Alphanumeric;

    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect::<String>()
        .to_uppercase();

    format!("WBR_{}_{}", chrono::Utc::now().timestamp(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let reference = generate_receipt_reference();
        assert!(reference.starts_with("WBR_"));
        assert_eq!(reference.split('_').count(), 3);
    }
}
