use comanda_common::Pesos;

/// Platform commission, as a percentage of the order subtotal.
pub const SERVICE_FEE_PERCENT: i64 = 5;

/// The platform's cut for an order: 5% of the subtotal, rounded half-up to the nearest peso.
pub fn service_fee(subtotal: Pesos) -> Pesos {
    let hundredths = subtotal.value() * SERVICE_FEE_PERCENT;
    Pesos::from((hundredths + 50).div_euclid(100))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn five_percent_of_round_subtotals() {
        assert_eq!(service_fee(Pesos::from(30_000)), Pesos::from(1_500));
        assert_eq!(service_fee(Pesos::from(20_000)), Pesos::from(1_000));
        assert_eq!(service_fee(Pesos::from(0)), Pesos::from(0));
    }

    #[test]
    fn rounds_half_up() {
        // 10_001 * 5% = 500.05 -> 500
        assert_eq!(service_fee(Pesos::from(10_001)), Pesos::from(500));
        // 10_010 * 5% = 500.50 -> 501
        assert_eq!(service_fee(Pesos::from(10_010)), Pesos::from(501));
        // 10 * 5% = 0.50 -> 1
        assert_eq!(service_fee(Pesos::from(10)), Pesos::from(1));
        // 9 * 5% = 0.45 -> 0
        assert_eq!(service_fee(Pesos::from(9)), Pesos::from(0));
    }

    #[test]
    fn total_invariant_holds() {
        for subtotal in [30_000_i64, 10_001, 15_000, 1, 999_999] {
            let subtotal = Pesos::from(subtotal);
            let fee = service_fee(subtotal);
            assert_eq!(subtotal + fee, Pesos::from(subtotal.value() + fee.value()));
        }
    }
}
