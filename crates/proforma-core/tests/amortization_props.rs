use proforma_core::proforma::amortization_schedule;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn principal_portions_repay_the_loan(
        principal in 1_000i64..100_000_000,
        rate_bp in 0i64..1_500,
        years in 1u32..=40,
    ) {
        let principal = Decimal::from(principal);
        let annual_rate = Decimal::new(rate_bp, 4);
        let schedule = amortization_schedule(principal, annual_rate, years * 12).unwrap();

        let repaid: Decimal = schedule.rows.iter().map(|r| r.principal).sum();
        prop_assert!((repaid - principal).abs() < dec!(0.000001));

        let last = schedule.rows.last().unwrap();
        prop_assert_eq!(last.closing_balance, Decimal::ZERO);
        prop_assert!(schedule.rows.len() as u32 <= years * 12);
    }

    #[test]
    fn balance_never_increases(
        principal in 1_000i64..10_000_000,
        rate_bp in 0i64..1_500,
        years in 1u32..=35,
    ) {
        let schedule =
            amortization_schedule(Decimal::from(principal), Decimal::new(rate_bp, 4), years * 12)
                .unwrap();
        for row in &schedule.rows {
            prop_assert!(row.closing_balance <= row.opening_balance);
            prop_assert!(row.closing_balance >= Decimal::ZERO);
        }
    }
}

#[test]
fn zero_rate_payment_is_straight_line() {
    let schedule = amortization_schedule(dec!(3600000), Decimal::ZERO, 360).unwrap();
    assert_eq!(schedule.monthly_payment, dec!(10000));
    assert_eq!(schedule.total_interest, Decimal::ZERO);
    assert_eq!(schedule.rows.len(), 360);
    assert!(schedule.rows.iter().all(|r| r.interest.is_zero()));
}
