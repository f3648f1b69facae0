use pos_math::{fill_gaps, lag, population_std_dev, trailing_means, MathError, Summary, TrailingMean};
use rstest::rstest;

#[test]
fn test_weekly_features_on_a_short_series() {
    let sales = [100.0, 200.0, 300.0];

    let means = trailing_means(&sales, 7).unwrap();
    assert_eq!(means, vec![100.0, 150.0, 200.0]);

    // nothing is 7 rows back yet
    let lagged = lag(&sales, 7);
    assert!(lagged.iter().all(Option::is_none));
    assert_eq!(fill_gaps(&lagged), None);
}

#[test]
fn test_lag_then_fill_covers_every_row() {
    let sales: Vec<f64> = (1..=10).map(f64::from).collect();
    let filled = fill_gaps(&lag(&sales, 7)).unwrap();
    assert_eq!(filled, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0]);
}

#[rstest]
#[case(1, vec![4.0, 8.0, 6.0])]
#[case(2, vec![4.0, 6.0, 7.0])]
#[case(5, vec![4.0, 6.0, 6.0])]
fn test_trailing_window_sizes(#[case] period: usize, #[case] expected: Vec<f64>) {
    assert_eq!(trailing_means(&[4.0, 8.0, 6.0], period).unwrap(), expected);
}

#[test]
fn test_window_state() {
    let mut window = TrailingMean::new(2).unwrap();
    assert!(matches!(window.value(), Err(MathError::InsufficientData(_))));

    window.update(1.0);
    window.update(3.0);
    window.update(5.0);
    assert_eq!(window.len(), 2);
    assert_eq!(window.value().unwrap(), 4.0);

    window.reset();
    assert!(window.is_empty());
    assert!(TrailingMean::new(0).is_err());
}

#[test]
fn test_summary_and_spread() {
    let summary = Summary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    assert_eq!(summary.count, 8);
    assert_eq!(summary.mean, 5.0);
    assert_eq!(summary.min, 2.0);
    assert_eq!(summary.max, 9.0);
    assert!((summary.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);

    assert!((population_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
    assert_eq!(population_std_dev(&[]), 0.0);
    assert!(Summary::from_values(&[]).is_err());
}
