use flowstation::calibration::{Calibration, PSI_TO_BAR, check_sensor};
use flowstation::error::AppError;

#[test]
fn accepts_ordered_ranges() {
    let calibration = Calibration::new(0.5, 4.5, 0.0, 10.0).unwrap();
    assert_eq!(calibration, Calibration::default());
}

#[test]
fn rejects_inverted_or_empty_ranges() {
    assert!(Calibration::new(4.5, 0.5, 0.0, 10.0).is_err());
    assert!(Calibration::new(0.5, 4.5, 10.0, 0.0).is_err());
    assert!(Calibration::new(0.5, 0.5, 0.0, 10.0).is_err());
    assert!(Calibration::new(0.5, 4.5, 3.0, 3.0).is_err());
}

#[test]
fn rejects_non_finite_values() {
    assert!(Calibration::new(f64::NAN, 4.5, 0.0, 10.0).is_err());
    assert!(Calibration::new(0.5, f64::INFINITY, 0.0, 10.0).is_err());
}

#[test]
fn parses_form_fields() {
    let calibration = Calibration::parse_fields(" 0.5", "4.5 ", "0", "10").unwrap();
    assert!(calibration.is_valid());

    let err = Calibration::parse_fields("abc", "4.5", "0", "10").unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("v_min < v_max")));

    assert!(Calibration::parse_fields("", "4.5", "0", "10").is_err());
    assert!(Calibration::parse_fields("NaN", "4.5", "0", "10").is_err());
    assert!(Calibration::parse_fields("4.5", "0.5", "0", "10").is_err());
}

#[test]
fn converts_voltage_to_pressure() {
    let calibration = Calibration::default();

    assert!((calibration.psi_at(0.5) - 0.0).abs() < 1e-9);
    assert!((calibration.psi_at(2.5) - 5.0).abs() < 1e-9);
    assert!((calibration.psi_at(4.5) - 10.0).abs() < 1e-9);
    assert!((calibration.bar_at(4.5) - 10.0 * PSI_TO_BAR).abs() < 1e-9);
}

#[test]
fn formats_form_fields() {
    let calibration = Calibration::new(0.512, 4.5, 0.0, 10.0).unwrap();
    assert_eq!(calibration.field_text(), ["0.51", "4.50", "0.0", "10.0"]);
}

#[test]
fn sensor_index_must_address_a_pressure_channel() {
    assert_eq!(check_sensor(0).unwrap(), 0);
    assert_eq!(check_sensor(3).unwrap(), 3);
    assert!(check_sensor(4).is_err());
}
