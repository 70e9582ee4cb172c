//! Integration tests for the calibration chain and configuration loading.

use std::io::Write;

use asi_common::Instrument;
use asi_tools::calibration::{calibrate, Calibrated, CalibrationOptions};
use asi_tools::config::ToolsConfig;
use ndarray::Array2;
use skymap::Calibration;
use tempfile::NamedTempFile;
use test_utils::{assert_approx_eq, stack_from_fn};

#[test]
fn test_full_chain_to_rayleighs() {
    // Dark block of 10 DN, sky of 110 DN over 3 frames
    let stack = stack_from_fn::<u16>(8, 8, 1, 3, |r, c, _, _| if r < 5 && c < 5 { 10 } else { 110 });
    let flatfield = Calibration::flatfield("15649", Instrument::Rego, Array2::from_elem((8, 8), 0.5));
    let rayleighs = Calibration::rayleighs("15649", Instrument::Rego, 4.0);

    let opts = CalibrationOptions::new(Instrument::Rego)
        .with_flatfield(&flatfield)
        .with_rayleighs(&rayleighs);
    let out = calibrate(&stack, &opts).unwrap();
    let Calibrated::Rayleighs(out) = out else {
        panic!("expected Rayleighs output");
    };

    // (110 - 10) * 0.5 = 50 DN, * 4 R/DN/s / 2 s = 100 R
    assert_eq!(out.dim(), (8, 8, 1, 3));
    assert_approx_eq!(out.value(7, 7, 0, 2), 100.0, 1e-9);
    assert_eq!(out.value(0, 0, 0, 0), 0.0);
    assert_eq!(out.timestamps(), stack.timestamps());
}

#[test]
fn test_flatfield_shape_mismatch() {
    let stack = stack_from_fn::<u16>(8, 8, 1, 1, |_, _, _, _| 100);
    let flatfield = Calibration::flatfield("15649", Instrument::Rego, Array2::from_elem((4, 4), 1.0));
    let opts = CalibrationOptions::none(Instrument::Rego).with_flatfield(&flatfield);
    assert!(matches!(
        calibrate(&stack, &opts),
        Err(asi_common::AsiError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_config_file_drives_exposure() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "dark_box_size: 3").unwrap();
    writeln!(file, "exposure_overrides:").unwrap();
    writeln!(file, "  trex_nir: 10.0").unwrap();

    let config = ToolsConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.dark_box_size, 3);
    assert_eq!(config.min_elevation, 5.0);

    let stack = stack_from_fn::<u16>(4, 4, 1, 1, |_, _, _, _| 100);
    let rayleighs = Calibration::rayleighs("nir", Instrument::TrexNir, 2.0);
    let mut opts = CalibrationOptions::none(Instrument::TrexNir).with_rayleighs(&rayleighs);
    opts.exposure_s = config.exposure_seconds(Instrument::TrexNir);
    let out = calibrate(&stack, &opts).unwrap().to_f64();
    assert_approx_eq!(out.value(0, 0, 0, 0), 20.0, 1e-9);
}

#[test]
fn test_config_overrides_reach_full_chain() {
    // 4x4 dark block of 10 DN inside a 5x5 block bordered by 60 DN
    let stack = stack_from_fn::<u16>(6, 6, 1, 1, |r, c, _, _| match (r, c) {
        (r, c) if r < 4 && c < 4 => 10,
        (4, _) | (_, 4) => 60,
        _ => 110,
    });
    let flatfield = Calibration::flatfield("15649", Instrument::Rego, Array2::from_elem((6, 6), 1.0));
    let rayleighs = Calibration::rayleighs("15649", Instrument::Rego, 4.0);

    let defaults = ToolsConfig::default();
    let opts = CalibrationOptions::from_config(Instrument::Rego, &defaults)
        .with_flatfield(&flatfield)
        .with_rayleighs(&rayleighs);
    assert_eq!(opts.dark_box_size, 5);
    // 5x5 block: (16 * 10 + 9 * 60) / 25 = 28; (110 - 28) * 4 / 2
    let out = calibrate(&stack, &opts).unwrap().to_f64();
    assert_approx_eq!(out.value(5, 5, 0, 0), 164.0, 1e-9);

    let config = ToolsConfig::from_yaml_str("dark_box_size: 4\nexposure_overrides:\n  rego: 4.0\n").unwrap();
    let opts = CalibrationOptions::from_config(Instrument::Rego, &config)
        .with_flatfield(&flatfield)
        .with_rayleighs(&rayleighs);
    // 4x4 block: 10; (110 - 10) * 4 / 4
    let out = calibrate(&stack, &opts).unwrap().to_f64();
    assert_approx_eq!(out.value(5, 5, 0, 0), 100.0, 1e-9);
}

#[test]
fn test_invalid_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "min_elevation: 120.0").unwrap();
    let err = ToolsConfig::from_yaml_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("min_elevation"));
}
