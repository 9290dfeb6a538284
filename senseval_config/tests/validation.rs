use rstest::rstest;
use senseval_config::load_toml;

#[test]
fn empty_document_yields_legacy_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults should validate");
    assert_eq!(cfg.grouping.start_tolerance_hours, 24);
    assert_eq!(cfg.averaging.completeness_threshold, 0.75);
    assert_eq!(cfg.regression.min_pairs, 3);
    assert_eq!(cfg.met_targets.rh_min_pct, 10.0);
    assert_eq!(cfg.met_targets.rh_max_pct, 90.0);
}

#[test]
fn rejects_zero_start_tolerance() {
    let toml = r#"
[grouping]
start_tolerance_hours = 0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject tolerance=0");
    assert!(
        format!("{err}").contains("start_tolerance_hours must be >= 1"),
        "unexpected message: {err}"
    );
}

#[rstest]
#[case(0.0)]
#[case(-0.1)]
#[case(1.5)]
fn rejects_out_of_range_completeness_threshold(#[case] threshold: f64) {
    let toml = format!(
        r#"
[averaging]
completeness_threshold = {threshold}
"#
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject threshold");
    assert!(
        format!("{err}").contains("completeness_threshold must be in (0.0, 1.0]"),
        "unexpected message: {err}"
    );
}

#[test]
fn accepts_boundary_threshold_of_one() {
    let toml = r#"
[averaging]
completeness_threshold = 1.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("threshold of exactly 1.0 is valid");
}

#[test]
fn rejects_min_pairs_below_two() {
    let toml = r#"
[regression]
min_pairs = 1
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject min_pairs=1");
    assert!(format!("{err}").contains("min_pairs must be >= 2"));
}

#[test]
fn rejects_inverted_met_ranges() {
    let toml = r#"
[met_targets]
temp_min_c = 40.0
temp_max_c = -20.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject inverted range");
    assert!(format!("{err}").contains("temp_min_c must be < met_targets.temp_max_c"));
}

#[test]
fn rejects_rh_range_outside_percent_bounds() {
    let toml = r#"
[met_targets]
rh_min_pct = -5.0
rh_max_pct = 90.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject negative RH bound");
    assert!(format!("{err}").contains("within [0, 100]"));
}
