#[cfg(test)]
use crate::{
    Config, ExportError, Month, Operator, Period, SessionState, StateStore,
    export::{download_file_name, validate},
    period::PeriodError,
    state::{self, DEFAULT_OUTLETS},
};
#[cfg(test)]
use anyhow::Result;
#[cfg(test)]
use std::fs;

#[cfg(test)]
fn catalog(names: &[&str]) -> SessionState {
    SessionState {
        outlets: names.iter().map(|s| (*s).to_owned()).collect(),
        ..Default::default()
    }
}

#[test]
fn add_outlet_skips_blanks_and_duplicates() {
    let mut state = catalog(&["Toko A"]);
    assert!(state.add_outlet("Toko B"));
    assert!(!state.add_outlet("Toko A"));
    assert!(!state.add_outlet(""));
    assert!(!state.add_outlet("   "));
    assert!(!state.add_outlet("Toko B"));
    assert_eq!(state.outlets, ["Toko A", "Toko B"]);
}

#[test]
fn add_outlet_keeps_the_name_as_typed() {
    let mut state = SessionState::default();
    assert!(state.add_outlet(" Toko C "));
    // an exact match only; the trimmed form is a different outlet
    assert!(state.add_outlet("Toko C"));
    assert_eq!(state.outlets, [" Toko C ", "Toko C"]);
}

#[test]
fn selection_follows_catalog_order_and_drops_unknowns() {
    let mut state = catalog(&["Toko A", "Toko B", "Toko C"]);
    state.select(["Toko C", "Nowhere", "Toko A"]);
    assert_eq!(state.selected, ["Toko A", "Toko C"]);
    assert!(state.selected.iter().all(|s| state.outlets.contains(s)));

    state.select(Vec::<String>::new());
    assert!(state.selected.is_empty());
}

#[test]
fn seeding_only_fills_an_empty_catalog() {
    let mut state = SessionState::default();
    assert!(state.seed_defaults());
    assert_eq!(state.outlets.len(), DEFAULT_OUTLETS.len());
    assert_eq!(state.outlets[0], "ALFAMIDI GALESONG TAKALAR");
    assert_eq!(state.outlets[38], "ALFAMIDI RUMBIA JENEPONTO");

    let mut custom = catalog(&["Toko A"]);
    assert!(!custom.seed_defaults());
    assert_eq!(custom.outlets, ["Toko A"]);
}

#[test]
fn state_file_uses_form_keys() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("data_kunjungan.json");
    let mut state = catalog(&["Toko A"]);
    state.select(["Toko A"]);
    state.operator = Operator {
        name: "Ani".into(),
        id_number: "123".into(),
        role: "Staff".into(),
    };
    state::save(&path, &state)?;

    let text = fs::read_to_string(&path)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(json["toko"][0], "Toko A");
    assert_eq!(json["selected"][0], "Toko A");
    assert_eq!(json["petugas"]["nama"], "Ani");
    assert_eq!(json["petugas"]["nik"], "123");
    assert_eq!(json["petugas"]["jabatan"], "Staff");
    assert!(text.contains("\n    \"toko\""));

    assert_eq!(state::load(&path), state);
    Ok(())
}

#[test]
fn unreadable_state_loads_as_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing.json");
    assert_eq!(state::load(&missing), SessionState::default());

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json")?;
    assert_eq!(state::load(&broken), SessionState::default());

    let wrong_shape = dir.path().join("shape.json");
    fs::write(&wrong_shape, r#"{"toko": "Toko A"}"#)?;
    assert_eq!(state::load(&wrong_shape), SessionState::default());
    Ok(())
}

#[test]
fn missing_keys_fall_back_per_field() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("partial.json");
    fs::write(&path, r#"{"toko": ["Toko A"], "petugas": {}}"#)?;
    let state = state::load(&path);
    assert_eq!(state.outlets, ["Toko A"]);
    assert!(state.selected.is_empty());
    assert_eq!(state.operator, Operator::default());
    Ok(())
}

#[test]
fn store_seeds_and_prunes_on_open() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data_kunjungan.json");
    fs::write(
        &path,
        r#"{"toko": ["Toko A", "Toko B"], "selected": ["Toko B", "Gone"], "petugas": {}}"#,
    )?;
    let store = StateStore::open(&path)?;
    assert_eq!(store.state().selected, ["Toko B"]);
    assert_eq!(state::load(&path).selected, ["Toko B"]);

    let fresh = dir.path().join("fresh.json");
    let store = StateStore::open(&fresh)?;
    assert_eq!(store.state().outlets.len(), DEFAULT_OUTLETS.len());
    assert!(fresh.exists());
    Ok(())
}

#[test]
fn store_persists_every_change() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data_kunjungan.json");
    let mut store = StateStore::open(&path)?;

    assert!(store.add_outlet("Toko Baru")?);
    assert!(!store.add_outlet("Toko Baru")?);
    assert!(store.check("Toko Baru")?);
    assert!(store.check("ALFAMIDI BAROMBONG")?);
    assert!(!store.check("Unknown")?);
    store.set_operator(Operator {
        name: "Ani".into(),
        ..Default::default()
    })?;

    let saved = state::load(&path);
    assert_eq!(saved.outlets.last().map(String::as_str), Some("Toko Baru"));
    assert_eq!(saved.selected, ["ALFAMIDI BAROMBONG", "Toko Baru"]);
    assert_eq!(saved.operator.name, "Ani");

    assert!(store.uncheck("ALFAMIDI BAROMBONG")?);
    assert!(!store.uncheck("ALFAMIDI BAROMBONG")?);
    assert_eq!(state::load(&path).selected, ["Toko Baru"]);
    Ok(())
}

#[test]
fn months_parse_by_name_or_number() {
    assert_eq!("Maret".parse::<Month>().map(Month::number), Ok(3));
    assert_eq!("desember".parse::<Month>().map(Month::number), Ok(12));
    assert_eq!(" 8 ".parse::<Month>().map(Month::name), Ok("Agustus"));
    assert!(matches!("13".parse::<Month>(), Err(PeriodError::UnknownMonth(_))));
    assert!(matches!("March".parse::<Month>(), Err(PeriodError::UnknownMonth(_))));
    assert_eq!(Month::from_number(0), None);
}

#[test]
fn years_are_bounded() -> Result<()> {
    let march: Month = "Maret".parse()?;
    assert_eq!(Period::new(march, 2020)?.year, 2020);
    assert_eq!(Period::new(march, 2100)?.year, 2100);
    assert_eq!(Period::new(march, 2019), Err(PeriodError::YearOutOfRange(2019)));
    assert_eq!(Period::new(march, 2101), Err(PeriodError::YearOutOfRange(2101)));
    assert_eq!(Period::new(march, -1), Err(PeriodError::YearOutOfRange(-1)));

    let now = Period::current();
    assert!((2020..=2100).contains(&now.year));
    Ok(())
}

#[test]
fn validation_checks_selection_before_operator() {
    let mut state = catalog(&["Toko A"]);
    assert!(matches!(validate(&state), Err(ExportError::NoOutletSelected)));

    state.select(["Toko A"]);
    let err = validate(&state).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Nama petugas wajib diisi!");

    state.operator.name = "Ani".into();
    assert!(validate(&state).is_ok());
    assert_eq!(
        ExportError::NoOutletSelected.to_string(),
        "Pilih minimal 1 toko!"
    );
}

#[test]
fn download_name_carries_operator_and_period() -> Result<()> {
    let period = Period::new("Maret".parse()?, 2025)?;
    assert_eq!(download_file_name("Ani", &period), "Kunjungan_Ani_Maret_2025.xlsx");
    assert_eq!(
        download_file_name("A/B", &period),
        "Kunjungan_A_B_Maret_2025.xlsx"
    );
    Ok(())
}

#[test]
fn workbook_errors_read_as_their_cause() {
    let err = ExportError::from(anyhow::anyhow!("zip broken").context("cannot open x.xlsx"));
    assert!(!err.is_validation());
    assert_eq!(err.to_string(), "cannot open x.xlsx: zip broken");
}

#[test]
fn config_keys_are_optional() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    fs::write(&path, "output_dir = \"/tmp/out\"\n")?;
    let config = Config::load_from(&path)?;
    assert_eq!(config.output_dir(), std::path::PathBuf::from("/tmp/out"));
    assert_eq!(config.state_file(), std::path::PathBuf::from("data_kunjungan.json"));

    fs::write(&path, "state_file = [")?;
    assert!(Config::load_from(&path).is_err());
    Ok(())
}
