//! Form state persisted in a flat JSON sidecar.
//!
//! The whole document is rewritten after every mutation. Reading is lenient:
//! a missing, unreadable or malformed file yields an empty state instead of
//! an error, so the form always comes up.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_STATE_FILE: &str = "data_kunjungan.json";

/// Outlet catalog used when the stored one is empty.
pub const DEFAULT_OUTLETS: [&str; 39] = [
    "ALFAMIDI GALESONG TAKALAR",
    "ALFAMIDI BONTOSUNGGU TAKALAR",
    "ALFAMIDI GALESONG UTARA TAKALAR",
    "ALFAMIDI BAROMBONG",
    "ALFAMIDI EMMY SAELAN",
    "ALFAMIDI TALASALAPANG",
    "ALFAMIDI JIPANG RAYA",
    "ALFAMIDI MINASA UPA",
    "ALFAMIDI SULTAN HASANUDDIN",
    "ALFAMIDI AGUS SALIM",
    "ALFAMIDI POROS MALINO",
    "ALFAMIDI POROS PALANGGA",
    "ALFAMIDI METRO TANJUNG BUNGA",
    "ALFAMIDI METRO TANJUNG BUNGA BLOK H",
    "ALFAMIDI BONTO KADOPEPE",
    "ALFAMIDI SUPER LIMBUNG",
    "ALFAMIDI ELANG BANTAENG",
    "ALFAMIDI RATULANGI BANTAENG",
    "ALFAMIDI RAYA LANTO BANTAENG",
    "ALFAMIDI PAHLAWAN BANTAENG",
    "ALFAMIDI BANGKALA JENEPONTO",
    "ALFAMIDI POROS TAKALAR",
    "ALFAMIDI PALEKO TAKALAR",
    "ALFAMIDI SAM RATULANGI BULUKUMBA",
    "ALFAMIDI GAJAH MADA BULUKUMBA",
    "ALFAMIDI PAHLAWAN BULUKUMBA",
    "ALFAMIDI ANDI SULTAN BULUKUMBA",
    "ALFAMIDI KUSUMA BANGSA BULUKUMBA",
    "ALFAMIDI JEND. SUDIRMAN BULUKUMBA",
    "ALFAMIDI BONTOBAHARI BULUKUMBA",
    "ALFAMIDI KALIMPORO KAJANG BULUKUMBA",
    "ALFAMIDI KEMAKMURAN TANETE BULUKUMBA",
    "ALFAMIDI PAHLAWAN 2 JENEPONTO",
    "ALFAMIDI PAHLAWAN JENEPONTO",
    "ALFAMIDI JENEPONTO 2",
    "ALFAMIDI LANTO PASEWANG JENEPONTO",
    "ALFAMIDI TAMALATEA JENEPONTO",
    "ALFAMIDI TOLO JENEPONTO",
    "ALFAMIDI RUMBIA JENEPONTO",
];

/// The person recording the visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    #[serde(rename = "nama", default)]
    pub name: String,
    #[serde(rename = "nik", default)]
    pub id_number: String,
    #[serde(rename = "jabatan", default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(rename = "toko", default)]
    pub outlets: Vec<String>,
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(rename = "petugas", default)]
    pub operator: Operator,
}

impl SessionState {
    /// Appends `name` unless it is blank or already in the catalog.
    ///
    /// Blankness is judged on the trimmed name, but the name is stored as
    /// given; duplicates are matched exactly.
    pub fn add_outlet(&mut self, name: &str) -> bool {
        if name.trim().is_empty() || self.outlets.iter().any(|o| o == name) {
            return false;
        }
        self.outlets.push(name.to_owned());
        true
    }

    /// Replaces the selection with the catalog entries named in `checked`,
    /// in catalog order. Names outside the catalog are ignored.
    pub fn select<I, S>(&mut self, checked: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let checked: Vec<S> = checked.into_iter().collect();
        self.selected = self
            .outlets
            .iter()
            .filter(|o| checked.iter().any(|c| c.as_ref() == o.as_str()))
            .cloned()
            .collect();
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|s| s == name)
    }

    /// Fills an empty catalog with [`DEFAULT_OUTLETS`].
    pub fn seed_defaults(&mut self) -> bool {
        if !self.outlets.is_empty() {
            return false;
        }
        self.outlets = DEFAULT_OUTLETS.iter().map(|s| (*s).to_owned()).collect();
        true
    }
}

/// Reads the state file, falling back to the empty state on any failure.
pub fn load(path: &Path) -> SessionState {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            debug!("State file {} not readable ({err}); starting empty", path.display());
            return SessionState::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(state) => state,
        Err(err) => {
            warn!(
                "State file {} is not valid state JSON ({err}); starting empty",
                path.display()
            );
            SessionState::default()
        }
    }
}

/// Overwrites the state file with the full state (4-space indented JSON).
pub fn save(path: &Path, state: &SessionState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    state
        .serialize(&mut ser)
        .context("Failed to serialise state")?;

    fs::write(path, buf)
        .with_context(|| format!("Failed to write state to {}", path.display()))?;
    debug!("Saved state to {}", path.display());
    Ok(())
}

/// State bound to its backing file; every mutation is saved immediately.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: SessionState,
}

impl StateStore {
    /// Loads the state the way the form does on each visit: seed an empty
    /// catalog, re-derive the selection from the catalog, write it back.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut state = load(&path);
        if state.seed_defaults() {
            info!("Seeded {} default outlets", state.outlets.len());
        }
        let previous = std::mem::take(&mut state.selected);
        state.select(&previous);

        let store = Self { path, state };
        store.save()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn save(&self) -> Result<()> {
        save(&self.path, &self.state)
    }

    pub fn set_operator(&mut self, operator: Operator) -> Result<()> {
        self.state.operator = operator;
        self.save()
    }

    /// Returns whether the outlet was new.
    pub fn add_outlet(&mut self, name: &str) -> Result<bool> {
        if !self.state.add_outlet(name) {
            debug!("Outlet `{name}` is blank or already listed");
            return Ok(false);
        }
        info!("Added outlet `{name}`");
        self.save()?;
        Ok(true)
    }

    pub fn select<I, S>(&mut self, checked: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.select(checked);
        self.save()
    }

    /// Ticks one outlet; `false` when it is not in the catalog.
    pub fn check(&mut self, name: &str) -> Result<bool> {
        if !self.state.outlets.iter().any(|o| o == name) {
            return Ok(false);
        }
        let mut checked = self.state.selected.clone();
        checked.push(name.to_owned());
        self.select(&checked)?;
        Ok(true)
    }

    /// Unticks one outlet; `false` when it was not selected.
    pub fn uncheck(&mut self, name: &str) -> Result<bool> {
        if !self.state.is_selected(name) {
            return Ok(false);
        }
        let checked: Vec<String> = self
            .state
            .selected
            .iter()
            .filter(|s| *s != name)
            .cloned()
            .collect();
        self.select(&checked)?;
        Ok(true)
    }
}
