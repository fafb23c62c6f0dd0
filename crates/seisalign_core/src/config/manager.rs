//! TOML persistence for [`Settings`].
//!
//! The file is always replaced through a sibling temp file, and a single
//! section can be rewritten in place with `toml_edit` so hand edits to the
//! other sections survive.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors from reading, validating or writing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on settings file: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not edit settings document: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("No settings file at {0}")]
    Missing(PathBuf),

    #[error("Settings rejected: {0}")]
    Invalid(#[from] crate::errors::AlignError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the in-memory [`Settings`] and the file they persist to.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Start from defaults; nothing is read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory edits are not persisted until [`save`](Self::save) or
    /// [`update_section`](Self::update_section).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read and validate an existing file.
    pub fn load(&mut self) -> ConfigResult<()> {
        let text = self.read_existing()?;
        self.settings = decode(&text)?;
        tracing::debug!("Settings read from {}", self.path.display());
        Ok(())
    }

    /// Like [`load`](Self::load), but a missing file is created from
    /// defaults, and a file with unknown tables or absent keys is rewritten
    /// in full.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        let text = match self.read_existing() {
            Ok(text) => text,
            Err(ConfigError::Missing(_)) => {
                tracing::info!("Writing default settings to {}", self.path.display());
                self.settings = Settings::default();
                return self.save();
            }
            Err(e) => return Err(e),
        };

        self.settings = decode(&text)?;
        if is_incomplete(&text, &self.settings)? {
            tracing::info!("Completing settings file {}", self.path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Replace the whole file with the current settings.
    pub fn save(&self) -> ConfigResult<()> {
        let document = self.render()?;
        replace_file(&self.path, &document)?;
        Ok(())
    }

    /// Rewrite one table from the current settings, keeping everything else
    /// in the file as it is on disk now.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut document = match fs::read_to_string(&self.path) {
            Ok(text) => text.parse::<DocumentMut>()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => return Err(e.into()),
        };

        let table = self.section_body(section)?.parse::<DocumentMut>()?;
        document[section.table_name()] = Item::Table(table.as_table().clone());

        replace_file(&self.path, &document.to_string())?;
        tracing::debug!(
            "Section [{}] written to {}",
            section.table_name(),
            self.path.display()
        );
        Ok(())
    }

    fn read_existing(&self) -> ConfigResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ConfigError::Missing(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Key/value lines of one table, without the `[header]`.
    fn section_body(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        Ok(match section {
            ConfigSection::Window => toml::to_string_pretty(&s.window)?,
            ConfigSection::Filter => toml::to_string_pretty(&s.filter)?,
            ConfigSection::Iccs => toml::to_string_pretty(&s.iccs)?,
            ConfigSection::Mccc => toml::to_string_pretty(&s.mccc)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
        })
    }

    /// Full document with a comment line above each table.
    fn render(&self) -> ConfigResult<String> {
        let mut lines = vec![
            "# Seisalign Configuration".to_string(),
            "# Regenerated from defaults when keys are missing.".to_string(),
        ];
        for section in ConfigSection::ALL {
            lines.push(String::new());
            lines.push(format!("# {}", section.description()));
            lines.push(format!("[{}]", section.table_name()));
            lines.extend(self.section_body(section)?.lines().map(str::to_string));
        }
        lines.push(String::new());
        Ok(lines.join("\n"))
    }
}

/// Parse, then validate both engine configurations the settings produce.
fn decode(text: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(text)?;
    settings.iccs_config().validate()?;
    settings.mccc_config().validate()?;
    Ok(settings)
}

/// True when `text` has tables we do not know or lacks keys that `settings`
/// filled in from defaults.
fn is_incomplete(text: &str, settings: &Settings) -> ConfigResult<bool> {
    let on_disk: DocumentMut = text.parse()?;
    let known = |name: &str| ConfigSection::ALL.iter().any(|s| s.table_name() == name);
    if on_disk.iter().any(|(name, _)| !known(name)) {
        return Ok(true);
    }

    let expected: DocumentMut = toml::to_string_pretty(settings)?.parse()?;
    for (name, item) in expected.iter() {
        let (Item::Table(full), Some(Item::Table(present))) = (item, on_disk.get(name)) else {
            return Ok(true);
        };
        if full.iter().any(|(key, _)| !present.contains_key(key)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Write `content` to `<path>.tmp` in the same directory, then rename it
/// over `path`.
fn replace_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let staging = path.with_extension("toml.tmp");

    let mut file = fs::File::create(&staging)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&staging, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::McccWeighting;
    use tempfile::tempdir;

    fn settings_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("seisalign.toml")
    }

    #[test]
    fn missing_file_is_created_with_every_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("seisalign.toml");

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Seisalign Configuration"));
        for section in ConfigSection::ALL {
            assert!(text.contains(&format!("[{}]", section.table_name())));
        }
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn saved_settings_read_back_equal() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);

        let mut writer = ConfigManager::new(&path);
        writer.settings_mut().iccs.min_correlation = Some(0.3);
        writer.settings_mut().mccc.constraint_weight = 2.5;
        writer.save().unwrap();

        let mut reader = ConfigManager::new(&path);
        reader.load().unwrap();
        assert_eq!(reader.settings(), writer.settings());
    }

    #[test]
    fn partial_file_keeps_values_and_gains_defaults() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, "[mccc]\nweighting = \"correlation-weighted\"\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        assert_eq!(
            manager.settings().mccc.weighting,
            McccWeighting::CorrelationWeighted
        );
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[iccs]"));
        assert!(text.contains("correlation-weighted"));
    }

    #[test]
    fn complete_file_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        ConfigManager::new(&path).save().unwrap();

        // a comment only survives if nothing rewrites the file
        let marked = format!("# hand edit\n{}", fs::read_to_string(&path).unwrap());
        fs::write(&path, &marked).unwrap();

        ConfigManager::new(&path).load_or_create().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), marked);
    }

    #[test]
    fn load_requires_existing_file() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, "[window]\nt0 = 2.0\nt1 = 1.0\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        assert!(matches!(manager.load(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn section_update_preserves_other_tables() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("max_iterations = 10", "max_iterations = 42")).unwrap();

        manager.settings_mut().mccc.use_peak_fit = true;
        manager.update_section(ConfigSection::Mccc).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("use_peak_fit = true"));
        assert!(text.contains("max_iterations = 42"));
    }
}
