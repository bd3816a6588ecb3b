//! Shared plumbing for the command-line tools: file loading and logging.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use tactics::{ContentLibrary, EncounterData, EngineConfig, PartySheet};
use tracing_subscriber::EnvFilter;

/// Reads a text file, honouring a UTF-8/UTF-16 byte order mark if present.
pub fn read_text_auto(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
    }
}

/// `spec` is either a built-in encounter id or a path to encounter JSON.
pub fn load_encounter(spec: &str) -> Result<EncounterData> {
    let path = Path::new(spec);
    if path.exists() {
        EncounterData::from_json_str(&read_text_auto(path)?).with_context(|| format!("loading {}", spec))
    } else {
        EncounterData::builtin(spec)
    }
}

pub fn load_party(path: Option<&Path>) -> Result<PartySheet> {
    match path {
        Some(path) => {
            PartySheet::from_json_str(&read_text_auto(path)?).with_context(|| format!("loading {}", path.display()))
        }
        None => PartySheet::builtin(),
    }
}

/// Built-in content, or `weapons.json`/`spells.json`/`bestiary.json` from `dir`.
pub fn load_content(dir: Option<&Path>) -> Result<ContentLibrary> {
    match dir {
        Some(dir) => ContentLibrary::from_json(
            &read_text_auto(&dir.join("weapons.json"))?,
            &read_text_auto(&dir.join("spells.json"))?,
            &read_text_auto(&dir.join("bestiary.json"))?,
        ),
        None => ContentLibrary::builtin(),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = read_text_auto(path)?;
    let cfg = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        EngineConfig::from_json_str(&text)
    } else {
        EngineConfig::from_yaml_str(&text)
    };
    cfg.with_context(|| format!("loading {}", path.display()))
}

/// Logs go to stderr. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
