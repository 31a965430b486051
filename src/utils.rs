use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use env_logger::Builder;
use log::LevelFilter;
use serde::{Serialize, de::DeserializeOwned};

use crate::HOME;

pub fn init_logger(name: &str, debug: bool, systemd: bool) {
    let mut builder = Builder::new();

    if systemd {
        builder.format(|formatter, record| {
            writeln!(formatter, "[{}]: {}", record.level(), record.args())
        });
    } else {
        builder.format(|formatter, record| {
            writeln!(
                formatter,
                "{} [{}] ({}): {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S %z"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }

    if let Ok(var) = env::var("RUST_LOG") {
        builder.parse_filters(&var);
    } else if debug {
        builder.filter(None, LevelFilter::Info);
        builder.filter(Some(name), LevelFilter::Debug);
        builder.filter(Some("get5_bracket"), LevelFilter::Debug);
    } else {
        // if no RUST_LOG provided, default to logging at the Info level
        builder.filter(None, LevelFilter::Info);
    }

    builder.init();
}

/// The default data folder, `$XDG_DATA_HOME/get5-bracket` on Linux.
#[must_use]
pub fn data_folder() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(HOME), |dir| dir.join(HOME))
}

/// # Errors
///
/// If the folder can't be created.
pub fn create_data_folder(data_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir.join("matches"))
        .with_context(|| format!("create_data_folder: {}", data_dir.display()))
}

/// Writes to a temporary file next to `path`, then renames it over `path`.
///
/// # Errors
///
/// If serializing or writing fails.
pub fn write_ron<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut string = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())?;
    string.push('\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, string).with_context(|| format!("write: {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename: {}", path.display()))?;

    Ok(())
}

/// # Errors
///
/// If the file exists but can't be read or parsed.
pub fn read_ron<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let string = fs::read_to_string(path).with_context(|| format!("read: {}", path.display()))?;
    let value = ron::from_str(&string).with_context(|| format!("parse: {}", path.display()))?;

    Ok(Some(value))
}

/// Lower case ASCII letters and digits, everything else collapses into
/// single dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}
