use std::path::PathBuf;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{error::Error, utils};

const SETTINGS_FILE: &str = "settings.ron";

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Where the game server plugin reports match events to.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(skip)]
    data_dir: Option<PathBuf>,
}

impl Settings {
    /// # Errors
    ///
    /// If the settings file exists but can't be read.
    pub fn load(data_dir: PathBuf) -> anyhow::Result<Self> {
        let mut settings: Self =
            utils::read_ron(&data_dir.join(SETTINGS_FILE))?.unwrap_or_default();

        settings.data_dir = Some(data_dir);
        Ok(settings)
    }

    /// # Errors
    ///
    /// If the URL isn't http(s) or saving fails.
    pub fn set_webhook_url(&mut self, webhook_url: Option<String>) -> Result<(), Error> {
        let webhook_url = webhook_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        if let Some(url) = &webhook_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(Error::BadRequest(format!(
                "the webhook url '{url}' has to start with http:// or https://"
            )));
        }

        let next = Self {
            webhook_url,
            data_dir: self.data_dir.clone(),
        };
        if let Some(data_dir) = &next.data_dir {
            utils::write_ron(&data_dir.join(SETTINGS_FILE), &next).map_err(Error::persist)?;
        }
        *self = next;

        info!("webhook url: {:?}", self.webhook_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn webhook_url_has_to_be_http() -> anyhow::Result<()> {
        let mut settings = Settings::default();

        assert!(
            settings
                .set_webhook_url(Some("ftp://example.org".to_string()))
                .is_err()
        );
        assert_eq!(settings.webhook_url, None);

        settings.set_webhook_url(Some(" https://example.org/get5 ".to_string()))?;
        assert_eq!(
            settings.webhook_url.as_deref(),
            Some("https://example.org/get5")
        );

        settings.set_webhook_url(Some(String::new()))?;
        assert_eq!(settings.webhook_url, None);

        Ok(())
    }

    #[test]
    fn failed_save_keeps_the_old_url() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut settings = Settings::load(temp.path().join("missing"))?;

        let result = settings.set_webhook_url(Some("https://example.org/get5".to_string()));

        assert!(matches!(result, Err(Error::Persist(_))));
        assert_eq!(settings.webhook_url, None);

        Ok(())
    }
}
