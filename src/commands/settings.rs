//! UI settings and config.kdl commands.

use super::{Output, json, open_store};
use crate::Result;
use crate::config::{
    ConfigOverrides, Resolved, ResolvedConfig, read_config, resolve_config, write_config,
};
use crate::models::{UiSettings, UiSettingsPatch};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
#[serde(transparent)]
pub struct SettingsRecord {
    pub settings: UiSettings,
}

impl Output for SettingsRecord {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let s = &self.settings;
        [
            format!("theme:      {}", s.theme),
            format!("rate:       {:.2}", s.narration_rate),
            format!("pitch:      {:.2}", s.narration_pitch),
            format!("volume:     {:.2}", s.narration_volume),
            format!("animations: {}", s.animations_enabled),
        ]
        .join("\n")
    }
}

pub fn settings_show(data_dir: &Path) -> Result<SettingsRecord> {
    let mut store = open_store(data_dir)?;
    Ok(SettingsRecord {
        settings: store.settings()?,
    })
}

pub fn settings_update(data_dir: &Path, patch: UiSettingsPatch) -> Result<SettingsRecord> {
    let mut store = open_store(data_dir)?;
    Ok(SettingsRecord {
        settings: store.update_settings(patch)?,
    })
}

#[derive(Serialize)]
pub struct ConfigShow {
    pub data_dir: Resolved<PathBuf>,
    #[serde(flatten)]
    pub config: ResolvedConfig,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        [
            format!(
                "data-dir:      {} ({})",
                self.data_dir.value.display(),
                self.data_dir.source
            ),
            format!(
                "output-format: {} ({})",
                self.config.output_format.value, self.config.output_format.source
            ),
            format!(
                "grace-ms:      {} ({})",
                self.config.grace_ms.value, self.config.grace_ms.source
            ),
            format!(
                "action-log:    {} ({})",
                self.config.action_log.value, self.config.action_log.source
            ),
        ]
        .join("\n")
    }
}

/// Show resolved configuration. Works before `mg init`.
pub fn config_show(data_dir: Resolved<PathBuf>, overrides: &ConfigOverrides) -> Result<ConfigShow> {
    let config = resolve_config(&data_dir.value, overrides)?;
    Ok(ConfigShow { data_dir, config })
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigSet> {
    let mut config = read_config(data_dir)?;
    config.set(key, value)?;
    write_config(data_dir, &config)?;
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        path: crate::config::config_path(data_dir).display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::commands::init;
    use crate::config::{OutputFormat, ValueSource};
    use crate::test_utils::TestEnv;

    #[test]
    fn test_settings_update_validates() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        let updated = settings_update(
            env.data_path(),
            UiSettingsPatch {
                narration_rate: Some(0.7),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.settings.narration_rate, 0.7);

        let rejected = settings_update(
            env.data_path(),
            UiSettingsPatch {
                narration_pitch: Some(3.0),
                ..Default::default()
            },
        );
        assert!(matches!(rejected, Err(Error::InvalidFieldValue(_))));
        assert_eq!(settings_show(env.data_path()).unwrap().settings.narration_pitch, 1.0);
    }

    #[test]
    fn test_config_set_then_show() {
        let env = TestEnv::new();
        config_set(env.data_path(), "output-format", "human").unwrap();
        config_set(env.data_path(), "grace-ms", "200").unwrap();

        let shown = config_show(
            Resolved::new(env.data_path().to_path_buf(), ValueSource::CliFlag),
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(shown.config.output_format.value, OutputFormat::Human);
        assert_eq!(shown.config.grace_ms.value, 200);
        assert_eq!(shown.config.grace_ms.source, ValueSource::ConfigFile);
        assert!(shown.to_human().contains("grace-ms:      200 (config)"));
    }

    #[test]
    fn test_config_set_rejects_unknown_key() {
        let env = TestEnv::new();
        assert!(matches!(
            config_set(env.data_path(), "color", "blue"),
            Err(Error::Config(_))
        ));
        assert!(!crate::config::config_path(env.data_path()).exists());
    }
}
