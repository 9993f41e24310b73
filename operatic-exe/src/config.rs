//! User configuration options.

use std::{fs::create_dir_all, io::ErrorKind, path::PathBuf};

use dirs::config_dir;
use input::config::KeyBindings;
use log::{error, info, warn};
use nanoserde::{DeRon, SerRon};
use patch::Model;
use sound_sdl2::AudioSettings;

use crate::{BASE_DIR, CLIOptions};

const LOG_TAG: &str = "UserConfig";

fn get_cfg_file() -> Option<PathBuf> {
    let Some(mut dir) = config_dir() else {
        warn!(target: LOG_TAG, "Couldn't find user config dir");
        return None;
    };
    dir.push(BASE_DIR);
    if !dir.exists() {
        if let Err(e) = create_dir_all(&dir) {
            error!(target: LOG_TAG, "Couldn't create {dir:?}: {e}");
            return None;
        }
    }
    dir.push("user.ron");
    Some(dir)
}

#[derive(Debug, Clone, PartialEq, DeRon, SerRon)]
pub struct UserConfig {
    pub sample_rate: u32,
    pub buffer_size: u16,
    /// `two-op` or `four-op`
    pub model: String,
    pub keys: KeyBindings,
}

impl Default for UserConfig {
    fn default() -> Self {
        let audio = AudioSettings::default();
        Self {
            sample_rate: audio.sample_rate,
            buffer_size: audio.buffer_size,
            model: Model::default().to_string(),
            keys: KeyBindings::default(),
        }
    }
}

impl UserConfig {
    /// Read the config file, falling back to (and later writing) defaults if
    /// it is missing or can't be parsed
    pub fn load() -> Self {
        let Some(path) = get_cfg_file() else {
            return UserConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(buf) if !buf.trim().is_empty() => match UserConfig::deserialize_ron(&buf) {
                Ok(data) => {
                    info!(target: LOG_TAG, "Loaded user config file");
                    return data;
                }
                Err(e) => warn!("Could not deserialise {path:?} ({e:?}), recreating config"),
            },
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not read {path:?}: {e}"),
        }
        info!("Created default user config file");
        UserConfig::default()
    }

    pub fn write(&self) {
        let Some(path) = get_cfg_file() else {
            return;
        };
        match std::fs::write(&path, self.serialize_ron()) {
            Ok(_) => info!("Saved user config to {path:?}"),
            Err(err) => error!("Could not write config: {err}"),
        }
    }

    /// The configured model, the default if the stored name is unknown
    pub fn model(&self) -> Model {
        self.model.parse().unwrap_or_else(|e| {
            warn!(target: LOG_TAG, "{e}: {}, using {}", self.model, Model::default());
            Model::default()
        })
    }

    pub fn audio(&self) -> AudioSettings {
        AudioSettings {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
        }
    }

    /// Sync the CLI options and UserOptions with each other
    pub fn sync_cli(&mut self, cli: &mut CLIOptions) {
        info!("Checking CLI options");

        if let Some(model) = cli.model {
            if model != self.model() {
                self.model = model.to_string();
                info!("Model changed to: {model}");
            }
        } else {
            cli.model = Some(self.model());
        }

        if let Some(rate) = cli.sample_rate {
            self.sample_rate = rate;
        } else {
            cli.sample_rate = Some(self.sample_rate);
        }

        if let Some(size) = cli.buffer_size {
            self.buffer_size = size;
        } else {
            cli.buffer_size = Some(self.buffer_size);
        }
    }
}
