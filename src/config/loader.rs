use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{Error, Result};

use super::{Config, APP_DIR_NAME, CONFIG_ENV, CONFIG_FILE_NAME};

pub fn load_or_default() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        cfg.save_to_path(&path)?;
        tracing::info!(path = %path.display(), "wrote default config");
        super::validate(&cfg)?;
        return Ok(cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = format!(
        "# statpanel config\n\
spi_bus = {}\n\
spi_speed_hz = {}\n\
dc_pin = {}\n\
rst_pin = {}\n\
backlight_pin = {}\n\
cs_pin = {}\n\
i2c_bus = {}\n\
touch_addr = \"{:#04x}\"\n\
touch_rst_pin = {}\n\
touch_driver = \"{}\"\n\
refresh_interval = \"{}\"\n\
poll_interval = \"{}\"\n\
debounce = \"{}\"\n",
        config.spi_bus,
        config.spi_speed_hz,
        config.dc_pin,
        config.rst_pin,
        format_pin(config.backlight_pin),
        format_pin(config.cs_pin),
        config.i2c_bus,
        config.touch_addr,
        format_pin(config.touch_rst_pin),
        config.touch_driver,
        humantime::format_duration(config.refresh_interval),
        humantime::format_duration(config.poll_interval),
        humantime::format_duration(config.debounce),
    );
    fs::write(path, contents)?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let mut cfg = Config::default();

    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            Error::InvalidArgs(format!("invalid config line {line_no}: '{line}'"))
        })?;

        let key = key.trim();
        let value = value.trim().trim_matches('"');
        match key {
            "spi_bus" => cfg.spi_bus = number(key, value, line_no)?,
            "spi_speed_hz" => cfg.spi_speed_hz = number(key, value, line_no)?,
            "dc_pin" => cfg.dc_pin = number(key, value, line_no)?,
            "rst_pin" => cfg.rst_pin = number(key, value, line_no)?,
            "backlight_pin" => cfg.backlight_pin = optional_pin(key, value, line_no)?,
            "cs_pin" => cfg.cs_pin = optional_pin(key, value, line_no)?,
            "i2c_bus" => cfg.i2c_bus = number(key, value, line_no)?,
            "touch_addr" => {
                cfg.touch_addr = super::parse_addr(value).map_err(|e| {
                    Error::InvalidArgs(format!("invalid touch_addr on line {line_no}: {e}"))
                })?;
            }
            "touch_rst_pin" => cfg.touch_rst_pin = optional_pin(key, value, line_no)?,
            "touch_driver" => {
                cfg.touch_driver = value.parse().map_err(|e: String| {
                    Error::InvalidArgs(format!("invalid touch_driver on line {line_no}: {e}"))
                })?;
            }
            "refresh_interval" => cfg.refresh_interval = duration(key, value, line_no)?,
            "poll_interval" => cfg.poll_interval = duration(key, value, line_no)?,
            "debounce" => cfg.debounce = duration(key, value, line_no)?,
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown config key '{other}' on line {line_no}"
                )));
            }
        }
    }

    super::validate(&cfg)?;
    Ok(cfg)
}

/// `$STATPANEL_CONFIG` when set, else `<config dir>/statpanel/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let dirs = directories::ProjectDirs::from("", "", APP_DIR_NAME).ok_or_else(|| {
        Error::InvalidArgs(format!(
            "cannot locate a config directory; set {CONFIG_ENV}"
        ))
    })?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn number<T: FromStr>(key: &str, value: &str, line_no: usize) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgs(format!("invalid {key} value on line {line_no}")))
}

fn optional_pin(key: &str, value: &str, line_no: usize) -> Result<Option<u8>> {
    if value == "null" || value.is_empty() {
        return Ok(None);
    }
    number(key, value, line_no).map(Some)
}

fn duration(key: &str, value: &str, line_no: usize) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| Error::InvalidArgs(format!("invalid {key} on line {line_no}: {e}")))
}

fn format_pin(pin: Option<u8>) -> String {
    pin.map(|p| p.to_string()).unwrap_or_else(|| "null".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_honours_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("panel.toml");
        std::env::set_var(CONFIG_ENV, &target);
        let resolved = config_path().unwrap();
        std::env::remove_var(CONFIG_ENV);
        assert_eq!(resolved, target);
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let cfg = parse("# comment\n\n   \ndc_pin = 22\n").unwrap();
        assert_eq!(cfg.dc_pin, 22);
    }

    #[test]
    fn parse_rejects_lines_without_equals() {
        let err = parse("dc_pin 22").unwrap_err();
        assert!(format!("{err}").contains("invalid config line 1"));
    }

    #[test]
    fn written_defaults_parse_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        save_to_path(&Config::default(), &path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("refresh_interval = \"1s\""));
        assert!(contents.contains("touch_addr = \"0x38\""));
        assert_eq!(parse(&contents).unwrap(), Config::default());
    }
}
