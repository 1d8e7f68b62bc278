use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const MIN_IMAGE_WIDTH: u32 = 400;
pub const MIN_IMAGE_HEIGHT: u32 = 300;
pub const DEFAULT_IMAGE_WIDTH: u32 = 1600;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 1200;
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;
pub const DEFAULT_CAPTURE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CAMERA_BIN: &str = "/usr/bin/libcamera-still";
pub const DEFAULT_DB_FILENAME: &str = "db.sqlite";
pub const DEFAULT_MAINTENANCE_MESSAGE: &str = "Service is in maintenance now.";
pub const DEFAULT_INLINE_LATEST_PHOTOS: usize = 20;

/// Typed configuration, read from the environment (with optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Whitelisted Telegram usernames. The only identities the bot talks to.
    pub allowed_users: Vec<String>,

    // Capture geometry, clamped to the hardware minimums.
    pub image_width: u32,
    pub image_height: u32,
    /// Extra capture flags in configured order; `None` values are bare flags.
    pub camera_params: Vec<(String, Option<String>)>,

    pub queue_capacity: usize,
    pub capture_timeout: Duration,
    pub camera_bin: PathBuf,

    pub db_path: PathBuf,

    pub maintenance_mode: bool,
    pub maintenance_message: String,

    /// Page size for inline-query lookups of cached photos.
    pub inline_latest_photos: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let allowed_users = parse_csv(env_str("TELEGRAM_ALLOWED_USERS"));
        if allowed_users.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_ALLOWED_USERS environment variable is required".to_string(),
            ));
        }

        let image_width = clamp_min(
            env_u32("IMAGE_WIDTH").unwrap_or(DEFAULT_IMAGE_WIDTH),
            MIN_IMAGE_WIDTH,
        );
        let image_height = clamp_min(
            env_u32("IMAGE_HEIGHT").unwrap_or(DEFAULT_IMAGE_HEIGHT),
            MIN_IMAGE_HEIGHT,
        );

        let camera_params = parse_camera_params(env_str("CAMERA_PARAMS"))?;

        let queue_capacity = env_usize("CAPTURE_QUEUE_CAPACITY")
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);
        let capture_timeout = Duration::from_secs(
            env_u64("CAPTURE_TIMEOUT_SECS").unwrap_or(DEFAULT_CAPTURE_TIMEOUT_SECS),
        );

        let camera_bin = env_path("CAMERA_BIN").unwrap_or_else(|| PathBuf::from(DEFAULT_CAMERA_BIN));
        if !is_executable_file(&camera_bin) {
            return Err(Error::Config(format!(
                "camera binary not found or not executable: {}",
                camera_bin.display()
            )));
        }

        let db_path = env_path("DB_PATH").unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILENAME));

        let maintenance_mode = env_bool("MAINTENANCE_MODE").unwrap_or(false);
        let maintenance_message = env_str("MAINTENANCE_MESSAGE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MAINTENANCE_MESSAGE.to_string());

        let inline_latest_photos = env_usize("INLINE_LATEST_PHOTOS")
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_INLINE_LATEST_PHOTOS);

        Ok(Self {
            telegram_bot_token,
            allowed_users,
            image_width,
            image_height,
            camera_params,
            queue_capacity,
            capture_timeout,
            camera_bin,
            db_path,
            maintenance_mode,
            maintenance_message,
            inline_latest_photos,
        })
    }
}

/// Parse `CAMERA_PARAMS`: comma-separated `flag` or `flag=value` entries,
/// e.g. `--rotation=180,--hflip`. Order is preserved; flags are validated
/// here so a bad entry fails startup instead of the first capture.
fn parse_camera_params(v: Option<String>) -> Result<Vec<(String, Option<String>)>> {
    let mut out = Vec::new();

    for entry in v.unwrap_or_default().split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (flag, value) = match entry.split_once('=') {
            Some((flag, value)) => (flag.trim(), Some(value.trim().to_string())),
            None => (entry, None),
        };

        if !flag.starts_with('-') || flag.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "invalid camera parameter: {entry} (flags must start with '-' and contain no whitespace)"
            )));
        }

        out.push((flag.to_string(), value));
    }

    Ok(out)
}

fn clamp_min(v: u32, min: u32) -> u32 {
    if v < min {
        min
    } else {
        v
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_params_preserve_order_and_bare_flags() {
        let parsed =
            parse_camera_params(Some("--rotation=180,--hflip,--quality=90".to_string())).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("--rotation".to_string(), Some("180".to_string())),
                ("--hflip".to_string(), None),
                ("--quality".to_string(), Some("90".to_string())),
            ]
        );
    }

    #[test]
    fn camera_params_reject_non_flags() {
        assert!(parse_camera_params(Some("rotation=180".to_string())).is_err());
        assert!(parse_camera_params(Some("--bad flag".to_string())).is_err());
    }

    #[test]
    fn camera_params_empty_is_fine() {
        assert!(parse_camera_params(None).unwrap().is_empty());
        assert!(parse_camera_params(Some(" , ".to_string())).unwrap().is_empty());
    }

    #[test]
    fn geometry_is_clamped_to_minimums() {
        assert_eq!(clamp_min(100, MIN_IMAGE_WIDTH), MIN_IMAGE_WIDTH);
        assert_eq!(clamp_min(1600, MIN_IMAGE_WIDTH), 1600);
    }

    #[test]
    fn csv_parsing_trims_and_skips_empties() {
        assert_eq!(
            parse_csv(Some(" alice, ,bob ".to_string())),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }
}
