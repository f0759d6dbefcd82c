//! Deployment configuration, loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// The few knobs the backend needs. Every field has a default so a bare
/// checkout runs without any environment set up.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the JSON store files.
    pub data_dir: PathBuf,
    /// Directory uploaded property images are moved into.
    pub image_dir: PathBuf,
    /// Web path prefix recorded for stored images.
    pub image_web_root: String,
    /// Google Maps embed API key.
    pub maps_key: String,
    /// Items per page for paginated listings.
    pub page_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            image_dir: PathBuf::from("./data/images"),
            image_web_root: "/images".to_string(),
            maps_key: String::new(),
            page_limit: 6,
        }
    }
}

impl Config {
    /// Reads `REALTOR_*` environment variables, falling back to the
    /// defaults per field.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            data_dir: env::var("REALTOR_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            image_dir: env::var("REALTOR_IMAGE_DIR").map(PathBuf::from).unwrap_or(defaults.image_dir),
            image_web_root: env::var("REALTOR_IMAGE_WEB_ROOT").unwrap_or(defaults.image_web_root),
            maps_key: env::var("REALTOR_MAPS_KEY").unwrap_or(defaults.maps_key),
            page_limit: env::var("REALTOR_PAGE_LIMIT")
                .ok()
                .and_then(|limit| limit.parse().ok())
                .unwrap_or(defaults.page_limit),
        }
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn properties_path(&self) -> PathBuf {
        self.data_dir.join("properties.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.page_limit, 6);
        assert_eq!(config.users_path(), PathBuf::from("./data/users.json"));
        assert_eq!(config.properties_path(), PathBuf::from("./data/properties.json"));
    }
}
