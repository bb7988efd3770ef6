use std::path::PathBuf;

use crate::error::Result;
use crate::type_map::TypeMap;

const DEFAULT_TYPE_MAP: &str = "type_map.toml";

/// Settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub type_map_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());
        let type_map_path = std::env::var("PGMODEL_TYPE_MAP")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TYPE_MAP));

        Config {
            database_url,
            type_map_path,
        }
    }

    /// An explicit URL wins over `DATABASE_URL`.
    pub fn database_url_or(&self, url: Option<String>) -> Option<String> {
        url.or_else(|| self.database_url.clone())
    }

    pub fn type_map(&self) -> Result<TypeMap> {
        TypeMap::load(&self.type_map_path)
    }
}
