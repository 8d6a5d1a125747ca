//! # Configuration des outils DLNA
//!
//! Ce module gère la configuration de l'annonceur SSDP et du validateur :
//! - Chargement depuis un fichier YAML
//! - Fusion avec la configuration par défaut intégrée
//! - Surcharges par variables d'environnement (`DLNA_CONFIG__SECTION__KEY`)
//! - Getters typés avec valeurs par défaut
//!
//! Il n'y a pas de singleton : chaque binaire charge sa [`Config`] au démarrage
//! et en dérive une [`DeviceIdentity`] qu'il passe explicitement.
//!
//! ## Usage
//!
//! ```no_run
//! use dlnaconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let identity = config.device_identity()?;
//! println!("Announcing {} at {}", identity.uuid, identity.location_url);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod identity;

pub use identity::DeviceIdentity;

use anyhow::{Context, Result, anyhow};
use dirs::home_dir;
use dlnautils::{guess_local_ip, list_ipv4_addrs, server_string};
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    net::Ipv4Addr,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use tracing::{info, warn};
use uuid::Uuid;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("dlna.yaml");

const ENV_CONFIG_DIR: &str = "DLNA_CONFIG";
const ENV_PREFIX: &str = "DLNA_CONFIG__";
const LOCAL_CONFIG_DIR: &str = ".dlna";

/// Produit annoncé dans l'en-tête SERVER par défaut
pub const DEFAULT_PRODUCT: &str = "PHPDLNA/1.0";

pub const DEFAULT_MAX_AGE: u64 = 43200;
pub const DEFAULT_TTL: u32 = 3;
pub const DEFAULT_SEARCH_TARGET: &str = "ssdp:all";
pub const DEFAULT_WINDOW_SECS: u64 = 9;
pub const DEFAULT_MX: u32 = 3;
pub const DEFAULT_SERVER_MARKER: &str = "PHPDLNA";
pub const DEFAULT_MAX_BROWSE_DEPTH: usize = 32;
pub const DEFAULT_BROWSE_COUNT: u32 = 8;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_MIN_LEVEL: &str = "info";

/// Macro to generate a getter for unsigned values with default
macro_rules! impl_unsigned_config {
    ($getter:ident, $ty:ty, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<$ty> {
            let value = match self.get_value($path) {
                Ok(value) => value,
                Err(_) => return Ok($default),
            };
            match value {
                Value::Number(n) => match n.as_u64() {
                    Some(v) => <$ty>::try_from(v)
                        .with_context(|| format!("{} is out of range: {}", $path.join("."), v)),
                    None => Err(anyhow!("{} must be a positive integer", $path.join("."))),
                },
                Value::String(s) if s.trim().is_empty() => Ok($default),
                Value::String(s) => s
                    .trim()
                    .parse::<$ty>()
                    .with_context(|| format!("Invalid {} value '{}'", $path.join("."), s)),
                Value::Null => Ok($default),
                other => Err(anyhow!(
                    "{} must be a positive integer, got {:?}",
                    $path.join("."),
                    other
                )),
            }
        }
    };
}

/// Macro to generate a getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }
    };
}

/// Macro to generate a getter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
                _ => Ok($default.to_string()),
            }
        }
    };
}

/// Gestionnaire de configuration
///
/// La configuration est un arbre YAML protégé par un mutex. `set_value` et
/// les setters sauvegardent immédiatement le fichier quand la configuration en a un.
#[derive(Debug)]
pub struct Config {
    config_dir: Option<PathBuf>,
    path: Option<PathBuf>,
    data: Mutex<Value>,
}

impl Config {
    /// Cherche le répertoire de configuration dans l'ordre :
    /// 1. le répertoire fourni
    /// 2. la variable `DLNA_CONFIG`
    /// 3. `.dlna` dans le répertoire courant
    /// 4. `.dlna` dans le répertoire personnel
    fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        if Path::new(LOCAL_CONFIG_DIR).exists() {
            return PathBuf::from(LOCAL_CONFIG_DIR);
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(LOCAL_CONFIG_DIR);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(LOCAL_CONFIG_DIR)
    }

    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Cannot create config directory {}", path.display()))?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")
            .with_context(|| format!("Config directory {} is not writable", path.display()))?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Charge la configuration depuis `directory` (ou le répertoire par défaut)
    ///
    /// 1. Charge la configuration intégrée
    /// 2. Fusionne `config.yaml` s'il existe
    /// 3. Applique les surcharges d'environnement
    /// 4. Sauvegarde le résultat fusionné
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join("config.yaml");

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)
                    .with_context(|| format!("Invalid YAML in {}", path.display()))?;
                merge_yaml(&mut config_value, &Self::lower_keys_value(external_value));
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
            }
        }

        let mut config_value = Self::lower_keys_value(config_value);
        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir: Some(config_dir),
            path: Some(path),
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Construit une configuration en mémoire (sans fichier ni environnement)
    /// à partir d'un document YAML fusionné avec les valeurs par défaut.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if !yaml.trim().is_empty() {
            let external_value: Value = serde_yaml::from_str(yaml)?;
            merge_yaml(&mut config_value, &Self::lower_keys_value(external_value));
        }

        Ok(Config {
            config_dir: None,
            path: None,
            data: Mutex::new(Self::lower_keys_value(config_value)),
        })
    }

    /// Répertoire de configuration, si la configuration vient d'un fichier
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration mutex poisoned"))
    }

    /// Sauvegarde la configuration dans `config.yaml` (sans effet en mémoire)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = self.lock()?;
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(path, yaml).with_context(|| format!("Cannot write {}", path.display()))?;
        Ok(())
    }

    /// Fixe une valeur au chemin donné et sauvegarde
    ///
    /// * `path` - Chemin des clés (ex: `&["device", "uuid"]`)
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.lock()?;
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Lit la valeur au chemin donné
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(err) = Self::set_value_internal(config, &key_path, yaml_value) {
                    warn!(env_var = %key, "Ignoring config override: {}", err);
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// UUID du device, généré (et sauvegardé) s'il n'est pas configuré
    pub fn get_device_uuid(&self) -> Result<String> {
        let path = &["device", "uuid"];
        match self.get_value(path) {
            Ok(Value::String(uuid)) if !uuid.trim().is_empty() => {
                let uuid_str = uuid.trim();
                Ok(uuid_str.strip_prefix("uuid:").unwrap_or(uuid_str).to_string())
            }
            _ => {
                let new_uuid = Uuid::new_v4().to_string();
                info!(uuid = %new_uuid, "Generated device UUID");
                self.set_value(path, Value::String(new_uuid.clone()))?;
                Ok(new_uuid)
            }
        }
    }

    pub fn set_device_uuid(&self, uuid: String) -> Result<()> {
        let uuid_str = uuid.trim();
        let sanitized = uuid_str.strip_prefix("uuid:").unwrap_or(uuid_str).to_string();
        self.set_value(&["device", "uuid"], Value::String(sanitized))
    }

    /// Identifiant SERVER, par défaut `<os>/<version> UPnP/1.0 PHPDLNA/1.0`
    pub fn get_server_id(&self) -> Result<String> {
        match self.get_value(&["device", "server_id"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Ok(server_string(DEFAULT_PRODUCT)),
        }
    }

    /// URL de description explicitement configurée (sans valeur devinée)
    pub fn get_configured_location(&self) -> Result<Option<String>> {
        match self.get_value(&["device", "location"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
            _ => Ok(None),
        }
    }

    /// URL de description, devinée depuis l'IP locale si absente
    pub fn get_location(&self) -> Result<String> {
        match self.get_configured_location()? {
            Some(location) => Ok(location),
            None => {
                let guessed = format!("http://{}/rootDesc.xml", guess_local_ip());
                warn!(location = %guessed, "No device location configured, using a guess");
                Ok(guessed)
            }
        }
    }

    pub fn set_location(&self, location: String) -> Result<()> {
        self.set_value(&["device", "location"], Value::String(location))
    }

    impl_unsigned_config!(
        get_max_age,
        u64,
        &["device", "max_age"],
        DEFAULT_MAX_AGE
    );

    impl_unsigned_config!(
        get_announce_ttl,
        u32,
        &["announcer", "ttl"],
        DEFAULT_TTL
    );

    impl_bool_config!(
        get_strict_search_target,
        &["announcer", "strict_search_target"],
        false
    );

    /// Interface sur laquelle rejoindre le groupe multicast (`None` = toutes)
    pub fn get_announce_interface(&self) -> Result<Option<Ipv4Addr>> {
        match self.get_value(&["announcer", "interface"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => {
                let addr = s
                    .trim()
                    .parse::<Ipv4Addr>()
                    .with_context(|| format!("Invalid announcer.interface '{}'", s))?;
                let local = list_ipv4_addrs();
                if !local.is_empty() && !local.contains(&addr) {
                    warn!(interface = %addr, "announcer.interface is not a local IPv4 address");
                }
                Ok(Some(addr))
            }
            _ => Ok(None),
        }
    }

    impl_string_config!(
        get_search_target,
        &["validator", "search_target"],
        DEFAULT_SEARCH_TARGET
    );

    impl_unsigned_config!(
        get_discovery_window_secs,
        u64,
        &["validator", "window_secs"],
        DEFAULT_WINDOW_SECS
    );

    impl_unsigned_config!(
        get_search_mx,
        u32,
        &["validator", "mx"],
        DEFAULT_MX
    );

    impl_string_config!(
        get_server_marker,
        &["validator", "server_marker"],
        DEFAULT_SERVER_MARKER
    );

    impl_unsigned_config!(
        get_max_browse_depth,
        usize,
        &["validator", "max_browse_depth"],
        DEFAULT_MAX_BROWSE_DEPTH
    );

    impl_unsigned_config!(
        get_browse_count,
        u32,
        &["validator", "browse_count"],
        DEFAULT_BROWSE_COUNT
    );

    impl_unsigned_config!(
        get_http_timeout_secs,
        u64,
        &["validator", "http_timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    impl_string_config!(
        get_log_min_level,
        &["logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    /// Construit l'identité du device annoncé
    pub fn device_identity(&self) -> Result<DeviceIdentity> {
        Ok(DeviceIdentity::new(
            self.get_device_uuid()?,
            self.get_server_id()?,
            self.get_location()?,
            self.get_max_age()?,
        ))
    }
}

/// Fusionne récursivement `external` dans `default`.
///
/// Les mappings sont fusionnés clé par clé ; scalaires et séquences sont remplacés.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Number;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.get_max_age().unwrap(), 43200);
        assert_eq!(config.get_announce_ttl().unwrap(), 3);
        assert!(!config.get_strict_search_target().unwrap());
        assert_eq!(config.get_search_target().unwrap(), "ssdp:all");
        assert_eq!(config.get_discovery_window_secs().unwrap(), 9);
        assert_eq!(config.get_search_mx().unwrap(), 3);
        assert_eq!(config.get_server_marker().unwrap(), "PHPDLNA");
        assert_eq!(config.get_max_browse_depth().unwrap(), 32);
        assert_eq!(config.get_browse_count().unwrap(), 8);
        assert_eq!(config.get_announce_interface().unwrap(), None);
        assert_eq!(config.get_configured_location().unwrap(), None);
    }

    #[test]
    fn test_yaml_overrides_and_key_case() {
        let config = Config::from_yaml_str(
            r#"
Device:
  UUID: "uuid:1234"
  Server_Id: "Linux/6.1 UPnP/1.0 PHPDLNA/1.0"
  location: "http://10.0.0.2/dlna/rootDesc.xml"
  max_age: "1800"
announcer:
  strict_search_target: true
  interface: "10.0.0.2"
"#,
        )
        .unwrap();

        let identity = config.device_identity().unwrap();
        assert_eq!(identity.uuid, "1234");
        assert_eq!(identity.server_id, "Linux/6.1 UPnP/1.0 PHPDLNA/1.0");
        assert_eq!(identity.location_url, "http://10.0.0.2/dlna/rootDesc.xml");
        assert_eq!(identity.cache_seconds, 1800);
        assert!(config.get_strict_search_target().unwrap());
        assert_eq!(
            config.get_announce_interface().unwrap(),
            Some(Ipv4Addr::new(10, 0, 0, 2))
        );
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let config = Config::from_yaml_str("validator:\n  window_secs: soon\n").unwrap();
        assert!(config.get_discovery_window_secs().is_err());
    }

    #[test]
    fn test_uuid_is_generated_once() {
        let config = Config::from_yaml_str("").unwrap();
        let first = config.get_device_uuid().unwrap();
        let second = config.get_device_uuid().unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_yaml_keeps_default_siblings() {
        let mut default: Value = serde_yaml::from_str("a:\n  b: 1\n  c: 2\n").unwrap();
        let external: Value = serde_yaml::from_str("a:\n  c: 3\n").unwrap();
        merge_yaml(&mut default, &external);
        let b = Config::get_value_internal(&default, &["a", "b"]).unwrap();
        let c = Config::get_value_internal(&default, &["a", "c"]).unwrap();
        assert_eq!(b, Value::Number(Number::from(1)));
        assert_eq!(c, Value::Number(Number::from(3)));
    }
}
