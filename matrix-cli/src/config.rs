//! Configuration loader, grounded on `core-engine/src/vendor_data/config.rs`'s
//! shape (a plain struct read once at startup) but backed by the `ini`
//! crate rather than JSON, per spec.md §6: "a single INI-style file...
//! the core merely reads values by (section, key)".

use ini::Ini;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub primary_uri: String,
    pub primary_namespace: String,
    pub primary_database: String,
    pub external_uri: String,
}

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Debug, Clone)]
pub struct SubprocessConfig {
    pub office_converter_path: String,
    pub pdf_tabulizer_jar_path: String,
}

#[derive(Debug, Clone)]
pub struct LockConfig {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub object_store: ObjectStoreConfig,
    pub monitoring: MonitoringConfig,
    pub subprocess: SubprocessConfig,
    pub lock: LockConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let ini = Ini::load_from_file(path.as_ref())?;
        let get = |section: &str, key: &str, default: &str| -> String {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .unwrap_or(default)
                .to_string()
        };

        Ok(Config {
            db: DbConfig {
                primary_uri: get("db", "primary_uri", "mem://"),
                primary_namespace: get("db", "primary_namespace", "matrix"),
                primary_database: get("db", "primary_database", "ingest"),
                external_uri: get("db", "external_uri", "mem://"),
            },
            object_store: ObjectStoreConfig {
                bucket: get("object_store", "bucket", "matrix-files"),
                region: get("object_store", "region", "us-east-1"),
                endpoint: ini.section(Some("object_store")).and_then(|s| s.get("endpoint")).map(str::to_string),
            },
            monitoring: MonitoringConfig {
                statsd_host: get("monitoring", "statsd_host", "127.0.0.1"),
                statsd_port: get("monitoring", "statsd_port", "8125").parse().unwrap_or(8125),
            },
            subprocess: SubprocessConfig {
                office_converter_path: get("subprocess", "office_converter_path", "/usr/bin/soffice"),
                pdf_tabulizer_jar_path: get("subprocess", "pdf_tabulizer_jar_path", "/opt/matrix/tabula.jar"),
            },
            lock: LockConfig {
                path: get("lock", "path", "/var/run/receive-matrix-email.lock"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_values_from_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[db]\nprimary_uri = mem://\nprimary_namespace = ns\nprimary_database = db\nexternal_uri = mem://\n\n[monitoring]\nstatsd_host = 10.0.0.5\nstatsd_port = 9125\n"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.db.primary_namespace, "ns");
        assert_eq!(config.monitoring.statsd_host, "10.0.0.5");
        assert_eq!(config.monitoring.statsd_port, 9125);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[db]\nprimary_uri = mem://\n").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.lock.path, "/var/run/receive-matrix-email.lock");
    }
}
