//! Layered configuration feeding a running store

use crate::integration::test_utils::{EnvGuard, ENV_MUTEX};
use std::fs;
use tempfile::TempDir;
use zettelstore::config::{ConfigLoader, WORKSPACE_CONFIG_FILE};
use zettelstore::error::{ConfigError, StoreError};
use zettelstore::place::manager::Manager;
use zettelstore::place::{Context, Place};
use zettelstore::zettel::Zid;

fn isolated(dir: &TempDir) -> EnvGuard {
    EnvGuard::set(&[
        ("XDG_CONFIG_HOME", dir.path().join("xdg").to_str()),
        ("ZETTELSTORE__READONLY", None),
        ("ZETTELSTORE__AUTH__OWNER", None),
    ])
}

#[test]
fn test_workspace_file_builds_a_store() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let _env = isolated(&dir);
    let zettel_dir = dir.path().join("zettel");
    fs::create_dir_all(&zettel_dir).unwrap();
    fs::write(
        dir.path().join(WORKSPACE_CONFIG_FILE),
        format!(
            "places = [\"dir://{}\"]\n\n[logging]\nlevel = \"warn\"\n",
            zettel_dir.display()
        ),
    )
    .unwrap();

    let config = ConfigLoader::load(dir.path()).unwrap();
    assert_eq!(config.logging.level, "warn");
    assert!(config.validate().is_ok());

    let manager = Manager::from_config(&config).unwrap();
    let ctx = Context::background();
    manager.start(&ctx).unwrap();
    assert_eq!(manager.locations().len(), 2);
    manager.stop(&ctx).unwrap();
}

#[test]
fn test_environment_overrides_files() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let _env = isolated(&dir);
    fs::write(
        dir.path().join(WORKSPACE_CONFIG_FILE),
        "places = [\"mem:\"]\nreadonly = false\n",
    )
    .unwrap();
    let _overrides = EnvGuard::set(&[
        ("ZETTELSTORE__READONLY", Some("true")),
        ("ZETTELSTORE__AUTH__OWNER", Some("20200101000000")),
    ]);

    let config = ConfigLoader::load(dir.path()).unwrap();
    assert!(config.readonly);
    let policy = config.policy_config().unwrap();
    assert_eq!(policy.owner, Zid::new(20200101000000));
    assert!(policy.readonly);
}

#[test]
fn test_global_file_is_the_lowest_file_layer() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let _env = isolated(&dir);
    let global = dir.path().join("xdg").join("zettelstore");
    fs::create_dir_all(&global).unwrap();
    fs::write(
        global.join("config.toml"),
        "places = [\"mem:\"]\n[auth]\ndefault_visibility = \"public\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load(dir.path()).unwrap();
    assert_eq!(config.places, vec!["mem:"]);
    assert_eq!(config.auth.default_visibility, "public");
    assert_eq!(
        ConfigLoader::xdg_config_path(),
        Some(global.join("config.toml"))
    );
}

#[test]
fn test_invalid_owner_is_reported() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.toml");
    fs::write(&file, "[auth]\nowner = \"not-a-zid\"\n").unwrap();

    let config = ConfigLoader::load_from_file(&file).unwrap();
    assert!(config.validate().is_err());
    assert!(matches!(
        Manager::from_config(&config),
        Err(StoreError::Config(ConfigError::Invalid(_)))
    ));
}
