use super::load::{default_config_path, default_log_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_encore_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", "/tmp/encore-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/encore-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("encore")
            .join("config.toml")
    );
}

#[test]
fn default_paths_fall_back_to_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::remove("XDG_STATE_HOME");
    let _g3 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.config/encore/config.toml")
    );
    assert_eq!(
        default_log_path().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.local/state/encore/encore.log")
    );
}

#[test]
fn defaults_match_the_web_player() {
    let s = Settings::default();
    assert_eq!(s.playback.volume, 0.7);
    assert_eq!(s.playback.restart_threshold_secs, 3.0);
    assert!(s.playback.autoplay);
    assert!(!s.playback.shuffle);
    assert_eq!(s.playback.repeat_mode, RepeatModeSetting::Off);
    assert_eq!(s.ui.search_debounce_ms, 300);
    assert_eq!(s.catalog.source, CatalogSource::Local);
    assert!(s.validate().is_ok());
}

#[test]
fn repeat_mode_aliases_parse() {
    let parse = |v: &str| {
        let s: Settings = toml::from_str(&format!("[playback]\nrepeat_mode = \"{v}\"\n")).unwrap();
        s.playback.repeat_mode
    };
    assert_eq!(parse("off"), RepeatModeSetting::Off);
    assert_eq!(parse("no-loop"), RepeatModeSetting::Off);
    assert_eq!(parse("repeat-all"), RepeatModeSetting::RepeatAll);
    assert_eq!(parse("loop-all"), RepeatModeSetting::RepeatAll);
    assert_eq!(parse("repeat-one"), RepeatModeSetting::RepeatOne);
    assert_eq!(parse("loop_one"), RepeatModeSetting::RepeatOne);
}

#[test]
fn validate_rejects_bad_values() {
    let mut s = Settings::default();
    s.audio.tick_ms = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.playback.volume = 1.5;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.playback.restart_threshold_secs = -1.0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.catalog.source = CatalogSource::Http;
    assert!(s.validate().is_err());
    s.catalog.base_url = Some("http://localhost:3000".into());
    assert!(s.validate().is_ok());
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
shuffle = true
repeat_mode = "repeat-one"
volume = 0.4
restart_threshold_secs = 5.0
autoplay = false

[audio]
tick_ms = 100
quit_fade_out_ms = 0

[catalog]
source = "http"
base_url = "http://localhost:3000"
timeout_secs = 3

[ui]
header_text = "hello"
search_debounce_ms = 150

[library]
extensions = ["mp3"]
recursive = false
display_fields = ["filename"]
display_separator = "::"

[logging]
level = "debug"
file = "/tmp/encore.log"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("ENCORE__AUDIO__TICK_MS");

    let s = Settings::load().unwrap();
    assert!(s.playback.shuffle);
    assert_eq!(s.playback.repeat_mode, RepeatModeSetting::RepeatOne);
    assert_eq!(s.playback.volume, 0.4);
    assert_eq!(s.playback.restart_threshold_secs, 5.0);
    assert!(!s.playback.autoplay);
    assert_eq!(s.audio.tick_ms, 100);
    assert_eq!(s.audio.quit_fade_out_ms, 0);
    assert_eq!(s.catalog.source, CatalogSource::Http);
    assert_eq!(s.catalog.base_url.as_deref(), Some("http://localhost:3000"));
    assert_eq!(s.catalog.timeout_secs, 3);
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(s.ui.search_debounce_ms, 150);
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert_eq!(s.library.display_fields, vec![TrackDisplayField::Filename]);
    assert_eq!(s.library.display_separator, "::");
    assert_eq!(s.logging.level, "debug");
    assert_eq!(
        s.logging.file.as_deref(),
        Some(std::path::Path::new("/tmp/encore.log"))
    );
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
tick_ms = 250
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("ENCORE__AUDIO__TICK_MS", "50");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.tick_ms, 50);
}
