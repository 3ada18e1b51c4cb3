use fieldhost::config::Config;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("write config");
    path.to_string_lossy().to_string()
}

#[test]
fn default_file_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fieldhost.toml");
    let path = path.to_string_lossy().to_string();

    tokio_test::block_on(Config::create_default(&path)).unwrap();
    let cfg = tokio_test::block_on(Config::load(&path)).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.default_zone, 100);
    assert_eq!(cfg.economy.party_share_percent, 40);
    assert_eq!(cfg.companion.max_level(), 30);
    assert_eq!(cfg.zones.len(), 1);
}

#[test]
fn minimal_file_fills_in_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "min.toml",
        r#"
[server]
bind = "127.0.0.1:9000"
max_sessions = 4

[logging]
level = "debug"
"#,
    );
    let cfg = tokio_test::block_on(Config::load(&path)).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.server.max_sessions, 4);
    assert_eq!(cfg.logging.file, None);
    assert_eq!(cfg.pickup.blocked_category, 291);
    assert_eq!(cfg.zones[0].name, "Town Square");
    assert!(cfg.zones[0].potion_allowed);
}

#[test]
fn zones_and_economy_are_read() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "zones.toml",
        r#"
default_zone = 200

[server]
bind = "127.0.0.1:9000"
max_sessions = 10

[logging]
level = "info"

[economy]
party_share_percent = 50
party_bonus_percent = 10

[[zones]]
id = 200
name = "Harbor"
everlast = true
consume_cooldown_secs = 3

[[zones]]
id = 201
name = "Arena"
potion_allowed = false
"#,
    );
    let cfg = tokio_test::block_on(Config::load(&path)).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.economy.party_share_percent, 50);
    assert_eq!(cfg.zones.len(), 2);
    assert!(cfg.zones[0].everlast);
    assert_eq!(cfg.zones[0].consume_cooldown_secs, 3);
    assert!(!cfg.zones[1].potion_allowed);
}

#[test]
fn missing_and_broken_files_are_errors() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml").to_string_lossy().to_string();
    let err = tokio_test::block_on(Config::load(&missing)).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));

    let broken = write(&dir, "broken.toml", "[server\nbind = ");
    let err = tokio_test::block_on(Config::load(&broken)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn validation_rejects_bad_values() {
    let mut cfg = Config::default();
    cfg.economy.party_share_percent = 101;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.companion.level_thresholds = vec![0, 5, 3];
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.companion.max_slots = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.default_zone = 999;
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("default_zone 999"));
}
