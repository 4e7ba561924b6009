use std::process::Command;
use tempfile::TempDir;

fn freshwatch(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_freshwatch"));
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("FRESHWATCH_ROOT");
    cmd
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let output = freshwatch(temp_path)
        .arg("init")
        .output()
        .expect("Failed to run init command");
    assert!(output.status.success());

    let config_path = temp_path.join(".freshwatch/settings.toml");
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[watcher]"));
    assert!(content.contains("debounce_ms = 100"));

    // second init without --force refuses
    let again = freshwatch(temp_path).arg("init").output().unwrap();
    assert!(!again.status.success());

    let forced = freshwatch(temp_path).args(["init", "--force"]).output().unwrap();
    assert!(forced.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let config_dir = temp_path.join(".freshwatch");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("settings.toml"),
        "version = 2\n[watcher]\ndebounce_ms = 275\n",
    )
    .unwrap();

    let output = freshwatch(temp_path)
        .arg("config")
        .output()
        .expect("Failed to run config command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("debounce_ms = 275"));
}

#[test]
fn test_estimate_json() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();
    std::fs::create_dir_all(temp_path.join("src")).unwrap();
    std::fs::write(temp_path.join("src/a.rs"), "").unwrap();
    std::fs::write(temp_path.join("src/b.rs"), "").unwrap();

    let output = freshwatch(temp_path)
        .args(["estimate", "src", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["estimate"], 2);
    assert_eq!(report["verdict"], "ok");
}

#[test]
fn test_estimate_refused_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();
    for i in 0..10 {
        std::fs::write(temp_path.join(format!("{i}.txt")), "").unwrap();
    }

    let output = freshwatch(temp_path)
        .args(["estimate", "."])
        .env("FRESHWATCH_WATCHER__ESTIMATE_CAP", "5")
        .env("FRESHWATCH_WATCHER__WARN_THRESHOLD", "2")
        .env("FRESHWATCH_WATCHER__HARD_THRESHOLD", "8")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("refused"));
}
