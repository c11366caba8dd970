//! Configuration files through the CLI run context

use prefuel::cli::{Commands, OutputFormat, RecommendArgs, RunContext};
use prefuel::config::{ConfigLoader, ProviderType};
use prefuel::error::ApiError;
use prefuel::pipeline::Preset;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn write(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

#[test]
fn explicit_config_file_is_shown_with_key_redacted() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("prefuel.toml");
    write(
        &file,
        r#"
[provider]
provider_type = "anthropic"
model = "claude-3-5-haiku-latest"
api_key = "sk-ant-secret"

[pipeline]
preset = "chained-shared"
temperature = 0.3
"#,
    );

    let ctx = RunContext::new(temp.path().to_path_buf(), Some(file.clone())).unwrap();
    assert_eq!(ctx.config().provider.provider_type, ProviderType::Anthropic);
    assert_eq!(ctx.config().pipeline.preset, Preset::ChainedShared);

    let shown = ctx.execute(&Commands::Config).unwrap();
    assert!(shown.contains(&file.display().to_string()));
    assert!(shown.contains("claude-3-5-haiku-latest"));
    assert!(shown.contains("chained-shared"));
    assert!(!shown.contains("sk-ant-secret"));
}

#[test]
fn invalid_config_is_rejected_at_startup() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("prefuel.toml");
    write(&file, "[pipeline]\ntemperature = 4.5\n");

    let err = RunContext::new(temp.path().to_path_buf(), Some(file))
        .err()
        .expect("temperature outside [0, 2] must be rejected");
    assert!(matches!(err, ApiError::ConfigError(_)));
    assert!(err.to_string().contains("temperature"));
}

#[test]
fn missing_credential_fails_before_any_request() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("prefuel.toml");
    write(
        &file,
        "[provider]\nprovider_type = \"openai\"\napi_key_env = \"PREFUEL_TEST_UNSET_KEY_7F3A\"\n",
    );

    let ctx = RunContext::new(temp.path().to_path_buf(), Some(file)).unwrap();
    let command = Commands::Recommend(RecommendArgs {
        activity: "running".to_string(),
        hours: 1.0,
        preset: None,
        mode: None,
        temperature: None,
        format: OutputFormat::Text,
        parallel: false,
    });
    let err = ctx.execute(&command).unwrap_err();
    assert!(matches!(err, ApiError::ProviderNotConfigured(_)));
}

#[test]
fn workspace_environment_file_overrides_base_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let saved_xdg = std::env::var("XDG_CONFIG_HOME").ok();
    let saved_env = std::env::var("PREFUEL_ENV").ok();
    std::env::set_var("XDG_CONFIG_HOME", temp.path().join("xdg"));
    std::env::set_var("PREFUEL_ENV", "production");

    write(
        &temp.path().join("config").join("config.toml"),
        "[provider]\nprovider_type = \"ollama\"\nmodel = \"llama3\"\n",
    );
    write(
        &temp.path().join("config").join("production.toml"),
        "[provider]\nmodel = \"llama3:70b\"\n\n[logging]\nlevel = \"error\"\n",
    );

    let loaded = ConfigLoader::load(temp.path());

    match saved_xdg {
        Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    match saved_env {
        Some(v) => std::env::set_var("PREFUEL_ENV", v),
        None => std::env::remove_var("PREFUEL_ENV"),
    }

    let config = loaded.unwrap();
    assert_eq!(config.provider.provider_type, ProviderType::Ollama);
    assert_eq!(config.provider.model, "llama3:70b");
    assert_eq!(config.logging.level, "error");
}
