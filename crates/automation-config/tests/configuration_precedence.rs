//! Behavioural tests for configuration layering.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use automation_config::{Config, LogFormat, default_log_filter, default_socket_path};
use camino::Utf8Path;
use once_cell::sync::Lazy;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const MANAGED_VARIABLES: [&str; 5] = [
    "APP_AUTOMATION_SOCKET",
    "APP_AUTOMATION_DRY_RUN",
    "APP_AUTOMATION_SAFARI_HELPER",
    "APP_AUTOMATION_MESSAGES_HELPER",
    "APP_AUTOMATION_CONFIG_PATH",
];

struct Harness {
    temp_dir: TempDir,
    cli_args: RefCell<Vec<OsString>>,
    env_overrides: RefCell<Vec<(String, Option<OsString>)>>,
    loaded: RefCell<Option<Config>>,
    error: RefCell<Option<String>>,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let temp_dir = TempDir::new().expect("create temporary directory");
        let harness = Self {
            temp_dir,
            cli_args: RefCell::new(vec![OsString::from("automationd")]),
            env_overrides: RefCell::new(Vec::new()),
            loaded: RefCell::new(None),
            error: RefCell::new(None),
            _guard: guard,
        };
        for key in MANAGED_VARIABLES {
            harness.remove_env(key);
        }
        harness
    }

    fn write_config(&self, contents: &str) {
        let path = self.temp_dir.path().join("automation.toml");
        fs::write(&path, contents).expect("write configuration");
        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Edition 2024 marks environment mutation as unsafe; the harness holds
        // the environment mutex and restores overrides in `Drop`.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn remove_env(&self, key: &str) {
        let previous = std::env::var_os(key);
        if previous.is_none() {
            return;
        }
        unsafe { std::env::remove_var(key) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn push_cli_arg(&self, arg: impl Into<OsString>) {
        self.cli_args.borrow_mut().push(arg.into());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }

        let args = self.cli_args.borrow().clone();
        match Config::load_from_args(args) {
            Ok(config) => *self.loaded.borrow_mut() = Some(config),
            Err(error) => *self.error.borrow_mut() = Some(error.to_string()),
        }
    }

    fn config(&self) -> Config {
        self.load();
        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }
        self.loaded
            .borrow()
            .clone()
            .expect("configuration was not loaded")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            match value {
                Some(os_value) => unsafe { std::env::set_var(&key, os_value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a configuration file setting the socket to \"{socket}\"")]
fn given_configuration_file(harness: &Harness, socket: String) {
    harness.write_config(&format!("socket = \"{}\"\n", &socket));
}

#[given("the environment sets \"{key}\" to \"{value}\"")]
fn given_environment(harness: &Harness, key: String, value: String) {
    harness.set_env(&key, &value);
}

#[when("the CLI sets the socket to \"{socket}\"")]
fn when_cli_override(harness: &Harness, socket: String) {
    harness.push_cli_arg("--socket");
    harness.push_cli_arg(&socket);
}

#[when("the CLI passes the dry-run switch")]
fn when_cli_dry_run(harness: &Harness) {
    harness.push_cli_arg(automation_config::DRY_RUN_SWITCH);
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the socket to \"{socket}\"")]
fn then_resolved_socket(harness: &Harness, socket: String) {
    assert_eq!(harness.config().socket(), Utf8Path::new(&socket));
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.config();
    assert_eq!(config.socket(), default_socket_path());
    assert!(!config.dry_run());
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.helper_timeout_ms, 5_000);
}

#[then("loading the configuration enables dry-run")]
fn then_dry_run_enabled(harness: &Harness) {
    assert!(harness.config().dry_run());
}

#[then("loading the configuration resolves the Safari helper to \"{path}\"")]
fn then_safari_helper(harness: &Harness, path: String) {
    assert_eq!(
        harness.config().safari_helper(),
        Some(Utf8Path::new(&path))
    );
}

#[then("no Messages helper is configured")]
fn then_no_messages_helper(harness: &Harness) {
    assert_eq!(harness.config().messages_helper(), None);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Built-in defaults apply without overrides"
)]
fn defaults_apply(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Environment overrides the configuration file"
)]
fn environment_beats_file(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line flags override the environment"
)]
fn cli_beats_environment(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Dry-run accepts a numeric switch"
)]
fn dry_run_numeric_switch(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Environment dry-run survives unrelated flags"
)]
fn dry_run_survives_cli_flags(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "The dry-run switch enables the gate"
)]
fn dry_run_switch(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Helper paths come from the environment"
)]
fn helper_paths_from_environment(#[from(harness)] harness: Harness) {
    let _ = harness;
}
