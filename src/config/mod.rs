//! Configuration loading via `ortho-config`.
//!
//! Settings merge defaults, `volhook.toml` and `VOLHOOK_*` environment
//! variables. Command-line flags are applied on top through
//! [`CliOverrides`], and the result is resolved once into a [`HookConfig`]
//! that is passed explicitly to the dispatcher.

use std::ffi::OsString;
use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::hook::HookMode;
use crate::orchestrator::ExhaustionPolicy;
use crate::poller::PollPolicy;

/// Layered settings read from configuration files and the environment.
#[derive(Clone, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "VOLHOOK",
    discovery(
        app_name = "volhook",
        env_var = "VOLHOOK_CONFIG_PATH",
        config_file_name = "volhook.toml",
        dotfile_name = ".volhook.toml",
        project_file_name = "volhook.toml"
    )
)]
pub struct HookSettings {
    /// Linode personal access token. Required.
    pub token: Option<String>,
    /// Name of the container invoking the hook. Informational only.
    pub name: Option<String>,
    /// Label of the node volumes should be attached to. Defaults to the
    /// local host name.
    pub host: Option<String>,
    /// Hook type: `pre` or `post`. Required.
    pub hook: Option<String>,
    /// Root of the Linode API.
    #[ortho_config(default = "https://api.linode.com/v4".to_owned())]
    pub api_url: String,
    /// Seconds to wait before each detach status check.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Number of detach status checks before giving up.
    #[ortho_config(default = 20)]
    pub max_poll_attempts: u32,
    /// Behaviour when the volume never reports detached: `proceed` or
    /// `abort`.
    #[ortho_config(default = "proceed".to_owned())]
    pub on_poll_exhausted: String,
    /// Configuration profile passed with attach requests.
    pub config_id: Option<u64>,
}

impl fmt::Debug for HookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("host", &self.host)
            .field("hook", &self.hook)
            .field("api_url", &self.api_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("on_poll_exhausted", &self.on_poll_exhausted)
            .field("config_id", &self.config_id)
            .finish()
    }
}

impl HookSettings {
    /// Loads settings without attempting to parse CLI arguments. Values merge
    /// defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("volhook")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

/// Values supplied on the command line. `None` keeps the layered setting.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--token`.
    pub token: Option<String>,
    /// `--name`.
    pub name: Option<String>,
    /// `--host`.
    pub host: Option<String>,
    /// `--hook`.
    pub hook: Option<String>,
    /// `--volume`, repeatable.
    pub volumes: Vec<String>,
    /// `--api-url`.
    pub api_url: Option<String>,
    /// `--poll-interval-secs`.
    pub poll_interval_secs: Option<u64>,
    /// `--max-poll-attempts`.
    pub max_poll_attempts: Option<u32>,
    /// `--on-poll-exhausted`.
    pub on_poll_exhausted: Option<String>,
    /// `--config-id`.
    pub config_id: Option<u64>,
}

impl fmt::Debug for CliOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliOverrides")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("hook", &self.hook)
            .field("volumes", &self.volumes)
            .finish_non_exhaustive()
    }
}

/// Fully resolved inputs for one hook invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct HookConfig {
    /// Bearer token sent with every API request.
    pub token: String,
    /// Name of the invoking container, when provided.
    pub container_name: Option<String>,
    /// Label of the target node.
    pub host: String,
    /// Hook type to run.
    pub mode: HookMode,
    /// Volume labels to attach, in order.
    pub volumes: Vec<String>,
    /// Root of the Linode API.
    pub api_url: String,
    /// Detach wait budget.
    pub poll: PollPolicy,
    /// Behaviour when the detach wait is exhausted.
    pub on_poll_exhausted: ExhaustionPolicy,
    /// Configuration profile passed with attach requests.
    pub config_id: Option<u64>,
}

impl fmt::Debug for HookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookConfig")
            .field("token", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("host", &self.host)
            .field("mode", &self.mode)
            .field("volumes", &self.volumes)
            .field("api_url", &self.api_url)
            .field("poll", &self.poll)
            .field("on_poll_exhausted", &self.on_poll_exhausted)
            .field("config_id", &self.config_id)
            .finish()
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    flag: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        flag: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            flag,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: pass {}, set {} or add {} to volhook.toml",
            self.description, self.flag, self.env_var, self.toml_key
        ))
    }
}

const TOKEN: FieldMetadata =
    FieldMetadata::new("Linode API token", "--token", "VOLHOOK_TOKEN", "token");
const HOOK: FieldMetadata =
    FieldMetadata::new("hook type (pre|post)", "--hook", "VOLHOOK_HOOK", "hook");
const HOST: FieldMetadata =
    FieldMetadata::new("target host name", "--host", "VOLHOOK_HOST", "host");
const API_URL: FieldMetadata =
    FieldMetadata::new("Linode API URL", "--api-url", "VOLHOOK_API_URL", "api_url");

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}

impl HookConfig {
    /// Merges `overrides` onto `settings` and validates the result.
    ///
    /// `local_host` supplies the default target node when neither source
    /// names one. The token is checked before the hook type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the token, hook type, host,
    /// or API URL is absent, [`ConfigError::InvalidHookMode`] for an unknown
    /// hook type, and [`ConfigError::InvalidValue`] for an unknown
    /// exhaustion policy.
    pub fn resolve(
        settings: HookSettings,
        overrides: CliOverrides,
        local_host: impl FnOnce() -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let token = non_blank(overrides.token.or(settings.token)).ok_or_else(|| TOKEN.missing())?;

        let hook = non_blank(overrides.hook.or(settings.hook)).ok_or_else(|| HOOK.missing())?;
        let mode = hook
            .parse::<HookMode>()
            .map_err(|err| ConfigError::InvalidHookMode(err.0))?;

        let host = non_blank(overrides.host.or(settings.host))
            .or_else(|| non_blank(local_host()))
            .ok_or_else(|| HOST.missing())?;

        let api_url = non_blank(Some(overrides.api_url.unwrap_or(settings.api_url)))
            .ok_or_else(|| API_URL.missing())?;

        let on_poll_exhausted = overrides
            .on_poll_exhausted
            .unwrap_or(settings.on_poll_exhausted)
            .parse::<ExhaustionPolicy>()
            .map_err(|err| ConfigError::InvalidValue {
                field: String::from("on_poll_exhausted"),
                message: err.to_string(),
            })?;

        let poll = PollPolicy {
            max_attempts: overrides
                .max_poll_attempts
                .unwrap_or(settings.max_poll_attempts),
            interval: Duration::from_secs(
                overrides
                    .poll_interval_secs
                    .unwrap_or(settings.poll_interval_secs),
            ),
        };

        let volumes = overrides
            .volumes
            .into_iter()
            .filter_map(|volume| non_blank(Some(volume)))
            .collect();

        Ok(Self {
            token,
            container_name: non_blank(overrides.name.or(settings.name)),
            host,
            mode,
            volumes,
            api_url,
            poll,
            on_poll_exhausted,
            config_id: overrides.config_id.or(settings.config_id),
        })
    }
}

/// Returns the local host name, if it is valid UTF-8.
#[must_use]
pub fn local_host_name() -> Option<String> {
    gethostname::gethostname().into_string().ok()
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates the hook type is not `pre` or `post`.
    #[error("invalid hook type '{0}': --hook must be pre or post")]
    InvalidHookMode(String),
    /// Indicates a field holds a value outside its accepted set.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Field that failed validation.
        field: String,
        /// Description of the problem.
        message: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
