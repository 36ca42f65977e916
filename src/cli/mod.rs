//! Command-line interface definitions for the `volhook` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI for the `volhook` binary.
///
/// Flags override values from `volhook.toml` and `VOLHOOK_*` environment
/// variables.
#[derive(Debug, Parser)]
#[command(
    name = "volhook",
    version,
    about = "Attach Linode block storage volumes to this node before a container starts"
)]
pub(crate) struct Cli {
    /// Linode API bearer token.
    #[arg(long, value_name = "TOKEN")]
    pub(crate) token: Option<String>,
    /// Name of the container invoking the hook.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: Option<String>,
    /// Label of the node to attach volumes to (defaults to the local host name).
    #[arg(long, value_name = "HOST")]
    pub(crate) host: Option<String>,
    /// Hook type: pre | post.
    #[arg(long, value_name = "HOOK")]
    pub(crate) hook: Option<String>,
    /// Volume to attach. Repeat for multiple volumes, e.g. --volume vol1 --volume vol2.
    #[arg(
        long = "volume",
        value_name = "VOLUME",
        env = "VOLHOOK_VOLUMES",
        value_delimiter = ','
    )]
    pub(crate) volumes: Vec<String>,
    /// Root of the Linode API.
    #[arg(long, value_name = "URL")]
    pub(crate) api_url: Option<String>,
    /// Seconds to wait before each detach status check.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) poll_interval_secs: Option<u64>,
    /// Number of detach status checks before giving up.
    #[arg(long, value_name = "COUNT")]
    pub(crate) max_poll_attempts: Option<u32>,
    /// What to do when the volume never reports detached: proceed | abort.
    #[arg(long, value_name = "POLICY")]
    pub(crate) on_poll_exhausted: Option<String>,
    /// Configuration profile to add the volume to when attaching.
    #[arg(long, value_name = "ID")]
    pub(crate) config_id: Option<u64>,
    /// Log output format: text | json.
    #[arg(long, value_name = "FORMAT", env = "VOLHOOK_LOG_FORMAT", default_value = "text")]
    pub(crate) log_format: String,
    /// Directory for daily rotated log files, in addition to stderr.
    #[arg(long, value_name = "DIR", env = "VOLHOOK_LOG_DIR")]
    pub(crate) log_dir: Option<PathBuf>,
    /// Number of rotated log files to keep.
    #[arg(
        long,
        value_name = "COUNT",
        env = "VOLHOOK_LOG_MAX_FILES",
        default_value_t = 7
    )]
    pub(crate) log_max_files: usize,
}
