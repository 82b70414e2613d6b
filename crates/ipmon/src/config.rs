//! CLI configuration: a thin wrapper around `ipmon_config`.
//!
//! Re-exports the shared types and layers the global flags
//! (`--server`, `--insecure`, `--timeout`, ...) on top of the active
//! profile.

use std::time::Duration;

use ipmon_core::{MonitorConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use ipmon_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Timeout the CLI uses unless `--timeout` says otherwise.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `MonitorConfig` for this invocation.
///
/// Flag values win over profile values. Without a matching profile the
/// server must come from `--server` / `IPMON_SERVER`.
pub fn resolve(global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    let cfg = load_config_or_default();
    let name = active_profile_name(global, &cfg);

    let profile = match (cfg.profiles.get(&name), &global.server) {
        (Some(profile), _) => profile.clone(),
        (None, Some(server)) => Profile::new(server.clone()),
        (None, None) if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name,
                available: available.join(", "),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    resolve_profile(&profile, &cfg, global)
}

/// Translate a `Profile` plus global flags into a `MonitorConfig`.
pub fn resolve_profile(
    profile: &Profile,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<MonitorConfig, CliError> {
    let mut config = ipmon_config::profile_to_monitor_config(profile)?;

    if let Some(server) = &global.server {
        config.url = ipmon_config::parse_server_url(server)?;
    }

    if global.insecure || cfg.defaults.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }

    // --timeout carries a default, so only an explicit value beats the
    // profile.
    let timeout = if global.timeout == DEFAULT_TIMEOUT_SECS {
        profile.timeout.unwrap_or(cfg.defaults.timeout)
    } else {
        global.timeout
    };
    config.timeout = Duration::from_secs(timeout);

    tracing::debug!(url = %config.url, timeout, "resolved server configuration");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn globals(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["ipmon"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["profile", "path"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile() {
        let mut profile = Profile::new("http://10.0.0.5:5000");
        profile.timeout = Some(10);
        let cfg = Config::default();

        let config = resolve_profile(
            &profile,
            &cfg,
            &globals(&["--server", "http://monitor.tce.go.gov.br", "-k", "--timeout", "3"]),
        )
        .unwrap();

        assert_eq!(config.url.as_str(), "http://monitor.tce.go.gov.br/");
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn profile_timeout_used_without_flag() {
        let mut profile = Profile::new("http://10.0.0.5:5000");
        profile.timeout = Some(10);

        let config = resolve_profile(&profile, &Config::default(), &globals(&[])).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn bad_server_flag_is_a_validation_error() {
        let profile = Profile::new("http://10.0.0.5:5000");
        let err = resolve_profile(&profile, &Config::default(), &globals(&["--server", "nope"]))
            .unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }
}
