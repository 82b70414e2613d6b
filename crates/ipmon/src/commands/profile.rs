//! Profile subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;

use ipmon_core::{DEFAULT_SEGMENT, KNOWN_SEGMENTS};

use crate::cli::{GlobalOpts, ProfileArgs, ProfileCommand};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

// ── Prompts ─────────────────────────────────────────────────────────

fn prompt_failed(e: &dialoguer::Error) -> CliError {
    CliError::Validation {
        field: "input".into(),
        reason: format!("could not read answer: {e}"),
    }
}

/// Use the flag value, or ask for it when a terminal is attached.
fn value_or_prompt(
    given: Option<String>,
    prompt: &str,
    default: &str,
    field: &str,
) -> Result<String, CliError> {
    if let Some(value) = given {
        return Ok(value);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: format!("--{field} is required when not running interactively"),
        });
    }
    Input::new()
        .with_prompt(prompt)
        .default(default.to_owned())
        .interact_text()
        .map_err(|e| prompt_failed(&e))
}

pub fn handle(args: ProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ProfileCommand::Init {
            name,
            url,
            segment,
            set_default,
        } => {
            let name = value_or_prompt(
                name.or_else(|| global.profile.clone()),
                "Profile name",
                "default",
                "name",
            )?;
            let server = value_or_prompt(
                url.or_else(|| global.server.clone()),
                "IP monitor URL",
                "http://localhost:5000",
                "url",
            )?;
            ipmon_config::parse_server_url(&server)?;

            let segment = segment.unwrap_or_else(|| DEFAULT_SEGMENT.into());
            if !KNOWN_SEGMENTS.contains(&segment.as_str()) {
                tracing::warn!(%segment, "segment is not one of the known VLANs");
            }

            let mut cfg = config::load_config_or_default();
            let mut profile = Profile::new(server);
            profile.default_segment = segment;
            cfg.profiles.insert(name.clone(), profile);
            if set_default || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            let path = config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("✓ Profile '{name}' written to {}", path.display());
            }
            Ok(())
        }

        ProfileCommand::Show => {
            let cfg = config::load_config_or_default();
            output::print_output(&ipmon_config::to_toml(&cfg)?, global.quiet);
            Ok(())
        }

        ProfileCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
