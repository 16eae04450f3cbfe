//! Config subcommand handlers.

use secrecy::{ExposeSecret, SecretString};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with plaintext switch passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut shown = cfg.clone();
    for profile in shown.switches.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    shown
}

fn to_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("<unrenderable config: {e}>"))
}

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::active_config_path(global).display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let shown = redacted(&cfg);
            let out = output::render_single(config::output_format(global, &cfg), &shown, to_toml)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::active_config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            config::save_config_to(&Config::default(), &path)?;
            eprintln!("✓ Configuration written to {}", path.display());
            Ok(())
        }

        ConfigCommand::SetPassword { switch } => {
            let cfg = config::load(global)?;
            let profile = cfg.switches.get(&switch).ok_or_else(|| CliError::NoCredentials {
                switch: switch.clone(),
            })?;
            if profile.username.is_none() {
                return Err(CliError::NoCredentials { switch });
            }

            let password = SecretString::from(
                rpassword::prompt_password(format!("Password for {switch}: ")).map_err(prompt_err)?,
            );
            if password.expose_secret().is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }

            config::store_switch_password(&switch, password.expose_secret())?;
            eprintln!("✓ Password for '{switch}' stored in system keyring");
            Ok(())
        }
    }
}
