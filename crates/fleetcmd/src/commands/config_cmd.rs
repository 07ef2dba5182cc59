//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use fleetcmd_config::{Config, Defaults, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, prompt_err};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

const REDACTED: &str = "****";

/// Copy of `cfg` with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    cfg
}

/// Format config for display. Expects an already redacted config.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "command = \"{}\"", d.command);
    let _ = writeln!(out, "batch_size = {}", d.batch_size);
    let _ = writeln!(out, "scheduling = \"{}\"", d.scheduling);
    let _ = writeln!(out, "output_dir = \"{}\"", d.output_dir.display());
    let _ = writeln!(out, "connect_timeout = {}", d.connect_timeout);
    let _ = writeln!(out, "read_timeout = {}", d.read_timeout);
    let _ = writeln!(out, "port = {}", d.port);
    if let Some(ref log_file) = d.log_file {
        let _ = writeln!(out, "log_file = \"{}\"", log_file.display());
    }

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref pw) = p.password {
            let _ = writeln!(out, "password = \"{pw}\"");
        }
        if let Some(port) = p.port {
            let _ = writeln!(out, "port = {port}");
        }
        if let Some(timeout) = p.connect_timeout {
            let _ = writeln!(out, "connect_timeout = {timeout}");
        }
    }

    out
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    let path = config::save_config(cfg)?;
    tracing::debug!(path = %path.display(), "config saved");
    Ok(())
}

fn prompt_secret(label: &str) -> Result<SecretString, CliError> {
    let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(SecretString::from(secret))
}

/// Where the password for a new profile should live. Fills in the
/// profile's `password` or `password_env` as chosen.
fn prompt_password_storage(profile_name: &str, profile: &mut Profile) -> Result<(), CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Read from an environment variable",
        "Save to config file (plaintext)",
        "Ask on every run",
    ];
    let selection = Select::new()
        .with_prompt("Where should the device password come from?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match selection {
        0 => {
            let secret = prompt_secret("Password: ")?;
            fleetcmd_config::store_password(profile_name, &secret)?;
            eprintln!("   ✓ Password stored in system keyring");
        }
        1 => {
            let var: String = Input::new()
                .with_prompt("Environment variable name")
                .default("FLEETCMD_DEVICE_PASSWORD".into())
                .interact_text()
                .map_err(prompt_err)?;
            profile.password_env = Some(var);
        }
        2 => {
            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            profile.password = Some(secret);
        }
        _ => {}
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("fleetcmd configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::load_config().unwrap_or_default();

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("Device username")
                .interact_text()
                .map_err(prompt_err)?;
            if username.is_empty() {
                return Err(CliError::Validation {
                    field: "username".into(),
                    reason: "username cannot be empty".into(),
                });
            }

            let mut profile = Profile {
                username: Some(username),
                ..Profile::default()
            };
            prompt_password_storage(&profile_name, &mut profile)?;

            let defaults = Defaults::default();
            let command: String = Input::new()
                .with_prompt("Default show command")
                .default(defaults.command.clone())
                .interact_text()
                .map_err(prompt_err)?;
            let batch_size: usize = Input::new()
                .with_prompt("Devices per batch")
                .default(defaults.batch_size)
                .validate_with(|n: &usize| if *n == 0 { Err("must be at least 1") } else { Ok(()) })
                .interact_text()
                .map_err(prompt_err)?;

            cfg.defaults.command = command;
            cfg.defaults.batch_size = batch_size;
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Review a run first: fleetcmd plan --devices devices.csv");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.profiles.keys().cloned().collect::<Vec<_>>().join("\n")
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);

            cfg.set_value(&profile_name, &key, &value)?;

            save_config(&cfg)?;
            if key.starts_with("defaults.") {
                eprintln!("✓ Set {key}");
            } else {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: fleetcmd config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            cfg.profile(&name)?;

            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config()?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            cfg.profile(&profile_name)?;

            let secret = prompt_secret("Password: ")?;
            fleetcmd_config::store_password(&profile_name, &secret)?;

            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_plaintext_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                username: Some("netops".into()),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );

        let text = format_config(&redacted(&cfg));
        assert!(text.contains("[profiles.lab]"));
        assert!(text.contains("username = \"netops\""));
        assert!(text.contains("password = \"****\""));
        assert!(!text.contains("hunter2"));
    }
}
