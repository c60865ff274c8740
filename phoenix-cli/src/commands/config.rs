///! CLI configuration commands

use crate::config::Config;
use crate::output;
use crate::ConfigCommands;
use anyhow::Result;

pub fn handle_config_command(command: ConfigCommands, config: &Config) -> Result<()> {
    match command {
        ConfigCommands::Init => {
            let path = Config::config_path()?;
            if path.exists() {
                output::print_warning(&format!("Config already exists at {}", path.display()));
                return Ok(());
            }

            Config::default().save()?;
            output::print_success(&format!("Wrote default config to {}", path.display()));
            output::print_info("Edit it to set source_cluster, clone_prefix and the DNS alias");
        }

        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
    }

    Ok(())
}
