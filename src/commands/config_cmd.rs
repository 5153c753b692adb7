use clap::{Args, Subcommand, ValueEnum};

use lofersil::Config;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("port: {}", config.port.value);
                        println!("  source: {}", config.port.source);
                        println!();

                        println!("production: {}", config.production.value);
                        println!("  source: {}", config.production.source);
                        println!();

                        let csrf = &config.csrf;
                        println!("csrf:");
                        println!("  token_byte_length: {}", csrf.token_byte_length);
                        println!("  token_expiration_ms: {}", csrf.token_expiration_ms);
                        println!(
                            "  signing_key: {}",
                            if csrf.signing_key.is_some() {
                                "(set)"
                            } else {
                                "(random per process)"
                            }
                        );
                        println!("  cookie_name: {}", csrf.cookie_name);
                        println!("  header_name: {}", csrf.header_name);
                        println!("  field_name: {}", csrf.field_name);
                        println!("  cleanup_interval_ms: {}", csrf.cleanup_interval_ms);
                    }
                }
                Ok(())
            }
        }
    }
}
