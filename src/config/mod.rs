#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "logi-tower")]
#[command(about = "Warehouse control tower: bin allocation and truck loading")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the ledger snapshot path from config
    #[arg(long)]
    pub ledger: Option<String>,

    /// Override truck capacity from config
    #[arg(long)]
    pub transport_capacity: Option<u32>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入 TOML 配置並套用命令列覆蓋設定
    pub fn resolve(&self) -> crate::utils::error::Result<toml_config::TomlConfig> {
        let mut config = match &self.config {
            Some(path) => toml_config::TomlConfig::from_file(path)?,
            None => toml_config::TomlConfig::default(),
        };

        if let Some(path) = &self.ledger {
            config.ledger.path = Some(path.clone());
        }
        if let Some(capacity) = self.transport_capacity {
            config.tower.transport_capacity = capacity;
        }
        if self.json_logs {
            config.logging.json = Some(true);
        }
        Ok(config)
    }
}
