use crate::core::controller::TowerSettings;
use crate::utils::error::{Result, WarehouseError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub tower: TowerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
    pub grid: Option<GridConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerConfig {
    #[serde(default = "default_transport_capacity")]
    pub transport_capacity: u32,
    #[serde(default = "default_max_requeues")]
    pub max_requeues: u32,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            transport_capacity: default_transport_capacity(),
            max_requeues: default_max_requeues(),
        }
    }
}

fn default_transport_capacity() -> u32 {
    2000
}

fn default_max_requeues() -> u32 {
    3
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// 未設定時帳本只存在記憶體
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub location: String,
    pub capacity: u32,
}

/// 倉庫格位網格：走道 × 區段 × 層
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub aisles: u32,
    pub sections: u32,
    pub levels: u32,
    pub sizes: Vec<u32>,
}

impl GridConfig {
    /// Location codes like `Aisle-01-Sect-02-Lvl-1`, sizes assigned in turn.
    pub fn slots(&self) -> Vec<SlotConfig> {
        let mut slots = Vec::new();
        if self.sizes.is_empty() {
            return slots;
        }
        for a in 1..=self.aisles {
            for s in 1..=self.sections {
                for l in 1..=self.levels {
                    let capacity = self.sizes[slots.len() % self.sizes.len()];
                    slots.push(SlotConfig {
                        location: format!("Aisle-{:02}-Sect-{:02}-Lvl-{}", a, s, l),
                        capacity,
                    });
                }
            }
        }
        slots
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WarehouseError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| WarehouseError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LEDGER_PATH})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WarehouseError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn tower_settings(&self) -> TowerSettings {
        TowerSettings {
            transport_capacity: self.tower.transport_capacity,
            max_requeues: self.tower.max_requeues,
        }
    }

    /// Explicit `[[slots]]` first, then the generated grid.
    pub fn seed_slots(&self) -> Vec<SlotConfig> {
        let mut slots = self.slots.clone();
        if let Some(grid) = &self.grid {
            slots.extend(grid.slots());
        }
        slots
    }

    pub fn json_logs(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number(
            "tower.transport_capacity",
            u64::from(self.tower.transport_capacity),
            1,
        )?;
        validate_range("tower.max_requeues", self.tower.max_requeues, 0, 1000)?;

        if let Some(path) = &self.ledger.path {
            validate_path("ledger.path", path)?;
        }

        if let Some(level) = &self.logging.level {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level.as_str()) {
                return Err(WarehouseError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.clone(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        let mut seen = HashSet::new();
        for slot in self.seed_slots() {
            validate_non_empty_string("slots.location", &slot.location)?;
            validate_positive_number("slots.capacity", u64::from(slot.capacity), 1)?;
            if !seen.insert(slot.location.clone()) {
                return Err(WarehouseError::InvalidConfigValueError {
                    field: "slots.location".to_string(),
                    value: slot.location,
                    reason: "Duplicate location".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
