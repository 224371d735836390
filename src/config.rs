//! Configuração do shiptrack carregada a partir de `shiptrack.toml`.
//!
//! A struct [`TrackerConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `SHIPTRACK_API_KEY` e `SHIPTRACK_API_URL` têm
//! precedência sobre o arquivo; flags da CLI têm precedência sobre ambas.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::catalog::{CandidateCatalog, CandidateProvider};
use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::tracking::{CandidateId, Category, PollConfig};

pub const DEFAULT_CONFIG_FILE: &str = "shiptrack.toml";
pub const ENV_API_KEY: &str = "SHIPTRACK_API_KEY";
pub const ENV_API_URL: &str = "SHIPTRACK_API_URL";

/// Configuração de nível superior carregada de `shiptrack.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// URL base da API do provedor de rastreamento.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Chave enviada no cabeçalho `x-api-key`.
    #[serde(default)]
    pub api_key: String,

    /// Intervalo fixo entre consultas, em segundos.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Máximo de consultas por job antes do timeout.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Se erros de transporte consomem tentativas de consulta.
    #[serde(default = "default_count_transport_errors")]
    pub count_transport_errors: bool,

    /// Limite de erros de transporte consecutivos quando não contam como tentativa.
    #[serde(default = "default_max_transport_errors")]
    pub max_transport_errors: u32,

    /// Orçamento total de uma busca em modo auto-detect, em segundos.
    #[serde(default)]
    pub search_budget_secs: Option<u64>,

    /// Candidatos testados ao mesmo tempo. Apenas 1 é suportado.
    #[serde(default = "default_trial_concurrency")]
    pub trial_concurrency: u32,

    /// Timeout de cada requisição HTTP, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Substitui o catálogo embutido de transportadoras quando não vazio.
    #[serde(default)]
    pub carriers: Vec<CarrierEntry>,
}

/// Entrada `[[carriers]]` do arquivo de configuração.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CarrierEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Categorias atendidas; vazio significa todas.
    #[serde(default)]
    pub categories: Vec<Category>,
}

fn default_api_url() -> String {
    "http://localhost:8080/v1".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    15
}

fn default_count_transport_errors() -> bool {
    true
}

fn default_max_transport_errors() -> u32 {
    15
}

fn default_trial_concurrency() -> u32 {
    1
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
            count_transport_errors: default_count_transport_errors(),
            max_transport_errors: default_max_transport_errors(),
            search_budget_secs: None,
            trial_concurrency: default_trial_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            carriers: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Carrega a configuração de `path`, ou de `shiptrack.toml` no diretório atual.
    ///
    /// Um caminho explícito precisa existir; o arquivo padrão é opcional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Aplica as variáveis de ambiente lidas por `lookup`. Valores vazios são ignorados.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.api_key = key;
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if !self.count_transport_errors && self.max_transport_errors == 0 {
            return Err(ConfigError::Invalid(
                "max_transport_errors must be at least 1".into(),
            ));
        }
        if self.trial_concurrency != 1 {
            return Err(ConfigError::Invalid(format!(
                "trial_concurrency {} is not supported, carriers are tried one at a time",
                self.trial_concurrency
            )));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url must not be empty".into()));
        }
        if let Some(entry) = self.carriers.iter().find(|c| c.id.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "carrier entry {entry:?} has an empty id"
            )));
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_attempts,
            count_transport_errors: self.count_transport_errors,
            max_transport_errors: self.max_transport_errors,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll: self.poll_config(),
            search_budget: self.search_budget_secs.map(Duration::from_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Catálogo configurado, ou o embutido quando `[[carriers]]` está ausente.
    pub fn catalog(&self) -> CandidateCatalog {
        if self.carriers.is_empty() {
            return CandidateCatalog::builtin();
        }
        let providers = self
            .carriers
            .iter()
            .map(|entry| {
                let id = CandidateId::new(entry.id.as_str());
                let categories = if entry.categories.is_empty() {
                    Category::ALL.to_vec()
                } else {
                    entry.categories.clone()
                };
                let name = entry.name.clone().unwrap_or_else(|| id.to_string());
                CandidateProvider {
                    id,
                    display_name: name,
                    categories,
                }
            })
            .collect();
        CandidateCatalog::new(providers)
    }
}
