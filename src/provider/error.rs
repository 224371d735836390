//! Tipos de erro para o cliente da API de rastreamento.
//!
//! Define [`ClientError`] separando a recusa explícita do provedor
//! (`CreateRejected`) das falhas de infraestrutura (rede, HTTP 5xx).
//! Usa `thiserror` para derivar `Display` e `Error`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o provedor de rastreamento.
///
/// - [`CreateRejected`](ClientError::CreateRejected): o provedor recusou criar o job
///   (ex.: referência malformada para aquele armador)
/// - [`Api`](ClientError::Api): qualquer outro erro HTTP
/// - [`Network`](ClientError::Network) / [`Transport`](ClientError::Transport):
///   falha na camada de transporte
#[derive(Debug, Error)]
pub enum ClientError {
    /// O provedor recusou explicitamente a criação do job.
    #[error("provider rejected request (status {status}): {reason}")]
    CreateRejected { status: u16, reason: String },

    /// Erro HTTP retornado pela API que não é uma recusa.
    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout, corpo inválido).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Falha de transporte sem erro `reqwest` associado.
    #[error("transport error: {0}")]
    Transport(String),

    /// URL base do provedor inválida.
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// `true` quando o provedor recusou o pedido, em vez de uma falha de infraestrutura.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::CreateRejected { .. })
    }
}
