//! Tipos de dados para requisições e respostas da API de rastreamento.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON.
//! Os campos de [`JobSnapshot`] são opcionais: o provedor omite o que não tem.

use serde::{Deserialize, Serialize};

use crate::tracking::Category;

/// Marcador de job ainda em processamento.
pub const STATUS_IN_PROGRESS: &str = "in-progress";
/// Marcador de job concluído com sucesso.
pub const STATUS_SUCCEEDED: &str = "succeeded";
/// Marcador de job concluído com falha.
pub const STATUS_FAILED: &str = "failed";

/// Corpo da requisição `POST /trackings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    /// Número do contêiner, BL ou booking.
    pub reference: String,
    /// Categoria da referência.
    pub category: Category,
    /// Identificador do armador no catálogo.
    pub provider: String,
}

/// Resposta de `POST /trackings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobResponse {
    /// Identificador do job atribuído pelo provedor.
    pub id: String,
}

/// Corpo de erro retornado pelo provedor (formato livre).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Estado atual de um job remoto, retornado por `GET /trackings/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Um de `in-progress`, `succeeded` ou `failed`.
    #[serde(default)]
    pub status: Option<String>,
    /// Detalhe textual da falha, quando houver.
    #[serde(default)]
    pub exception: Option<String>,
    /// Objeto de rastreamento bruto; a projeção tolera campos ausentes.
    #[serde(default)]
    pub tracking: Option<serde_json::Value>,
}

/// Status remoto interpretado a partir de [`JobSnapshot::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    InProgress,
    Succeeded,
    Failed,
    Unrecognized,
}

impl JobSnapshot {
    /// Interpreta o marcador de status; valores desconhecidos viram `Unrecognized`.
    pub fn remote_status(&self) -> RemoteStatus {
        match self.status.as_deref() {
            Some(STATUS_IN_PROGRESS) => RemoteStatus::InProgress,
            Some(STATUS_SUCCEEDED) => RemoteStatus::Succeeded,
            Some(STATUS_FAILED) => RemoteStatus::Failed,
            _ => RemoteStatus::Unrecognized,
        }
    }

    /// Objeto de rastreamento, ignorando `null` e valores que não são objetos.
    pub fn tracking_object(&self) -> Option<&serde_json::Value> {
        self.tracking.as_ref().filter(|t| t.is_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_wire_category() {
        let req = CreateJobRequest {
            reference: "MSCU1234567".into(),
            category: Category::BillOfLading,
            provider: "MSC".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["category"], "bill_of_lading");
        assert_eq!(json["provider"], "MSC");
    }

    #[test]
    fn snapshot_deserializes_from_api_format() {
        let api_json = r#"{
            "status": "failed",
            "exception": "Container not found at carrier",
            "tracking": null
        }"#;
        let snap: JobSnapshot = serde_json::from_str(api_json).unwrap();
        assert_eq!(snap.remote_status(), RemoteStatus::Failed);
        assert_eq!(snap.exception.as_deref(), Some("Container not found at carrier"));
        assert!(snap.tracking_object().is_none());
    }

    #[test]
    fn snapshot_tolerates_missing_fields() {
        let snap: JobSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snap.remote_status(), RemoteStatus::Unrecognized);
        assert!(snap.exception.is_none());
    }

    #[test]
    fn status_markers_are_exact() {
        for (raw, expected) in [
            ("in-progress", RemoteStatus::InProgress),
            ("succeeded", RemoteStatus::Succeeded),
            ("failed", RemoteStatus::Failed),
            ("in_progress", RemoteStatus::Unrecognized),
            ("SUCCEEDED", RemoteStatus::Unrecognized),
        ] {
            let snap = JobSnapshot {
                status: Some(raw.into()),
                ..Default::default()
            };
            assert_eq!(snap.remote_status(), expected, "status {raw}");
        }
    }
}
