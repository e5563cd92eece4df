//! Wire types for the portal's JSON bodies.

use serde::{Deserialize, Serialize};

/// Metadata the portal holds for a stored entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_handle_id: Option<String>,
}

/// Request body for creating a file entity from an uploaded file handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileEntity {
    pub name: String,
    pub parent_id: String,
    pub file_handle_id: String,
}

/// Receipt for raw bytes uploaded ahead of entity creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    pub id: String,
}

/// Descriptive metadata attached to a result entity. The evaluation queue
/// refuses to score a submission whose cancer code or data type is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultAnnotations {
    pub cancer: String,
    pub data_type: String,
    pub method: String,
    pub normalization: String,
    pub feature_selection: String,
    pub clinical_used: String,
}

impl ResultAnnotations {
    /// Annotations for a clinical-covariates-only model: no normalization,
    /// no feature selection.
    pub fn clinical_model(cancer: &str, method: &str) -> Self {
        Self {
            cancer: cancer.to_string(),
            data_type: "clinical".to_string(),
            method: method.to_string(),
            normalization: "None".to_string(),
            feature_selection: "None".to_string(),
            clinical_used: "Yes".to_string(),
        }
    }
}

/// Which input entities an artifact was derived from and which code entity
/// produced it, rendered as a provenance graph on the entity page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub used: Vec<String>,
    pub executed: Vec<String>,
}

/// Request body for submitting a stored entity to an evaluation queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub evaluation_id: u64,
    pub entity_id: String,
}

/// The portal's acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub id: String,
    pub evaluation_id: u64,
    pub entity_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotations_round_trip_through_json() {
        let annotations = ResultAnnotations::clinical_model("KIRC", "Aalen additive model");
        let encoded = serde_json::to_string(&annotations).unwrap();
        assert!(encoded.contains("\"dataType\":\"clinical\""));
        assert!(encoded.contains("\"featureSelection\":\"None\""));
        let decoded: ResultAnnotations = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, annotations);
    }

    #[test]
    fn provenance_round_trips_through_json() {
        let provenance = ProvenanceRecord {
            used: vec!["syn100".to_string(), "syn200".to_string()],
            executed: vec!["syn300".to_string()],
        };
        let encoded = serde_json::to_string(&provenance).unwrap();
        let decoded: ProvenanceRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, provenance);
    }

    #[test]
    fn entity_metadata_tolerates_missing_optional_fields() {
        let decoded: EntityMetadata =
            serde_json::from_str(r#"{"id":"syn42","name":"clinical.tsv"}"#).unwrap();
        assert_eq!(decoded.id, "syn42");
        assert_eq!(decoded.parent_id, None);
        assert_eq!(decoded.file_handle_id, None);
    }
}
