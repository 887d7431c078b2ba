//! Artifact extraction from engine output objects.
//!
//! Model deployments disagree on field names, so each kind accepts a short
//! list of aliases and takes the first non-empty one.

use prodgen_core::artifact::strip_data_uri_prefix;
use prodgen_core::kind::ArtifactKind;

/// Field names carrying generated text, in lookup order.
pub const TEXT_FIELDS: [&str; 2] = ["description", "text"];

/// Field names carrying a base64 image, in lookup order.
pub const IMAGE_FIELDS: [&str; 2] = ["image", "image_base64"];

pub const REPORT_RESULT_FIELDS: [&str; 1] = ["result"];
pub const REPORT_WEB_RESULTS_FIELD: &str = "web_results";

/// A generated artifact pulled out of an engine output.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineArtifact {
    Text { description: String },
    /// Raw base64, any data URI prefix already removed.
    Image { image_base64: String },
    Report { result: String, web_results: String },
}

/// First field among `names` holding a non-blank string.
pub fn first_non_empty(output: &serde_json::Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        output
            .get(name)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

/// Extract the artifact for `kind`, or `None` if the output has none.
///
/// An empty artifact counts as missing.
pub fn extract_artifact(kind: ArtifactKind, output: &serde_json::Value) -> Option<EngineArtifact> {
    match kind {
        ArtifactKind::Text => {
            first_non_empty(output, &TEXT_FIELDS).map(|description| EngineArtifact::Text { description })
        }
        ArtifactKind::Image => {
            let raw = first_non_empty(output, &IMAGE_FIELDS)?;
            let stripped = strip_data_uri_prefix(&raw);
            if stripped.is_empty() {
                return None;
            }
            Some(EngineArtifact::Image {
                image_base64: stripped.to_string(),
            })
        }
        ArtifactKind::Report => {
            let result = first_non_empty(output, &REPORT_RESULT_FIELDS)?;
            let web_results = match output.get(REPORT_WEB_RESULTS_FIELD) {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            Some(EngineArtifact::Report { result, web_results })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn either_text_field_name_yields_same_value() {
        let a = extract_artifact(ArtifactKind::Text, &json!({"description": "맛있는 빵"}));
        let b = extract_artifact(ArtifactKind::Text, &json!({"text": "맛있는 빵"}));
        assert_eq!(a, b);
        assert_eq!(
            a,
            Some(EngineArtifact::Text {
                description: "맛있는 빵".into()
            })
        );
    }

    #[test]
    fn either_image_field_name_yields_same_value() {
        let a = extract_artifact(ArtifactKind::Image, &json!({"image": "aGVsbG8="}));
        let b = extract_artifact(ArtifactKind::Image, &json!({"image_base64": "aGVsbG8="}));
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn empty_primary_field_falls_through_to_alias() {
        let got = extract_artifact(ArtifactKind::Text, &json!({"description": "", "text": "t"}));
        assert_eq!(got, Some(EngineArtifact::Text { description: "t".into() }));
    }

    #[test]
    fn image_data_uri_prefix_is_stripped() {
        let got = extract_artifact(
            ArtifactKind::Image,
            &json!({"image": "data:image/png;base64,aGVsbG8="}),
        );
        assert_eq!(
            got,
            Some(EngineArtifact::Image {
                image_base64: "aGVsbG8=".into()
            })
        );
    }

    #[test]
    fn empty_artifacts_are_missing() {
        assert_eq!(extract_artifact(ArtifactKind::Text, &json!({"description": "  "})), None);
        assert_eq!(extract_artifact(ArtifactKind::Image, &json!({})), None);
        assert_eq!(
            extract_artifact(ArtifactKind::Image, &json!({"image": "data:image/png;base64,"})),
            None
        );
        assert_eq!(extract_artifact(ArtifactKind::Report, &json!({"web_results": "x"})), None);
    }

    #[test]
    fn report_web_results_are_optional_and_stringified() {
        let plain = extract_artifact(ArtifactKind::Report, &json!({"result": "r"}));
        assert_eq!(
            plain,
            Some(EngineArtifact::Report {
                result: "r".into(),
                web_results: String::new()
            })
        );

        let structured = extract_artifact(
            ArtifactKind::Report,
            &json!({"result": "r", "web_results": [{"url": "u"}]}),
        );
        assert_eq!(
            structured,
            Some(EngineArtifact::Report {
                result: "r".into(),
                web_results: r#"[{"url":"u"}]"#.into()
            })
        );
    }
}
