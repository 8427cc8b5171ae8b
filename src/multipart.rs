use crate::bindings::BindingBodyWriter;
use crate::error::{Result, WorkersError};
use crate::types::WorkerScriptParams;
use reqwest::blocking::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;

const SCRIPT_BODY_PART: &str = "script";
const METADATA_PART: &str = "metadata";

/// A fully assembled upload body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct UploadMetadata {
    body_part: String,
    bindings: Vec<Value>,
}

/// Part name for the script source. Starts at `script` and grows until it no
/// longer collides with a binding name.
pub fn script_body_part_name(params: &WorkerScriptParams) -> String {
    let mut name = SCRIPT_BODY_PART.to_string();
    while params.bindings.contains_key(&name) {
        name.push('_');
    }
    name
}

/// Assemble the multipart body for a script upload with bindings: one
/// `metadata` JSON part, one script part, then any parts contributed by the
/// bindings themselves.
pub fn format_multipart_body(params: &WorkerScriptParams) -> Result<MultipartBody> {
    let body_part = script_body_part_name(params);

    let mut metadata = UploadMetadata {
        body_part: body_part.clone(),
        bindings: Vec::with_capacity(params.bindings.len()),
    };
    let mut body_writers: Vec<BindingBodyWriter> = Vec::new();
    for (name, binding) in &params.bindings {
        let (fragment, writer) = binding.serialize(name)?;
        if let Some(part) = fragment.get("part").and_then(Value::as_str) {
            if part == METADATA_PART || part == body_part {
                return Err(WorkersError::Multipart(format!(
                    "binding '{}' declares reserved part name '{}'",
                    name, part
                )));
            }
        }
        metadata.bindings.push(fragment);
        if let Some(writer) = writer {
            body_writers.push(writer);
        }
    }

    let metadata_json = serde_json::to_string(&metadata).map_err(WorkersError::Serialize)?;
    let metadata_part = Part::text(metadata_json)
        .mime_str("application/json")
        .map_err(|e| WorkersError::Multipart(e.to_string()))?;
    let script_part = Part::bytes(params.script.clone().into_bytes())
        .mime_str("application/javascript")
        .map_err(|e| WorkersError::Multipart(e.to_string()))?;

    let mut form = Form::new()
        .part(METADATA_PART, metadata_part)
        .part(body_part, script_part);
    for writer in body_writers {
        form = writer(form)?;
    }

    // Part names go out raw so they match the names declared in metadata.
    let form = form.percent_encode_noop();
    let content_type = format!("multipart/form-data; boundary={}", form.boundary());
    let mut body = Vec::new();
    form.into_reader().read_to_end(&mut body)?;

    Ok(MultipartBody { content_type, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{InheritBinding, PlainTextBinding, WasmModuleBinding};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn body_text(body: &MultipartBody) -> String {
        String::from_utf8_lossy(&body.body).into_owned()
    }

    #[test]
    fn test_script_part_name_defaults_to_script() {
        let params = WorkerScriptParams::new("x").with_binding("b1", InheritBinding::new());
        assert_eq!(script_body_part_name(&params), "script");
    }

    #[test]
    fn test_script_part_name_avoids_binding_names() {
        let params = WorkerScriptParams::new("x")
            .with_binding("script", InheritBinding::new())
            .with_binding("script_", InheritBinding::new())
            .with_binding("script__", PlainTextBinding::new("v"));
        let name = script_body_part_name(&params);
        assert_eq!(name, "script___");
        assert!(!params.bindings.contains_key(&name));
    }

    #[test]
    fn test_content_type_carries_boundary() {
        let params = WorkerScriptParams::new("x").with_binding("b1", InheritBinding::new());
        let body = format_multipart_body(&params).unwrap();
        let boundary = body
            .content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        assert!(!boundary.is_empty());
        assert!(body_text(&body).contains(&format!("--{}--", boundary)));
    }

    #[test]
    fn test_body_has_metadata_then_script() {
        let params = WorkerScriptParams::new("addEventListener('fetch', () => {})")
            .with_binding("b1", InheritBinding::new())
            .with_binding("b2", InheritBinding::from_old_name("old_binding_name"));
        let text = body_text(&format_multipart_body(&params).unwrap());

        let metadata_at = text.find("name=\"metadata\"").unwrap();
        let script_at = text.find("name=\"script\"").unwrap();
        assert!(metadata_at < script_at);
        assert_eq!(text.matches("name=\"metadata\"").count(), 1);
        assert_eq!(text.matches("name=\"script\"").count(), 1);
        assert!(text.contains("application/javascript"));
        assert!(text.contains("addEventListener('fetch', () => {})"));

        let bindings = json!([
            { "name": "b1", "type": "inherit" },
            { "name": "b2", "type": "inherit", "old_name": "old_binding_name" }
        ]);
        assert!(text.contains("\"body_part\":\"script\""));
        assert!(text.contains(&format!("\"bindings\":{}", bindings)));
    }

    #[test]
    fn test_binding_parts_follow_script() {
        let params = WorkerScriptParams::new("x")
            .with_binding("MODULE", WasmModuleBinding::new(b"\0asm".to_vec()));
        let text = body_text(&format_multipart_body(&params).unwrap());

        let script_at = text.find("name=\"script\"").unwrap();
        let module_at = text.find("name=\"MODULE\"").unwrap();
        assert!(script_at < module_at);
        assert!(text.contains("application/wasm"));
    }

    #[test]
    fn test_renamed_script_part_is_declared_in_metadata() {
        let params = WorkerScriptParams::new("x").with_binding("script", InheritBinding::new());
        let text = body_text(&format_multipart_body(&params).unwrap());
        assert!(text.contains("\"body_part\":\"script_\""));
        assert!(text.contains("name=\"script_\""));
    }

    #[test]
    fn test_binding_part_named_metadata_is_rejected() {
        let params = WorkerScriptParams::new("x")
            .with_binding("metadata", WasmModuleBinding::new(b"\0asm".to_vec()));
        let err = format_multipart_body(&params).unwrap_err();
        assert!(matches!(err, WorkersError::Multipart(_)));
    }

    #[test]
    fn test_inherit_binding_named_metadata_is_allowed() {
        let params = WorkerScriptParams::new("x").with_binding("metadata", InheritBinding::new());
        let text = body_text(&format_multipart_body(&params).unwrap());
        assert_eq!(text.matches("name=\"metadata\"").count(), 1);
        assert!(text.contains("\"name\":\"metadata\""));
    }

    #[test]
    fn test_part_names_are_written_raw() {
        let params = WorkerScriptParams::new("x")
            .with_binding("MY MODULE", WasmModuleBinding::new(b"\0asm".to_vec()));
        let text = body_text(&format_multipart_body(&params).unwrap());
        assert!(text.contains("name=\"MY MODULE\""));
        assert!(text.contains("\"part\":\"MY MODULE\""));
        assert!(!text.contains("name*="));
    }
}
