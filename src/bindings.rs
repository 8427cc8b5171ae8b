//! Bindings attached to a script at upload time.
//!
//! Each binding kind serializes itself independently into a metadata fragment
//! and, when it carries a payload that does not fit in JSON, a writer that
//! appends its own part to the multipart form.

use crate::error::{Result, WorkersError};
use reqwest::blocking::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Appends a binding's body part(s) to the upload form.
pub type BindingBodyWriter = Box<dyn FnOnce(Form) -> Result<Form> + Send>;

pub trait WorkerBinding: fmt::Debug + Send + Sync {
    /// Produce the metadata fragment for a binding declared under `name`, plus an
    /// optional writer for any extra body part.
    fn serialize(&self, name: &str) -> Result<(Value, Option<BindingBodyWriter>)>;
}

fn to_fragment<T: Serialize>(meta: &T) -> Result<Value> {
    serde_json::to_value(meta).map_err(WorkersError::Serialize)
}

/// Re-binds a value that was bound on the previously uploaded script version,
/// optionally under a different name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InheritBinding {
    pub old_name: Option<String>,
}

impl InheritBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_old_name(old_name: impl Into<String>) -> Self {
        Self {
            old_name: Some(old_name.into()),
        }
    }
}

impl WorkerBinding for InheritBinding {
    fn serialize(&self, name: &str) -> Result<(Value, Option<BindingBodyWriter>)> {
        #[derive(Serialize)]
        struct Meta<'a> {
            name: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            old_name: Option<&'a str>,
        }

        let meta = to_fragment(&Meta {
            name,
            kind: "inherit",
            old_name: self.old_name.as_deref().filter(|n| !n.is_empty()),
        })?;
        Ok((meta, None))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainTextBinding {
    pub text: String,
}

impl PlainTextBinding {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl WorkerBinding for PlainTextBinding {
    fn serialize(&self, name: &str) -> Result<(Value, Option<BindingBodyWriter>)> {
        #[derive(Serialize)]
        struct Meta<'a> {
            name: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            text: &'a str,
        }

        let meta = to_fragment(&Meta {
            name,
            kind: "plain_text",
            text: &self.text,
        })?;
        Ok((meta, None))
    }
}

/// A compiled WebAssembly module, shipped as its own `application/wasm` part
/// named after the binding.
#[derive(Clone, PartialEq, Eq)]
pub struct WasmModuleBinding {
    pub module: Vec<u8>,
}

impl WasmModuleBinding {
    pub fn new(module: impl Into<Vec<u8>>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

impl fmt::Debug for WasmModuleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmModuleBinding")
            .field("module_len", &self.module.len())
            .finish()
    }
}

impl WorkerBinding for WasmModuleBinding {
    fn serialize(&self, name: &str) -> Result<(Value, Option<BindingBodyWriter>)> {
        #[derive(Serialize)]
        struct Meta<'a> {
            name: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            part: &'a str,
        }

        let meta = to_fragment(&Meta {
            name,
            kind: "wasm_module",
            part: name,
        })?;

        let part_name = name.to_string();
        let module = self.module.clone();
        let writer: BindingBodyWriter = Box::new(move |form: Form| {
            let part = Part::bytes(module)
                .file_name(part_name.clone())
                .mime_str("application/wasm")
                .map_err(|e| WorkersError::Multipart(e.to_string()))?;
            Ok(form.part(part_name, part))
        });
        Ok((meta, Some(writer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_inherit_binding_without_old_name() {
        let (meta, writer) = InheritBinding::new().serialize("b1").unwrap();
        assert_eq!(meta, json!({ "name": "b1", "type": "inherit" }));
        assert!(writer.is_none());
    }

    #[test]
    fn test_inherit_binding_with_old_name() {
        let (meta, writer) = InheritBinding::from_old_name("old_binding_name")
            .serialize("b2")
            .unwrap();
        assert_eq!(
            meta,
            json!({ "name": "b2", "type": "inherit", "old_name": "old_binding_name" })
        );
        assert!(writer.is_none());
    }

    #[test]
    fn test_plain_text_binding() {
        let (meta, writer) = PlainTextBinding::new("hello").serialize("GREETING").unwrap();
        assert_eq!(
            meta,
            json!({ "name": "GREETING", "type": "plain_text", "text": "hello" })
        );
        assert!(writer.is_none());
    }

    #[test]
    fn test_wasm_binding_references_its_own_part() {
        let (meta, writer) = WasmModuleBinding::new(vec![0x00, 0x61, 0x73, 0x6d])
            .serialize("MODULE")
            .unwrap();
        assert_eq!(
            meta,
            json!({ "name": "MODULE", "type": "wasm_module", "part": "MODULE" })
        );
        assert!(writer.is_some());
    }
}
