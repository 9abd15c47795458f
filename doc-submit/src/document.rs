use serde::Deserialize;
use serde::Serialize;

use crate::SubmitError;

// Every wire name is spelled out so that renaming a field in Rust can never
// change the payload. Absent values go out as `null`; on input, missing and
// `null` both read back as `None`.

/// A document creation request as accepted by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "description", default)]
    pub description: Option<Description>,
    #[serde(rename = "doc_id", default)]
    pub doc_id: Option<String>,
    #[serde(rename = "doc_status", default)]
    pub doc_status: Option<String>,
    #[serde(rename = "doc_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "import_request", default)]
    pub import_request: Option<bool>,
    #[serde(rename = "owner_inn", default)]
    pub owner_inn: Option<String>,
    #[serde(rename = "participant_inn", default)]
    pub participant_inn: Option<String>,
    #[serde(rename = "producer_inn", default)]
    pub producer_inn: Option<String>,
    #[serde(rename = "production_date", default)]
    pub production_date: Option<String>,
    #[serde(rename = "production_type", default)]
    pub production_type: Option<String>,
    #[serde(rename = "products", default)]
    pub products: Option<Vec<Product>>,
    #[serde(rename = "reg_date", default)]
    pub reg_date: Option<String>,
    #[serde(rename = "reg_number", default)]
    pub reg_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "participant_inn", default)]
    pub participant_inn: Option<String>,
}

/// One labelled product within a [`Document`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "certificate_document", default)]
    pub certificate_document: Option<String>,
    #[serde(rename = "certificate_document_date", default)]
    pub certificate_document_date: Option<String>,
    #[serde(rename = "certificate_document_number", default)]
    pub certificate_document_number: Option<String>,
    #[serde(rename = "owner_inn", default)]
    pub owner_inn: Option<String>,
    #[serde(rename = "producer_inn", default)]
    pub producer_inn: Option<String>,
    #[serde(rename = "production_date", default)]
    pub production_date: Option<String>,
    #[serde(rename = "tnved_code", default)]
    pub tnved_code: Option<String>,
    #[serde(rename = "uit_code", default)]
    pub uit_code: Option<String>,
    #[serde(rename = "uitu_code", default)]
    pub uitu_code: Option<String>,
}

impl Document {
    /// Encodes the document as the JSON request body.
    pub fn to_wire(&self) -> Result<String, SubmitError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a document from its JSON wire form.
    pub fn from_wire(json: &str) -> Result<Self, SubmitError> {
        Ok(serde_json::from_str(json)?)
    }
}
