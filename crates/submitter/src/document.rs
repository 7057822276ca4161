use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Document introducing goods into circulation, as accepted by the CRPT create endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Participant description
    pub description: Description,
    /// Document ID
    #[serde(rename = "docid")]
    pub doc_id: String,
    /// Document status
    pub doc_status: String,
    /// Document type
    pub doc_type: String,
    /// Whether the goods are imported
    pub import_request: bool,
    /// Owner tax number
    pub owner_inn: String,
    /// Participant tax number
    pub participant_inn: String,
    /// Producer tax number
    pub producer_inn: String,
    /// Production date
    pub production_date: NaiveDate,
    /// Production type
    pub production_type: String,
    /// Goods listed in the document
    pub products: Vec<Product>,
    /// Registration date
    pub reg_date: NaiveDate,
    /// Registration number
    pub reg_number: String,
}

/// Participant description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    /// Participant tax number
    pub participant_inn: String,
}

/// A single product line. Every field is optional on the wire and encoded as `null` when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Conformity document kind
    pub certificate_document: Option<String>,
    /// Conformity document date
    pub certificate_document_date: Option<NaiveDate>,
    /// Conformity document number
    pub certificate_document_number: Option<String>,
    /// Owner tax number
    pub owner_inn: Option<String>,
    /// Producer tax number
    pub producer_inn: Option<String>,
    /// Production date
    pub production_date: Option<NaiveDate>,
    /// Commodity code
    pub tnved_code: Option<String>,
    /// Unit identification code
    pub uit_code: Option<String>,
    /// Package identification code
    pub uitu_code: Option<String>,
}

impl Document {
    /// The fixture document used by the demo binary, dated `today`.
    pub fn sample(today: NaiveDate) -> Self {
        Self {
            description: Description { participant_inn: "33211".to_owned() },
            doc_id: "UUID2103-1245235".to_owned(),
            doc_status: "GOOD".to_owned(),
            doc_type: "Type".to_owned(),
            import_request: false,
            owner_inn: "888333".to_owned(),
            participant_inn: "777333111".to_owned(),
            producer_inn: "66666333111".to_owned(),
            production_date: today,
            production_type: "ttt".to_owned(),
            products: Vec::new(),
            reg_date: today,
            reg_number: "123".to_owned(),
        }
    }
}
