use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// One product or service line on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Decimal,
}

/// Normalized output of the OCR collaborator: one physical receipt.
///
/// Every field defaults so a partially filled record still parses; `is_boleta`
/// defaults to false, which makes an incomplete record count as "not a receipt".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    #[serde(default)]
    pub receipt_number: String,
    #[serde(default)]
    pub vendor: String,
    /// As printed/extracted (YYYY-MM-DD when the extractor behaves).
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub is_boleta: bool,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// An image selected for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanImage {
    /// Shown in progress and error messages.
    pub file_name: String,
    /// Stored on the resulting items as their receipt image.
    pub reference: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// One selected file, in selection order: its image, or why it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    Image(ScanImage),
    Unreadable { file_name: String, error: ScanError },
}

impl ScanInput {
    pub fn file_name(&self) -> &str {
        match self {
            ScanInput::Image(img) => &img.file_name,
            ScanInput::Unreadable { file_name, .. } => file_name,
        }
    }
}

impl From<ScanImage> for ScanInput {
    fn from(image: ScanImage) -> Self {
        ScanInput::Image(image)
    }
}
