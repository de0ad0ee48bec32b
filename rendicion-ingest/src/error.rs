use thiserror::Error;

/// Failure to turn one image into receipt records. Isolated per image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("could not read image: {0}")]
    Image(String),

    /// The OCR collaborator failed; the message is meant for the user.
    #[error("{0}")]
    Extractor(String),

    #[error("unexpected response from the receipt reader: {0}")]
    Malformed(String),
}
