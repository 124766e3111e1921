//! Concrete extractor implementations and the default chain factory

mod heavy_structured;
mod pdf_text;
mod plain_text;
mod vision_ocr;

pub use heavy_structured::HeavyStructuredExtractor;
pub use pdf_text::PdfTextExtractor;
pub use plain_text::PlainTextExtractor;
pub use vision_ocr::VisionOcrExtractor;
