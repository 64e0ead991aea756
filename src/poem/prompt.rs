//! Request payload for the `generateContent` endpoint.
//!
//! [`PromptBuilder`] pairs the fixed instruction with the inline, base64
//! encoded picture in the shape the API expects:
//!
//! ```text
//! { "contents": [ { "parts": [ { "text": … }, { "inline_data": { "mime_type": …, "data": … } } ] } ] }
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::camera::CapturedImage;

/// Builds generation requests around a fixed instruction.
///
/// ```
/// use poetry_printer::camera::CapturedImage;
/// use poetry_printer::poem::PromptBuilder;
///
/// let builder = PromptBuilder::new("Write a Haiku about the scene in this picture.");
/// let body = builder.request_body(&CapturedImage::jpeg(vec![0xff, 0xd8]));
/// assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "/9g=");
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instruction: String,
}

impl PromptBuilder {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn request_body(&self, image: &CapturedImage) -> serde_json::Value {
        serde_json::json!({
            "contents": [
                {
                    "parts": [
                        { "text": self.instruction },
                        {
                            "inline_data": {
                                "mime_type": image.mime_type,
                                "data": STANDARD.encode(&image.bytes)
                            }
                        }
                    ]
                }
            ]
        })
    }
}
