//! Receipt editing: transforming a stored receipt image with a free-text instruction.

use crate::{
    core::receipt::ReceiptImage,
    errors::{Error, Result},
};
use async_trait::async_trait;

/// Something that can edit a receipt image.
#[async_trait]
pub trait ReceiptEditor: Send + Sync {
    /// Returns a new image produced from `image` according to `instruction`.
    ///
    /// Any transport or parsing problem, and an answer without an image, is reported as
    /// [`Error::Edit`].
    async fn edit(&self, image: &ReceiptImage, instruction: &str) -> Result<ReceiptImage>;
}

/// Trims the instruction and rejects an empty one.
pub fn validate_instruction(instruction: &str) -> Result<&str> {
    let trimmed = instruction.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput {
            message: "the edit instruction cannot be empty".to_string(),
        });
    }
    Ok(trimmed)
}

/// Instruction sent alongside the image to edit.
#[must_use]
pub fn edit_prompt(instruction: &str) -> String {
    format!("Edit this image: {instruction}. Return only the image.")
}

/// Validates the instruction and asks `editor` for the new image.
///
/// Nothing is stored here; the caller commits the result with
/// [`crate::core::history::apply_receipt_edit`] only once this has succeeded.
pub async fn request_edit(
    editor: &dyn ReceiptEditor,
    image: &ReceiptImage,
    instruction: &str,
) -> Result<ReceiptImage> {
    let instruction = validate_instruction(instruction)?;
    editor.edit(image, instruction).await
}
