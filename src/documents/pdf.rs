// Local PDF text extraction (lopdf)

use anyhow::Context;
use lopdf::Document;
use tracing::debug;

/// Minimum non-whitespace characters for a PDF to count as having a text layer.
pub const MIN_TEXT_LAYER_CHARS: usize = 16;

/// Extracts the text of every page, in page order.
pub fn extract_text(bytes: &[u8]) -> anyhow::Result<String> {
    let doc = Document::load_mem(bytes).context("failed to parse PDF")?;

    let mut text = String::new();
    for (page_number, _) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&page_text);
            }
            Err(e) => debug!(page = page_number, error = %e, "No extractable text on page"),
        }
    }

    Ok(text)
}

pub fn has_text_layer(text: &str) -> bool {
    text.chars().filter(|c| !c.is_whitespace()).count() >= MIN_TEXT_LAYER_CHARS
}
