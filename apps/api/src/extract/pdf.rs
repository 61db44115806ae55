use anyhow::{anyhow, bail, Result};
use tracing::warn;

/// Extracts the text layer of a PDF.
///
/// Scanned or image-only documents have no text layer and are reported as a
/// failure rather than passed on as an empty resume.
pub(super) fn extract_pdf_text(data: &[u8]) -> Result<String> {
    // The decoder panics on some malformed inputs instead of returning an error.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data))
        .map_err(|_| anyhow!("the PDF structure is corrupt or unsupported"))?
        .map_err(|e| anyhow!("{e}"))?;

    if text.trim().is_empty() {
        warn!("No extractable text found in PDF ({} bytes)", data.len());
        bail!(
            "no text layer found; this appears to be a scanned or image-only PDF. \
             Please provide a text-based PDF"
        );
    }

    Ok(text)
}
