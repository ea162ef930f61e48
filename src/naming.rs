//! Name derivation and PDF content constants

/// The PDF MIME type used for admission checks
pub const PDF_MIME: &str = "application/pdf";

/// The ZIP MIME type carried by combined archive artifacts
pub const ZIP_MIME: &str = "application/zip";

/// The 4-byte signature every PDF starts with (`%PDF`)
pub const PDF_MAGIC: [u8; 4] = *b"%PDF";

/// Fixed name of the combined archive artifact
pub const ARCHIVE_NAME: &str = "Unlocked_PDFs.zip";

/// Suffix appended to every unlocked output name
const UNLOCKED_SUFFIX: &str = "_unlocked.pdf";

/// Derive the output name for an unlocked file
///
/// Strips exactly one trailing case-insensitive `.pdf` extension and appends
/// `_unlocked.pdf`. Names with no extension or with interior dots are
/// otherwise left untouched; the rule is deliberately narrow and is not
/// generalized to other extensions.
///
/// # Examples
///
/// ```
/// use pdf_unlock::naming::unlocked_name;
///
/// assert_eq!(unlocked_name("report.pdf"), "report_unlocked.pdf");
/// assert_eq!(unlocked_name("SCAN.PDF"), "SCAN_unlocked.pdf");
/// assert_eq!(unlocked_name("notes"), "notes_unlocked.pdf");
/// assert_eq!(unlocked_name("v1.2.pdf"), "v1.2_unlocked.pdf");
/// ```
pub fn unlocked_name(original: &str) -> String {
    let stem = original
        .len()
        .checked_sub(4)
        .and_then(|cut| original.get(cut..).map(|tail| (cut, tail)))
        .filter(|(_, tail)| tail.eq_ignore_ascii_case(".pdf"))
        .map_or(original, |(cut, _)| &original[..cut]);
    format!("{stem}{UNLOCKED_SUFFIX}")
}

/// Whether a byte buffer begins with the `%PDF` signature
///
/// This is a content-sniffing gate independent of the declared MIME type,
/// which is host-supplied and must not be trusted alone.
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.len() >= PDF_MAGIC.len() && bytes[..PDF_MAGIC.len()] == PDF_MAGIC
}
