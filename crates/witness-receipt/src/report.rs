use crate::verify::VerificationResult;

/// Renders the human-readable verification report.
///
/// The guarantee and non-guarantee statements are fixed text; callers print
/// them with every verdict so readers never over-trust a passing check.
pub fn build_report(result: &VerificationResult) -> Vec<String> {
    let verdict = if result.ok { "VERIFIED" } else { "REJECTED" };
    vec![
        format!("{verdict}: {}", result.reason),
        "Guarantees:".to_string(),
        "- Detects tampering for fields covered by stored hashes.".to_string(),
        "- Confirms basic structure and event counts.".to_string(),
        "Does not guarantee:".to_string(),
        "- Origin/authenticity (no signatures).".to_string(),
        "- That the model actually ran or output is correct.".to_string(),
    ]
}
