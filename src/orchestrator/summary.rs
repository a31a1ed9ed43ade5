use super::RunLedger;

/// Human-readable end-of-run summary: counts, then every failure and skip.
pub fn render_summary(ledger: &RunLedger) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Provisioning finished: {} step(s), {} succeeded, {} failed, {} skipped\n",
        ledger.results.len(),
        ledger.success_count(),
        ledger.failures.len(),
        ledger.skipped.len()
    ));
    if !ledger.failures.is_empty() {
        out.push_str("Failed steps:\n");
        for entry in &ledger.failures {
            out.push_str(&format!("  - {} (exit {})\n", entry.name, entry.exit_code));
        }
    }
    if !ledger.skipped.is_empty() {
        out.push_str("Skipped steps:\n");
        for entry in &ledger.skipped {
            out.push_str(&format!("  - {}: {}\n", entry.name, entry.reason));
        }
    }
    out
}
