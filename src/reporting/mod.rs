//! Probe report generation
//!
//! Writes the two result partitions to a spreadsheet-compatible CSV
//! file, merged back into dispatch order.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::probe::ResultPartitions;

/// Report metadata
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    /// Target URL the probe ran against
    pub target: String,
    /// Report generation time
    pub generated_at: DateTime<Utc>,
}

impl ReportMetadata {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// Generate CSV report
pub fn render_csv(metadata: &ReportMetadata, partitions: &ResultPartitions) -> String {
    let mut csv = String::new();

    let _ = writeln!(csv, "# target: {}", metadata.target);
    let _ = writeln!(csv, "# generated: {}", metadata.generated_at.to_rfc3339());
    csv.push_str("Seq,Candidate,Verdict,Status,Length\n");

    for result in partitions.candidates_in_order() {
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            result.seq,
            csv_escape(&result.candidate),
            result.verdict.as_str(),
            result.response.status,
            result.response.size,
        );
    }

    csv
}

/// Write CSV report to a file
pub fn write_csv(
    metadata: &ReportMetadata,
    partitions: &ResultPartitions,
    path: &Path,
) -> Result<()> {
    std::fs::write(path, render_csv(metadata, partitions))
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    tracing::info!(path = %path.display(), results = partitions.total(), "wrote probe report");
    Ok(())
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ProbeRequest, ProbeResponse};
    use crate::probe::{ProbeResult, Verdict};

    fn partitions() -> ResultPartitions {
        let mut partitions = ResultPartitions::new();
        for (seq, candidate, verdict) in [
            (0, "A", Verdict::Success),
            (1, "B", Verdict::Failure),
            (2, "a,b", Verdict::Success),
        ] {
            partitions.push(ProbeResult {
                seq,
                candidate: candidate.to_string(),
                verdict,
                response: ProbeResponse::new(200, "OK", b"body".to_vec()),
                sent_request: ProbeRequest::new("POST", "http://target.local/login"),
            });
        }
        partitions
    }

    #[test]
    fn rows_follow_dispatch_order() {
        let csv = render_csv(&ReportMetadata::new("http://target.local"), &partitions());
        let rows: Vec<&str> = csv.lines().skip(3).collect();
        assert_eq!(rows[0], "0,A,success,200,4");
        assert_eq!(rows[1], "1,B,failed,200,4");
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        let csv = render_csv(&ReportMetadata::new("http://target.local"), &partitions());
        assert!(csv.contains("\"a,b\""));
    }

    #[test]
    fn escape_doubles_embedded_quotes() {
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("plain"), "plain");
    }
}
