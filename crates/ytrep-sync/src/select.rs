//! Canonical report selection.
//!
//! The service may regenerate a report for a period it already covered; only
//! the most recently created report per period start is kept.

use chrono::{DateTime, Utc};
use ytrep_core::ReportArtifact;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// One artifact per distinct period start, ascending by period start.
    pub canonical: Vec<ReportArtifact>,
    /// Creation time of the newest listed artifact, whichever period it covers.
    pub watermark: DateTime<Utc>,
    pub listed: usize,
}

/// `None` when nothing new was listed.
pub fn select_canonical(mut artifacts: Vec<ReportArtifact>) -> Option<Selection> {
    let watermark = artifacts.iter().map(|a| a.created_at).max()?;
    let listed = artifacts.len();

    // Stable sort: equal (period_start, created_at) keep listing order, so the
    // later-listed one ends up last and wins.
    artifacts.sort_by(|a, b| {
        a.period_start
            .cmp(&b.period_start)
            .then(a.created_at.cmp(&b.created_at))
    });

    let mut canonical: Vec<ReportArtifact> = Vec::new();
    for artifact in artifacts {
        match canonical.last_mut() {
            Some(last) if last.period_start == artifact.period_start => *last = artifact,
            _ => canonical.push(artifact),
        }
    }

    Some(Selection {
        canonical,
        watermark,
        listed,
    })
}
