//! Extension discovery over one source.
//!
//! # Responsibility
//! - Produce one manifest or one skip record per candidate.
//! - Read candidates in parallel, hand results back in candidate order.
//!
//! # Invariants
//! - One bad candidate never aborts the scan.
//! - Ids are unique per run; the first candidate in traversal order wins.

use crate::extension::error::{ExtensionError, ExtensionResult, SkipRecord};
use crate::extension::manifest::{ExtensionKind, ExtensionManifest, ManifestError};
use crate::extension::source::ExtensionSource;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;

/// Result for one discovery candidate.
#[derive(Debug)]
pub enum DiscoveryOutcome {
    Found(ExtensionManifest),
    Skipped(SkipRecord),
}

/// Scans `source` for extensions of `kind`.
///
/// # Errors
/// - Returns [`ExtensionError::Source`] when the candidate list itself cannot
///   be read. Per-candidate failures become [`DiscoveryOutcome::Skipped`].
pub fn discover(
    source: &dyn ExtensionSource,
    kind: ExtensionKind,
) -> ExtensionResult<Vec<DiscoveryOutcome>> {
    let started_at = Instant::now();
    let candidates = source.list_candidates().inspect_err(|err| {
        warn!(
            "event=discover module=extension status=error kind={} location={} error={}",
            kind,
            source.location(),
            err
        );
    })?;

    // Manifest reads are independent; the indexed collect keeps list order.
    let parsed: Vec<(String, Result<ExtensionManifest, ManifestError>)> = candidates
        .into_par_iter()
        .map(|candidate| {
            let result = read_candidate(source, kind, &candidate);
            (candidate, result)
        })
        .collect();

    let mut seen = HashSet::new();
    let mut outcomes = Vec::with_capacity(parsed.len());
    for (candidate, result) in parsed {
        let reason = match result {
            Ok(manifest) if seen.insert(manifest.id.clone()) => {
                outcomes.push(DiscoveryOutcome::Found(manifest));
                continue;
            }
            Ok(manifest) => ManifestError::DuplicateId(manifest.id),
            Err(reason) => reason,
        };

        warn!(
            "event=discover_candidate module=extension status=skip kind={} candidate={} reason={}",
            kind, candidate, reason
        );
        outcomes.push(DiscoveryOutcome::Skipped(SkipRecord {
            candidate: candidate.clone(),
            error: ExtensionError::ManifestInvalid { candidate, reason },
        }));
    }

    info!(
        "event=discover module=extension status=ok kind={} location={} found={} skipped={} duration_ms={}",
        kind,
        source.location(),
        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, DiscoveryOutcome::Found(_)))
            .count(),
        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, DiscoveryOutcome::Skipped(_)))
            .count(),
        started_at.elapsed().as_millis()
    );
    Ok(outcomes)
}

/// Splits outcomes into manifests and skip records, preserving order.
pub fn partition_outcomes(
    outcomes: Vec<DiscoveryOutcome>,
) -> (Vec<ExtensionManifest>, Vec<SkipRecord>) {
    let mut manifests = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            DiscoveryOutcome::Found(manifest) => manifests.push(manifest),
            DiscoveryOutcome::Skipped(record) => skipped.push(record),
        }
    }
    (manifests, skipped)
}

fn read_candidate(
    source: &dyn ExtensionSource,
    kind: ExtensionKind,
    candidate: &str,
) -> Result<ExtensionManifest, ManifestError> {
    let file_name = kind.manifest_file();
    let bytes = source
        .read_manifest(candidate, file_name)
        .map_err(|err| ManifestError::Unreadable(err.to_string()))?
        .ok_or(ManifestError::Missing(file_name))?;
    ExtensionManifest::parse(kind, candidate, &bytes)
}
