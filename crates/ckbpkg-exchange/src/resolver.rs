//! Conflict resolution for verified import candidates
//!
//! Candidates are applied one by one to a working copy of the profile list.
//! A candidate whose GUID is not in the working set is appended. One that
//! matches an existing profile exactly is left alone. Any other GUID match is
//! a conflict, settled by a [`ConflictPolicy`]. The caller commits the
//! finished working set in a single assignment.

use ckbpkg_profile::{Profile, ProfileId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::reader::ImportCandidate;

/// What to do with a candidate whose GUID is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDecision {
    /// Keep the existing profile, drop the candidate
    Skip,
    /// Replace the existing profile's content, keeping its GUID and position
    Overwrite,
    /// Append the candidate under a freshly generated GUID
    RenameAsNew,
}

impl fmt::Display for ConflictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::RenameAsNew => "rename",
        })
    }
}

/// A candidate colliding with a profile already in the working set
#[derive(Debug, Clone, Copy)]
pub struct Conflict<'a> {
    pub existing: &'a Profile,
    pub candidate: &'a ImportCandidate,
}

/// Source of conflict decisions.
///
/// Returning `None` means the conflict was left unresolved (for example a
/// cancelled prompt); the candidate is then skipped.
pub trait ConflictPolicy {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Option<ConflictDecision>;
}

impl<F> ConflictPolicy for F
where
    F: FnMut(&Conflict<'_>) -> Option<ConflictDecision>,
{
    fn decide(&mut self, conflict: &Conflict<'_>) -> Option<ConflictDecision> {
        self(conflict)
    }
}

/// The same decision for every conflict
impl ConflictPolicy for ConflictDecision {
    fn decide(&mut self, _conflict: &Conflict<'_>) -> Option<ConflictDecision> {
        Some(*self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Declined,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeKind {
    Imported,
    Unchanged,
    Overwritten,
    RenamedAsNew { new_id: ProfileId },
    Skipped { reason: SkipReason },
}

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// GUID as found in the archive
    pub id: ProfileId,
    pub name: String,
    pub base_name: String,
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

impl ImportOutcome {
    /// Whether this outcome changes the profile set
    pub fn is_change(&self) -> bool {
        matches!(
            self.kind,
            OutcomeKind::Imported | OutcomeKind::Overwritten | OutcomeKind::RenamedAsNew { .. }
        )
    }
}

/// Working set after all candidates were applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub profiles: Vec<Profile>,
    pub outcomes: Vec<ImportOutcome>,
}

impl Resolution {
    pub fn has_changes(&self) -> bool {
        self.outcomes.iter().any(ImportOutcome::is_change)
    }
}

/// Applies candidates against a profile list
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportResolver;

impl ImportResolver {
    /// Resolve `candidates` in order against `current`.
    ///
    /// Never fails. `current` itself is not touched.
    pub fn resolve(
        current: &[Profile],
        candidates: Vec<ImportCandidate>,
        policy: &mut dyn ConflictPolicy,
    ) -> Resolution {
        let mut working = current.to_vec();
        let mut outcomes = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let id = candidate.id();
            let kind = match working.iter().position(|p| p.id() == id) {
                None => {
                    working.push(candidate.profile.clone());
                    OutcomeKind::Imported
                }
                Some(index) => Self::resolve_conflict(&mut working, index, &candidate, policy),
            };

            debug!(
                id = %id,
                name = %candidate.name(),
                outcome = ?kind,
                "Candidate resolved"
            );
            outcomes.push(ImportOutcome {
                id,
                name: candidate.name().to_string(),
                base_name: candidate.base_name.clone(),
                kind,
            });
        }

        let resolution = Resolution {
            profiles: working,
            outcomes,
        };
        info!(
            candidates = resolution.outcomes.len(),
            changed = resolution.outcomes.iter().filter(|o| o.is_change()).count(),
            "Import resolved"
        );
        resolution
    }

    fn resolve_conflict(
        working: &mut Vec<Profile>,
        index: usize,
        candidate: &ImportCandidate,
        policy: &mut dyn ConflictPolicy,
    ) -> OutcomeKind {
        let decision = match working.get(index) {
            Some(existing) if *existing == candidate.profile => return OutcomeKind::Unchanged,
            Some(existing) => policy.decide(&Conflict {
                existing,
                candidate,
            }),
            None => None,
        };

        match decision {
            None => {
                debug!(id = %candidate.id(), "Conflict left unresolved, skipping");
                OutcomeKind::Skipped {
                    reason: SkipReason::Unresolved,
                }
            }
            Some(ConflictDecision::Skip) => OutcomeKind::Skipped {
                reason: SkipReason::Declined,
            },
            Some(ConflictDecision::Overwrite) => {
                if let Some(slot) = working.get_mut(index) {
                    *slot = candidate.profile.clone();
                }
                OutcomeKind::Overwritten
            }
            Some(ConflictDecision::RenameAsNew) => {
                let new_id = fresh_id(working);
                working.push(candidate.profile.clone().reassigned(new_id));
                OutcomeKind::RenamedAsNew { new_id }
            }
        }
    }
}

fn fresh_id(working: &[Profile]) -> ProfileId {
    loop {
        let id = ProfileId::generate();
        if !working.iter().any(|p| p.id() == id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{IniProfileSerializer, ProfileSerializer};
    use crate::integrity::IntegrityStamper;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn candidate(profile: &Profile) -> ImportCandidate {
        let document = IniProfileSerializer.serialize(profile);
        ImportCandidate {
            base_name: "ckbprofile0".to_string(),
            digest: IntegrityStamper::digest(&document.to_bytes()),
            document,
            profile: profile.clone(),
        }
    }

    fn existing_set() -> Result<(Profile, Profile), Box<dyn std::error::Error>> {
        let a = Profile::new("A").with_field("k", "a")?;
        let b = Profile::new("B").with_field("k", "b")?;
        Ok((a, b))
    }

    #[test]
    fn test_new_candidate_is_appended() -> TestResult {
        let (a, b) = existing_set()?;
        let c = Profile::new("C");
        let resolution =
            ImportResolver::resolve(&[a.clone(), b.clone()], vec![candidate(&c)], &mut ConflictDecision::Skip);
        assert_eq!(resolution.profiles, vec![a, b, c]);
        assert_eq!(resolution.outcomes[0].kind, OutcomeKind::Imported);
        Ok(())
    }

    #[test]
    fn test_skip_leaves_set_identical() -> TestResult {
        let (a, b) = existing_set()?;
        let incoming = a.clone().with_field("k", "changed")?;
        let current = vec![a, b];
        let resolution =
            ImportResolver::resolve(&current, vec![candidate(&incoming)], &mut ConflictDecision::Skip);
        assert_eq!(resolution.profiles, current);
        assert!(!resolution.has_changes());
        assert_eq!(
            resolution.outcomes[0].kind,
            OutcomeKind::Skipped {
                reason: SkipReason::Declined
            }
        );
        Ok(())
    }

    #[test]
    fn test_overwrite_replaces_content_in_place() -> TestResult {
        let (a, b) = existing_set()?;
        let incoming = a.clone().with_field("k", "changed")?;
        let resolution = ImportResolver::resolve(
            &[a.clone(), b.clone()],
            vec![candidate(&incoming)],
            &mut ConflictDecision::Overwrite,
        );
        assert_eq!(resolution.profiles.len(), 2);
        assert_eq!(resolution.profiles[0].id(), a.id());
        assert_eq!(resolution.profiles[0].field("k"), Some("changed"));
        assert_eq!(resolution.profiles[1], b);
        Ok(())
    }

    #[test]
    fn test_rename_as_new_appends_under_fresh_guid() -> TestResult {
        let (a, b) = existing_set()?;
        let incoming = a.clone().with_field("k", "changed")?;
        let resolution = ImportResolver::resolve(
            &[a.clone(), b.clone()],
            vec![candidate(&incoming)],
            &mut ConflictDecision::RenameAsNew,
        );
        assert_eq!(resolution.profiles.len(), 3);
        assert_eq!(resolution.profiles[0], a);
        assert_eq!(resolution.profiles[1], b);

        let added = &resolution.profiles[2];
        assert_ne!(added.id(), a.id());
        assert_eq!(added.name(), "A");
        assert_eq!(added.field("k"), Some("changed"));
        assert_eq!(
            resolution.outcomes[0].kind,
            OutcomeKind::RenamedAsNew { new_id: added.id() }
        );
        Ok(())
    }

    #[test]
    fn test_identical_candidate_needs_no_decision() -> TestResult {
        let (a, b) = existing_set()?;
        let mut asked = 0;
        let mut policy = |_: &Conflict<'_>| {
            asked += 1;
            Some(ConflictDecision::Overwrite)
        };
        let resolution = ImportResolver::resolve(&[a.clone(), b], vec![candidate(&a)], &mut policy);
        assert_eq!(asked, 0);
        assert_eq!(resolution.outcomes[0].kind, OutcomeKind::Unchanged);
        Ok(())
    }

    #[test]
    fn test_decisions_are_per_candidate_and_unresolved_skips() -> TestResult {
        let (a, b) = existing_set()?;
        let a2 = a.clone().with_field("k", "a2")?;
        let b2 = b.clone().with_field("k", "b2")?;

        let mut policy = |conflict: &Conflict<'_>| {
            if conflict.existing.name() == "A" {
                None
            } else {
                Some(ConflictDecision::Overwrite)
            }
        };
        let resolution = ImportResolver::resolve(
            &[a.clone(), b.clone()],
            vec![candidate(&a2), candidate(&b2)],
            &mut policy,
        );

        assert_eq!(resolution.profiles[0], a);
        assert_eq!(resolution.profiles[1], b2);
        assert_eq!(
            resolution.outcomes[0].kind,
            OutcomeKind::Skipped {
                reason: SkipReason::Unresolved
            }
        );
        assert_eq!(resolution.outcomes[1].kind, OutcomeKind::Overwritten);
        Ok(())
    }

    #[test]
    fn test_same_guid_twice_in_one_archive_conflicts_with_itself() -> TestResult {
        let c = Profile::new("C");
        let c2 = c.clone().with_field("k", "second")?;
        let resolution = ImportResolver::resolve(
            &[Profile::new("A")],
            vec![candidate(&c), candidate(&c2)],
            &mut ConflictDecision::Skip,
        );
        assert_eq!(resolution.profiles.len(), 2);
        assert_eq!(resolution.outcomes[0].kind, OutcomeKind::Imported);
        assert!(matches!(resolution.outcomes[1].kind, OutcomeKind::Skipped { .. }));
        Ok(())
    }
}
