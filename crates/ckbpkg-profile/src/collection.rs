//! The device's ordered profile list

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Profile, ProfileError, ProfileId, ProfileResult};

/// Ordered set of profiles owned by one device, plus the current selection.
///
/// List order is meaningful (it is the order the user arranged) and the
/// collection is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CollectionRepr", into = "CollectionRepr")]
pub struct ProfileCollection {
    profiles: Vec<Profile>,
    current: ProfileId,
}

#[derive(Serialize, Deserialize)]
struct CollectionRepr {
    current: Option<ProfileId>,
    profiles: Vec<Profile>,
}

impl TryFrom<CollectionRepr> for ProfileCollection {
    type Error = ProfileError;

    fn try_from(repr: CollectionRepr) -> Result<Self, Self::Error> {
        let mut collection = Self::from_profiles(repr.profiles)?;
        if let Some(current) = repr.current
            && collection.find(current).is_some()
        {
            collection.current = current;
        }
        Ok(collection)
    }
}

impl From<ProfileCollection> for CollectionRepr {
    fn from(collection: ProfileCollection) -> Self {
        Self {
            current: Some(collection.current),
            profiles: collection.profiles,
        }
    }
}

impl Default for ProfileCollection {
    fn default() -> Self {
        Self::new(Profile::new(crate::DEFAULT_PROFILE))
    }
}

impl ProfileCollection {
    /// Start a collection with a single profile, which becomes current.
    pub fn new(first: Profile) -> Self {
        Self {
            current: first.id(),
            profiles: vec![first],
        }
    }

    /// Build a collection from a list; the first profile becomes current.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::LastProfile`] for an empty list and
    /// [`ProfileError::DuplicateId`] if two profiles share an id.
    pub fn from_profiles(profiles: Vec<Profile>) -> ProfileResult<Self> {
        Self::check_unique(&profiles)?;
        let current = profiles
            .first()
            .map(Profile::id)
            .ok_or(ProfileError::LastProfile)?;
        Ok(Self { profiles, current })
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn ids(&self) -> Vec<ProfileId> {
        self.profiles.iter().map(Profile::id).collect()
    }

    pub fn find(&self, id: ProfileId) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id() == id)
    }

    pub fn index_of(&self, id: ProfileId) -> Option<usize> {
        self.profiles.iter().position(|p| p.id() == id)
    }

    pub fn current_id(&self) -> ProfileId {
        self.current
    }

    pub fn current(&self) -> Option<&Profile> {
        self.find(self.current)
    }

    /// Make `id` the current profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] if no profile has that id.
    pub fn set_current(&mut self, id: ProfileId) -> ProfileResult<()> {
        self.require_index(id)?;
        self.current = id;
        Ok(())
    }

    /// Append a fresh, empty profile and select it.
    pub fn create(&mut self, name: &str) -> ProfileId {
        let profile = Profile::new(name);
        let id = profile.id();
        debug!(profile_id = %id, name = profile.name(), "Creating profile");
        self.profiles.push(profile);
        self.current = id;
        id
    }

    /// Rename a profile and return the normalized name actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] if no profile has that id.
    pub fn rename(&mut self, id: ProfileId, name: &str) -> ProfileResult<&str> {
        let index = self.require_index(id)?;
        let profile = self
            .profiles
            .get_mut(index)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        profile.set_name(name);
        Ok(profile.name())
    }

    /// Copy a profile under a new id, insert it right after the original and
    /// select it.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] if no profile has that id.
    pub fn duplicate(&mut self, id: ProfileId) -> ProfileResult<ProfileId> {
        let index = self.require_index(id)?;
        let copy = self
            .profiles
            .get(index)
            .map(Profile::duplicate)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        let new_id = copy.id();
        self.profiles.insert(index.saturating_add(1), copy);
        self.current = new_id;
        debug!(source = %id, profile_id = %new_id, "Duplicated profile");
        Ok(new_id)
    }

    /// Remove a profile. If it was current, the profile that moved into its
    /// slot (or the last one) becomes current.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::LastProfile`] when only one profile remains and
    /// [`ProfileError::NotFound`] for an unknown id.
    pub fn delete(&mut self, id: ProfileId) -> ProfileResult<Profile> {
        let index = self.require_index(id)?;
        if self.profiles.len() <= 1 {
            return Err(ProfileError::LastProfile);
        }
        let removed = self.profiles.remove(index);
        if self.current == id {
            let next = self
                .profiles
                .get(index)
                .or_else(|| self.profiles.last())
                .map(Profile::id)
                .ok_or(ProfileError::LastProfile)?;
            self.current = next;
        }
        debug!(profile_id = %id, "Deleted profile");
        Ok(removed)
    }

    /// Move a profile one slot towards the front. No-op at the front.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] for an unknown id.
    pub fn move_up(&mut self, id: ProfileId) -> ProfileResult<usize> {
        let index = self.require_index(id)?;
        if index == 0 {
            return Ok(index);
        }
        let target = index.saturating_sub(1);
        self.profiles.swap(index, target);
        Ok(target)
    }

    /// Move a profile one slot towards the back. No-op at the back.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] for an unknown id.
    pub fn move_down(&mut self, id: ProfileId) -> ProfileResult<usize> {
        let index = self.require_index(id)?;
        let target = index.saturating_add(1);
        if target >= self.profiles.len() {
            return Ok(index);
        }
        self.profiles.swap(index, target);
        Ok(target)
    }

    /// Rebuild the order from `order`. Unknown and repeated ids are ignored;
    /// profiles missing from `order` keep their relative order at the end.
    pub fn reorder(&mut self, order: &[ProfileId]) {
        let mut remaining = std::mem::take(&mut self.profiles);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in order {
            if let Some(pos) = remaining.iter().position(|p| p.id() == *id) {
                reordered.push(remaining.remove(pos));
            }
        }
        reordered.append(&mut remaining);
        self.profiles = reordered;
    }

    /// Replace the whole list in one assignment. The current selection is kept
    /// if it survives, otherwise the first profile is selected.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::LastProfile`] for an empty list and
    /// [`ProfileError::DuplicateId`] if two profiles share an id. The
    /// collection is left untouched on error.
    pub fn replace_profiles(&mut self, profiles: Vec<Profile>) -> ProfileResult<()> {
        Self::check_unique(&profiles)?;
        let fallback = profiles
            .first()
            .map(Profile::id)
            .ok_or(ProfileError::LastProfile)?;
        let keep_current = profiles.iter().any(|p| p.id() == self.current);
        self.profiles = profiles;
        if !keep_current {
            self.current = fallback;
        }
        Ok(())
    }

    /// Look a profile up by GUID text, or else by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] when nothing matches and
    /// [`ProfileError::Ambiguous`] when several profiles carry that name.
    pub fn resolve(&self, reference: &str) -> ProfileResult<&Profile> {
        if let Ok(id) = ProfileId::parse(reference)
            && let Some(profile) = self.find(id)
        {
            return Ok(profile);
        }

        let wanted = reference.trim().to_lowercase();
        let mut matches = self
            .profiles
            .iter()
            .filter(|p| p.name().to_lowercase() == wanted);
        match (matches.next(), matches.next()) {
            (Some(profile), None) => Ok(profile),
            (Some(_), Some(_)) => Err(ProfileError::Ambiguous(reference.to_string())),
            (None, _) => Err(ProfileError::NotFound(reference.to_string())),
        }
    }

    fn require_index(&self, id: ProfileId) -> ProfileResult<usize> {
        self.index_of(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    fn check_unique(profiles: &[Profile]) -> ProfileResult<()> {
        let mut seen = std::collections::HashSet::with_capacity(profiles.len());
        for profile in profiles {
            if !seen.insert(profile.id()) {
                return Err(ProfileError::DuplicateId(profile.id().to_string()));
            }
        }
        Ok(())
    }
}
