//! Profile document model and partial-update patch.
//!
//! The wire format uses camelCase keys to match the stored documents
//! (`firstName`, `photoURL`, ...). `displayName` is always derived from the
//! name fields and is never independently editable; [`ProfilePatch`] has no
//! such field by construction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

/// Hard cap on the photo gallery.
pub const MAX_PHOTOS: usize = 15;

/// Account moderation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Blocked,
    Suspended,
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Free,
    Standard,
    Premium,
}

/// Which profiles the user wants to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestedIn {
    Male,
    Female,
    #[default]
    Both,
}

/// Inclusive age bracket for candidate matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl Default for AgeRange {
    fn default() -> Self {
        Self { min: 18, max: 50 }
    }
}

/// Matching preferences.
///
/// Supplied in a patch, this record replaces the stored one wholesale
/// (shallow merge: nested fields are not merged individually).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub interested_in: InterestedIn,
    #[validate(custom(function = "validate_age_range"))]
    pub age_range: AgeRange,
    /// Maximum candidate distance in kilometers.
    #[validate(range(min = 1))]
    pub max_distance: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            interested_in: InterestedIn::Both,
            age_range: AgeRange::default(),
            max_distance: 50,
        }
    }
}

fn validate_age_range(range: &AgeRange) -> Result<(), ValidationError> {
    if range.min < 18 {
        return Err(ValidationError::new("age_range_underage"));
    }
    if range.max < range.min {
        return Err(ValidationError::new("age_range_inverted"));
    }
    Ok(())
}

/// One user's account and dating-profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Opaque identity, assigned at registration, immutable.
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Always `first_name + " " + last_name`; recomputed on every name change.
    pub display_name: String,
    /// Mirror of `photos[0]` when the gallery is non-empty.
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Ordered gallery; `photos[0]` is the canonical profile photo.
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub preferences: Preferences,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,

    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default)]
    pub account_type: AccountType,

    /// Forward-compatibility bag for fields this version does not model.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

/// Derive the display name from its parts.
pub fn display_name_for(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .trim()
        .to_string()
}

impl UserProfile {
    /// Fresh profile with documented creation defaults: active/free account,
    /// interested-in-both 18 to 50 within 50 km, empty interests and photos.
    pub fn new(
        uid: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let first_name = first_name.into();
        let last_name = last_name.into();
        let display_name = display_name_for(&first_name, &last_name);

        Self {
            uid: uid.into(),
            email: email.into(),
            first_name,
            last_name,
            display_name,
            photo_url: None,
            gender: None,
            date_of_birth: None,
            bio: None,
            location: None,
            interests: Vec::new(),
            photos: Vec::new(),
            preferences: Preferences::default(),
            created_at: now,
            updated_at: now,
            last_active: now,
            account_status: AccountStatus::default(),
            account_type: AccountType::default(),
            extensions: Map::new(),
        }
    }

    /// Add or remove an interest. Returns `true` if the interest is present
    /// after the call.
    pub fn toggle_interest(&mut self, interest: &str) -> bool {
        if let Some(pos) = self.interests.iter().position(|i| i == interest) {
            self.interests.remove(pos);
            false
        } else {
            self.interests.push(interest.to_string());
            true
        }
    }
}

/// Partial profile update. Every field is optional; absent fields leave the
/// stored value untouched (shallow merge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilePatch {
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub interests: Option<Vec<String>>,
    #[validate(length(max = 15, code = "too_many_photos"))]
    pub photos: Option<Vec<String>>,
    #[validate(nested)]
    pub preferences: Option<Preferences>,
    pub account_status: Option<AccountStatus>,
    pub account_type: Option<AccountType>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

impl ProfilePatch {
    /// Shallow-merge this patch into `profile` and refresh the mutation
    /// timestamps.
    ///
    /// Upholds the document invariants: `display_name` is recomputed when
    /// either name field is present, and `photos[0]` is mirrored into
    /// `photo_url` whenever the gallery is non-empty. `preferences`, when
    /// supplied, replaces the stored record wholesale. Extension keys are
    /// merged individually (they are top-level document keys).
    pub fn apply_to(&self, profile: &mut UserProfile, now: DateTime<Utc>) {
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }

        let name_changed = self.first_name.is_some() || self.last_name.is_some();
        if let Some(first) = &self.first_name {
            profile.first_name = first.clone();
        }
        if let Some(last) = &self.last_name {
            profile.last_name = last.clone();
        }
        if name_changed {
            profile.display_name = display_name_for(&profile.first_name, &profile.last_name);
        }

        if let Some(url) = &self.photo_url {
            profile.photo_url = Some(url.clone());
        }
        if let Some(gender) = &self.gender {
            profile.gender = Some(gender.clone());
        }
        if let Some(dob) = self.date_of_birth {
            profile.date_of_birth = Some(dob);
        }
        if let Some(bio) = &self.bio {
            profile.bio = Some(bio.clone());
        }
        if let Some(location) = &self.location {
            profile.location = Some(location.clone());
        }
        if let Some(interests) = &self.interests {
            profile.interests = interests.clone();
        }
        if let Some(photos) = &self.photos {
            profile.photos = photos.clone();
        }
        if let Some(preferences) = &self.preferences {
            profile.preferences = preferences.clone();
        }
        if let Some(status) = self.account_status {
            profile.account_status = status;
        }
        if let Some(kind) = self.account_type {
            profile.account_type = kind;
        }
        if !self.extensions.is_empty() {
            profile
                .extensions
                .extend(self.extensions.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(first_photo) = profile.photos.first() {
            profile.photo_url = Some(first_photo.clone());
        }

        profile.updated_at = now;
        profile.last_active = now;
    }
}
