//! Wire types for the BARcode API.
//!
//! Field names are camelCase on the wire.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_impersonate: Option<bool>,
}

/// Sharing regime governing a specimen's offspring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rules {
    /// Don't Break The Chain: offspring must be passed on.
    Dbtc,
    /// Pay It Forward.
    Pif,
    #[default]
    Private,
}

impl Rules {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rules::Dbtc => "dbtc",
            Rules::Pif => "pif",
            Rules::Private => "private",
        }
    }
}

impl fmt::Display for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragStatus {
    Alive,
    Dead,
    Transferred,
}

/// Light and flow requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "LOW",
            Level::Medium => "MEDIUM",
            Level::High => "HIGH",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Hardiness {
    Easy,
    #[default]
    Moderate,
    Difficult,
    Expert,
}

impl Hardiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hardiness::Easy => "EASY",
            Hardiness::Moderate => "MODERATE",
            Hardiness::Difficult => "DIFFICULT",
            Hardiness::Expert => "EXPERT",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrowthRate {
    Slow,
    #[default]
    Moderate,
    Fast,
}

impl GrowthRate {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthRate::Slow => "SLOW",
            GrowthRate::Moderate => "MODERATE",
            GrowthRate::Fast => "FAST",
        }
    }
}

/// A coral fragment owned by a member.
///
/// Condition fields are kept as strings because older records carry values
/// outside the form's vocabulary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frag {
    pub frag_id: u64,
    pub name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(rename = "type")]
    pub frag_type: String,
    pub rules: Rules,
    pub status: FragStatus,
    pub is_alive: bool,
    #[serde(default)]
    pub is_static: Option<bool>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub date_acquired: String,
    #[serde(default)]
    pub source: Option<String>,

    pub light: String,
    pub flow: String,
    pub hardiness: String,
    pub growth_rate: String,

    pub owner: User,
    pub owns_it: bool,
    #[serde(default)]
    pub has_one: Option<bool>,

    pub mother_id: u64,
    #[serde(default)]
    pub frag_of: Option<u64>,

    #[serde(default)]
    pub frags_available: u32,
    #[serde(default)]
    pub other_frags_available: Option<u32>,

    #[serde(default)]
    pub fan_count: Option<u32>,
    #[serde(default)]
    pub is_fan: Option<bool>,

    #[serde(default)]
    pub thread_url: Option<String>,
    #[serde(default)]
    pub in_collection: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tank {
    pub tank_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub owner: User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    InUse,
    Maintenance,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    pub item_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub owner: User,
    pub status: EquipmentStatus,
    #[serde(default)]
    pub current_holder: Option<User>,
    #[serde(default)]
    pub queue_length: Option<u32>,
    #[serde(default)]
    pub in_line: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketListing {
    pub listing_id: u64,
    pub frag: Frag,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub seller: User,
    pub status: ListingStatus,
    pub created_at: String,
}

/// How the collection view lays out frags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionView {
    Cards,
    Gallery,
}

impl CollectionView {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionView::Cards => "cards",
            CollectionView::Gallery => "gallery",
        }
    }
}

/// User preferences. Unknown keys are preserved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub your_collection_view: Option<CollectionView>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One preference write: `PUT /user/settings/:key/:value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingUpdate {
    pub key: String,
    pub value: String,
}

impl SettingUpdate {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        SettingUpdate {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn collection_view(view: CollectionView) -> Self {
        SettingUpdate::new("yourCollectionView", view.as_str())
    }
}

// ============================================================================
// Response envelopes
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub user: User,
    #[serde(default)]
    pub frags: Vec<Frag>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonateResponse {
    pub name: String,
    pub can_impersonate: bool,
    pub impersonating: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragLineageNode {
    pub frag_id: u64,
    pub text: String,
    pub owner: User,
    pub is_alive: bool,
    #[serde(default)]
    pub is_source: Option<bool>,
    #[serde(default)]
    pub original: Option<bool>,
    #[serde(default)]
    pub date_acquired: String,
    #[serde(default)]
    pub children: Vec<FragLineageNode>,
}

impl FragLineageNode {
    /// Nodes in this subtree, root included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(FragLineageNode::size).sum::<usize>()
    }

    /// Nodes in this subtree that are still alive.
    pub fn alive_count(&self) -> usize {
        usize::from(self.is_alive)
            + self
                .children
                .iter()
                .map(FragLineageNode::alive_count)
                .sum::<usize>()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragTreeResponse {
    pub root: FragLineageNode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragKidsResponse {
    #[serde(default)]
    pub frags: Vec<Frag>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanResponse {
    pub is_fan: bool,
    pub likes: u32,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareResponse {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragType {
    #[serde(rename = "type")]
    pub frag_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumsResponse {
    #[serde(default)]
    pub types: Vec<FragType>,
    #[serde(default)]
    pub market: bool,
}

/// `["frag", fragId]`: one frag picked out of the collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragDetail {
    pub frag: Frag,
    pub user: User,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub member: User,
    #[serde(default)]
    pub frags: Vec<Frag>,
    #[serde(default)]
    pub tanks: Vec<Tank>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MembersResponse {
    #[serde(default)]
    pub members: Vec<User>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TanksResponse {
    #[serde(default)]
    pub tanks: Vec<Tank>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TankResponse {
    pub tank: Tank,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentListResponse {
    #[serde(default)]
    pub items: Vec<EquipmentItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDetail {
    pub item: EquipmentItem,
    /// Queue entries; shape is owned by the server.
    #[serde(default)]
    pub queue: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketResponse {
    #[serde(default)]
    pub listings: Vec<MarketListing>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub frag_type: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_frags: u64,
    pub total_members: u64,
    pub dbtc_frags: u64,
    pub pif_frags: u64,
    pub private_frags: u64,
    pub alive_frags: u64,
    #[serde(default)]
    pub top_types: Vec<TypeCount>,
}

// ============================================================================
// Client-side filtering
// ============================================================================

/// Collection view filter. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Exact coral type.
    pub frag_type: Option<String>,
    pub collection: Option<Rules>,
    /// When `Some(true)`, only living frags.
    pub alive: Option<bool>,
}

impl FragFilter {
    /// The view's initial filter: living frags only.
    pub fn alive_only() -> Self {
        FragFilter {
            alive: Some(true),
            ..FragFilter::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.frag_type.is_none() && self.collection.is_none() && self.alive.is_none()
    }

    pub fn matches(&self, frag: &Frag) -> bool {
        if let Some(name) = &self.name {
            if !frag.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(frag_type) = &self.frag_type {
            if &frag.frag_type != frag_type {
                return false;
            }
        }
        if let Some(rules) = self.collection {
            if frag.rules != rules {
                return false;
            }
        }
        if self.alive == Some(true) && !frag.is_alive {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, frags: &'a [Frag]) -> Vec<&'a Frag> {
        frags.iter().filter(|f| self.matches(f)).collect()
    }
}

// ============================================================================
// Save-frag form
// ============================================================================

/// Image selected for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        ImageUpload {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read an image from disk, guessing its MIME type from the extension.
    ///
    /// # Errors
    /// Returns `Error::Validation` for a path without a file name, or the I/O error.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Validation {
                status: 0,
                message: format!("not a file: {}", path.display()),
            })?
            .to_string();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(ImageUpload::new(file_name, mime, bytes))
    }
}

/// Add/edit coral form, posted as multipart to `/dbtc/add`.
#[derive(Clone, Debug, PartialEq)]
pub struct FragForm {
    pub name: String,
    pub frag_type: String,
    pub rules: Rules,
    pub light: Level,
    pub flow: Level,
    pub hardiness: Hardiness,
    pub growth_rate: GrowthRate,
    pub scientific_name: Option<String>,
    pub source: Option<String>,
    pub date_acquired: Option<String>,
    pub notes: Option<String>,
    /// Present when editing an existing frag.
    pub frag_id: Option<u64>,
    pub picture: Option<ImageUpload>,
}

impl FragForm {
    /// New form with the view's defaults (private, medium light/flow, moderate).
    pub fn new(name: impl Into<String>, frag_type: impl Into<String>) -> Self {
        FragForm {
            name: name.into(),
            frag_type: frag_type.into(),
            rules: Rules::default(),
            light: Level::default(),
            flow: Level::default(),
            hardiness: Hardiness::default(),
            growth_rate: GrowthRate::default(),
            scientific_name: None,
            source: None,
            date_acquired: None,
            notes: None,
            frag_id: None,
            picture: None,
        }
    }

    /// Pre-fill an edit form from an existing frag.
    ///
    /// Condition values outside the form vocabulary fall back to defaults.
    pub fn edit(frag: &Frag) -> Self {
        let level = |s: &str| match s {
            "LOW" => Level::Low,
            "HIGH" => Level::High,
            _ => Level::Medium,
        };
        let hardiness = match frag.hardiness.as_str() {
            "EASY" => Hardiness::Easy,
            "DIFFICULT" => Hardiness::Difficult,
            "EXPERT" => Hardiness::Expert,
            _ => Hardiness::Moderate,
        };
        let growth_rate = match frag.growth_rate.as_str() {
            "SLOW" => GrowthRate::Slow,
            "FAST" => GrowthRate::Fast,
            _ => GrowthRate::Moderate,
        };
        FragForm {
            name: frag.name.clone(),
            frag_type: frag.frag_type.clone(),
            rules: frag.rules,
            light: level(&frag.light),
            flow: level(&frag.flow),
            hardiness,
            growth_rate,
            scientific_name: frag.scientific_name.clone(),
            source: frag.source.clone(),
            date_acquired: Some(frag.date_acquired.clone()),
            notes: frag.notes.clone(),
            frag_id: Some(frag.frag_id),
            picture: None,
        }
    }

    /// Client-side checks matching the form's required fields.
    ///
    /// # Errors
    /// Returns `Error::Validation` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation {
                status: 0,
                message: "Name is required".to_string(),
            });
        }
        if self.frag_type.trim().is_empty() {
            return Err(Error::Validation {
                status: 0,
                message: "Type is required".to_string(),
            });
        }
        Ok(())
    }

    /// Text fields in submission order; empty optionals are omitted.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("type", self.frag_type.clone()),
            ("rules", self.rules.as_str().to_string()),
            ("light", self.light.as_str().to_string()),
            ("flow", self.flow.as_str().to_string()),
            ("hardiness", self.hardiness.as_str().to_string()),
            ("growthRate", self.growth_rate.as_str().to_string()),
        ];
        let optional = [
            ("scientificName", &self.scientific_name),
            ("source", &self.source),
            ("dateAcquired", &self.date_acquired),
            ("notes", &self.notes),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                fields.push((name, value.clone()));
            }
        }
        if let Some(id) = self.frag_id {
            fields.push(("fragId", id.to_string()));
        }
        fields
    }

    /// Build the multipart body.
    ///
    /// # Errors
    /// Returns `Error::Config` if the picture's MIME type is malformed.
    pub fn to_multipart(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields() {
            form = form.text(name, value);
        }
        if let Some(picture) = &self.picture {
            let part = reqwest::multipart::Part::bytes(picture.bytes.clone())
                .file_name(picture.file_name.clone())
                .mime_str(&picture.mime)?;
            form = form.part("picture", part);
        }
        Ok(form)
    }
}

/// Free-text problem report for one frag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OopsReport {
    pub frag_id: u64,
    pub notes: String,
}
