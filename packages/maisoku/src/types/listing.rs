//! Property listing schema and the listing record itself.
//!
//! The field set is fixed and versioned. Wire names are the destination
//! database's property names, so a serialized listing can be handed to the
//! publisher (and to report code) without renaming.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::field::EvidenceScoredField;

/// Version of the listing field set.
pub const SCHEMA_VERSION: u32 = 1;

/// How a field's raw value is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Digits only, parsed as an integer
    Integer {
        /// Yield 0 instead of null on parse failure
        zero_default: bool,
    },

    /// Digits and decimal point, parsed as a float
    Decimal {
        /// Yield 0 instead of null on parse failure
        zero_default: bool,
    },

    /// Trimmed string
    Text,

    /// List of tag strings
    Tags,
}

/// A field of the listing schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingField {
    PropertyName,
    Address,
    Rent,
    ManagementFee,
    FloorPlan,
    FloorArea,
    BuiltDate,
    Structure,
    Orientation,
    FloorLevel,
    DepositMonths,
    KeyMoneyMonths,
    ContractType,
    TransactionType,
    AgentName,
    PropertyType,
    Station1,
    Station1WalkMinutes,
    Station2,
    DepositNotes,
    KeyExchangeFee,
    FireInsuranceFee,
    MiscInitialCosts,
    ContractPeriod,
    RenewalFee,
    GuarantorTerms,
    MoveInDate,
    EquipmentTags,
    Ad,
    AgentPhone,
    Status,
}

impl ListingField {
    /// Every field, required fields first, in schema order.
    pub const ALL: [ListingField; 31] = [
        Self::PropertyName,
        Self::Address,
        Self::Rent,
        Self::ManagementFee,
        Self::FloorPlan,
        Self::FloorArea,
        Self::BuiltDate,
        Self::Structure,
        Self::Orientation,
        Self::FloorLevel,
        Self::DepositMonths,
        Self::KeyMoneyMonths,
        Self::ContractType,
        Self::TransactionType,
        Self::AgentName,
        Self::PropertyType,
        Self::Station1,
        Self::Station1WalkMinutes,
        Self::Station2,
        Self::DepositNotes,
        Self::KeyExchangeFee,
        Self::FireInsuranceFee,
        Self::MiscInitialCosts,
        Self::ContractPeriod,
        Self::RenewalFee,
        Self::GuarantorTerms,
        Self::MoveInDate,
        Self::EquipmentTags,
        Self::Ad,
        Self::AgentPhone,
        Self::Status,
    ];

    /// Wire name (the destination property name).
    pub fn name(self) -> &'static str {
        match self {
            Self::PropertyName => "物件名",
            Self::Address => "所在地",
            Self::Rent => "賃料",
            Self::ManagementFee => "管理費共益費",
            Self::FloorPlan => "間取り",
            Self::FloorArea => "専有面積",
            Self::BuiltDate => "築年月",
            Self::Structure => "構造",
            Self::Orientation => "向き",
            Self::FloorLevel => "所在階建",
            Self::DepositMonths => "敷金月数",
            Self::KeyMoneyMonths => "礼金月数",
            Self::ContractType => "契約形態",
            Self::TransactionType => "取引態様",
            Self::AgentName => "管理会社元付業者名",
            Self::PropertyType => "物件種別",
            Self::Station1 => "最寄り駅1",
            Self::Station1WalkMinutes => "駅1徒歩分",
            Self::Station2 => "最寄り駅2",
            Self::DepositNotes => "敷金礼金備考",
            Self::KeyExchangeFee => "鍵交換費用",
            Self::FireInsuranceFee => "火災保険料",
            Self::MiscInitialCosts => "その他初期費用合計",
            Self::ContractPeriod => "契約期間",
            Self::RenewalFee => "更新料",
            Self::GuarantorTerms => "保証会社条件",
            Self::MoveInDate => "入居時期",
            Self::EquipmentTags => "設備タグ",
            Self::Ad => "AD",
            Self::AgentPhone => "業者電話番号",
            Self::Status => "ステータス",
        }
    }

    /// Look a field up by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Whether the field must be present in every listing.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::PropertyName
                | Self::Address
                | Self::Rent
                | Self::ManagementFee
                | Self::FloorPlan
                | Self::FloorArea
                | Self::BuiltDate
                | Self::Structure
                | Self::Orientation
                | Self::FloorLevel
                | Self::DepositMonths
                | Self::KeyMoneyMonths
                | Self::ContractType
                | Self::TransactionType
                | Self::AgentName
        )
    }

    /// Normalization category.
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Rent | Self::Station1WalkMinutes => FieldKind::Integer {
                zero_default: false,
            },
            Self::ManagementFee
            | Self::KeyExchangeFee
            | Self::FireInsuranceFee
            | Self::MiscInitialCosts => FieldKind::Integer { zero_default: true },
            Self::FloorArea => FieldKind::Decimal {
                zero_default: false,
            },
            Self::DepositMonths | Self::KeyMoneyMonths => FieldKind::Decimal { zero_default: true },
            Self::EquipmentTags => FieldKind::Tags,
            _ => FieldKind::Text,
        }
    }

    /// Required fields, in schema order.
    pub fn required() -> impl Iterator<Item = ListingField> {
        Self::ALL.into_iter().filter(|f| f.is_required())
    }

    /// Optional fields, in schema order.
    pub fn optional() -> impl Iterator<Item = ListingField> {
        Self::ALL.into_iter().filter(|f| !f.is_required())
    }
}

/// A normalized property listing.
///
/// Maps wire names to evidence-scored fields, preserving insertion order.
/// Keys outside the schema are allowed and kept as pass-through values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyListing {
    fields: IndexMap<String, EvidenceScoredField>,
}

impl PropertyListing {
    /// Create an empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a schema field.
    pub fn insert(&mut self, field: ListingField, value: EvidenceScoredField) {
        self.fields.insert(field.name().to_string(), value);
    }

    /// Set a field by wire name (schema or pass-through).
    pub fn insert_named(&mut self, name: impl Into<String>, value: EvidenceScoredField) {
        self.fields.insert(name.into(), value);
    }

    /// Get a schema field.
    pub fn get(&self, field: ListingField) -> Option<&EvidenceScoredField> {
        self.fields.get(field.name())
    }

    /// Get a field by wire name.
    pub fn get_named(&self, name: &str) -> Option<&EvidenceScoredField> {
        self.fields.get(name)
    }

    /// Whether a schema field is present (possibly null).
    pub fn contains(&self, field: ListingField) -> bool {
        self.fields.contains_key(field.name())
    }

    /// Required fields not yet present.
    pub fn missing_required(&self) -> Vec<ListingField> {
        ListingField::required()
            .filter(|f| !self.contains(*f))
            .collect()
    }

    /// Insert a "not found" marker for every missing required field.
    pub fn fill_required(&mut self, page_index: usize) {
        for field in self.missing_required() {
            self.insert(
                field,
                EvidenceScoredField::not_found(
                    page_index,
                    format!("ページ{}で見つかりません", page_index + 1),
                ),
            );
        }
    }

    /// Iterate over `(wire name, field)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvidenceScoredField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the listing has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Average confidence across present fields (0.0 when empty).
    pub fn mean_confidence(&self) -> f64 {
        if self.fields.is_empty() {
            return 0.0;
        }
        let total: f64 = self.fields.values().map(|f| f.confidence()).sum();
        total / self.fields.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::field::{Evidence, FieldValue};

    #[test]
    fn test_schema_counts() {
        assert_eq!(ListingField::required().count(), 15);
        assert_eq!(ListingField::optional().count(), 16);
    }

    #[test]
    fn test_name_round_trip_is_unique() {
        for field in ListingField::ALL {
            assert_eq!(ListingField::from_name(field.name()), Some(field));
        }
        assert_eq!(ListingField::from_name("バルコニー"), None);
    }

    #[test]
    fn test_fill_required_adds_markers() {
        let mut listing = PropertyListing::new();
        assert_eq!(listing.mean_confidence(), 0.0);
        listing.insert(
            ListingField::Rent,
            EvidenceScoredField::new(
                Some(FieldValue::Integer(85000)),
                0.9,
                Evidence::new(0, "賃料: 85,000円"),
            ),
        );

        listing.fill_required(1);

        assert!(listing.missing_required().is_empty());
        assert_eq!(listing.len(), 15);
        let name = listing.get(ListingField::PropertyName).unwrap();
        assert!(!name.is_found());
        assert_eq!(name.evidence().snippet, "ページ2で見つかりません");
        assert_eq!(
            listing.get(ListingField::Rent).unwrap().value(),
            Some(&FieldValue::Integer(85000))
        );
        // Markers count with zero confidence.
        assert!((listing.mean_confidence() - 0.9 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut listing = PropertyListing::new();
        listing.insert(
            ListingField::FloorPlan,
            EvidenceScoredField::new(
                Some(FieldValue::Text("1K".into())),
                0.5,
                Evidence::new(0, "間取り: 1K"),
            ),
        );

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["間取り"]["value"], "1K");
    }
}
