//! Publishing listings to a destination database.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MaisokuError, Result};
use crate::pipeline::throttle::Throttle;
use crate::traits::destination::{CreatedPage, Destination, PropertyValue};
use crate::types::{
    field::FieldValue,
    listing::{ListingField, PropertyListing},
    progress::{ProgressReporter, ProgressSender, Stage},
};

/// Properties a destination must expose before anything is published.
pub const DESTINATION_REQUIRED: [ListingField; 8] = [
    ListingField::PropertyName,
    ListingField::Address,
    ListingField::Rent,
    ListingField::FloorPlan,
    ListingField::FloorArea,
    ListingField::ManagementFee,
    ListingField::DepositMonths,
    ListingField::KeyMoneyMonths,
];

/// How a listing field is typed in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    RichText,
    PhoneNumber,
    Number,
    Select,
    MultiSelect,
}

/// Destination property type of a field.
pub fn property_kind(field: ListingField) -> PropertyKind {
    use ListingField::*;

    match field {
        PropertyName => PropertyKind::Title,
        Address | Station1 | Station2 | BuiltDate | FloorLevel | DepositNotes | ContractPeriod
        | RenewalFee | GuarantorTerms | MoveInDate | AgentName => {
            PropertyKind::RichText
        }
        AgentPhone => PropertyKind::PhoneNumber,
        Station1WalkMinutes | FloorArea | Rent | ManagementFee | DepositMonths
        | KeyMoneyMonths | KeyExchangeFee | FireInsuranceFee | MiscInitialCosts => {
            PropertyKind::Number
        }
        PropertyType | FloorPlan | Structure | Orientation | ContractType | TransactionType
        | Ad | Status => PropertyKind::Select,
        EquipmentTags => PropertyKind::MultiSelect,
    }
}

/// Typed destination properties for one listing, in field order.
///
/// Null values are omitted, and so are empty strings for text and select
/// properties. Zero numbers are kept.
pub fn build_properties(listing: &PropertyListing) -> Vec<(String, PropertyValue)> {
    ListingField::ALL
        .into_iter()
        .filter_map(|field| {
            let value = listing.get(field)?.value()?;
            let property = to_property(property_kind(field), value)?;
            Some((field.name().to_string(), property))
        })
        .collect()
}

fn to_property(kind: PropertyKind, value: &FieldValue) -> Option<PropertyValue> {
    if kind == PropertyKind::Number {
        return value.as_f64().map(PropertyValue::Number);
    }
    if kind == PropertyKind::MultiSelect {
        return match value {
            FieldValue::Tags(tags) => Some(PropertyValue::MultiSelect(tags.clone())),
            _ => None,
        };
    }

    let text = value.to_display_string();
    if text.is_empty() {
        return None;
    }

    Some(match kind {
        PropertyKind::Title => PropertyValue::Title(text),
        PropertyKind::PhoneNumber => PropertyValue::PhoneNumber(text),
        PropertyKind::Select => PropertyValue::Select(text),
        _ => PropertyValue::RichText(text),
    })
}

/// A page created for a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedListing {
    /// Position of the listing in the input
    pub index: usize,
    pub page: CreatedPage,
}

/// A listing that could not be published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishFailure {
    pub index: usize,
    pub error: String,
}

/// Outcome of one publishing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishReport {
    pub created: Vec<PublishedListing>,
    pub failed: Vec<PublishFailure>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Publish listings as destination pages.
///
/// The destination schema is checked once; a missing required property
/// fails the whole run before any page is created. Per-listing failures
/// are recorded in the report. With a progress sender, one `Publish`
/// event is emitted per listing attempted.
pub async fn publish_listings<'a, D: Destination>(
    destination: &D,
    destination_id: &str,
    listings: impl IntoIterator<Item = &'a PropertyListing>,
    throttle: &Throttle,
    progress: Option<&ProgressSender>,
) -> Result<PublishReport> {
    check_schema(destination, destination_id).await?;

    let listings: Vec<&PropertyListing> = listings.into_iter().collect();
    let progress = ProgressReporter::new(progress.cloned());
    let mut report = PublishReport::default();
    for (index, listing) in listings.iter().enumerate() {
        throttle.wait().await;

        let properties = build_properties(listing);
        match destination.create_page(&properties, destination_id).await {
            Ok(page) => report.created.push(PublishedListing { index, page }),
            Err(e) => {
                warn!(index, error = %e, "Failed to create destination page");
                report.failed.push(PublishFailure {
                    index,
                    error: e.to_string(),
                });
            }
        }
        progress.report(Stage::Publish, index + 1, listings.len());
    }

    info!(
        created = report.created.len(),
        failed = report.failed.len(),
        "Publishing complete"
    );

    Ok(report)
}

/// Fail with `SchemaMismatch` unless every required property exists.
pub async fn check_schema<D: Destination>(destination: &D, destination_id: &str) -> Result<()> {
    let names = destination.property_names(destination_id).await?;
    let missing: Vec<String> = DESTINATION_REQUIRED
        .iter()
        .map(|f| f.name())
        .filter(|name| !names.iter().any(|n| n == name))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MaisokuError::SchemaMismatch { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDestination;
    use crate::types::progress::progress_channel;
    use crate::types::field::{Evidence, EvidenceScoredField};

    fn scored(value: FieldValue) -> EvidenceScoredField {
        EvidenceScoredField::new(Some(value), 0.9, Evidence::new(0, "x"))
    }

    fn listing() -> PropertyListing {
        let mut listing = PropertyListing::new();
        listing.insert(ListingField::PropertyName, scored(FieldValue::Text("パークマンション青山".into())));
        listing.insert(ListingField::Rent, scored(FieldValue::Integer(120000)));
        listing.insert(ListingField::ManagementFee, scored(FieldValue::Integer(0)));
        listing.insert(ListingField::FloorPlan, scored(FieldValue::Text("1LDK".into())));
        listing.insert(ListingField::AgentPhone, scored(FieldValue::Text("03-1234-5678".into())));
        listing.insert(ListingField::Structure, scored(FieldValue::Text(String::new())));
        listing.insert(
            ListingField::EquipmentTags,
            scored(FieldValue::Tags(vec!["オートロック".into()])),
        );
        listing.insert(ListingField::Address, EvidenceScoredField::not_found(0, "x"));
        listing
    }

    fn full_schema() -> Vec<String> {
        ListingField::ALL.iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn test_build_properties() {
        let properties = build_properties(&listing());
        let get = |name: &str| properties.iter().find(|(n, _)| n == name).map(|(_, v)| v);

        assert_eq!(get("物件名"), Some(&PropertyValue::Title("パークマンション青山".into())));
        assert_eq!(get("賃料"), Some(&PropertyValue::Number(120000.0)));
        assert_eq!(get("管理費共益費"), Some(&PropertyValue::Number(0.0)));
        assert_eq!(get("間取り"), Some(&PropertyValue::Select("1LDK".into())));
        assert_eq!(get("業者電話番号"), Some(&PropertyValue::PhoneNumber("03-1234-5678".into())));
        assert_eq!(
            get("設備タグ"),
            Some(&PropertyValue::MultiSelect(vec!["オートロック".into()]))
        );
        assert_eq!(get("所在地"), None);
        assert_eq!(get("構造"), None);
    }

    #[tokio::test]
    async fn test_schema_mismatch_creates_nothing() {
        let destination = MockDestination::new(vec!["物件名".into(), "所在地".into()]);

        let result = publish_listings(
            &destination,
            "db",
            [&listing()],
            &Throttle::disabled(),
            None,
        )
        .await;

        match result {
            Err(MaisokuError::SchemaMismatch { missing }) => {
                assert_eq!(missing.len(), 6);
                assert!(missing.contains(&"賃料".to_string()));
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
        assert!(destination.created().is_empty());
    }

    #[tokio::test]
    async fn test_publishes_each_listing() {
        let destination = MockDestination::new(full_schema());
        let listings = vec![listing(), listing()];

        let report = publish_listings(&destination, "db", &listings, &Throttle::disabled(), None)
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.created[1].index, 1);
        assert_eq!(destination.created().len(), 2);
    }

    #[tokio::test]
    async fn test_page_failure_is_recorded() {
        let destination = MockDestination::new(full_schema()).failing_pages();

        let report = publish_listings(&destination, "db", [&listing()], &Throttle::disabled(), None)
            .await
            .unwrap();

        assert!(report.created.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 0);
    }

    #[tokio::test]
    async fn test_progress_counts_every_attempt() {
        let destination = MockDestination::new(full_schema()).failing_pages();
        let listings = vec![listing(), listing()];
        let (tx, mut rx) = progress_channel();

        publish_listings(&destination, "db", &listings, &Throttle::disabled(), Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.stage == Stage::Publish && e.total == 2));
        assert_eq!(events[1].percent(), 100);
    }
}
