//! Release-wide defaults layered under every business term's spec.
use super::{CollectionSpec, EntityRef, MergeSpec};
use crate::identity::KeySpec;
use crate::policy::{MergePolicy, RicherRule};
use crate::release::STANDARD_COLLECTIONS;

/// Relationship arrays that behave as sets wherever an entity carries them.
const SET_FIELDS: &[&str] = &[
    "roles",
    "relatedLots",
    "relatedLotGroups",
    "relatedBids",
    "awardIDs",
];

/// Identifier lists whose rows are distinct per `(id, scheme)`.
fn scheme_keyed() -> MergePolicy {
    MergePolicy::AppendDedupByKey(Some(KeySpec::composite(["id", "scheme"])))
}

pub fn release_base_spec() -> MergeSpec {
    STANDARD_COLLECTIONS
        .iter()
        .fold(MergeSpec::new(), |spec, path| {
            spec.collection(*path, standard_collection(path))
        })
        .field("tender.additionalClassifications", scheme_keyed())
}

/// Items are one row per lot, keyed by `relatedLot`; their `id` is positional.
pub(crate) fn lot_items() -> CollectionSpec {
    CollectionSpec::keyed_by(KeySpec::single("relatedLot"))
        .sequential_id("id")
        .reference(EntityRef::new("relatedLot", "tender.lots"))
}

fn standard_collection(path: &str) -> CollectionSpec {
    let keyed = if path == "tender.items" {
        lot_items()
    } else {
        CollectionSpec::keyed_by_id()
    };
    let mut collection = SET_FIELDS
        .iter()
        .fold(keyed, |collection, field| {
            collection.field(*field, MergePolicy::UnionSet)
        })
        .field("additionalClassifications", scheme_keyed());
    if path == "parties" {
        collection = collection
            .field(
                "name",
                MergePolicy::PreserveIfRicher(RicherRule::DepartmentQualifier),
            )
            .field("additionalIdentifiers", scheme_keyed());
    }
    collection
}
