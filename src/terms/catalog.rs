//! Built-in merge specs for eForms business terms, in registration order.
//!
//! Each entry states only what its term contributes; release-wide rules
//! (standard collection keys, relationship sets) come from the base spec.
use crate::identity::KeySpec;
use crate::policy::MergePolicy::{self, AppendDedupByKey, DeepMerge, Overwrite, UnionSet};
use crate::policy::RicherRule;
use crate::spec::{lot_items, CollectionSpec, EntityRef, MergeSpec};

fn keyed() -> CollectionSpec {
    CollectionSpec::keyed_by_id()
}

fn department_name() -> MergePolicy {
    MergePolicy::PreserveIfRicher(RicherRule::DepartmentQualifier)
}

fn related_lots(collection: CollectionSpec) -> CollectionSpec {
    collection
        .field("relatedLots", UnionSet)
        .reference(EntityRef::new("relatedLots", "tender.lots"))
}

fn lots(collection: CollectionSpec) -> MergeSpec {
    MergeSpec::new().collection("tender.lots", collection)
}

fn items(collection: CollectionSpec) -> MergeSpec {
    MergeSpec::new().collection("tender.items", collection)
}

fn parties(collection: CollectionSpec) -> MergeSpec {
    MergeSpec::new().collection("parties", collection)
}

fn awards(collection: CollectionSpec) -> MergeSpec {
    MergeSpec::new().collection("awards", collection)
}

fn bids(collection: CollectionSpec) -> MergeSpec {
    MergeSpec::new().collection("bids.details", collection)
}

pub(super) fn builtin_terms() -> Vec<(&'static str, MergeSpec)> {
    vec![
        // Notice and procedure
        ("BT-01-notice", MergeSpec::new().field("tender.legalBasis", DeepMerge)),
        ("BT-04-notice", MergeSpec::new().field("tender.id", Overwrite)),
        ("BT-05-notice", MergeSpec::new().field("date", Overwrite)),
        ("BT-27-Procedure", MergeSpec::new().field("tender.value", DeepMerge)),
        (
            "BT-195(BT-09)-Procedure",
            MergeSpec::new().collection("withheldInformation", keyed().field("field", Overwrite)),
        ),
        // Lots and lot groups
        ("BT-137-Lot", lots(keyed())),
        (
            "BT-137-LotsGroup",
            MergeSpec::new().collection("tender.lotGroups", keyed()),
        ),
        (
            "BT-1375-Procedure",
            MergeSpec::new().collection("tender.lotGroups", related_lots(keyed())),
        ),
        ("BT-21-Lot", lots(keyed().field("title", Overwrite))),
        ("BT-24-Lot", lots(keyed().field("description", Overwrite))),
        ("BT-27-Lot", lots(keyed().field("value", DeepMerge))),
        (
            "BT-539-Lot",
            lots(keyed().field("awardCriteria.criteria", AppendDedupByKey(None))),
        ),
        ("BT-765-Lot", lots(keyed().field("techniques", DeepMerge))),
        (
            "BT-113-Lot",
            lots(keyed().field("techniques.frameworkAgreement.maximumParticipants", Overwrite)),
        ),
        (
            "BT-5010-Lot",
            lots(keyed().collection("planning.budget.finance", keyed())),
        ),
        (
            "BT-14-Lot",
            MergeSpec::new().collection("tender.documents", related_lots(keyed())),
        ),
        (
            "BT-125(i)-Lot",
            MergeSpec::new().collection(
                "relatedProcesses",
                related_lots(keyed()).field("relationship", UnionSet),
            ),
        ),
        // Items, one per lot
        ("BT-262-Lot", items(lot_items().field("classification", Overwrite))),
        (
            "BT-263-Lot",
            items(lot_items().field(
                "additionalClassifications",
                AppendDedupByKey(Some(KeySpec::composite(["id", "scheme"]))),
            )),
        ),
        ("BT-25-Lot", items(lot_items().field("quantity", Overwrite))),
        ("BT-625-Lot", items(lot_items().field("unit", DeepMerge))),
        (
            "BT-5121-Lot",
            items(lot_items().field("deliveryAddresses", AppendDedupByKey(None))),
        ),
        // Organisations
        ("OPT-200-Organization-Company", parties(keyed())),
        (
            "BT-500-Organization-Company",
            parties(keyed().field("name", department_name())),
        ),
        (
            "BT-16-Organization-Company",
            parties(keyed().field("name", department_name())),
        ),
        (
            "BT-510(a)-Organization-Company",
            parties(keyed().field("address", DeepMerge)),
        ),
        (
            "BT-513-Organization-Company",
            parties(keyed().field("address", DeepMerge)),
        ),
        (
            "BT-503-Organization-Company",
            parties(keyed().field("contactPoint", DeepMerge)),
        ),
        (
            "OPT-300-Procedure-Buyer",
            parties(keyed().field("roles", UnionSet)).field("buyer", DeepMerge),
        ),
        (
            "OPT-301-Lot-ReviewOrg",
            parties(keyed().field("roles", UnionSet)),
        ),
        (
            "OPT-160-UBO",
            parties(keyed().collection("beneficialOwners", keyed().field("name", Overwrite))),
        ),
        (
            "BT-706-UBO",
            parties(keyed().collection(
                "beneficialOwners",
                keyed().field("nationalities", UnionSet),
            )),
        ),
        // Results, tenders and contracts
        ("BT-13713-LotResult", awards(related_lots(keyed()))),
        ("BT-142-LotResult", awards(keyed().field("status", Overwrite))),
        (
            "OPT-320-LotResult",
            awards(
                keyed()
                    .field("relatedBids", UnionSet)
                    .reference(EntityRef::new("relatedBids", "bids.details")),
            ),
        ),
        (
            "BT-759-LotResult",
            MergeSpec::new().collection(
                "bids.statistics",
                keyed()
                    .field("value", Overwrite)
                    .reference(EntityRef::new("relatedLot", "tender.lots")),
            ),
        ),
        ("BT-720-Tender", bids(keyed().field("value", DeepMerge))),
        ("BT-13714-Tender", bids(related_lots(keyed()))),
        (
            "BT-3202-Contract",
            MergeSpec::new().collection(
                "contracts",
                keyed()
                    .field("awardIDs", UnionSet)
                    .reference(EntityRef::new("awardIDs", "awards")),
            ),
        ),
        (
            "BT-145-Contract",
            MergeSpec::new().collection("contracts", keyed().field("dateSigned", Overwrite)),
        ),
    ]
}
