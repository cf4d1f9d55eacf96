//! Transaction record: the mutable interview answers the waterfall reads

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::marker::PhantomData;

use crate::rules::{EntityExemption, ExemptionId, TransferExemption, TrustExemption, NONE_SENTINEL};
use crate::waterfall::gates;

// ============================================================================
// Checklist
// ============================================================================

/// Answer to a multi-select exemption question
///
/// The sentinel and real identifiers cannot coexist: `NoneApply` and
/// `Selected` are separate variants, and `Selected` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checklist<T> {
    Unanswered,
    NoneApply,
    /// Selected identifiers in the order the user picked them
    Selected(Vec<T>),
}

impl<T> Default for Checklist<T> {
    fn default() -> Self {
        Checklist::Unanswered
    }
}

/// A single user edit to a checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistEdit<T> {
    SelectNone,
    Select(T),
    Deselect(T),
    Toggle(T),
    Clear,
}

impl<T: ExemptionId> Checklist<T> {
    pub fn is_answered(&self) -> bool {
        !matches!(self, Checklist::Unanswered)
    }

    pub fn is_none_apply(&self) -> bool {
        matches!(self, Checklist::NoneApply)
    }

    pub fn selected(&self) -> &[T] {
        match self {
            Checklist::Selected(ids) => ids,
            _ => &[],
        }
    }

    pub fn contains(&self, id: T) -> bool {
        self.selected().contains(&id)
    }

    /// Mark "no exemption applies", dropping any selected identifiers
    pub fn select_none(&mut self) {
        *self = Checklist::NoneApply;
    }

    /// Add an identifier, dropping the sentinel if it was set
    pub fn select(&mut self, id: T) {
        match self {
            Checklist::Selected(ids) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            _ => *self = Checklist::Selected(vec![id]),
        }
    }

    pub fn deselect(&mut self, id: T) {
        if let Checklist::Selected(ids) = self {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                *self = Checklist::Unanswered;
            }
        }
    }

    pub fn toggle(&mut self, id: T) {
        if self.contains(id) {
            self.deselect(id);
        } else {
            self.select(id);
        }
    }

    pub fn clear(&mut self) {
        *self = Checklist::Unanswered;
    }

    pub fn apply(&mut self, edit: ChecklistEdit<T>) {
        match edit {
            ChecklistEdit::SelectNone => self.select_none(),
            ChecklistEdit::Select(id) => self.select(id),
            ChecklistEdit::Deselect(id) => self.deselect(id),
            ChecklistEdit::Toggle(id) => self.toggle(id),
            ChecklistEdit::Clear => self.clear(),
        }
    }

    /// Identifiers as persisted, sentinel included
    pub fn wire_ids(&self) -> Vec<&'static str> {
        match self {
            Checklist::Unanswered => Vec::new(),
            Checklist::NoneApply => vec![NONE_SENTINEL],
            Checklist::Selected(ids) => ids.iter().map(|id| id.id()).collect(),
        }
    }
}

impl<T: ExemptionId> Serialize for Checklist<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ids = self.wire_ids();
        let mut seq = serializer.serialize_seq(Some(ids.len()))?;
        for id in ids {
            seq.serialize_element(id)?;
        }
        seq.end()
    }
}

impl<'de, T: ExemptionId> Deserialize<'de> for Checklist<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChecklistVisitor<T>(PhantomData<T>);

        impl<'de, T: ExemptionId> de::Visitor<'de> for ChecklistVisitor<T> {
            type Value = Checklist<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a list of {:?} exemption identifiers", T::CATEGORY)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Checklist::Unanswered)
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut saw_sentinel = false;
                let mut checklist = Checklist::Unanswered;

                while let Some(raw) = seq.next_element::<String>()? {
                    if raw == NONE_SENTINEL {
                        saw_sentinel = true;
                        continue;
                    }
                    let id = T::from_id(&raw).ok_or_else(|| {
                        <A::Error as de::Error>::custom(format!(
                            "unknown {:?} exemption identifier '{}'",
                            T::CATEGORY,
                            raw
                        ))
                    })?;
                    checklist.select(id);
                }

                // A mixed list resolves to the real identifiers, matching what
                // selecting an identifier after the sentinel does interactively.
                if saw_sentinel && !checklist.is_answered() {
                    checklist.select_none();
                }
                Ok(checklist)
            }
        }

        deserializer.deserialize_any(ChecklistVisitor(PhantomData))
    }
}

// ============================================================================
// Scalar answers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "yes",
            YesNo::No => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LenderAml {
    Yes,
    No,
    Unknown,
}

impl LenderAml {
    pub fn as_str(&self) -> &'static str {
        match self {
            LenderAml::Yes => "yes",
            LenderAml::No => "no",
            LenderAml::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyerType {
    Individual,
    Entity,
    Trust,
}

impl BuyerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyerType::Individual => "individual",
            BuyerType::Entity => "entity",
            BuyerType::Trust => "trust",
        }
    }
}

// ============================================================================
// Transaction record
// ============================================================================

/// Field of the transaction record, named as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordField {
    TransferExemptions,
    IsResidential,
    HasIntentToBuild,
    IsNonFinanced,
    LenderHasAml,
    BuyerType,
    IsStatutoryTrust,
    EntityExemptions,
    TrustExemptions,
}

impl RecordField {
    pub const ALL: [RecordField; 9] = [
        RecordField::TransferExemptions,
        RecordField::IsResidential,
        RecordField::HasIntentToBuild,
        RecordField::IsNonFinanced,
        RecordField::LenderHasAml,
        RecordField::BuyerType,
        RecordField::IsStatutoryTrust,
        RecordField::EntityExemptions,
        RecordField::TrustExemptions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RecordField::TransferExemptions => "transferExemptions",
            RecordField::IsResidential => "isResidential",
            RecordField::HasIntentToBuild => "hasIntentToBuild",
            RecordField::IsNonFinanced => "isNonFinanced",
            RecordField::LenderHasAml => "lenderHasAml",
            RecordField::BuyerType => "buyerType",
            RecordField::IsStatutoryTrust => "isStatutoryTrust",
            RecordField::EntityExemptions => "entityExemptions",
            RecordField::TrustExemptions => "trustExemptions",
        }
    }
}

/// Interview answers for one real-estate transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionRecord {
    pub transfer_exemptions: Checklist<TransferExemption>,
    pub is_residential: Option<YesNo>,
    pub has_intent_to_build: Option<YesNo>,
    pub is_non_financed: Option<YesNo>,
    pub lender_has_aml: Option<LenderAml>,
    pub buyer_type: Option<BuyerType>,
    pub is_statutory_trust: Option<bool>,
    pub entity_exemptions: Checklist<EntityExemption>,
    pub trust_exemptions: Checklist<TrustExemption>,
}

impl TransactionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_answered(&self, field: RecordField) -> bool {
        match field {
            RecordField::TransferExemptions => self.transfer_exemptions.is_answered(),
            RecordField::IsResidential => self.is_residential.is_some(),
            RecordField::HasIntentToBuild => self.has_intent_to_build.is_some(),
            RecordField::IsNonFinanced => self.is_non_financed.is_some(),
            RecordField::LenderHasAml => self.lender_has_aml.is_some(),
            RecordField::BuyerType => self.buyer_type.is_some(),
            RecordField::IsStatutoryTrust => self.is_statutory_trust.is_some(),
            RecordField::EntityExemptions => self.entity_exemptions.is_answered(),
            RecordField::TrustExemptions => self.trust_exemptions.is_answered(),
        }
    }

    pub fn clear(&mut self, field: RecordField) {
        match field {
            RecordField::TransferExemptions => self.transfer_exemptions.clear(),
            RecordField::IsResidential => self.is_residential = None,
            RecordField::HasIntentToBuild => self.has_intent_to_build = None,
            RecordField::IsNonFinanced => self.is_non_financed = None,
            RecordField::LenderHasAml => self.lender_has_aml = None,
            RecordField::BuyerType => self.buyer_type = None,
            RecordField::IsStatutoryTrust => self.is_statutory_trust = None,
            RecordField::EntityExemptions => self.entity_exemptions.clear(),
            RecordField::TrustExemptions => self.trust_exemptions.clear(),
        }
    }

    /// Whether the question behind `field` is meaningful given its parents
    pub fn applies(&self, field: RecordField) -> bool {
        match field {
            RecordField::HasIntentToBuild => gates::intent_question_applies(self),
            RecordField::LenderHasAml => gates::lender_question_applies(self),
            RecordField::IsStatutoryTrust => gates::statutory_question_applies(self),
            RecordField::EntityExemptions => gates::entity_checklist_applies(self),
            RecordField::TrustExemptions => gates::trust_checklist_applies(self),
            _ => true,
        }
    }

    /// Answered fields whose gating answer no longer selects them
    pub fn stale_fields(&self) -> Vec<RecordField> {
        RecordField::ALL
            .into_iter()
            .filter(|field| self.is_answered(*field) && !self.applies(*field))
            .collect()
    }

    /// Drop every stale answer, returning what was cleared
    ///
    /// Gates only look at parent fields, which always come earlier in
    /// `RecordField::ALL`, so one ordered pass reaches a fixed point.
    pub fn clear_stale(&mut self) -> Vec<RecordField> {
        let mut cleared = Vec::new();
        for field in RecordField::ALL {
            if self.is_answered(field) && !self.applies(field) {
                self.clear(field);
                cleared.push(field);
            }
        }
        cleared
    }

    /// Stable textual form used for fingerprinting
    pub fn canonical_form(&self) -> String {
        fn opt(value: Option<&'static str>) -> &'static str {
            value.unwrap_or("")
        }

        format!(
            "transferExemptions={};isResidential={};hasIntentToBuild={};isNonFinanced={};\
             lenderHasAml={};buyerType={};isStatutoryTrust={};entityExemptions={};trustExemptions={}",
            self.transfer_exemptions.wire_ids().join(","),
            opt(self.is_residential.map(|v| v.as_str())),
            opt(self.has_intent_to_build.map(|v| v.as_str())),
            opt(self.is_non_financed.map(|v| v.as_str())),
            opt(self.lender_has_aml.map(|v| v.as_str())),
            opt(self.buyer_type.map(|v| v.as_str())),
            opt(self.is_statutory_trust.map(|v| if v { "true" } else { "false" })),
            self.entity_exemptions.wire_ids().join(","),
            self.trust_exemptions.wire_ids().join(","),
        )
    }

    /// SHA-256 of the canonical form, hex encoded
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.canonical_form().as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_none_clears_identifiers() {
        let mut list = Checklist::Unanswered;
        list.select(TransferExemption::Death);
        list.select(TransferExemption::Divorce);
        list.select_none();
        assert_eq!(list, Checklist::NoneApply);
        assert_eq!(list.wire_ids(), vec!["none"]);
    }

    #[test]
    fn test_select_after_none_drops_sentinel() {
        let mut list = Checklist::Unanswered;
        list.select_none();
        list.select(EntityExemption::Bank);
        assert_eq!(list, Checklist::Selected(vec![EntityExemption::Bank]));
    }

    #[test]
    fn test_selection_order_preserved_without_duplicates() {
        let mut list = Checklist::Unanswered;
        list.select(TransferExemption::Exchange1031);
        list.select(TransferExemption::Easement);
        list.select(TransferExemption::Exchange1031);
        assert_eq!(list.wire_ids(), vec!["1031-exchange", "easement"]);
    }

    #[test]
    fn test_deselect_last_returns_to_unanswered() {
        let mut list = Checklist::Unanswered;
        list.toggle(TrustExemption::ExemptOwnedTrust);
        list.toggle(TrustExemption::ExemptOwnedTrust);
        assert_eq!(list, Checklist::Unanswered);
    }

    #[test]
    fn test_record_json_uses_persisted_names() {
        let record = TransactionRecord {
            transfer_exemptions: Checklist::NoneApply,
            is_residential: Some(YesNo::Yes),
            buyer_type: Some(BuyerType::Trust),
            is_statutory_trust: Some(true),
            entity_exemptions: Checklist::Selected(vec![EntityExemption::Bank]),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["transferExemptions"], serde_json::json!(["none"]));
        assert_eq!(value["isResidential"], "yes");
        assert_eq!(value["buyerType"], "trust");
        assert_eq!(value["isStatutoryTrust"], true);
        assert_eq!(value["entityExemptions"], serde_json::json!(["bank"]));
        assert_eq!(value["trustExemptions"], serde_json::json!([]));

        let restored: TransactionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn test_missing_fields_default_to_unanswered() {
        let record: TransactionRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, TransactionRecord::new());

        let record: TransactionRecord =
            serde_json::from_str(r#"{"transferExemptions": null}"#).unwrap();
        assert!(!record.transfer_exemptions.is_answered());
    }

    #[test]
    fn test_mixed_persisted_list_prefers_identifiers() {
        let record: TransactionRecord =
            serde_json::from_str(r#"{"transferExemptions": ["none", "death"]}"#).unwrap();
        assert_eq!(
            record.transfer_exemptions,
            Checklist::Selected(vec![TransferExemption::Death])
        );
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        let result: Result<TransactionRecord, _> =
            serde_json::from_str(r#"{"entityExemptions": ["bank", "banks"]}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("banks"), "unexpected error: {}", err);
    }

    #[test]
    fn test_stale_fields_detected() {
        let record = TransactionRecord {
            is_residential: Some(YesNo::Yes),
            has_intent_to_build: Some(YesNo::No),
            buyer_type: Some(BuyerType::Individual),
            entity_exemptions: Checklist::Selected(vec![EntityExemption::Bank]),
            ..Default::default()
        };
        assert_eq!(
            record.stale_fields(),
            vec![RecordField::HasIntentToBuild, RecordField::EntityExemptions]
        );
    }

    #[test]
    fn test_clear_stale_reaches_fixed_point() {
        let mut record = TransactionRecord {
            buyer_type: Some(BuyerType::Entity),
            is_statutory_trust: Some(false),
            trust_exemptions: Checklist::NoneApply,
            entity_exemptions: Checklist::NoneApply,
            ..Default::default()
        };
        let cleared = record.clear_stale();
        assert_eq!(
            cleared,
            vec![RecordField::IsStatutoryTrust, RecordField::TrustExemptions]
        );
        assert!(record.stale_fields().is_empty());
        assert!(record.entity_exemptions.is_none_apply());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut record = TransactionRecord::new();
        let empty = record.fingerprint();
        assert_eq!(empty.len(), 64);
        assert_eq!(empty, TransactionRecord::new().fingerprint());

        record.is_residential = Some(YesNo::No);
        assert_ne!(record.fingerprint(), empty);
    }

    #[test]
    fn test_fingerprint_sensitive_to_selection_order() {
        let mut a = TransactionRecord::new();
        a.transfer_exemptions.select(TransferExemption::Death);
        a.transfer_exemptions.select(TransferExemption::Divorce);

        let mut b = TransactionRecord::new();
        b.transfer_exemptions.select(TransferExemption::Divorce);
        b.transfer_exemptions.select(TransferExemption::Death);

        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn edit_strategy() -> impl Strategy<Value = ChecklistEdit<TransferExemption>> {
        let id = proptest::sample::select(TransferExemption::all().to_vec());
        prop_oneof![
            Just(ChecklistEdit::SelectNone),
            Just(ChecklistEdit::Clear),
            id.clone().prop_map(ChecklistEdit::Select),
            id.clone().prop_map(ChecklistEdit::Deselect),
            id.prop_map(ChecklistEdit::Toggle),
        ]
    }

    proptest! {
        /// Property: after any edit sequence the sentinel never coexists with an identifier
        #[test]
        fn sentinel_mutually_exclusive(edits in prop::collection::vec(edit_strategy(), 0..30)) {
            let mut list = Checklist::Unanswered;
            for edit in edits {
                list.apply(edit);
                let ids = list.wire_ids();
                if ids.contains(&NONE_SENTINEL) {
                    prop_assert_eq!(ids, vec![NONE_SENTINEL]);
                }
                if let Checklist::Selected(selected) = &list {
                    prop_assert!(!selected.is_empty());
                }
            }
        }

        /// Property: selecting the sentinel always yields exactly {none}
        #[test]
        fn select_none_yields_sentinel_only(edits in prop::collection::vec(edit_strategy(), 0..30)) {
            let mut list = Checklist::Unanswered;
            for edit in edits {
                list.apply(edit);
            }
            list.select_none();
            prop_assert_eq!(list.wire_ids(), vec![NONE_SENTINEL]);
        }

        /// Property: selecting an identifier after the sentinel removes the sentinel
        #[test]
        fn select_after_none_removes_sentinel(
            id in proptest::sample::select(EntityExemption::all().to_vec())
        ) {
            let mut list = Checklist::NoneApply;
            list.select(id);
            prop_assert_eq!(list, Checklist::Selected(vec![id]));
        }
    }
}
