//! Exemption rule table
//!
//! Static reference data for the three checklist questions of the
//! interview: transfer-level exemptions, exempt transferee entities and
//! exempt transferee trusts. Each exemption has a stable wire identifier
//! shared by the wizard, the waterfall and the persisted report, plus a
//! display label.
//!
//! The identifier returned by [`ExemptionId::id`] is the only spelling of
//! an exemption anywhere in the workspace. Persisted checklists are parsed
//! through [`ExemptionId::from_id`], so a misspelled identifier is rejected
//! at the boundary instead of silently routing the waterfall elsewhere.

use serde::Serialize;
use std::fmt;

/// Checklist value meaning "no exemption applies"
pub const NONE_SENTINEL: &str = "none";

/// Which checklist an exemption belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Transfer,
    Entity,
    Trust,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Transfer => "Transfer exemptions",
            Category::Entity => "Exempt entity types",
            Category::Trust => "Exempt trust types",
        }
    }
}

/// Closed vocabulary of one exemption checklist
pub trait ExemptionId: Copy + Eq + fmt::Debug + 'static {
    const CATEGORY: Category;

    /// Stable wire identifier
    fn id(&self) -> &'static str;

    /// Human-readable label
    fn label(&self) -> &'static str;

    /// Every exemption in display order
    fn all() -> &'static [Self];

    fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|e| e.id() == id)
    }
}

// ============================================================================
// Transfer-level exemptions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferExemption {
    Easement,
    Death,
    Divorce,
    Bankruptcy,
    CourtSupervised,
    SelfSettledTrust,
    Exchange1031,
    NoReportingPerson,
}

impl ExemptionId for TransferExemption {
    const CATEGORY: Category = Category::Transfer;

    fn id(&self) -> &'static str {
        match self {
            TransferExemption::Easement => "easement",
            TransferExemption::Death => "death",
            TransferExemption::Divorce => "divorce",
            TransferExemption::Bankruptcy => "bankruptcy",
            TransferExemption::CourtSupervised => "court-supervised",
            TransferExemption::SelfSettledTrust => "self-settled-trust",
            TransferExemption::Exchange1031 => "1031-exchange",
            TransferExemption::NoReportingPerson => "no-reporting-person",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TransferExemption::Easement => "Grant, transfer, or assignment of an easement",
            TransferExemption::Death => "Transfer resulting from the death of an individual",
            TransferExemption::Divorce => "Transfer incident to divorce or dissolution of marriage",
            TransferExemption::Bankruptcy => "Transfer to a bankruptcy estate",
            TransferExemption::CourtSupervised => "Transfer supervised by a court",
            TransferExemption::SelfSettledTrust => {
                "No-consideration transfer by an individual to their self-settled trust"
            }
            TransferExemption::Exchange1031 => {
                "Transfer to a qualified intermediary in a 1031 exchange"
            }
            TransferExemption::NoReportingPerson => "No reporting person is involved",
        }
    }

    fn all() -> &'static [Self] {
        &[
            TransferExemption::Easement,
            TransferExemption::Death,
            TransferExemption::Divorce,
            TransferExemption::Bankruptcy,
            TransferExemption::CourtSupervised,
            TransferExemption::SelfSettledTrust,
            TransferExemption::Exchange1031,
            TransferExemption::NoReportingPerson,
        ]
    }
}

// ============================================================================
// Exempt transferee entities
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityExemption {
    SecuritiesIssuer,
    Government,
    Bank,
    CreditUnion,
    DepositoryHoldingCompany,
    MoneyServicesBusiness,
    BrokerDealer,
    SecuritiesExchange,
    ExchangeActRegistered,
    InsuranceCompany,
    InsuranceProducer,
    CommodityRegistered,
    PublicUtility,
    InvestmentCompany,
    InvestmentAdviser,
    ExemptOwnedSubsidiary,
}

impl ExemptionId for EntityExemption {
    const CATEGORY: Category = Category::Entity;

    fn id(&self) -> &'static str {
        match self {
            EntityExemption::SecuritiesIssuer => "securities-issuer",
            EntityExemption::Government => "government",
            EntityExemption::Bank => "bank",
            EntityExemption::CreditUnion => "credit-union",
            EntityExemption::DepositoryHoldingCompany => "depository-holding-company",
            EntityExemption::MoneyServicesBusiness => "money-services-business",
            EntityExemption::BrokerDealer => "broker-dealer",
            EntityExemption::SecuritiesExchange => "securities-exchange",
            EntityExemption::ExchangeActRegistered => "exchange-act-registered",
            EntityExemption::InsuranceCompany => "insurance-company",
            EntityExemption::InsuranceProducer => "insurance-producer",
            EntityExemption::CommodityRegistered => "commodity-registered",
            EntityExemption::PublicUtility => "public-utility",
            EntityExemption::InvestmentCompany => "investment-company",
            EntityExemption::InvestmentAdviser => "investment-adviser",
            EntityExemption::ExemptOwnedSubsidiary => "exempt-owned-subsidiary",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EntityExemption::SecuritiesIssuer => "Securities reporting issuer",
            EntityExemption::Government => "Governmental authority",
            EntityExemption::Bank => "Bank",
            EntityExemption::CreditUnion => "Credit union",
            EntityExemption::DepositoryHoldingCompany => "Depository institution holding company",
            EntityExemption::MoneyServicesBusiness => "Money services business",
            EntityExemption::BrokerDealer => "Broker or dealer in securities",
            EntityExemption::SecuritiesExchange => "Securities exchange or clearing agency",
            EntityExemption::ExchangeActRegistered => "Other Exchange Act registered entity",
            EntityExemption::InsuranceCompany => "Insurance company",
            EntityExemption::InsuranceProducer => "State-licensed insurance producer",
            EntityExemption::CommodityRegistered => "Commodity Exchange Act registered entity",
            EntityExemption::PublicUtility => "Public utility",
            EntityExemption::InvestmentCompany => "Registered investment company",
            EntityExemption::InvestmentAdviser => "Registered investment adviser",
            EntityExemption::ExemptOwnedSubsidiary => {
                "Entity wholly owned by an exempt entity"
            }
        }
    }

    fn all() -> &'static [Self] {
        &[
            EntityExemption::SecuritiesIssuer,
            EntityExemption::Government,
            EntityExemption::Bank,
            EntityExemption::CreditUnion,
            EntityExemption::DepositoryHoldingCompany,
            EntityExemption::MoneyServicesBusiness,
            EntityExemption::BrokerDealer,
            EntityExemption::SecuritiesExchange,
            EntityExemption::ExchangeActRegistered,
            EntityExemption::InsuranceCompany,
            EntityExemption::InsuranceProducer,
            EntityExemption::CommodityRegistered,
            EntityExemption::PublicUtility,
            EntityExemption::InvestmentCompany,
            EntityExemption::InvestmentAdviser,
            EntityExemption::ExemptOwnedSubsidiary,
        ]
    }
}

// ============================================================================
// Exempt transferee trusts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustExemption {
    SecuritiesIssuerTrust,
    TrusteeSecuritiesIssuer,
    ExemptOwnedTrust,
}

impl ExemptionId for TrustExemption {
    const CATEGORY: Category = Category::Trust;

    fn id(&self) -> &'static str {
        match self {
            TrustExemption::SecuritiesIssuerTrust => "securities-issuer-trust",
            TrustExemption::TrusteeSecuritiesIssuer => "trustee-securities-issuer",
            TrustExemption::ExemptOwnedTrust => "exempt-owned-trust",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TrustExemption::SecuritiesIssuerTrust => "Trust that is a securities reporting issuer",
            TrustExemption::TrusteeSecuritiesIssuer => {
                "Trust whose trustee is a securities reporting issuer"
            }
            TrustExemption::ExemptOwnedTrust => "Trust wholly owned by an exempt entity",
        }
    }

    fn all() -> &'static [Self] {
        &[
            TrustExemption::SecuritiesIssuerTrust,
            TrustExemption::TrusteeSecuritiesIssuer,
            TrustExemption::ExemptOwnedTrust,
        ]
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// One selectable checklist row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExemptionOption {
    pub id: &'static str,
    pub label: &'static str,
}

/// One checklist with its options, sentinel last
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExemptionCategory {
    pub category: Category,
    pub name: &'static str,
    pub options: Vec<ExemptionOption>,
    pub none_id: &'static str,
}

fn category_of<T: ExemptionId>() -> ExemptionCategory {
    ExemptionCategory {
        category: T::CATEGORY,
        name: T::CATEGORY.name(),
        options: T::all()
            .iter()
            .map(|e| ExemptionOption {
                id: e.id(),
                label: e.label(),
            })
            .collect(),
        none_id: NONE_SENTINEL,
    }
}

/// The full rule table, in interview order
pub fn catalog() -> Vec<ExemptionCategory> {
    vec![
        category_of::<TransferExemption>(),
        category_of::<EntityExemption>(),
        category_of::<TrustExemption>(),
    ]
}

/// Display label for any exemption identifier
///
/// Identifiers not in the table (e.g. codes persisted by an older rule
/// table) are humanized instead of failing.
pub fn label_for_code(code: &str) -> String {
    TransferExemption::from_id(code)
        .map(|e| e.label())
        .or_else(|| EntityExemption::from_id(code).map(|e| e.label()))
        .or_else(|| TrustExemption::from_id(code).map(|e| e.label()))
        .map(str::to_string)
        .unwrap_or_else(|| humanize(code))
}

/// `"foo_BAR-baz"` -> `"Foo Bar Baz"`
pub fn humanize(code: &str) -> String {
    code.split(|c| c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut title: String = first.to_uppercase().collect();
                    title.push_str(&chars.as_str().to_lowercase());
                    title
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
