//! Data models for the credit-risk pipeline.
//!
//! This module contains the core data structures shared across the
//! pipeline: bureau and attribute identities, the canonical record,
//! and the report with its conversation transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the fixed data-origin buckets. Each bureau has its own score-range
/// conventions, so defaults differ per bureau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bureau {
    Alpha,
    Beta,
    Gamma,
}

impl Bureau {
    /// All bureaus, in canonical order.
    pub const ALL: [Bureau; 3] = [Bureau::Alpha, Bureau::Beta, Bureau::Gamma];

    /// Parse the bureau name as it appears in provider payloads.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Alpha" => Some(Bureau::Alpha),
            "Beta" => Some(Bureau::Beta),
            "Gamma" => Some(Bureau::Gamma),
            _ => None,
        }
    }

    /// Lowercase segment used in provider endpoint paths.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Bureau::Alpha => "alpha",
            Bureau::Beta => "beta",
            Bureau::Gamma => "gamma",
        }
    }

    /// The credit-score range this bureau reports in.
    pub fn score_range(&self) -> (f64, f64) {
        match self {
            Bureau::Alpha => (300.0, 850.0),
            Bureau::Beta => (1.0, 1000.0),
            Bureau::Gamma => (0.0, 100.0),
        }
    }
}

impl fmt::Display for Bureau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bureau::Alpha => write!(f, "Alpha"),
            Bureau::Beta => write!(f, "Beta"),
            Bureau::Gamma => write!(f, "Gamma"),
        }
    }
}

/// A single attribute a bureau can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    CreditScore,
    Employment,
    PaymentHistory,
    CreditUtilization,
    DebtToIncomeRatio,
}

impl Attribute {
    /// All attributes, in canonical order.
    pub const ALL: [Attribute; 5] = [
        Attribute::CreditScore,
        Attribute::Employment,
        Attribute::PaymentHistory,
        Attribute::CreditUtilization,
        Attribute::DebtToIncomeRatio,
    ];

    /// Parse the `field` name as it appears in provider payloads.
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "credit" => Some(Attribute::CreditScore),
            "employment" => Some(Attribute::Employment),
            "payment_history" => Some(Attribute::PaymentHistory),
            "credit_utilization" => Some(Attribute::CreditUtilization),
            "debt_to_income_ratio" => Some(Attribute::DebtToIncomeRatio),
            _ => None,
        }
    }

    /// Segment used in provider endpoint paths. Note the DTI ratio uses a
    /// shorter path segment than its payload field name.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Attribute::CreditScore => "credit",
            Attribute::Employment => "employment",
            Attribute::PaymentHistory => "payment_history",
            Attribute::CreditUtilization => "credit_utilization",
            Attribute::DebtToIncomeRatio => "dti_ratio",
        }
    }

    /// Human-readable capability phrase, used to describe providers to the
    /// classifier oracle.
    pub fn capability_phrase(&self, bureau: Bureau) -> String {
        match self {
            Attribute::CreditScore => {
                format!("Used for calculating credit score from {} bureau", bureau)
            }
            Attribute::Employment => {
                format!("Used to get employment status from {} bureau", bureau)
            }
            Attribute::PaymentHistory => {
                format!("Used to retrieve payment history from {} bureau", bureau)
            }
            Attribute::CreditUtilization => {
                format!("Used to get credit utilization data from {} bureau", bureau)
            }
            Attribute::DebtToIncomeRatio => format!(
                "Used to get debt-to-income (DTI) ratio from {} bureau",
                bureau
            ),
        }
    }
}

/// All attributes reported by one bureau. Every field has a type-correct
/// default that stands in for "unknown"; score-range bounds default to the
/// bureau's own conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauProfile {
    pub credit_score: f64,
    pub score_range_min: f64,
    pub score_range_max: f64,
    pub payment_history: f64,
    pub credit_utilization: f64,
    pub debt_to_income_ratio: f64,
    pub employment_status: f64,
}

impl BureauProfile {
    /// Default profile for a bureau: zeros everywhere except the bureau's
    /// score-range bounds.
    pub fn default_for(bureau: Bureau) -> Self {
        let (min, max) = bureau.score_range();
        Self {
            credit_score: 0.0,
            score_range_min: min,
            score_range_max: max,
            payment_history: 0.0,
            credit_utilization: 0.0,
            debt_to_income_ratio: 0.0,
            employment_status: 0.0,
        }
    }

    /// Read one attribute cell.
    pub fn get(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::CreditScore => self.credit_score,
            Attribute::Employment => self.employment_status,
            Attribute::PaymentHistory => self.payment_history,
            Attribute::CreditUtilization => self.credit_utilization,
            Attribute::DebtToIncomeRatio => self.debt_to_income_ratio,
        }
    }

    /// Overwrite one attribute cell.
    pub fn set(&mut self, attribute: Attribute, value: f64) {
        match attribute {
            Attribute::CreditScore => self.credit_score = value,
            Attribute::Employment => self.employment_status = value,
            Attribute::PaymentHistory => self.payment_history = value,
            Attribute::CreditUtilization => self.credit_utilization = value,
            Attribute::DebtToIncomeRatio => self.debt_to_income_ratio = value,
        }
    }
}

/// The normalized, fixed-shape table combining all bureaus and attributes
/// for one report. The bureau set never changes across reports; only cell
/// values vary. Keyed by the bureau enum rather than positional arrays so a
/// reordering can never silently shift values between bureaus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub bureaus: BTreeMap<Bureau, BureauProfile>,
}

impl CanonicalRecord {
    /// A record with every cell at its documented default.
    pub fn with_defaults() -> Self {
        let bureaus = Bureau::ALL
            .iter()
            .map(|&b| (b, BureauProfile::default_for(b)))
            .collect();
        Self { bureaus }
    }

    /// Read one cell.
    #[allow(dead_code)] // Accessor pair with set; exercised heavily in tests
    pub fn get(&self, bureau: Bureau, attribute: Attribute) -> f64 {
        self.bureaus[&bureau].get(attribute)
    }

    /// Overwrite one cell. The bureau rows are fixed at construction, so
    /// this never inserts a new row.
    pub fn set(&mut self, bureau: Bureau, attribute: Attribute, value: f64) {
        if let Some(profile) = self.bureaus.get_mut(&bureau) {
            profile.set(attribute, value);
        }
    }
}

impl Default for CanonicalRecord {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry in a report's conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// A credit-risk report: canonical record, externally supplied score and
/// narrative, and the conversation transcript. Score and insights are
/// optional so a report can be delivered even when the external scorer or
/// the narrative oracle failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub record: Option<CanonicalRecord>,
    pub risk_score: Option<f64>,
    pub insights: Option<String>,
    pub transcript: Vec<ChatTurn>,
}

impl Report {
    /// A freshly minted report with no data attached yet.
    pub fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            record: None,
            risk_score: None,
            insights: None,
            transcript: Vec::new(),
        }
    }

    /// Append one turn to the transcript and return its index. The
    /// transcript is append-only; turns are never rewritten.
    pub fn append_turn(&mut self, speaker: Speaker, text: String) -> usize {
        self.transcript.push(ChatTurn { speaker, text });
        self.transcript.len() - 1
    }
}
