//! Input payloads: entity metadata plus transactions, or a raw instruction list.

use std::fmt;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};
use taxfill_common::RawValue;

/// Everything a fill pass can consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Direct placements that bypass field location.
    Instructions { instructions: Vec<Instruction> },
    /// Declarative, mapping-driven filling.
    Return(ReturnPayload),
}

impl Payload {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnPayload {
    pub meta: EntityMeta,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

/// Who is filing and for which period. Missing values surface as
/// `skippedNoValue` on the fields that need them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    #[serde(default, alias = "taxId", alias = "pin")]
    pub tax_id: Option<String>,
    #[serde(default, alias = "periodFrom")]
    pub period_from: Option<String>,
    #[serde(default, alias = "periodTo")]
    pub period_to: Option<String>,
    #[serde(default, alias = "returnType")]
    pub return_type: Option<String>,
}

impl EntityMeta {
    pub const DEFAULT_RETURN_TYPE: &'static str = "Original";

    pub fn return_type_or_default(&self) -> &str {
        self.return_type
            .as_deref()
            .unwrap_or(Self::DEFAULT_RETURN_TYPE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, alias = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub amount: Option<RawValue>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "counterpartyId")]
    pub counterparty_id: Option<String>,
    #[serde(default, alias = "invoiceRef")]
    pub invoice_ref: Option<String>,
}

impl TransactionRecord {
    pub fn new(kind: TransactionKind, amount: impl Into<RawValue>) -> Self {
        Self {
            kind,
            amount: Some(amount.into()),
            ..Self::default()
        }
    }
}

/// Transaction category. Unrecognised labels are kept, uppercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
    Other(String),
}

impl TransactionKind {
    pub fn parse(text: &str) -> Self {
        let upper = text.trim().to_ascii_uppercase();
        match upper.as_str() {
            "INCOME" | "SALE" | "SALES" | "REVENUE" => TransactionKind::Income,
            "EXPENSE" | "COST" | "PURCHASE" => TransactionKind::Expense,
            _ => TransactionKind::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Other(s) => s,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransactionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(match text {
            Some(t) if !t.trim().is_empty() => TransactionKind::parse(&t),
            Some(_) | None => TransactionKind::default(),
        })
    }
}

/// One direct placement: `value` goes to `cell` on the first sheet whose
/// name matches `sheet_keyword`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(alias = "sheetKeyword", alias = "sheet")]
    pub sheet_keyword: String,
    pub cell: String,
    #[serde(default)]
    pub value: Option<RawValue>,
}
