//! The six persisted entities and their static schemas.
//!
//! Field names on each struct match the column names in its schema, which is
//! what lets rows round-trip through serde without per-entity mapping code.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::schema::{Entity, EntitySchema, FieldDef, FieldType, ForeignKey};

/// Allowed values of [`CompanyInitiative::impact`].
pub const IMPACT_VARIANTS: &[&str] = &["LOW", "MEDIUM", "HIGH"];

/// Qualitative impact rating of an initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    /// Low impact.
    Low,
    /// Medium impact.
    Medium,
    /// High impact.
    High,
}

// ─────────────────────────────────────────────────────────────────────────────
// Company
// ─────────────────────────────────────────────────────────────────────────────

/// A company tracked by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Generated identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Exchange ticker symbol.
    pub stock_ticker: Option<String>,
    /// Company website.
    pub website: Option<String>,
}

/// Schema for [`Company`].
pub const COMPANY: EntitySchema = EntitySchema {
    name: "Company",
    resource: "companies",
    fields: &[
        FieldDef::generated_key("id"),
        FieldDef::required("name", FieldType::Text),
        FieldDef::optional("stock_ticker", FieldType::Text),
        FieldDef::optional("website", FieldType::Text),
    ],
    primary_key: &["id"],
    foreign_keys: &[],
};

impl Entity for Company {
    const SCHEMA: &'static EntitySchema = &COMPANY;
}

// ─────────────────────────────────────────────────────────────────────────────
// CompanyDescription
// ─────────────────────────────────────────────────────────────────────────────

/// A free-text description attached to a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDescription {
    /// Owning company.
    pub company_id: i64,
    /// Description text; part of the primary key.
    pub description: String,
}

/// Schema for [`CompanyDescription`].
pub const COMPANY_DESCRIPTION: EntitySchema = EntitySchema {
    name: "CompanyDescription",
    resource: "company-descriptions",
    fields: &[
        FieldDef::required("company_id", FieldType::Integer),
        FieldDef::required("description", FieldType::Text),
    ],
    primary_key: &["company_id", "description"],
    foreign_keys: &[ForeignKey {
        field: "company_id",
        target: "Company",
        target_field: "id",
    }],
};

impl Entity for CompanyDescription {
    const SCHEMA: &'static EntitySchema = &COMPANY_DESCRIPTION;
}

// ─────────────────────────────────────────────────────────────────────────────
// CompanyInitiative
// ─────────────────────────────────────────────────────────────────────────────

/// A sustainability initiative run by a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInitiative {
    /// Generated identifier.
    pub id: i64,
    /// Owning company.
    pub company_id: i64,
    /// Initiative name.
    pub name: String,
    /// Headline statistics.
    pub key_stats: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// When the initiative was announced or took effect.
    pub date: Option<NaiveDateTime>,
    /// Impact rating.
    pub impact: Option<Impact>,
    /// Rationale for the impact rating.
    pub justification: Option<String>,
    /// Where the information came from.
    pub source: Option<String>,
}

/// Schema for [`CompanyInitiative`].
pub const COMPANY_INITIATIVE: EntitySchema = EntitySchema {
    name: "CompanyInitiative",
    resource: "company-initiatives",
    fields: &[
        FieldDef::generated_key("id"),
        FieldDef::required("company_id", FieldType::Integer),
        FieldDef::required("name", FieldType::Text),
        FieldDef::optional("key_stats", FieldType::Text),
        FieldDef::optional("description", FieldType::Text),
        FieldDef::optional("date", FieldType::Timestamp),
        FieldDef::optional("impact", FieldType::Enum(IMPACT_VARIANTS)),
        FieldDef::optional("justification", FieldType::Text),
        FieldDef::optional("source", FieldType::Text),
    ],
    primary_key: &["id"],
    foreign_keys: &[ForeignKey {
        field: "company_id",
        target: "Company",
        target_field: "id",
    }],
};

impl Entity for CompanyInitiative {
    const SCHEMA: &'static EntitySchema = &COMPANY_INITIATIVE;
}

// ─────────────────────────────────────────────────────────────────────────────
// Sdg / SubSdg
// ─────────────────────────────────────────────────────────────────────────────

/// A UN Sustainable Development Goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sdg {
    /// Generated identifier.
    pub id: i64,
    /// Goal name.
    pub name: String,
}

/// Schema for [`Sdg`].
pub const SDG: EntitySchema = EntitySchema {
    name: "Sdg",
    resource: "sdgs",
    fields: &[
        FieldDef::generated_key("id"),
        FieldDef::required("name", FieldType::Text),
    ],
    primary_key: &["id"],
    foreign_keys: &[],
};

impl Entity for Sdg {
    const SCHEMA: &'static EntitySchema = &SDG;
}

/// A target beneath a Sustainable Development Goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSdg {
    /// Generated identifier.
    pub id: i64,
    /// Parent goal.
    pub sdg_id: i64,
    /// Target name.
    pub name: String,
}

/// Schema for [`SubSdg`].
pub const SUB_SDG: EntitySchema = EntitySchema {
    name: "SubSdg",
    resource: "sub-sdgs",
    fields: &[
        FieldDef::generated_key("id"),
        FieldDef::required("sdg_id", FieldType::Integer),
        FieldDef::required("name", FieldType::Text),
    ],
    primary_key: &["id"],
    foreign_keys: &[ForeignKey {
        field: "sdg_id",
        target: "Sdg",
        target_field: "id",
    }],
};

impl Entity for SubSdg {
    const SCHEMA: &'static EntitySchema = &SUB_SDG;
}

// ─────────────────────────────────────────────────────────────────────────────
// CompanyInitiativeSubSdg
// ─────────────────────────────────────────────────────────────────────────────

/// Links an initiative to a sub-goal it contributes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInitiativeSubSdg {
    /// Linked initiative.
    pub initiative_id: i64,
    /// Linked sub-goal.
    pub sub_sdg_id: i64,
}

/// Schema for [`CompanyInitiativeSubSdg`].
pub const COMPANY_INITIATIVE_SUB_SDG: EntitySchema = EntitySchema {
    name: "CompanyInitiativeSubSdg",
    resource: "company-initiative-sub-sdgs",
    fields: &[
        FieldDef::required("initiative_id", FieldType::Integer),
        FieldDef::required("sub_sdg_id", FieldType::Integer),
    ],
    primary_key: &["initiative_id", "sub_sdg_id"],
    foreign_keys: &[
        ForeignKey {
            field: "initiative_id",
            target: "CompanyInitiative",
            target_field: "id",
        },
        ForeignKey {
            field: "sub_sdg_id",
            target: "SubSdg",
            target_field: "id",
        },
    ],
};

impl Entity for CompanyInitiativeSubSdg {
    const SCHEMA: &'static EntitySchema = &COMPANY_INITIATIVE_SUB_SDG;
}

/// Every schema, parents before children.
pub const ALL_ENTITIES: &[&EntitySchema] = &[
    &COMPANY,
    &COMPANY_DESCRIPTION,
    &COMPANY_INITIATIVE,
    &SDG,
    &SUB_SDG,
    &COMPANY_INITIATIVE_SUB_SDG,
];

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
