//! Concept vocabulary and numeric tolerances.
//!
//! Everything the extractors know about concept wording lives here as plain
//! data, injected at construction time. Tests swap in alternate vocabularies
//! without touching extraction logic; deployments load one from JSON.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A canonical concept spelling and the source variants that map onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptAlias {
    pub canonical: String,
    pub variants: Vec<String>,
}

impl ConceptAlias {
    fn new(canonical: &str, variants: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Earning/deduction concept spellings.
    pub concept_aliases: Vec<ConceptAlias>,
    /// A concept starting with one of these is a deduction.
    pub deduction_prefixes: Vec<String>,
    /// A concept containing one of these is a withholding (deduction).
    pub withholding_keywords: Vec<String>,
    /// Recognised employer-contribution concepts.
    pub contribution_concepts: Vec<ConceptAlias>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            concept_aliases: vec![
                ConceptAlias::new(
                    "Salario base",
                    &["SALARIO BASE", "SAL. BASE", "SUELDO BASE", "SALARIO"],
                ),
                ConceptAlias::new("Plus convenio", &["PLUS CONVENIO", "PLUS CONV."]),
                ConceptAlias::new("Plus transporte", &["PLUS TRANSPORTE", "PLUS DE TRANSPORTE"]),
                ConceptAlias::new("Antigüedad", &["ANTIGUEDAD", "PLUS ANTIGUEDAD"]),
                ConceptAlias::new(
                    "Prorrata pagas extras",
                    &[
                        "PRORRATA PAGAS EXTRAS",
                        "PRORR. PAGAS EXTRAS",
                        "P.P. PAGAS EXTRAS",
                        "PRORRATA P. EXTRAS",
                    ],
                ),
                ConceptAlias::new(
                    "Horas extraordinarias",
                    &["HORAS EXTRAORDINARIAS", "HORAS EXTRAS", "H. EXTRAS"],
                ),
                ConceptAlias::new(
                    "Complemento personal",
                    &["COMPLEMENTO PERSONAL", "COMPL. PERSONAL"],
                ),
                ConceptAlias::new("Mejora voluntaria", &["MEJORA VOLUNTARIA", "MEJORA VOLUNT."]),
                ConceptAlias::new(
                    "DTO. Contingencias comunes",
                    &[
                        "DTO. CONT. COMUNES",
                        "DTO. CONTINGENCIAS COMUNES",
                        "DTO. C. COMUNES",
                    ],
                ),
                ConceptAlias::new("DTO. Desempleo", &["DTO. DESEMPLEO"]),
                ConceptAlias::new(
                    "DTO. Formación profesional",
                    &["DTO. FORMACION PROFESIONAL", "DTO. FORMACION", "DTO. F. PROFESIONAL"],
                ),
                ConceptAlias::new(
                    "DTO. MEI",
                    &["DTO. MEI", "DTO. MECANISMO EQUIDAD INTERGENERACIONAL"],
                ),
                ConceptAlias::new(
                    "Retención IRPF",
                    &[
                        "TRIBUTACION I.R.P.F.",
                        "RETENCION I.R.P.F.",
                        "RETENCION IRPF",
                        "I.R.P.F.",
                        "IRPF",
                    ],
                ),
            ],
            deduction_prefixes: vec!["DTO.".to_string()],
            withholding_keywords: vec!["I.R.P.F.".to_string()],
            contribution_concepts: vec![
                ConceptAlias::new(
                    "Contingencias comunes",
                    &["CONTINGENCIAS COMUNES", "CONT. COMUNES", "C. COMUNES"],
                ),
                ConceptAlias::new(
                    "Accidentes de trabajo y EP",
                    &["ACCIDENTES DE TRABAJO", "AT Y EP", "AT/EP", "A.T. Y E.P."],
                ),
                ConceptAlias::new("Desempleo", &["DESEMPLEO"]),
                ConceptAlias::new("Formación profesional", &["FORMACION PROFESIONAL", "FORMACION"]),
                ConceptAlias::new("FOGASA", &["FOGASA", "FONDO GARANTIA SALARIAL"]),
                ConceptAlias::new(
                    "Horas extraordinarias",
                    &["HORAS EXTRAORDINARIAS", "HORAS EXTRAS"],
                ),
                ConceptAlias::new("MEI", &["MEI", "MECANISMO EQUIDAD INTERGENERACIONAL"]),
            ],
        }
    }
}

impl Vocabulary {
    /// Canonical spelling for a cleaned concept, if the alias table knows it.
    pub fn canonical_concept(&self, concept: &str) -> Option<&str> {
        let key = concept_key(concept);
        self.concept_aliases
            .iter()
            .find(|alias| alias.variants.iter().any(|v| concept_key(v) == key))
            .map(|alias| alias.canonical.as_str())
    }

    /// Deduction iff the concept begins with a deduction prefix or contains a
    /// withholding keyword. Anything else is an earning.
    pub fn is_deduction(&self, concept: &str) -> bool {
        let key = concept_key(concept);
        self.deduction_prefixes
            .iter()
            .map(|p| concept_key(p))
            .any(|p| !p.is_empty() && key.starts_with(&p))
            || self
                .withholding_keywords
                .iter()
                .map(|k| concept_key(k))
                .any(|k| !k.is_empty() && key.contains(&k))
    }

    /// Map a contribution line's concept text onto the contribution lexicon.
    ///
    /// Matches the longest variant the text starts with, so trailing
    /// descriptors ("CONTINGENCIAS COMUNES EMPRESA") still resolve.
    pub fn contribution_concept(&self, concept: &str) -> Option<&str> {
        let key = concept_key(concept);
        self.contribution_concepts
            .iter()
            .flat_map(|alias| {
                alias
                    .variants
                    .iter()
                    .map(move |v| (concept_key(v), alias.canonical.as_str()))
            })
            .filter(|(variant, _)| !variant.is_empty() && key.starts_with(variant.as_str()))
            .max_by_key(|(variant, _)| variant.len())
            .map(|(_, canonical)| canonical)
    }
}

/// Tolerances for the two numeric consistency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Absolute tolerance for `base × rate / 100 ≈ amount`.
    pub contribution: Decimal,
    /// Absolute tolerance when comparing stated and computed totals.
    pub totals: Decimal,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            contribution: Decimal::new(1, 1),
            totals: Decimal::new(2, 2),
        }
    }
}

/// Full engine configuration, loadable from JSON with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub vocabulary: Vocabulary,
    pub tolerances: Tolerances,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            aliases = config.vocabulary.concept_aliases.len(),
            contributions = config.vocabulary.contribution_concepts.len(),
            "loaded engine config"
        );
        Ok(config)
    }
}

/// Comparison key for concept wording: uppercase, accents folded, and only
/// letters and digits kept, so `Sal. base` and `SAL BASE` collide.
pub fn concept_key(s: &str) -> String {
    fold_upper(s)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Uppercase with Spanish accents folded; punctuation and spacing kept.
///
/// Anchor phrases are written in this form so `Aportación` and `APORTACION`
/// locate the same block.
pub fn fold_upper(s: &str) -> String {
    s.chars().flat_map(char::to_uppercase).map(fold_accent).collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        other => other,
    }
}
