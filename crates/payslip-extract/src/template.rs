//! Layout classification.
//!
//! Most structure is shared across the known payslip layouts, so the only
//! thing a template decides is which additional anchor phrases bound the
//! employer-contribution block. Classification is a pure scan for
//! template-distinguishing marker phrases.

use payslip_core::{ExtractError, TemplateId, fold_upper};

/// Contribution-block start anchors every template accepts.
const GENERAL_CONTRIBUTION_START: &[&str] = &[
    "APORTACION DE LA EMPRESA",
    "APORTACION EMPRESA",
    "APORTACIONES DE LA EMPRESA",
    "CONTRIBUCION EMPRESARIAL",
];

/// Withholding-base anchors closing the contribution block.
const GENERAL_CONTRIBUTION_END: &[&str] = &[
    "BASE SUJETA A RETENCION",
    "BASE I.R.P.F.",
    "BASE IRPF",
];

/// Phrases any payslip carries. Text with none of these is not a layout we know.
const PAYSLIP_LANDMARKS: &[&str] = &[
    "NOMINA",
    "RECIBO DE SALARIO",
    "RECIBO INDIVIDUAL",
    "PERIODO DE LIQUIDACION",
    "TRABAJADOR",
    "DEVENGOS",
    "DEDUCCIONES",
    "LIQUIDO",
];

/// Anchor configuration for one layout variant.
#[derive(Debug)]
pub struct TemplateProfile {
    pub id: TemplateId,
    markers: &'static [&'static str],
    extra_start: &'static [&'static str],
    extra_end: &'static [&'static str],
}

impl TemplateProfile {
    /// Template-specific start anchors first, then the general ones.
    pub fn contribution_start(&self) -> Vec<&'static str> {
        self.extra_start
            .iter()
            .chain(GENERAL_CONTRIBUTION_START)
            .copied()
            .collect()
    }

    pub fn contribution_end(&self) -> Vec<&'static str> {
        self.extra_end
            .iter()
            .chain(GENERAL_CONTRIBUTION_END)
            .copied()
            .collect()
    }
}

// Order matters: the first profile whose marker appears wins.
static PROFILES: &[TemplateProfile] = &[
    TemplateProfile {
        id: TemplateId::BaseDetermination,
        markers: &["DETERMINACION DE LAS BASES"],
        extra_start: &["DETERMINACION DE LAS BASES", "CONCEPTOS DE RECAUDACION CONJUNTA"],
        extra_end: &[],
    },
    TemplateProfile {
        id: TemplateId::CostSummary,
        markers: &["COSTE EMPRESA", "SEGURIDAD SOCIAL A CARGO DE LA EMPRESA"],
        extra_start: &["COSTE EMPRESA", "SEGURIDAD SOCIAL A CARGO DE LA EMPRESA"],
        extra_end: &["COSTE TOTAL", "TOTAL COSTE"],
    },
];

static GENERAL: TemplateProfile = TemplateProfile {
    id: TemplateId::General,
    markers: &[],
    extra_start: &[],
    extra_end: &[],
};

/// Select the layout governing `text`.
///
/// Plausible payslip text without a specific marker is `General`. Text with
/// no payslip landmark at all is `UnrecognizedTemplate`; callers fall back
/// to `General` and keep the error as a warning.
pub fn classify(text: &str) -> Result<TemplateId, ExtractError> {
    let folded = fold_upper(text);

    if let Some(profile) = PROFILES
        .iter()
        .find(|p| p.markers.iter().any(|m| folded.contains(m)))
    {
        return Ok(profile.id);
    }

    if PAYSLIP_LANDMARKS.iter().any(|l| folded.contains(l)) {
        Ok(TemplateId::General)
    } else {
        Err(ExtractError::UnrecognizedTemplate)
    }
}

/// Anchor configuration for a template id.
pub fn profile(id: TemplateId) -> &'static TemplateProfile {
    PROFILES.iter().find(|p| p.id == id).unwrap_or(&GENERAL)
}
