//! Typed view of the analysis the model is instructed to emit.
//!
//! Every field is optional: the model's adherence is advisory. The types
//! tolerate the variants the model is known to produce (a project
//! description as a list, education years as numbers).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const STATUS_RECOMMENDED: &str = "recommended";
pub const STATUS_NOT_RECOMMENDED: &str = "not recommended";

#[derive(Debug, Error, PartialEq)]
pub enum SchemaViolation {
    #[error("analysis must be a JSON object")]
    NotAnObject,

    #[error("analysis does not match the schema: {0}")]
    Shape(String),

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("evaluation '{role}' has unknown status '{status}'")]
    UnknownStatus { role: String, status: String },
}

/// A string, or a list of strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TextOrList {
    Text(String),
    List(Vec<String>),
}

/// A string or a bare number (years, percentages, CGPA).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalInformation {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub start_date: Option<Scalar>,
    pub end_date: Option<Scalar>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: Option<String>,
    pub description: Option<TextOrList>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillScore {
    pub skill: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub college: Option<String>,
    pub degree: Option<String>,
    pub start_year: Option<Scalar>,
    pub end_year: Option<Scalar>,
    pub percentage: Option<Scalar>,
    pub cgpa: Option<Scalar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEvaluation {
    pub score: f64,
    pub status: String,
    #[serde(rename = "matchedSkills")]
    pub matched_skills: Option<TextOrList>,
    pub missing: Option<TextOrList>,
    pub suggest: Option<TextOrList>,
    pub summary: Option<String>,
}

impl RoleEvaluation {
    pub fn is_recommended(&self) -> Option<bool> {
        match self.status.trim().to_lowercase().as_str() {
            STATUS_RECOMMENDED => Some(true),
            STATUS_NOT_RECOMMENDED => Some(false),
            _ => None,
        }
    }
}

/// The full analysis. Role evaluations are keyed by the role title copied
/// from the job description; entries stay untyped so role order survives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(rename = "candidateName")]
    pub candidate_name: Option<String>,
    pub personal_information: Option<PersonalInformation>,
    pub summary: Option<String>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub skills: Vec<SkillScore>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub overall_score: Option<f64>,
    pub overall_summary: Option<String>,
    #[serde(default)]
    pub evaluations: Vec<Map<String, Value>>,
    pub resume_styling_score: Option<f64>,
}

impl Analysis {
    /// Every (role, evaluation) pair in document order.
    pub fn roles(&self) -> Result<Vec<(&str, RoleEvaluation)>, serde_json::Error> {
        self.evaluations
            .iter()
            .flat_map(|entry| entry.iter())
            .map(|(role, evaluation)| {
                RoleEvaluation::deserialize(evaluation).map(|parsed| (role.as_str(), parsed))
            })
            .collect()
    }
}

fn check_range(field: String, value: f64, min: f64, max: f64) -> Result<(), SchemaViolation> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SchemaViolation::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Parses and range-checks a value against the analysis schema.
pub fn validate_analysis(value: &Value) -> Result<Analysis, SchemaViolation> {
    if !value.is_object() {
        return Err(SchemaViolation::NotAnObject);
    }
    let analysis: Analysis = serde_json::from_value(value.clone())
        .map_err(|e| SchemaViolation::Shape(e.to_string()))?;

    if let Some(score) = analysis.overall_score {
        check_range("overall_score".to_string(), score, 0.0, 100.0)?;
    }
    if let Some(score) = analysis.resume_styling_score {
        check_range("resume_styling_score".to_string(), score, 0.0, 10.0)?;
    }
    for skill in &analysis.skills {
        check_range(format!("skills[{}].score", skill.skill), skill.score, 0.0, 10.0)?;
    }
    let roles = analysis
        .roles()
        .map_err(|e| SchemaViolation::Shape(e.to_string()))?;
    for (role, evaluation) in &roles {
        check_range(format!("evaluations[{role}].score"), evaluation.score, 0.0, 100.0)?;
        if evaluation.is_recommended().is_none() {
            return Err(SchemaViolation::UnknownStatus {
                role: role.to_string(),
                status: evaluation.status.clone(),
            });
        }
    }

    Ok(analysis)
}

/// Roles whose status disagrees with `score >= threshold`.
///
/// The model is told the rule but nothing forces it to follow it; this only
/// reports, it never rewrites the stored analysis.
pub fn threshold_mismatches(value: &Value, threshold: u8) -> Vec<String> {
    let Ok(analysis) = serde_json::from_value::<Analysis>(value.clone()) else {
        return Vec::new();
    };
    let Ok(roles) = analysis.roles() else {
        return Vec::new();
    };
    roles
        .into_iter()
        .filter(|(_, evaluation)| match evaluation.is_recommended() {
            Some(recommended) => recommended != (evaluation.score >= f64::from(threshold)),
            None => false,
        })
        .map(|(role, _)| role.to_string())
        .collect()
}
