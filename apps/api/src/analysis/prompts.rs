//! Prompt Builder for resume-vs-job-description analysis.
//!
//! The wording below is a behavioral contract with the model: the normalizer
//! and every consumer assume the model was told these rules. Bump
//! `PROMPT_VERSION` whenever the template changes.

pub const PROMPT_VERSION: &str = "resume-fit/v2";

/// Default recommendation threshold when the caller does not supply one.
pub const DEFAULT_THRESHOLD: u8 = 70;

pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the RESUME below and evaluate it against every role described in the JOB DESCRIPTION below. Extract structured information from the resume once, then assess the candidate's fit for each role.

===== RESUME (verbatim) =====
{resume_text}
===== END RESUME =====

===== JOB DESCRIPTION (verbatim) =====
{job_description}
===== END JOB DESCRIPTION =====

1. RESUME PARSING
   Extract these sections from the resume:
   - Personal information: name, email, phone, linkedin.
   - Summary: a brief professional summary or objective.
   - Work experience: company, job_title, start_date, end_date, responsibilities (list), achievements (list).
   - Projects: name, description.
   - Skills: a list of {"skill", "score"} objects. Score each skill 0-10 from years of experience, number of projects, and the proficiency shown in the resume.
   - Education: college, degree, start_year, end_year, percentage or cgpa.
   - Certifications: a list of strings.

2. RESUME SCORES
   - overall_score (integer 0-100): skills relevance, grammar quality, vocabulary, and formatting clarity.
   - resume_styling_score (integer 0-10): vocabulary, grammar, and formatting.

3. EVALUATION OF EACH ROLE
   For each role in the job description, copy the role title EXACTLY as it appears in the job description. Keep it short and use the identical title every time. Never invent or rephrase a title.
   - score (integer 0-100): relevance and ACTUAL USAGE of the role's required skills.
     A skill counts only when it is evidenced by use in work experience or projects. A skill that appears only in a skills list is insufficient evidence and must not raise the score.
     Also weigh years of experience and the context of usage (roles, projects, certifications).
   - status: If score >= {threshold}, status MUST be "recommended". If score < {threshold}, status MUST be "not recommended". Apply this rule mechanically, even when the resume is not fully aligned.
   - matchedSkills: up to 3 top skills from the resume that the role requires.
   - missing: up to 5 key skills the role requires that are missing or insufficiently demonstrated.
   - suggest: specific, actionable recommendations to better align the resume with the role.
   - summary: a clear explanation of fit. If status is "recommended" but alignment is weak, state explicitly "Resume is not aligned with the JD".

4. OVERALL SUMMARY (mandatory)
   overall_summary must state which role the candidate is best suited for and why.

5. OUTPUT FORMAT
   Return ONLY a JSON object with exactly these keys and types:
{
  "candidateName": "string",
  "personal_information": {"name": "string", "email": "string", "phone": "string", "linkedin": "string"},
  "summary": "string",
  "work_experience": [
    {"company": "string", "job_title": "string", "start_date": "string", "end_date": "string", "responsibilities": ["string"], "achievements": ["string"]}
  ],
  "projects": [{"name": "string", "description": "string"}],
  "skills": [{"skill": "string", "score": 0}],
  "education": [
    {"college": "string", "degree": "string", "start_year": "string", "end_year": "string", "percentage": "string"},
    {"college": "string", "degree": "string", "start_year": "string", "end_year": "string", "cgpa": "string"}
  ],
  "certifications": ["string"],
  "overall_score": 0,
  "overall_summary": "string",
  "evaluations": [
    {"<role title copied from the job description>": {"score": 0, "status": "recommended | not recommended", "matchedSkills": "string", "missing": "string", "suggest": "string", "summary": "string"}}
  ],
  "resume_styling_score": 0
}

6. RULES
   - Treat the resume as a single document and base every value only on the resume and the job description.
   - Use one evaluations element per role, keyed by the role title.
   - If the candidate's name cannot be determined, set candidateName to "Unknown".
   - If an optional field (for example linkedin, phone, achievements) is not present in the resume, use an empty string "" or an empty list [] as appropriate. Never omit a key.
   - Keep every key exactly as shown above.
   - Return ONLY the JSON object, nothing else."#;

/// Renders the analysis prompt. Pure and deterministic: identical inputs
/// always produce a byte-identical prompt.
pub fn build_analysis_prompt(resume_text: &str, job_description_text: &str, threshold: u8) -> String {
    let threshold = threshold.to_string();
    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("resume_text", resume_text),
            ("job_description", job_description_text),
            ("threshold", &threshold),
        ],
    )
}

/// Single-pass `{name}` substitution. Values are never re-scanned, so
/// placeholder-like text inside a document is embedded verbatim.
fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
