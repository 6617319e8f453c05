/// System instruction for label generation.
pub const LABEL_SYSTEM_PROMPT: &str = r#"
You are an AI-powered Resume Evaluator designed to assess how well a candidate's resume matches a given job description. You follow structured evaluation criteria, provide fair assessments, and return responses in a machine-readable format. Your outputs are clear, concise, and logically structured.

Always ensure that:
- Your evaluations are objective, unbiased, and based strictly on the provided inputs.
- Your responses follow a structured JSON format for easy parsing.
- You consider relevant skills, experience, education, and responsibilities while scoring the match.
- Minor differences in wording are accounted for, ensuring fair scoring.

Your primary role is to generate structured resume-job fit assessments that help automate candidate evaluation efficiently.
"#;

/// Build the per-row instruction embedding the resume and job description.
pub fn build_label_prompt(resume: &str, job_description: &str) -> String {
    format!(
        r#"
You are an AI-powered Resume Evaluator, tasked with analyzing how well a given resume matches a specific job description. Your response must be structured and contain a detailed breakdown of the match.

**Instructions:**
- Evaluate the resume against the job description based on multiple factors such as skills, experience, qualifications, and key responsibilities.
- Only return the JSON as output and nothing extra.
- Provide a structured JSON output with the following fields:

**Output Format:**
{{
    "summary": "A brief summary of how well the resume matches the job description.",
    "match_score": "A percentage (0-100) indicating the overall match strength.",
    "skill_match": {{
        "matched": ["List of skills from the JD found in the resume"],
        "missing": ["List of important skills from the JD missing in the resume"],
        "score": "A percentage score (0-100) based on skill relevance."
    }},
    "experience_match": {{
        "matched_years": "Number of years of relevant experience found in the resume.",
        "required_years": "Number of years required as per the JD.",
        "score": "A percentage score (0-100) indicating experience match."
    }},
    "education_match": {{
        "matched_degree": "Degree(s) from the resume that match the JD requirements.",
        "required_degree": "Degree(s) specified in the JD.",
        "score": "A percentage score (0-100) for education match."
    }},
    "responsibility_match": {{
        "matched": ["Key responsibilities from the JD found in the resume"],
        "missing": ["Key responsibilities missing from the resume"],
        "score": "A percentage score (0-100) indicating responsibility match."
    }},
    "final_assessment": "A brief verdict on whether the candidate is a strong, moderate, or weak fit."
}}

**Evaluation Guidelines:**
- Consider exact and semantic similarity while matching skills, experience, and responsibilities.
- Give higher scores for a strong match but ensure fairness in assessment.
- Do not be overly strict; minor variations in terminology should still be considered a match.
- Ensure logical scoring where no single category heavily skews the overall score.

**Now, evaluate the following resume against the job description:**
**Resume:**
{resume}

**Job Description:**
{job_description}

Provide your structured JSON response accordingly.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::labeling::validation::REQUIRED_KEYS;

    #[test]
    fn prompt_embeds_resume_before_job_description() {
        let prompt = build_label_prompt("3 years Python, no cloud experience", "Senior Python Engineer");
        let resume_at = prompt.find("3 years Python, no cloud experience").unwrap();
        let jd_at = prompt.find("Senior Python Engineer").unwrap();
        assert!(resume_at < jd_at);
    }

    #[test]
    fn prompt_lists_every_required_key() {
        let prompt = build_label_prompt("r", "j");
        for key in REQUIRED_KEYS {
            assert!(prompt.contains(&format!("\"{key}\"")), "prompt lacks {key}");
        }
        assert!(prompt.contains("\"final_assessment\""));
    }

    #[test]
    fn braces_in_inputs_are_not_interpreted() {
        let prompt = build_label_prompt("{resume}", "{{jd}}");
        assert!(prompt.contains("{resume}"));
        assert!(prompt.contains("{{jd}}"));
    }

    #[test]
    fn system_prompt_asks_for_json() {
        assert!(LABEL_SYSTEM_PROMPT.contains("JSON"));
    }
}
