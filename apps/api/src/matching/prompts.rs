// All LLM prompt constants for the Matching module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for résumé evaluation, enforcing JSON-only output.
pub const MATCH_SYSTEM: &str = "You are an expert technical recruiter and talent analyst. \
    You evaluate how well a candidate fits a job using only the evidence in their resume. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Matching prompt template.
/// Replace: {requirements_summary}, {jd_text}, {resume_text}
pub const MATCH_PROMPT_TEMPLATE: &str = r#"Evaluate how well the candidate below fits the job.

JOB REQUIREMENTS SUMMARY:
{requirements_summary}

FULL JOB DESCRIPTION:
{jd_text}

CANDIDATE RESUME:
{resume_text}

Return ONE JSON object in this EXACT shape (no extra text):
{
  "skillsMatch": 0,
  "experienceLevel": 0,
  "educationRelevance": 0,
  "overallFit": 0,
  "matchingSkills": ["Skill1", "Skill2"],
  "missingSkills": ["Skill3"],
  "remarks": "2-3 sentences on overall fit with key strengths and weaknesses."
}

SCORING RULES:
1. Every score is an independent number from 0 to 100. Do NOT return an overall or total score.
   - skillsMatch: alignment of explicit and implied skills (tools, technologies, described work) with the requirements.
     Partial overlap must score strictly between 0 and 100.
   - experienceLevel: whether the duration and relevance of experience match the role's expectations.
   - educationRelevance: whether the educational background supports the job domain.
   - overallFit: overall impression, versatility and alignment with the role.
2. Score interpretation: 90-100 excellent, 75-89 strong, 60-74 good, 40-59 moderate, 0-39 poor.
3. matchingSkills: skills required by the job that the resume demonstrates directly or through closely related work.
4. missingSkills: ONLY skills present in the job description but absent from the resume.
5. Base every judgement on the resume text. Do NOT invent experience."#;

/// Used when the job carries no structured fields.
pub const NO_STRUCTURED_REQUIREMENTS: &str =
    "No structured requirements provided; infer them from the full job description.";
