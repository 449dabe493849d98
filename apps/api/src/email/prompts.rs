// All LLM prompt constants for the Email module.

/// System prompt for email writing, enforcing JSON-only output.
pub const EMAIL_SYSTEM: &str = "You are an experienced recruiter who writes clear, respectful, \
    personalised candidate emails. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Email prompt template.
/// Replace: {category_intent}, {candidate_name}, {candidate_email}, {score},
/// {matching_skills}, {missing_skills}, {remarks}, {peer_comparison},
/// {job_title}, {company_name}, {manager_name}
pub const EMAIL_PROMPT_TEMPLATE: &str = r#"{category_intent}

CANDIDATE:
Name: {candidate_name}
Email: {candidate_email}
Match Score: {score}%

RESUME MATCHING SUMMARY:
Matching Skills: {matching_skills}
Growth Areas: {missing_skills}
Remarks: {remarks}
{peer_comparison}
JOB:
Position: {job_title}
Company: {company_name}

SIGN THE EMAIL AS:
{manager_name}, {company_name}

Return ONE JSON object in this EXACT shape (no extra text):
{
  "subject": "Email subject line",
  "body": "Full email body with greeting, paragraphs separated by blank lines, and sign-off",
  "tone": "one or two words describing the tone, e.g. warm, formal, encouraging"
}

RULES:
1. Address the candidate by name and refer to specific skills from the matching summary.
2. Never state the numeric match score or any ranking in the email itself.
3. Never invent experience, interview dates or salary details."#;

pub const INTERVIEW_INTENT: &str = "Write a warm, professional interview invitation. \
Congratulate the candidate on being shortlisted, mention the strengths that made them stand out, \
explain why they fit the role, and propose scheduling an interview with clear next steps.";

pub const REJECTION_INTENT: &str = "Write a respectful rejection email. \
Thank the candidate for their interest, acknowledge their genuine strengths, explain that another \
candidate was selected, frame the growth areas constructively without discouraging them, \
and keep the door open for future opportunities.";

/// Shown when the result carries no skills of a kind.
pub const NONE_IDENTIFIED: &str = "none identified";

/// Position line when the company did not supply a job title.
pub const UNSPECIFIED_POSITION: &str = "the open position";
