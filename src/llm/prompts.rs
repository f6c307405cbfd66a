use crate::llm::GenerationRequest;
use crate::models::{EvidenceDocument, SpendRecord};

/// Number of forward-looking programs the model is asked for
pub const RECOMMENDATION_COUNT: usize = 3;

/// System instruction framing the drafting model
pub const SYSTEM_INSTRUCTION: &str = r#"You are a sponsorship strategist preparing a personalized renewal proposal for a long-standing business partner.

RULES:
1. Base every statement about past giving on the spend data provided. Do not invent amounts.
2. Use the attached reference documents as evidence for program details, outcomes and upcoming opportunities.
3. Keep the tone warm, specific and professional. Avoid generic fundraising language.
4. Output MUST be valid JSON matching the provided schema. Do not wrap it in markdown."#;

/// Build the drafting request for one business and the accumulated evidence
pub fn build_proposal_request(
    record: &SpendRecord,
    evidence: &[EvidenceDocument],
) -> GenerationRequest {
    GenerationRequest {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt: build_proposal_prompt(record, evidence),
        attachments: evidence.to_vec(),
        response_schema: proposal_schema(),
    }
}

/// Build the user prompt: spend data followed by the task instructions
pub fn build_proposal_prompt(record: &SpendRecord, evidence: &[EvidenceDocument]) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# Business: {}\n", record.business_name()));
    prompt.push_str(&format!(
        "Total historical spend: {}\n\n",
        format_currency(record.total_spend())
    ));

    prompt.push_str("## Spend by Product\n");
    for (product, amount) in record.products() {
        prompt.push_str(&format!("- {}: {}\n", product, format_currency(*amount)));
    }
    prompt.push('\n');

    if !evidence.is_empty() {
        prompt.push_str("## Attached Reference Documents\n");
        for doc in evidence {
            prompt.push_str(&format!("- {} ({})\n", doc.name, doc.mime_type));
        }
        prompt.push('\n');
    }

    prompt.push_str("## Instructions\n");
    prompt.push_str(
        "1. In `summary`, summarize the prior relationship with this business in a short paragraph.\n",
    );
    prompt.push_str(
        "2. In `analysis`, describe what the spend pattern says about the partner's priorities.\n",
    );
    prompt.push_str(
        "3. In `sponsorshipReviews`, write one entry per product listed above, in the same order, \
         with a brief narrative of the impact that spend made.\n",
    );
    prompt.push_str(&format!(
        "4. In `recommendations`, identify exactly {} forward-looking programs this business should \
         sponsor next. If the reference documents describe specific named recurring programs, \
         prefer three of those over generic ideas.\n",
        RECOMMENDATION_COUNT
    ));
    prompt.push_str(
        "5. For every review and recommendation, add an `imagePrompt`: one sentence describing a \
         photograph that would illustrate it. No text, logos or faces in the image.\n",
    );

    prompt
}

/// Output contract for the drafting response
pub fn proposal_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "Summary of the prior sponsorship relationship"
            },
            "analysis": {
                "type": "STRING",
                "description": "What the spend pattern says about the partner"
            },
            "sponsorshipReviews": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING", "description": "Product name from the spend data"},
                        "amount": {"type": "NUMBER", "description": "Historical spend on the product"},
                        "narrative": {"type": "STRING", "description": "Brief impact narrative"},
                        "imagePrompt": {"type": "STRING", "description": "Description of an illustrative photograph"}
                    },
                    "required": ["name", "amount", "narrative"]
                }
            },
            "recommendations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "program": {"type": "STRING", "description": "Name of the recommended program"},
                        "reasoning": {"type": "STRING", "description": "Why this program fits the partner"},
                        "suggestedInvestment": {"type": "STRING", "description": "Suggested investment, e.g. \"$5,000\""},
                        "imagePrompt": {"type": "STRING", "description": "Description of an illustrative photograph"}
                    },
                    "required": ["program", "reasoning", "suggestedInvestment"]
                }
            }
        },
        "required": ["summary", "analysis", "sponsorshipReviews", "recommendations"]
    })
}

/// Format an amount as US dollars with thousands separators, e.g. `$1,500.00`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}
