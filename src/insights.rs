//! Narrative generation: report insights and chat replies.
//!
//! Both go through the text-completion oracle. Narrative failures never
//! propagate: the caller always gets usable text, falling back to a fixed
//! string when the oracle is down, so a report can still be delivered
//! without a narrative.

use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::oracle::CompletionOracle;

/// Fallback shown when insight generation fails.
pub const INSIGHTS_FALLBACK: &str = "Insights are temporarily unavailable for this report. \
The risk score and bureau data are unaffected.";

/// Fallback shown when a chat reply cannot be generated.
pub const CHAT_FALLBACK: &str =
    "I could not generate a reply just now. Please ask again in a moment.";

pub struct InsightGenerator {
    oracle: Arc<dyn CompletionOracle>,
}

impl InsightGenerator {
    pub fn new(oracle: Arc<dyn CompletionOracle>) -> Self {
        Self { oracle }
    }

    /// Generate the markdown narrative for a scored profile. Degrades to
    /// [`INSIGHTS_FALLBACK`] on any oracle error.
    pub async fn generate(&self, risk_score: f64, data: &Value) -> String {
        let prompt = build_insights_prompt(risk_score, data);

        match self.oracle.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Narrative generation failed, using fallback: {}", e);
                INSIGHTS_FALLBACK.to_string()
            }
        }
    }

    /// Generate one chat reply for a follow-up question, with the running
    /// insights and report id as context. Degrades to [`CHAT_FALLBACK`].
    pub async fn chat_reply(
        &self,
        report_id: &str,
        insights: Option<&str>,
        question: &str,
    ) -> String {
        let prompt = build_chat_prompt(report_id, insights, question);

        match self.oracle.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Chat reply generation failed for {}, using fallback: {}",
                    report_id, e
                );
                CHAT_FALLBACK.to_string()
            }
        }
    }
}

fn build_insights_prompt(risk_score: f64, data: &Value) -> String {
    format!(
        r#"You are an expert in credit risk analysis and loan underwriting.
You will be provided with a customer's credit profile, including their credit history, financial ratios, and employment details.

### Task:
Analyze the provided data and generate insights, highlighting key risk factors, strengths, and recommendations for loan approval or rejection.

### Customer's Risk Assessment:
- **Aggregated Risk Score:** {risk_score}

### Customer's Financial & Credit Profile:
{profile}

### Instructions:
1. **Format Profile as Table:** Convert the customer's financial & credit profile into a well-structured markdown table, grouping related data points under informative headers and interpreting credit scores against their bureau's score range.
2. **Identify Strengths:** Highlight positive indicators that support creditworthiness.
3. **Assess Risks:** Identify potential red flags that increase the likelihood of default.
4. **Provide Recommendations:** Offer actionable suggestions, such as loan approval terms or risk mitigation strategies.
5. **Format:** Present the insights in well-structured **Markdown** with proper headings and bullet points.
6. **Output:** Keep the report concise and clear, focusing on key findings and recommendations.

Now, generate a detailed markdown report based on this analysis.
"#,
        risk_score = risk_score,
        profile = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
    )
}

fn build_chat_prompt(report_id: &str, insights: Option<&str>, question: &str) -> String {
    let context = match insights {
        Some(text) => format!("### Report Insights:\n{}\n", text),
        None => "### Report Insights:\n(none generated yet)\n".to_string(),
    };

    format!(
        r#"You are a credit-risk assistant answering follow-up questions about one specific report.

### Report ID: {report_id}
{context}
### Question:
{question}

Answer concisely, grounded only in the report context above. If the report does not contain the answer, say so.
"#,
        report_id = report_id,
        context = context,
        question = question,
    )
}
