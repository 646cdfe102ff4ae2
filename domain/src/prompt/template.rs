//! Prompt templates for each council stage

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for Stage 1 - preserve topical continuity across turns
    pub fn stage1_system() -> &'static str {
        "You are participating in an ongoing user conversation. \
         Use prior turns to preserve context and subject continuity, \
         unless the user explicitly changes topic."
    }

    /// Instruction appended to the user turn when attachments are present
    pub fn attachment_instruction() -> &'static str {
        "File context is attached to this message. \
         Use the attached files as primary context for your answer. \
         If any attachment cannot be read, state that clearly."
    }

    /// Stage-1 user text: the query, optionally augmented with the
    /// attachment instruction and a compact attachment summary.
    pub fn stage1_user_text(query: &str, attachment_summary: Option<&str>) -> String {
        let base = query.trim();
        let Some(summary) = attachment_summary else {
            return base.to_string();
        };

        let instruction = if summary.is_empty() {
            Self::attachment_instruction().to_string()
        } else {
            format!("{}\n\n{}", Self::attachment_instruction(), summary)
        };

        if base.is_empty() {
            instruction
        } else {
            format!("{}\n\n{}", base, instruction)
        }
    }

    /// Stage-2 evaluation prompt over anonymized responses.
    ///
    /// The format requirement is strict on purpose: the parser keys on the
    /// literal `FINAL RANKING:` line.
    pub fn ranking_prompt(
        query: &str,
        context: Option<&str>,
        responses: &[(String, String)],
    ) -> String {
        let responses_text = responses
            .iter()
            .map(|(label, text)| format!("{}:\n{}", label, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let context_block = match context {
            Some(text) if !text.is_empty() => {
                format!("Conversation Context (previous turns):\n{}\n\n", text)
            }
            _ => String::new(),
        };

        format!(
            r#"You are evaluating different responses to the following question:

{context_block}Current Question: {query}

Here are the responses from different models (anonymized):

{responses_text}

Your task:
1. First, evaluate each response individually. For each response, explain what it does well and what it does poorly.
2. Then, at the very end of your response, provide a final ranking.

IMPORTANT: Your final ranking MUST be formatted EXACTLY as follows:
- Start with the line "FINAL RANKING:" (all caps, with colon)
- Then list the responses from best to worst as a numbered list
- Each line should be: number, period, space, then ONLY the response label (e.g., "1. Response A")
- Do not add any other text or explanations in the ranking section

Example of the correct format for your ENTIRE response:

Response A provides good detail on X but misses Y...
Response B is accurate but lacks depth on Z...
Response C offers the most comprehensive answer...

FINAL RANKING:
1. Response C
2. Response A
3. Response B

Now provide your evaluation and ranking:"#
        )
    }

    /// Stage-3 chairman prompt embedding all responses and rankings.
    pub fn synthesis_prompt(
        query: &str,
        context: Option<&str>,
        responses: &[(String, String)],
        rankings: &[(String, String)],
    ) -> String {
        let stage1_text = responses
            .iter()
            .map(|(model, text)| format!("Model: {}\nResponse: {}", model, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let stage2_text = rankings
            .iter()
            .map(|(model, text)| format!("Model: {}\nRanking: {}", model, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let context_block = match context {
            Some(text) if !text.is_empty() => {
                format!("Conversation Context (previous turns):\n{}\n\n", text)
            }
            _ => String::new(),
        };

        format!(
            r#"You are the Chairman of an LLM Council. Multiple AI models have provided responses to a user's question, and then ranked each other's responses.

{context_block}Current Question: {query}

STAGE 1 - Individual Responses:
{stage1_text}

STAGE 2 - Peer Rankings:
{stage2_text}

Your task as Chairman is to synthesize all of this information into a single, comprehensive, accurate answer to the user's original question. Consider:
- The individual responses and their insights
- The peer rankings and what they reveal about response quality
- Any patterns of agreement or disagreement

Provide a clear, well-reasoned final answer that represents the council's collective wisdom:"#
        )
    }

    /// Title generation prompt for a conversation's first user message.
    pub fn title_prompt(query: &str) -> String {
        format!(
            r#"Generate a very short title (3-5 words maximum) that summarizes the following question.
The title should be concise and descriptive. Do not use quotes or punctuation in the title.

Question: {query}

Title:"#
        )
    }
}
