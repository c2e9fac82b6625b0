
use std::collections::HashSet;
use tracing::warn;

use crate::config::Config;
use crate::groq::{ChatMessage, GroqClient};

pub const NO_OVERLAP_ANSWER: &str = "I found some potentially relevant information, but cannot \
    provide a specific answer to your question based on the available context.";

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAnswer {
    pub text: String,
    pub source: AnswerSource,
}

/// Turns a question plus retrieved context into a natural-language answer.
/// Implementations must be infallible: upstream failures degrade to a local
/// best-effort answer instead of propagating.
pub trait AnswerSynthesizer {
    fn generate_answer(&self, question: &str, context: &str) -> SynthesizedAnswer;
}

/// Groq-backed synthesizer with a deterministic keyword-overlap fallback.
#[derive(Debug, Clone)]
pub struct GroqAnswerer {
    client: Option<GroqClient>,
    max_tokens: u32,
    temperature: f32,
}

impl GroqAnswerer {
    #[inline]
    pub fn new(config: &Config) -> Self {
        let client = Config::groq_api_key().map(|key| GroqClient::new(config, key));
        if client.is_none() {
            warn!("GROQ_API_KEY not found, answers will use the local fallback path");
        }

        Self {
            client,
            max_tokens: config.groq.max_answer_tokens,
            temperature: config.groq.temperature,
        }
    }

    /// Synthesizer pinned to the local fallback path.
    #[inline]
    pub fn fallback_only() -> Self {
        Self {
            client: None,
            max_tokens: 0,
            temperature: 0.0,
        }
    }

    fn build_prompt(question: &str, context: &str) -> String {
        format!(
            "Based on the following context, answer the question accurately and concisely.\n\
             \n\
             Context:\n\
             {context}\n\
             \n\
             Question: {question}\n\
             \n\
             Instructions:\n\
             - Use only the information provided in the context\n\
             - If the context doesn't contain enough information, say so\n\
             - Provide a clear, well-structured answer\n\
             - Include relevant details from the context\n\
             \n\
             Answer:"
        )
    }
}

impl AnswerSynthesizer for GroqAnswerer {
    #[inline]
    fn generate_answer(&self, question: &str, context: &str) -> SynthesizedAnswer {
        if let Some(client) = &self.client {
            let prompt = Self::build_prompt(question, context);
            let messages = [ChatMessage::user(prompt)];

            match client.chat(&messages, self.max_tokens, self.temperature) {
                Ok(text) if !text.is_empty() => {
                    return SynthesizedAnswer {
                        text,
                        source: AnswerSource::Remote,
                    };
                }
                Ok(_) => warn!("Remote answer was empty, degrading to fallback"),
                Err(error) => {
                    warn!("Remote answer generation failed, degrading to fallback: {:#}", error);
                }
            }
        }

        SynthesizedAnswer {
            text: fallback_answer(question, context),
            source: AnswerSource::Fallback,
        }
    }
}

/// Best-effort local answer: rank context sentences by word overlap with
/// the question and stitch the top two together.
#[inline]
pub fn fallback_answer(question: &str, context: &str) -> String {
    let question_lower = question.to_lowercase();
    let question_words: HashSet<&str> = question_lower.split_whitespace().collect();

    let mut ranked: Vec<(&str, usize)> = Vec::new();
    for sentence in context.split('.') {
        let sentence_lower = sentence.to_lowercase();
        let overlap = sentence_lower
            .split_whitespace()
            .collect::<HashSet<&str>>()
            .intersection(&question_words)
            .count();
        if overlap > 0 {
            ranked.push((sentence.trim(), overlap));
        }
    }

    // Stable sort keeps context order for equally relevant sentences.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    if ranked.is_empty() {
        return NO_OVERLAP_ANSWER.to_string();
    }

    let answer = ranked
        .iter()
        .take(2)
        .map(|(sentence, _)| *sentence)
        .collect::<Vec<_>>()
        .join(". ");

    format!("Based on the available context: {answer}")
}
