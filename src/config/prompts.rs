//! Prompt assembly for the study assistant
//!
//! Every provider receives the same prompt: a system preamble (persona,
//! subject, language, exam mode, recent memory) followed by the student's
//! message and any attached subject material.

use crate::core::ChatRequest;

/// Answer style requested by the student
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExamMode {
    #[default]
    Normal,
    Teacher,
    TwoMarks,
    FiveMarks,
    EightMarks,
}

impl ExamMode {
    /// Parse a mode name, falling back to [`ExamMode::Normal`] for anything unknown
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "teacher" => Self::Teacher,
            "2marks" => Self::TwoMarks,
            "5marks" => Self::FiveMarks,
            "8marks" => Self::EightMarks,
            _ => Self::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Teacher => "teacher",
            Self::TwoMarks => "2marks",
            Self::FiveMarks => "5marks",
            Self::EightMarks => "8marks",
        }
    }

    fn tone(&self) -> &'static str {
        match self {
            Self::Teacher => builtin::TEACHER_TONE,
            _ => builtin::MENTOR_TONE,
        }
    }

    fn format(&self) -> &'static str {
        match self {
            Self::TwoMarks => "short 2-3 sentences max, exam-style",
            Self::FiveMarks => "structured paragraph with 5 key points",
            Self::EightMarks => "detailed essay style with introduction, body, conclusion",
            _ => "concise and clear bullet points",
        }
    }
}

/// A fully assembled prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System preamble on its own, for providers that take it separately
    pub preamble: String,
    /// The raw student message
    pub message: String,
    /// Preamble, message and attachments as one string
    pub text: String,
}

/// Build the prompt for a request, given the persona name and loaded memory
pub fn build_prompt(persona: &str, request: &ChatRequest, memory: &str) -> Prompt {
    let mode = request.exam_mode;

    let preamble = format!(
        "You are {persona}\n\
         Role: {tone}\n\
         Subject: {subject}\n\
         Language: {language}\n\
         Exam Mode: {mode}\n\
         Goal/Target: {goal}\n\
         Format Requirement: {format}\n\
         \n\
         Context History:\n\
         {memory}\n\
         \n\
         {instructions}",
        tone = mode.tone(),
        subject = request.subject,
        language = request.language,
        mode = mode.as_str(),
        goal = request.goal,
        format = mode.format(),
        instructions = builtin::INSTRUCTIONS,
    );

    let mut text = format!("{}\n\nStudent: {}", preamble, request.message);

    if !request.large_subjects.is_empty() {
        let attached = request
            .large_subjects
            .iter()
            .map(|s| format!("[{}]: {}", s.name, s.content))
            .collect::<Vec<_>>()
            .join("\n");
        text.push_str("\n\nAdditional Context (Large Subjects):\n");
        text.push_str(&attached);
    }

    Prompt {
        preamble,
        message: request.message.clone(),
        text,
    }
}

/// Built-in prompt fragments
pub mod builtin {
    pub const MENTOR_TONE: &str = "friendly, encouraging, and exam-focused mentor";

    pub const TEACHER_TONE: &str = "strict, formal, precise teacher, Indian syllabus aware";

    pub const INSTRUCTIONS: &str = r#"Instructions:
1. Be Indian-context aware (CBSE/ICSE/NBSE/state boards style).
2. Always include friendly, motivating, syllabus-aligned advice.
3. If the message contains file text or PDF content, analyze it first.
4. For passage generation, create unique reading comprehension passages with questions."#;
}
