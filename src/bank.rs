use serde::Deserialize;
use serde_json::error::Category;
use std::{
    collections::HashMap,
    fmt::{self, Display},
    fs, io,
    path::Path,
};

/// A single entry of the question bank.
#[derive(Clone, Deserialize)]
pub struct Question {
    /// Question to be displayed in chat.
    pub question: String,
    /// Possible answers keyed by their choice key.
    pub choices: HashMap<String, String>,
    /// Choice key of the correct answer. Must exist in `choices`.
    pub answer: String,
}

impl Question {
    /// Display text of the correct choice.
    pub fn correct_text(&self) -> &str {
        self.choices.get(&self.answer).map_or(self.answer.as_str(), String::as_str)
    }
}

#[derive(Deserialize)]
struct Exam {
    #[serde(default)]
    true_false: Vec<Question>,
    #[serde(default)]
    multiple_choice: Vec<Question>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "Exam")]
    exam: Exam,
}

#[derive(Debug)]
pub enum Error {
    /// The bank file could not be read.
    Io(io::Error),
    /// JSON syntax error detected.
    Syntax,
    /// Unexpected JSON data types encountered.
    Data,
    /// A question's answer key is absent from its choices.
    UnknownAnswer(Box<str>),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => Self::Data,
            _ => Self::Syntax,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read the question bank: {err}"),
            Self::Syntax => f.write_str("syntax error in the question bank"),
            Self::Data => f.write_str("unexpected data types in the question bank"),
            Self::UnknownAnswer(question) => {
                write!(f, "answer key not found among the choices of: {question}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Loads the question bank from disk. True/false questions precede
/// multiple-choice questions in the returned order.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Question>> {
    let data = fs::read(path)?;
    parse(&data)
}

fn parse(data: &[u8]) -> Result<Vec<Question>> {
    let Document { exam: Exam { true_false, multiple_choice } } = serde_json::from_slice(data)?;
    let mut questions = true_false;
    questions.extend(multiple_choice);
    for question in &questions {
        if !question.choices.contains_key(&question.answer) {
            return Err(Error::UnknownAnswer(question.question.clone().into_boxed_str()));
        }
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_categories_in_order() {
        let questions = parse(
            br#"{
                "Exam": {
                    "true_false": [
                        {"question": "The sky is blue.", "choices": {"t": "True", "f": "False"}, "answer": "t"},
                        {"question": "Fire is cold.", "choices": {"t": "True", "f": "False"}, "answer": "f"}
                    ],
                    "multiple_choice": [
                        {"question": "Capital of France?", "choices": {"a": "Paris", "b": "Lyon"}, "answer": "a"}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].question, "The sky is blue.");
        assert_eq!(questions[1].question, "Fire is cold.");
        assert_eq!(questions[2].question, "Capital of France?");
    }

    #[test]
    fn tolerates_missing_category() {
        let questions = parse(
            br#"{
                "Exam": {
                    "multiple_choice": [
                        {"question": "2 + 2?", "choices": {"a": "3", "b": "4"}, "answer": "b"}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_text(), "4");
    }

    #[test]
    fn rejects_invalid_syntax() {
        assert!(matches!(parse(b"{not json"), Err(Error::Syntax)));
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(matches!(parse(br#"{"Exam": {"true_false": 42}}"#), Err(Error::Data)));
    }

    #[test]
    fn rejects_unknown_answer_key() {
        let result = parse(
            br#"{
                "Exam": {
                    "true_false": [
                        {"question": "Water is wet.", "choices": {"t": "True", "f": "False"}, "answer": "x"}
                    ]
                }
            }"#,
        );
        assert!(matches!(result, Err(Error::UnknownAnswer(_))));
    }

    #[test]
    fn reports_missing_file() {
        assert!(matches!(load("no/such/bank.json"), Err(Error::Io(_))));
    }
}
