/*
 * amnesia: seal a secret behind a set of security questions
 * Copyright (C) 2018-2022 Aleksa Sarai <cyphar@cyphar.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::Error;

use std::{
    collections::{btree_map, BTreeMap},
    fmt,
};

use zeroize::Zeroizing;

/// Identifier of a question within a single sealed secret.
pub type QuestionId = u32;

/// Minimum number of questions (and answers) accepted by amnesia.
pub const MIN_QUESTIONS: usize = 2;

/// Maximum number of questions (and answers) accepted by amnesia, limited by
/// the number of distinct shards that can be dealt.
pub const MAX_QUESTIONS: usize = 255;

/// A question together with the answer that unlocks its share.
///
/// The answer is only ever needed when sealing and is never persisted.
#[derive(Clone)]
pub struct Question {
    question: String,
    answer: Zeroizing<String>,
}

impl Question {
    pub fn new<Q: Into<String>, A: Into<String>>(question: Q, answer: A) -> Self {
        Self {
            question: question.into(),
            answer: Zeroizing::new(answer.into()),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub(crate) fn answer(&self) -> &str {
        &self.answer
    }
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Question")
            .field("question", &self.question)
            .field("answer", &"<redacted>")
            .finish()
    }
}

/// The set of questions a secret is sealed behind, ordered by id.
#[derive(Clone, Debug, Default)]
pub struct Questions(BTreeMap<QuestionId, Question>);

impl Questions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Add `question` under the given `id`. Ids must be unique.
    pub fn insert(&mut self, id: QuestionId, question: Question) -> Result<&mut Self, Error> {
        match self.0.entry(id) {
            btree_map::Entry::Occupied(_) => Err(Error::DuplicateQuestionId(id)),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(question);
                Ok(self)
            }
        }
    }

    /// Add `question` under the next unused id, returning that id.
    pub fn push(&mut self, question: Question) -> QuestionId {
        let id = (0..)
            .find(|id| !self.0.contains_key(id))
            .expect("there are fewer questions than u32 values");
        self.0.insert(id, question);
        id
    }

    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.0.get(&id)
    }

    /// Whether a question with exactly this text has already been added.
    pub fn contains_question<S: AsRef<str>>(&self, question: S) -> bool {
        self.0.values().any(|q| q.question == question.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &Question)> {
        self.0.iter().map(|(id, q)| (*id, q))
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self.len() {
            n if n < MIN_QUESTIONS => Err(Error::TooFewQuestions { min: MIN_QUESTIONS }),
            n if n > MAX_QUESTIONS => Err(Error::TooManyQuestions { max: MAX_QUESTIONS }),
            _ => Ok(()),
        }
    }
}

/// Answers supplied when unsealing, keyed by question id.
///
/// Not every question needs an answer. Questions without an entry (or with
/// a blank entry) are simply left out of recovery.
#[derive(Clone, Default)]
pub struct Answers(BTreeMap<QuestionId, Zeroizing<String>>);

impl Answers {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the answer for question `id`, replacing any previous answer.
    pub fn set<S: Into<String>>(&mut self, id: QuestionId, answer: S) -> &mut Self {
        self.0.insert(id, Zeroizing::new(answer.into()));
        self
    }

    /// Returns the answer for question `id`, treating a blank answer the same
    /// as a missing one.
    pub fn get(&self, id: QuestionId) -> Option<&str> {
        self.0
            .get(&id)
            .map(|a| a.as_str())
            .filter(|a| !a.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self.len() {
            n if n < MIN_QUESTIONS => Err(Error::TooFewAnswers { min: MIN_QUESTIONS }),
            n if n > MAX_QUESTIONS => Err(Error::TooManyAnswers { max: MAX_QUESTIONS }),
            _ => Ok(()),
        }
    }
}

impl<S: Into<String>> FromIterator<(QuestionId, S)> for Answers {
    fn from_iter<I: IntoIterator<Item = (QuestionId, S)>>(iter: I) -> Self {
        let mut answers = Self::new();
        for (id, answer) in iter {
            answers.set(id, answer);
        }
        answers
    }
}

impl fmt::Debug for Answers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn question(i: usize) -> Question {
        Question::new(format!("What's your favourite animal #{}?", i), "cat")
    }

    #[test]
    fn questions_minimum() {
        let mut q = Questions::new();
        assert!(matches!(q.validate(), Err(Error::TooFewQuestions { min: 2 })));
        q.push(question(0));
        assert!(matches!(q.validate(), Err(Error::TooFewQuestions { min: 2 })));
        q.push(question(1));
        assert!(q.validate().is_ok());
    }

    #[test]
    fn questions_maximum() {
        let mut q = Questions::new();
        for i in 0..MAX_QUESTIONS {
            q.push(question(i));
        }
        assert!(q.validate().is_ok());
        q.push(question(MAX_QUESTIONS));
        assert!(matches!(
            q.validate(),
            Err(Error::TooManyQuestions { max: 255 })
        ));
    }

    #[test]
    fn questions_ids() {
        let mut q = Questions::new();
        assert_eq!(q.push(question(0)), 0);
        assert_eq!(q.push(question(1)), 1);
        q.insert(5, question(5)).unwrap();
        assert!(matches!(
            q.insert(1, question(1)),
            Err(Error::DuplicateQuestionId(1))
        ));
        // The next unused id fills the gap.
        assert_eq!(q.push(question(2)), 2);
        assert_eq!(
            q.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![0, 1, 2, 5]
        );
    }

    #[test]
    fn questions_contains() {
        let mut q = Questions::new();
        q.push(Question::new("What's your favourite food?", "pizza"));
        assert!(q.contains_question("What's your favourite food?"));
        assert!(!q.contains_question("What's your favourite animal?"));
        assert_eq!(
            q.get(0).map(Question::question),
            Some("What's your favourite food?")
        );
    }

    #[test]
    fn question_debug_redacts_answer() {
        let debug = format!("{:?}", Question::new("favourite food", "pizza"));
        assert!(debug.contains("favourite food"));
        assert!(!debug.contains("pizza"));

        let answers = [(0, "cat"), (1, "pizza")].into_iter().collect::<Answers>();
        let debug = format!("{:?}", answers);
        assert!(!debug.contains("cat") && !debug.contains("pizza"));
    }

    #[test]
    fn answers_blank_is_missing() {
        let answers = [(0, "cat"), (1, "")].into_iter().collect::<Answers>();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers.get(0), Some("cat"));
        assert_eq!(answers.get(1), None);
        assert_eq!(answers.get(2), None);
    }

    #[test]
    fn answers_bounds() {
        let mut answers = Answers::new();
        assert!(matches!(
            answers.validate(),
            Err(Error::TooFewAnswers { min: 2 })
        ));
        answers.set(0, "cat");
        assert!(matches!(
            answers.validate(),
            Err(Error::TooFewAnswers { min: 2 })
        ));
        answers.set(1, "pizza");
        assert!(answers.validate().is_ok());

        let answers = (0..=MAX_QUESTIONS as QuestionId)
            .map(|id| (id, "cat"))
            .collect::<Answers>();
        assert_eq!(answers.len(), 256);
        assert!(matches!(
            answers.validate(),
            Err(Error::TooManyAnswers { max: 255 })
        ));
    }
}
