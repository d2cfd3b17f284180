//! Question bank for the flag quiz
//!
//! Rooms consume questions through the [`QuestionSource`] trait. The
//! production source is [`CountryQuestionBank`], which loads a
//! `name,code` dataset of countries once at startup and draws a fresh
//! random selection for every request.

use std::path::Path;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};

/// Game mode that asks for a free-form answer instead of offering options
pub const MAP_MODE: &str = "MAP";

/// Number of options offered per multiple-choice question
const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub flag_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub name: String,
    pub code: String,
}

/// Produces an ordered question list for a room or a single-player game
pub trait QuestionSource: Send + Sync {
    fn generate(&self, count: usize, mode: &str) -> Result<Vec<Question>>;
}

pub struct CountryQuestionBank {
    countries: Vec<Country>,
}

impl CountryQuestionBank {
    pub fn new(countries: Vec<Country>) -> Self {
        Self { countries }
    }

    /// Load the dataset from a CSV file with `name,code` rows
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let bank = Self::from_csv_str(&contents)?;

        tracing::info!(
            path = %path.display(),
            countries = bank.len(),
            "Loaded question bank"
        );
        Ok(bank)
    }

    /// Parse `name,code` rows. Fields may be quoted; blank lines are skipped.
    pub fn from_csv_str(contents: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(contents.as_bytes());

        let mut countries = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| QuizError::QuestionBank(format!("unreadable dataset: {}", e)))?;
            let row = record.position().map_or(0, |p| p.line());

            match (record.len(), record.get(0), record.get(1)) {
                (2, Some(name), Some(code)) if !name.is_empty() && !code.is_empty() => {
                    countries.push(Country {
                        name: name.to_string(),
                        code: code.to_lowercase(),
                    });
                }
                _ => {
                    return Err(QuizError::QuestionBank(format!(
                        "malformed dataset row {}: {:?}",
                        row,
                        record.iter().collect::<Vec<_>>()
                    )));
                }
            }
        }

        Ok(Self::new(countries))
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

impl QuestionSource for CountryQuestionBank {
    fn generate(&self, count: usize, mode: &str) -> Result<Vec<Question>> {
        if self.countries.is_empty() {
            return Err(QuizError::QuestionBank("dataset is empty".to_string()));
        }

        let mut rng = rand::thread_rng();
        let mut selected: Vec<&Country> = self.countries.iter().collect();
        selected.shuffle(&mut rng);
        selected.truncate(count);

        let questions = selected
            .iter()
            .enumerate()
            .map(|(i, country)| {
                let options = (mode != MAP_MODE).then(|| {
                    let mut options = vec![country.name.clone()];
                    for j in 1..OPTIONS_PER_QUESTION {
                        let other = &selected[(i + j) % selected.len()].name;
                        if !options.contains(other) {
                            options.push(other.clone());
                        }
                    }
                    options.shuffle(&mut rng);
                    options
                });

                Question {
                    flag_url: format!("/static/svg/{}.svg", country.code),
                    options,
                    answer: country.name.clone(),
                }
            })
            .collect();

        Ok(questions)
    }
}

/// Bank with `count` synthetic countries named `Country00`, `Country01`, ...
#[cfg(test)]
pub(crate) fn sample_bank(count: usize) -> CountryQuestionBank {
    CountryQuestionBank::new(
        (0..count)
            .map(|i| Country {
                name: format!("Country{:02}", i),
                code: format!("c{:02}", i),
            })
            .collect(),
    )
}
