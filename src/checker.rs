//! Multiple-choice answer checking against query results.
//!
//! A [`Question`] reads one or more values out of a [`ResultSet`] by column
//! name and compares them with a fixed list of candidate answers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::ResultSet;

/// One literal candidate value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(f64),
    Text(String),
}

impl Answer {
    /// Numbers compare numerically (`12.5000` is `12.5`); text ignores case and padding
    pub fn matches(&self, raw: &str) -> bool {
        let raw = raw.trim();
        match self {
            Answer::Number(expected) => numbers_match(*expected, raw),
            Answer::Text(expected) => {
                let expected = expected.trim();
                match expected.parse::<f64>() {
                    // A quoted number in YAML still means a number
                    Ok(number) if numbers_match(number, raw) => true,
                    _ => expected.eq_ignore_ascii_case(raw),
                }
            }
        }
    }
}

fn numbers_match(expected: f64, raw: &str) -> bool {
    match raw.parse::<f64>() {
        Ok(actual) => (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
        Err(_) => false,
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Number(n) => write!(f, "{n}"),
            Answer::Text(t) => f.write_str(t),
        }
    }
}

/// A candidate: a single value, or a tuple for questions that read several values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choice {
    Single(Answer),
    Tuple(Vec<Answer>),
}

impl Choice {
    fn answers(&self) -> &[Answer] {
        match self {
            Choice::Single(answer) => std::slice::from_ref(answer),
            Choice::Tuple(answers) => answers,
        }
    }

    fn matches(&self, actual: &[Option<String>]) -> bool {
        let answers = self.answers();
        answers.len() == actual.len()
            && answers
                .iter()
                .zip(actual)
                .all(|(answer, value)| value.as_deref().map_or(false, |v| answer.matches(v)))
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.answers().iter().map(|a| a.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Where in the result the checked value(s) come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// A column of the first row
    FirstRow { column: String },
    /// A column of the first row containing `needle` anywhere
    MatchingRow { needle: String, column: String },
    /// `value_column` of the row whose `key_column` equals each key, in order
    ByKey {
        key_column: String,
        value_column: String,
        keys: Vec<String>,
    },
    /// The number of rows returned
    RowCount,
}

impl Expectation {
    /// The values this expectation reads, or why there are none to read
    pub fn observe(&self, result: &ResultSet) -> Result<Vec<Option<String>>, String> {
        match self {
            Expectation::RowCount => Ok(vec![Some(result.num_rows().to_string())]),
            _ if result.is_empty() => Err("no rows returned".into()),
            Expectation::FirstRow { column } => {
                require_column(result, column)?;
                let row = result.first().ok_or("no rows returned")?;
                Ok(vec![row.get(column).map(str::to_owned)])
            }
            Expectation::MatchingRow { needle, column } => {
                require_column(result, column)?;
                let row = result
                    .find_row(needle)
                    .ok_or_else(|| format!("no row mentions {needle:?}"))?;
                Ok(vec![row.get(column).map(str::to_owned)])
            }
            Expectation::ByKey {
                key_column,
                value_column,
                keys,
            } => {
                require_column(result, key_column)?;
                require_column(result, value_column)?;
                Ok(keys
                    .iter()
                    .map(|key| {
                        result
                            .find_by(key_column, key)
                            .and_then(|row| row.get(value_column))
                            .map(str::to_owned)
                    })
                    .collect())
            }
        }
    }
}

fn require_column(result: &ResultSet, column: &str) -> Result<(), String> {
    match result.column_index(column) {
        Some(_) => Ok(()),
        None => Err(format!(
            "column {column} not in result (columns: {})",
            result.column_names().join(", ")
        )),
    }
}

/// A multiple-choice question answered by a query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub expect: Expectation,
    pub options: Vec<Choice>,
}

impl Question {
    pub fn check(&self, result: &ResultSet) -> Verdict {
        let actual = match self.expect.observe(result) {
            Ok(actual) => actual,
            Err(reason) => return Verdict::NoData { reason },
        };
        match self.options.iter().position(|choice| choice.matches(&actual)) {
            Some(index) => Verdict::Matched {
                index,
                choice: self.options[index].clone(),
            },
            None => Verdict::Unexpected {
                actual: actual
                    .iter()
                    .map(|v| v.as_deref().unwrap_or("None").trim().to_owned())
                    .collect::<Vec<_>>()
                    .join(", "),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The observed values equal option `index`
    Matched { index: usize, choice: Choice },
    /// Values were found but no option fits them
    Unexpected { actual: String },
    /// The result did not contain what the question looks at
    NoData { reason: String },
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Matched { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Matched { choice, .. } => write!(f, "✅ Correct! Answer is {choice}"),
            Verdict::Unexpected { actual } => write!(f, "❌ Unexpected result: {actual}"),
            Verdict::NoData { reason } => write!(f, "❌ Cannot answer: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::RawCell;
    use crate::result::Column;

    fn prices() -> ResultSet {
        ResultSet::new(
            vec![
                Column::new("ITEM_SUBCATEGORY", RawCell::Text),
                Column::new("MAX_PRICE", RawCell::Fixed),
            ],
            vec![
                vec![Some("Hot Option".into()), Some("21.0000".into())],
                vec![Some("Warm Option".into()), Some("12.5000".into())],
                vec![Some("Cold Option".into()), Some("11.0000".into())],
            ],
        )
    }

    #[test]
    fn numeric_answers_ignore_trailing_zeros() {
        assert!(Answer::Number(12.5).matches("12.5000"));
        assert!(Answer::Number(5.0).matches(" 5 "));
        assert!(!Answer::Number(5.0).matches("five"));
        assert!(Answer::Text("X-Small".into()).matches("X-SMALL"));
    }

    #[test]
    fn quoted_numbers_still_compare_numerically() {
        let options: Vec<Choice> = serde_yaml::from_str(r#"["12.5", 11, "007"]"#).unwrap();
        assert_eq!(options[0], Choice::Single(Answer::Text("12.5".into())));
        assert!(options[0].matches(&[Some("12.5000".into())]));
        assert!(options[1].matches(&[Some("11.0000".into())]));
        assert!(options[2].matches(&[Some("7".into())]));
        assert!(options[2].matches(&[Some("007".into())]));
        assert!(!options[0].matches(&[Some("12.6".into())]));
    }

    #[test]
    fn first_row_count() {
        let question = Question {
            prompt: "Warm snacks".into(),
            expect: Expectation::FirstRow {
                column: "snack_warm_count".into(),
            },
            options: [5.0, 9.0, 3.0, 7.0]
                .into_iter()
                .map(|n| Choice::Single(Answer::Number(n)))
                .collect(),
        };
        let result = crate::warehouse::stub::single_column("SNACK_WARM_COUNT", RawCell::Fixed, &["7"]);
        let verdict = question.check(&result);
        assert!(matches!(verdict, Verdict::Matched { index: 3, .. }));
        assert_eq!(verdict.to_string(), "✅ Correct! Answer is 7");
    }

    #[test]
    fn by_key_tuples() {
        let question: Question = serde_yaml::from_str(
            r#"
prompt: Max price per subcategory
expect:
  kind: by_key
  key_column: item_subcategory
  value_column: max_price
  keys: [Hot Option, Warm Option, Cold Option]
options:
  - [21, 11, 11]
  - [21, 12.5, 11]
  - [19, 12.5, 11]
"#,
        )
        .unwrap();
        let verdict = question.check(&prices());
        assert!(matches!(verdict, Verdict::Matched { index: 1, .. }));
        assert_eq!(verdict.to_string(), "✅ Correct! Answer is 21, 12.5, 11");
    }

    #[test]
    fn matching_row_by_substring() {
        let question = Question {
            prompt: "Warm price".into(),
            expect: Expectation::MatchingRow {
                needle: "warm".into(),
                column: "MAX_PRICE".into(),
            },
            options: vec![Choice::Single(Answer::Number(11.0))],
        };
        assert_eq!(
            question.check(&prices()),
            Verdict::Unexpected {
                actual: "12.5000".into()
            }
        );
    }

    #[test]
    fn missing_data_is_not_an_unexpected_answer() {
        let question = Question {
            prompt: "p".into(),
            expect: Expectation::FirstRow {
                column: "SIZE".into(),
            },
            options: vec![Choice::Single(Answer::Text("Small".into()))],
        };
        assert!(matches!(
            question.check(&ResultSet::empty()),
            Verdict::NoData { .. }
        ));
        match question.check(&prices()) {
            Verdict::NoData { reason } => assert!(reason.contains("ITEM_SUBCATEGORY")),
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn row_count_works_on_empty_results() {
        let question = Question {
            prompt: "p".into(),
            expect: Expectation::RowCount,
            options: vec![Choice::Single(Answer::Number(0.0))],
        };
        assert!(question.check(&ResultSet::empty()).is_match());
    }
}
