use crate::types::{CorrectAnswer, QuestionType};

/// Checks the option/answer shape each question type requires.
///
/// Returns a human readable reason on failure.
pub fn check_question_shape(
    question_text: &str,
    question_type: QuestionType,
    options: &[String],
    answer: &CorrectAnswer,
) -> Result<(), String> {
    if question_text.trim().is_empty() {
        return Err("question_text must not be empty".into());
    }

    if question_type != QuestionType::FillInTheBlank && options.is_empty() {
        return Err(format!("Options are required for {} questions", question_type));
    }

    match question_type {
        QuestionType::Mcq => {
            if options.len() != 4 {
                return Err("MCQ questions must have exactly 4 options".into());
            }
            single_in_options(answer, options, question_type)
        }
        QuestionType::MultipleAnswer => {
            if options.len() < 3 {
                return Err("MultipleAnswer questions must have at least 3 options".into());
            }
            match answer {
                CorrectAnswer::Multiple(items) if !items.is_empty() => {
                    match items.iter().find(|a| !options.contains(a)) {
                        Some(missing) => Err(format!(
                            "Correct answer '{}' is not one of the options",
                            missing
                        )),
                        None => Ok(()),
                    }
                }
                CorrectAnswer::Multiple(_) => {
                    Err("MultipleAnswer questions need at least one correct answer".into())
                }
                CorrectAnswer::Single(_) => {
                    Err("MultipleAnswer questions need a list of correct answers".into())
                }
            }
        }
        QuestionType::TrueFalse => {
            if options.len() != 2 || options[0] != "True" || options[1] != "False" {
                return Err("True/False questions must have options [\"True\", \"False\"]".into());
            }
            single_in_options(answer, options, question_type)
        }
        QuestionType::FillInTheBlank => match answer {
            CorrectAnswer::Single(a) if !a.trim().is_empty() => Ok(()),
            _ => Err("Fill-in-the-blank questions need a single non-empty answer".into()),
        },
    }
}

fn single_in_options(
    answer: &CorrectAnswer,
    options: &[String],
    question_type: QuestionType,
) -> Result<(), String> {
    match answer {
        CorrectAnswer::Single(a) if options.contains(a) => Ok(()),
        CorrectAnswer::Single(a) => Err(format!("Correct answer '{}' is not one of the options", a)),
        CorrectAnswer::Multiple(_) => Err(format!(
            "{} questions take a single correct answer",
            question_type
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mcq_needs_four_options_and_member_answer() {
        let four = opts(&["a", "b", "c", "d"]);
        assert!(check_question_shape("q", QuestionType::Mcq, &four, &CorrectAnswer::Single("b".into())).is_ok());
        assert!(check_question_shape("q", QuestionType::Mcq, &four, &CorrectAnswer::Single("z".into())).is_err());
        assert!(check_question_shape(
            "q",
            QuestionType::Mcq,
            &opts(&["a", "b", "c"]),
            &CorrectAnswer::Single("a".into())
        )
        .is_err());
    }

    #[test]
    fn multiple_answer_requires_subset() {
        let options = opts(&["2", "3", "4", "5"]);
        let ok = CorrectAnswer::Multiple(opts(&["2", "3", "5"]));
        let bad = CorrectAnswer::Multiple(opts(&["2", "9"]));
        assert!(check_question_shape("primes", QuestionType::MultipleAnswer, &options, &ok).is_ok());
        assert!(check_question_shape("primes", QuestionType::MultipleAnswer, &options, &bad).is_err());
        assert!(check_question_shape(
            "primes",
            QuestionType::MultipleAnswer,
            &options,
            &CorrectAnswer::Single("2".into())
        )
        .is_err());
    }

    #[test]
    fn true_false_options_are_fixed() {
        let tf = opts(&["True", "False"]);
        assert!(check_question_shape("q", QuestionType::TrueFalse, &tf, &CorrectAnswer::Single("False".into())).is_ok());
        assert!(check_question_shape(
            "q",
            QuestionType::TrueFalse,
            &opts(&["Yes", "No"]),
            &CorrectAnswer::Single("Yes".into())
        )
        .is_err());
    }

    #[test]
    fn fill_in_the_blank_allows_no_options() {
        assert!(check_question_shape(
            "The capital of France is ____",
            QuestionType::FillInTheBlank,
            &[],
            &CorrectAnswer::Single("Paris".into())
        )
        .is_ok());
        assert!(check_question_shape(
            "x",
            QuestionType::FillInTheBlank,
            &[],
            &CorrectAnswer::Single("  ".into())
        )
        .is_err());
    }
}
