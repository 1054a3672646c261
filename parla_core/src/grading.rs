//! Answer normalization and grading.

use crate::QuestionKind;

/// Canonicalize an answer for comparison.
///
/// Lower-cases and trims the input. If the last character is then ASCII
/// punctuation, the trailing run of punctuation (and any whitespace mixed into
/// it) is stripped in a single pass, so `"Ciao !"` and `"Ciao!"` both become
/// `"ciao"`. Inner punctuation is kept.
///
/// Stripping whitespace inside that run, rather than leaving `"ciao "`, is
/// what makes `normalize(normalize(x)) == normalize(x)` hold.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let trimmed = lowered.trim();

    match trimmed.chars().last() {
        Some(last) if last.is_ascii_punctuation() => trimmed
            .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
            .to_string(),
        _ => trimmed.to_string(),
    }
}

/// Decide whether `raw_answer` is correct.
///
/// For multiple-choice questions a single-letter answer must match a
/// single-letter accepted answer exactly; it never matches a longer accepted
/// answer that merely normalizes to something starting with that letter.
pub fn grade(raw_answer: &str, accepted_answers: &[String], is_multiple_choice: bool) -> bool {
    let answer = normalize(raw_answer);

    if is_multiple_choice && is_single_letter(&answer) {
        return accepted_answers
            .iter()
            .any(|accepted| accepted.trim().to_lowercase() == answer);
    }

    accepted_answers
        .iter()
        .any(|accepted| normalize(accepted) == answer)
}

/// Grade an answer against a question's own kind and accepted answers
pub fn grade_question(raw_answer: &str, question: &crate::QuestionRecord) -> bool {
    grade(
        raw_answer,
        &question.accepted_answers,
        question.kind().is_multiple_choice(),
    )
}

/// Outcome of screening one line of user input before grading
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCheck {
    /// Leave the session immediately
    Exit,
    /// Nothing typed; ask again
    Empty,
    /// A letter outside the offered options; ask again
    InvalidOption { options: Vec<char> },
    /// Ready to grade
    Answer(String),
}

/// Screen a raw input line against the question kind
pub fn check_input(raw: &str, kind: &QuestionKind) -> InputCheck {
    let answer = raw.trim();
    let lowered = answer.to_lowercase();

    if is_exit_keyword(&lowered) {
        return InputCheck::Exit;
    }
    if answer.is_empty() {
        return InputCheck::Empty;
    }

    if let QuestionKind::MultipleChoice { options } = kind {
        let mut chars = lowered.chars();
        if let (Some(letter), None) = (chars.next(), chars.next()) {
            if letter.is_alphabetic() && !options.contains(&letter) {
                return InputCheck::InvalidOption {
                    options: options.clone(),
                };
            }
        }
    }

    InputCheck::Answer(answer.to_string())
}

fn is_exit_keyword(lowered: &str) -> bool {
    matches!(lowered, "exit" | "quit")
}

fn is_single_letter(answer: &str) -> bool {
    let mut chars = answer.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize("Ciao!"), "ciao");
        assert_eq!(normalize("  Bene  "), "bene");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("Wie geht's?"), "wie geht's");
        assert_eq!(normalize("Sì..."), "sì");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize("ciao !"), "ciao");
    }

    #[test]
    fn test_normalize_keeps_inner_punctuation() {
        assert_eq!(normalize("l'acqua"), "l'acqua");
        assert_eq!(normalize("a, b, c"), "a, b, c");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Ciao!",
            "  Bene  ",
            "",
            "ciao !",
            "Buona sera . ?",
            "  ?!  ",
            "È vero.",
            "A)",
            "non c'è",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_grade_single_letter_match() {
        assert!(grade("a", &answers(&["A", "Alfredo"]), true));
    }

    #[test]
    fn test_grade_letter_trap() {
        assert!(!grade("a", &answers(&["Alfredo"]), true));
    }

    #[test]
    fn test_grade_case_and_punctuation_insensitive() {
        assert!(grade("roma", &answers(&["Roma", "roma."]), false));
        assert!(grade("  Roma! ", &answers(&["roma"]), false));
    }

    #[test]
    fn test_grade_wrong_answer() {
        assert!(!grade("milano", &answers(&["Roma"]), false));
        assert!(!grade("b", &answers(&["A"]), true));
    }

    #[test]
    fn test_grade_empty_accepted_list_is_always_wrong() {
        assert!(!grade("anything", &[], false));
        assert!(!grade("a", &[], true));
    }

    #[test]
    fn test_grade_letter_on_free_text_uses_normal_rule() {
        assert!(grade("a", &answers(&["A."]), false));
    }

    #[test]
    fn test_grade_question_uses_kind() {
        let q = crate::QuestionRecord::new("Come stai? A) bene B) male", answers(&["a"]));
        assert!(grade_question("A", &q));
        assert!(!grade_question("b", &q));
    }

    #[test]
    fn test_check_input_exit_keywords() {
        assert_eq!(check_input("exit", &QuestionKind::FreeText), InputCheck::Exit);
        assert_eq!(check_input("  QUIT ", &QuestionKind::FreeText), InputCheck::Exit);
    }

    #[test]
    fn test_check_input_rejects_unknown_option() {
        let kind = QuestionKind::classify("A) uno B) due C) tre");
        assert_eq!(
            check_input("d", &kind),
            InputCheck::InvalidOption {
                options: vec!['a', 'b', 'c']
            }
        );
        assert_eq!(check_input("C", &kind), InputCheck::Answer("C".into()));
        // Longer answers are graded, not screened
        assert_eq!(check_input("uno", &kind), InputCheck::Answer("uno".into()));
    }

    #[test]
    fn test_check_input_accepts_d_when_offered() {
        let kind = QuestionKind::classify("A) uno B) due C) tre D) quattro");
        assert_eq!(check_input("d", &kind), InputCheck::Answer("d".into()));
    }

    #[test]
    fn test_check_input_empty() {
        assert_eq!(check_input("   ", &QuestionKind::FreeText), InputCheck::Empty);
    }
}
