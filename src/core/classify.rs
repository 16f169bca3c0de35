use crate::domain::ports::StatusRules;

/// 結果對話框的分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found,
    NotFound,
}

impl Outcome {
    pub fn label<'a>(&self, rules: &'a StatusRules) -> &'a str {
        match self {
            Outcome::Found => &rules.found_label,
            Outcome::NotFound => &rules.not_found_label,
        }
    }
}

/// Found only when the dialog text contains the success marker.
pub fn classify(dialog_text: &str, rules: &StatusRules) -> Outcome {
    if dialog_text.contains(&rules.success_marker) {
        Outcome::Found
    } else {
        Outcome::NotFound
    }
}
