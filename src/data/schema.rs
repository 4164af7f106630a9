//! Loan Dataset Schema
//! Column names and the enumerated levels of every categorical column.

pub const AGE: &str = "person_age";
pub const GENDER: &str = "person_gender";
pub const EDUCATION: &str = "person_education";
pub const INCOME: &str = "person_income";
pub const EMPLOYMENT_EXP: &str = "person_emp_exp";
pub const HOME_OWNERSHIP: &str = "person_home_ownership";
pub const LOAN_AMOUNT: &str = "loan_amnt";
pub const LOAN_INTENT: &str = "loan_intent";
pub const INTEREST_RATE: &str = "loan_int_rate";
pub const PERCENT_INCOME: &str = "loan_percent_income";
pub const CREDIT_HISTORY: &str = "cb_person_cred_hist_length";
pub const CREDIT_SCORE: &str = "credit_score";
pub const PRIOR_DEFAULTS: &str = "previous_loan_defaults_on_file";
pub const LOAN_STATUS: &str = "loan_status";

/// Target level for raw code 0.
pub const REJECTED: &str = "Rejected";
/// Target level for raw code 1. Positive class for ROC analysis.
pub const APPROVED: &str = "Approved";

/// Target levels in class-index order (0 = Rejected, 1 = Approved).
pub const STATUS_LEVELS: [&str; 2] = [REJECTED, APPROVED];

/// Numeric feature columns, in file order.
pub const NUMERIC_COLUMNS: [&str; 8] = [
    AGE,
    INCOME,
    EMPLOYMENT_EXP,
    LOAN_AMOUNT,
    INTEREST_RATE,
    PERCENT_INCOME,
    CREDIT_HISTORY,
    CREDIT_SCORE,
];

/// A categorical column and its fixed, unordered level set.
///
/// The first level acts as the reference level for dummy encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Factor {
    pub column: &'static str,
    pub levels: &'static [&'static str],
}

impl Factor {
    /// Position of `value` in the level set.
    pub fn level_index(&self, value: &str) -> Option<usize> {
        self.levels.iter().position(|level| *level == value)
    }
}

/// Categorical feature columns (everything designated except the target).
pub static FEATURE_FACTORS: [Factor; 5] = [
    Factor {
        column: GENDER,
        levels: &["female", "male"],
    },
    Factor {
        column: EDUCATION,
        levels: &["Associate", "Bachelor", "Doctorate", "High School", "Master"],
    },
    Factor {
        column: HOME_OWNERSHIP,
        levels: &["MORTGAGE", "OTHER", "OWN", "RENT"],
    },
    Factor {
        column: LOAN_INTENT,
        levels: &[
            "DEBTCONSOLIDATION",
            "EDUCATION",
            "HOMEIMPROVEMENT",
            "MEDICAL",
            "PERSONAL",
            "VENTURE",
        ],
    },
    Factor {
        column: PRIOR_DEFAULTS,
        levels: &["No", "Yes"],
    },
];

/// The target after relabelling.
pub static STATUS_FACTOR: Factor = Factor {
    column: LOAN_STATUS,
    levels: &STATUS_LEVELS,
};

/// Look up the factor definition for a column, target included.
pub fn factor_for(column: &str) -> Option<&'static Factor> {
    FEATURE_FACTORS
        .iter()
        .chain(std::iter::once(&STATUS_FACTOR))
        .find(|f| f.column == column)
}

/// Map a class index back to its status label.
pub fn status_label(class: usize) -> &'static str {
    STATUS_LEVELS.get(class).copied().unwrap_or(REJECTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_index_finds_known_levels() {
        let intent = factor_for(LOAN_INTENT).unwrap();
        assert_eq!(intent.level_index("DEBTCONSOLIDATION"), Some(0));
        assert_eq!(intent.level_index("VENTURE"), Some(5));
        assert_eq!(intent.level_index("venture"), None);
    }

    #[test]
    fn target_is_a_factor() {
        let status = factor_for(LOAN_STATUS).unwrap();
        assert_eq!(status.levels, &["Rejected", "Approved"]);
        assert!(factor_for(CREDIT_SCORE).is_none());
    }

    #[test]
    fn status_label_maps_class_index() {
        assert_eq!(status_label(0), "Rejected");
        assert_eq!(status_label(1), "Approved");
    }
}
