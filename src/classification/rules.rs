//! Ordered logic-category rules.
//!
//! Rules are tried in order and the first one that matches decides the
//! category, so the table order is the priority order.

use crate::common::text::{code_only, contains_keyword};
use crate::core::{LogicCategory, UnitType};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub category: LogicCategory,
    /// Whole-word keywords searched in the unit's code
    pub keywords: Vec<&'static str>,
    pub patterns: Vec<Regex>,
    pub name_prefixes: Vec<&'static str>,
    pub name_fragments: Vec<&'static str>,
    /// Rule applies to functions only
    pub functions_only: bool,
}

impl ClassificationRule {
    fn new(category: LogicCategory) -> Self {
        Self {
            category,
            keywords: Vec::new(),
            patterns: Vec::new(),
            name_prefixes: Vec::new(),
            name_fragments: Vec::new(),
            functions_only: false,
        }
    }

    fn keywords(mut self, keywords: &[&'static str]) -> Self {
        self.keywords = keywords.to_vec();
        self
    }

    fn patterns(mut self, patterns: &[&str]) -> Self {
        self.patterns = patterns.iter().filter_map(|p| Regex::new(p).ok()).collect();
        self
    }

    fn name_prefixes(mut self, prefixes: &[&'static str]) -> Self {
        self.name_prefixes = prefixes.to_vec();
        self
    }

    fn name_fragments(mut self, fragments: &[&'static str]) -> Self {
        self.name_fragments = fragments.to_vec();
        self
    }

    fn functions_only(mut self) -> Self {
        self.functions_only = true;
        self
    }

    /// `code` must already be masked and uppercased.
    pub fn matches(&self, name: &str, unit_type: UnitType, code: &str) -> bool {
        if self.functions_only && unit_type != UnitType::Function {
            return false;
        }
        self.keywords.iter().any(|k| contains_keyword(code, k))
            || self.patterns.iter().any(|p| p.is_match(code))
            || self.name_prefixes.iter().any(|p| name.starts_with(p))
            || self.name_fragments.iter().any(|f| name.contains(f))
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationRules {
    rules: Vec<ClassificationRule>,
}

impl ClassificationRules {
    pub fn standard() -> Self {
        use LogicCategory::*;

        let rules = vec![
            ClassificationRule::new(UiLogic).keywords(&[
                "SET_ITEM_PROPERTY",
                "SET_BLOCK_PROPERTY",
                "SET_WINDOW_PROPERTY",
                "SET_CANVAS_PROPERTY",
                "SET_TAB_PAGE_PROPERTY",
                "SHOW_WINDOW",
                "HIDE_WINDOW",
                "SHOW_VIEW",
                "HIDE_VIEW",
                "GO_BLOCK",
                "GO_ITEM",
                "SYNCHRONIZE",
                "SHOW_LOV",
            ]),
            ClassificationRule::new(TransactionLogic)
                .keywords(&["COMMIT", "ROLLBACK", "SAVEPOINT", "COMMIT_FORM"])
                .patterns(&[
                    r"(?:^|[^A-Z0-9_$#.])(?:INSERT\s+INTO|UPDATE\s+[A-Z][A-Z0-9_$#.]*\s+SET|DELETE\s+FROM|MERGE\s+INTO)\b",
                ]),
            ClassificationRule::new(ValidationLogic)
                .keywords(&["FORM_TRIGGER_FAILURE", "RAISE_APPLICATION_ERROR", "REGEXP_LIKE"])
                .name_prefixes(&["VALIDATE", "CHECK_", "CHK_", "VAL_", "VERIFY"])
                .name_fragments(&["_VALID", "_CHECK"]),
            ClassificationRule::new(IntegrationLogic)
                .keywords(&["UTL_HTTP", "UTL_FILE", "UTL_SMTP", "UTL_TCP", "DBMS_PIPE", "DBMS_ALERT", "HOST", "RUN_PRODUCT"])
                .patterns(&[r"\bAPEX_WEB_SERVICE\.", r"\bWEB\.SHOW_DOCUMENT\b", r"@[A-Z][A-Z0-9_$#]*"])
                .name_fragments(&["INTERFACE", "EXPORT", "IMPORT", "SYNC", "TRANSFER"]),
            ClassificationRule::new(SecurityAccessControl)
                .keywords(&["USER", "DBMS_CRYPTO", "DBMS_RLS"])
                .patterns(&[r"\b(?:ROLE|PRIVILEGE|PERMISSION|GRANT|PASSWORD|AUTHORI[SZ])[A-Z0-9_$#]*\b"])
                .name_fragments(&["SECURITY", "ACCESS", "LOGIN", "AUTH", "PRIV", "ROLE"]),
            ClassificationRule::new(BusinessLogic)
                .keywords(&["SELECT", "CURSOR", "FETCH"])
                .name_fragments(&["CALC", "COMPUTE", "PROCESS"]),
            ClassificationRule::new(UtilityHelper)
                .name_prefixes(&["GET_", "FN_", "F_", "FORMAT_", "TO_", "IS_", "HAS_", "CONVERT_"])
                .name_fragments(&["UTIL"])
                .functions_only(),
        ];

        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// First matching category, or `Unknown`.
    pub fn classify(&self, name: &str, unit_type: UnitType, code: &str) -> LogicCategory {
        let masked = code_only(code);
        let name = name.to_ascii_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&name, unit_type, &masked))
            .map_or(LogicCategory::Unknown, |rule| rule.category)
    }
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str, unit_type: UnitType, code: &str) -> LogicCategory {
        ClassificationRules::standard().classify(name, unit_type, code)
    }

    #[test]
    fn test_dml_is_transaction_logic() {
        assert_eq!(
            classify(
                "P1",
                UnitType::Procedure,
                "PROCEDURE P1 IS BEGIN INSERT INTO T1 VALUES (1); UPDATE T2 SET X=1; END P1;"
            ),
            LogicCategory::TransactionLogic
        );
    }

    #[test]
    fn test_ui_wins_over_transaction() {
        let code = "BEGIN GO_BLOCK('EMP'); COMMIT; END;";
        assert_eq!(classify("P", UnitType::Procedure, code), LogicCategory::UiLogic);
    }

    #[test]
    fn test_validation_by_name_or_keyword() {
        assert_eq!(
            classify("VALIDATE_SALARY", UnitType::Procedure, "BEGIN NULL; END;"),
            LogicCategory::ValidationLogic
        );
        assert_eq!(
            classify("P", UnitType::Procedure, "BEGIN RAISE FORM_TRIGGER_FAILURE; END;"),
            LogicCategory::ValidationLogic
        );
    }

    #[test]
    fn test_utility_only_for_functions() {
        let code = "BEGIN RETURN UPPER(p); END;";
        assert_eq!(classify("FORMAT_NAME", UnitType::Function, code), LogicCategory::UtilityHelper);
        assert_eq!(classify("FORMAT_NAME", UnitType::Procedure, code), LogicCategory::Unknown);
    }

    #[test]
    fn test_business_from_queries() {
        let code = "BEGIN SELECT SUM(x) INTO v FROM t; END;";
        assert_eq!(classify("TOTALS", UnitType::Procedure, code), LogicCategory::BusinessLogic);
    }

    #[test]
    fn test_keywords_in_literals_ignored() {
        let code = "BEGIN msg := 'COMMIT'; END;";
        assert_eq!(classify("P", UnitType::Procedure, code), LogicCategory::Unknown);
    }
}
