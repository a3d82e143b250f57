//! Closed list of 10-K sections the backend can analyze, in filing order.

/// One analyzable section: wire key plus display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub key: &'static str,
    pub label: &'static str,
}

const fn section(key: &'static str, label: &'static str) -> Section {
    Section { key, label }
}

pub const SECTIONS: [Section; 22] = [
    // Part I
    section("business", "Business"),
    section("risk_factors", "Risk factors"),
    section("unresolved_staff_comments", "Unresolved staff comments"),
    section("cybersecurity", "Cybersecurity"),
    section("properties", "Properties"),
    section("legal_proceedings", "Legal proceedings"),
    section("mine_safety", "Mine safety"),
    // Part II
    section(
        "market_for_registrants_common_equity",
        "Market for registrants common equity",
    ),
    section("selected_financial_data", "Selected financial data"),
    section(
        "managements_discussion_and_analysis",
        "Managements discussion and analysis",
    ),
    section(
        "quantitative_and_qualitative_disclosures",
        "Quantitative and qualitative disclosures",
    ),
    section("notes_to_financial_statements", "Notes to financial statements"),
    section(
        "changes_in_and_disagreements_with_accountants",
        "Changes in and disagreements with accountants",
    ),
    section("controls_and_procedures", "Controls and procedures"),
    section("other_information", "Other information"),
    section(
        "disclosures_regarding_foreign_jurisdictions",
        "Disclosures regarding foreign jurisdictions",
    ),
    // Part III
    section(
        "directors_and_executive_officers",
        "Directors and executive officers",
    ),
    section("executive_compensation", "Executive compensation"),
    section("security_ownership", "Security ownership"),
    section("certain_relationships", "Certain relationships"),
    section("principal_accountant_fees", "Principal accountant fees"),
    // Part IV
    section("exhibits", "Exhibits"),
];

/// Resolve user input to a section by wire key, label, or 1-based position.
pub fn find_section(input: &str) -> Option<&'static Section> {
    let needle = input.trim();
    if needle.is_empty() {
        return None;
    }

    if let Ok(position) = needle.parse::<usize>() {
        return position.checked_sub(1).and_then(|index| SECTIONS.get(index));
    }

    let normalized = needle.to_ascii_lowercase().replace([' ', '-'], "_");
    SECTIONS.iter().find(|section| {
        section.key == normalized || section.label.eq_ignore_ascii_case(needle)
    })
}
