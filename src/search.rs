//! Weighted multi-field department search.
//!
//! Matching is case-insensitive. Field scores add up, so a record that hits
//! on name and code ranks above one that hits on name alone:
//!
//! | field        | exact | substring |
//! |--------------|-------|-----------|
//! | name         | 100   | 95        |
//! | code         | 90    | 70        |
//! | manager name | -     | 60        |
//! | description  | -     | 40        |
//!
//! Records scoring zero are dropped. Results are sorted by descending score;
//! ties keep input order.

use serde::{Deserialize, Serialize};

use crate::hierarchy::{DepartmentRecord, Hierarchy};

pub const NAME_EXACT: u32 = 100;
pub const NAME_PARTIAL: u32 = 95;
pub const CODE_EXACT: u32 = 90;
pub const CODE_PARTIAL: u32 = 70;
pub const MANAGER_PARTIAL: u32 = 60;
pub const DESCRIPTION_PARTIAL: u32 = 40;

/// Record field a query matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchedField {
    Name,
    Code,
    ManagerName,
    Description,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub record_id: String,
    pub score: u32,
    /// Field with the highest individual weight among those that matched.
    pub matched_field: MatchedField,
}

/// A search hit plus the department ids from the top of the tree down to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub matched: SearchMatch,
    pub path: Vec<String>,
}

fn score_record(record: &DepartmentRecord, needle: &str) -> Option<(u32, MatchedField)> {
    let mut best: Option<(u32, MatchedField)> = None;
    let mut total = 0;
    let mut add = |weight: u32, field: MatchedField| {
        total += weight;
        if best.is_none_or(|(w, _)| weight > w) {
            best = Some((weight, field));
        }
    };

    let name = record.name.to_lowercase();
    if name == needle {
        add(NAME_EXACT, MatchedField::Name);
    } else if name.contains(needle) {
        add(NAME_PARTIAL, MatchedField::Name);
    }

    let code = record.code.to_lowercase();
    if code == needle {
        add(CODE_EXACT, MatchedField::Code);
    } else if code.contains(needle) {
        add(CODE_PARTIAL, MatchedField::Code);
    }

    if record
        .manager_name
        .as_deref()
        .is_some_and(|manager| manager.to_lowercase().contains(needle))
    {
        add(MANAGER_PARTIAL, MatchedField::ManagerName);
    }

    if record
        .description
        .as_deref()
        .is_some_and(|description| description.to_lowercase().contains(needle))
    {
        add(DESCRIPTION_PARTIAL, MatchedField::Description);
    }

    best.map(|(_, field)| (total, field))
}

/// Rank `records` against `query`.
///
/// Empty or whitespace-only queries return no matches. Leading and trailing
/// whitespace is ignored.
pub fn search(records: &[DepartmentRecord], query: &str) -> Vec<SearchMatch> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<SearchMatch> = records
        .iter()
        .filter_map(|record| {
            let (score, matched_field) = score_record(record, &needle)?;
            Some(SearchMatch {
                record_id: record.id.clone(),
                score,
                matched_field,
            })
        })
        .collect();

    // `sort_by` is stable, so equal scores keep input order.
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

/// [`search`] over `records`, each hit annotated with its path in
/// `hierarchy` for breadcrumbs and ancestor expansion.
pub fn search_with_paths(
    hierarchy: &Hierarchy,
    records: &[DepartmentRecord],
    query: &str,
) -> Vec<SearchHit> {
    search(records, query)
        .into_iter()
        .map(|matched| {
            let path = hierarchy.path_to(&matched.record_id);
            SearchHit { matched, path }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept(id: &str, name: &str, code: &str) -> DepartmentRecord {
        DepartmentRecord::new(id, name, code)
    }

    #[test]
    fn test_empty_query() {
        let records = vec![dept("1", "Engineering", "ENG")];
        assert!(search(&records, "").is_empty());
        assert!(search(&records, "   \t").is_empty());
    }

    #[test]
    fn test_name_and_code_outrank_description() {
        let records = vec![
            dept("plain", "Engineering", "E1"),
            dept("both", "Eng Services", "ENG"),
            dept("desc", "Facilities", "FAC").with_description("Supports eng teams"),
        ];
        let results = search(&records, "eng");
        let ids: Vec<&str> = results.iter().map(|m| m.record_id.as_str()).collect();

        assert_eq!(ids, vec!["both", "plain", "desc"]);
        assert_eq!(results[0].score, NAME_PARTIAL + CODE_EXACT);
        assert_eq!(results[0].matched_field, MatchedField::Name);
        assert_eq!(results[1].score, NAME_PARTIAL);
        assert_eq!(results[1].matched_field, MatchedField::Name);
        assert_eq!(results[2].matched_field, MatchedField::Description);
    }

    #[test]
    fn test_exact_name_beats_substring_name() {
        let records = vec![
            dept("sub", "Engineering Ops", "X"),
            dept("exact", "engineering", "Y"),
        ];
        let results = search(&records, "ENGINEERING");
        assert_eq!(results[0].record_id, "exact");
        assert_eq!(results[0].score, NAME_EXACT);
        assert_eq!(results[1].score, NAME_PARTIAL);
    }

    #[test]
    fn test_single_field_weights_are_ordered() {
        let records = vec![
            dept("desc", "A", "A").with_description("finance"),
            dept("manager", "B", "B").with_manager("Finance Lead"),
            dept("code-sub", "C", "FINANCE-2"),
            dept("code", "D", "FINANCE"),
            dept("name-sub", "Finance Ops", "E"),
            dept("name", "Finance", "F"),
        ];
        let ids: Vec<String> = search(&records, "finance")
            .into_iter()
            .map(|m| m.record_id)
            .collect();
        assert_eq!(
            ids,
            vec!["name", "name-sub", "code", "code-sub", "manager", "desc"]
        );
    }

    #[test]
    fn test_field_weights_follow_precedence() {
        let chain = [
            NAME_EXACT,
            NAME_PARTIAL,
            CODE_EXACT,
            CODE_PARTIAL,
            MANAGER_PARTIAL,
            DESCRIPTION_PARTIAL,
        ];
        assert!(chain.windows(2).all(|pair| pair[0] > pair[1]), "{chain:?}");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            dept("1", "Sales East", "S1"),
            dept("2", "Unrelated", "U"),
            dept("3", "Sales West", "S3"),
        ];
        let ids: Vec<String> = search(&records, "sales")
            .into_iter()
            .map(|m| m.record_id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_zero_score_excluded() {
        let records = vec![dept("1", "Legal", "LGL")];
        assert!(search(&records, "hr").is_empty());
    }

    #[test]
    fn test_search_with_paths() {
        let records = vec![
            dept("root", "Company", "CO"),
            dept("eng", "Engineering", "ENG").with_parent("root"),
            dept("web", "Web Platform", "WEB").with_parent("eng"),
        ];
        let hierarchy = Hierarchy::build(&records);
        let hits = search_with_paths(&hierarchy, &records, "platform");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched.record_id, "web");
        assert_eq!(hits[0].path, vec!["root", "eng", "web"]);
    }
}
