//! Storage-record form of access rules.
//!
//! Rule records are stored on documents the way their authors wrote them:
//! one record carrying a `users` list, a `groups` list, a privilege list and
//! an allow flag. This module parses that JSON form into [`AccessRule`]s,
//! expanding one record into up to two rules (one per subject kind).
//! Unknown privilege tokens are skipped at parse time, so one malformed
//! token cannot make the whole evaluation fail — the rule simply cannot
//! match on it.

use serde::Deserialize;

use crate::error::Result;
use crate::types::{AccessRule, Effect, Privilege, SubjectKind};

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    users: String,
    #[serde(default)]
    groups: String,
    #[serde(default)]
    levels: String,
    #[serde(default)]
    allow: i64,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split([' ', ',', '|'])
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn expand(record: &RawRecord) -> Vec<AccessRule> {
    let effect = if record.allow == 1 {
        Effect::Allow
    } else {
        Effect::Deny
    };
    let privileges = Privilege::parse_list(&record.levels);

    let mut rules = Vec::new();
    let users = split_list(&record.users);
    if !users.is_empty() {
        rules.push(AccessRule {
            subjects: users,
            kind: SubjectKind::User,
            privileges: privileges.clone(),
            effect,
        });
    }
    let groups = split_list(&record.groups);
    if !groups.is_empty() {
        rules.push(AccessRule {
            subjects: groups,
            kind: SubjectKind::Group,
            privileges,
            effect,
        });
    }
    rules
}

/// Parse a JSON array of stored rule records.
pub fn parse_rules(json: &str) -> Result<Vec<AccessRule>> {
    let records: Vec<RawRecord> = serde_json::from_str(json)?;
    Ok(records.iter().flat_map(expand).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_user_and_group_record() {
        let json = r#"[{"users":"Bob, Users.Alice","groups":"Staff.Dev","levels":"view,edit","allow":1}]"#;
        let rules = parse_rules(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].kind, SubjectKind::User);
        assert_eq!(rules[0].subjects, vec!["Bob", "Users.Alice"]);
        assert_eq!(
            rules[0].privileges,
            vec![Privilege::View, Privilege::Edit]
        );
        assert_eq!(rules[0].effect, Effect::Allow);
        assert_eq!(rules[1].kind, SubjectKind::Group);
        assert_eq!(rules[1].subjects, vec!["Staff.Dev"]);
    }

    #[test]
    fn deny_flag() {
        let json = r#"[{"users":"Bob","levels":"edit","allow":0}]"#;
        let rules = parse_rules(json).unwrap();
        assert_eq!(rules[0].effect, Effect::Deny);
    }

    #[test]
    fn unknown_privilege_tokens_are_skipped() {
        let json = r#"[{"users":"Bob","levels":"view, fly, edit","allow":1}]"#;
        let rules = parse_rules(json).unwrap();
        assert_eq!(
            rules[0].privileges,
            vec![Privilege::View, Privilege::Edit]
        );
    }

    #[test]
    fn empty_subject_lists_yield_no_rules() {
        let json = r#"[{"levels":"view","allow":1}]"#;
        assert!(parse_rules(json).unwrap().is_empty());
    }

    #[test]
    fn pipe_and_space_separators() {
        let json = r#"[{"users":"Bob|Alice Carol","levels":"view|edit comment","allow":1}]"#;
        let rules = parse_rules(json).unwrap();
        assert_eq!(rules[0].subjects, vec!["Bob", "Alice", "Carol"]);
        assert_eq!(rules[0].privileges.len(), 3);
    }

    #[test]
    fn malformed_json_is_a_storage_error() {
        assert!(parse_rules("not json").is_err());
    }
}
