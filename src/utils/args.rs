//! Command argument parsing.

use crate::error::{BotError, BotResult};
use crate::modes::UserRef;

/// Split off the first whitespace-separated word.
pub fn split_first(args: &str) -> (&str, &str) {
    let args = args.trim();
    match args.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (args, ""),
    }
}

/// Parse `1,2, 3` (commas and/or spaces) into ids.
///
/// Any non-numeric item fails the whole list.
pub fn parse_id_list(raw: &str) -> BotResult<Vec<i64>> {
    let items: Vec<&str> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        return Err(BotError::Config("no ids given".into()));
    }

    items
        .into_iter()
        .map(|item| {
            item.parse::<i64>()
                .map_err(|_| BotError::Config(format!("'{}' is not a numeric id", item)))
        })
        .collect()
}

/// Parse whitespace-separated user ids or handles.
pub fn parse_user_refs(raw: &str) -> Vec<UserRef> {
    raw.split_whitespace().filter_map(UserRef::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_first() {
        assert_eq!(split_first("3 Road Trip  songs"), ("3", "Road Trip  songs"));
        assert_eq!(split_first("only"), ("only", ""));
        assert_eq!(split_first(""), ("", ""));
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2, 3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("4 5").unwrap(), vec![4, 5]);
        assert!(matches!(parse_id_list("1,x"), Err(BotError::Config(_))));
        assert!(matches!(parse_id_list(" , "), Err(BotError::Config(_))));
    }

    #[test]
    fn test_parse_user_refs() {
        let refs = parse_user_refs("42 @alice bob");
        assert_eq!(
            refs,
            vec![
                UserRef::Id(42),
                UserRef::Handle("@alice".into()),
                UserRef::Handle("@bob".into()),
            ]
        );
    }
}
