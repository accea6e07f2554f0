//! Subset of the search and order languages of the API.
//!
//! Searches are `field = 'value'` clauses joined by `and`; orders are a field
//! name optionally followed by `asc` or `desc`.

/// Parsed `search` parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Search {
    clauses: Vec<(String, String)>,
}

impl Search {
    /// Parses `text`, rejecting fields that aren't in `fields`.
    pub(crate) fn parse(text: &str, fields: &[&str]) -> Result<Self, String> {
        let mut clauses = Vec::new();
        let mut rest = text.trim();

        while !rest.is_empty() {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            let (name, tail) = rest.split_at(end);
            if name.is_empty() {
                return Err(format!("Expected a field name in search '{}'", text));
            }
            if !fields.contains(&name) {
                return Err(format!(
                    "Field '{}' isn't supported in searches, supported fields are {}",
                    name,
                    fields.join(", ")
                ));
            }

            let tail = tail
                .trim_start()
                .strip_prefix('=')
                .ok_or_else(|| format!("Expected '=' after '{}' in search '{}'", name, text))?;
            let tail = tail
                .trim_start()
                .strip_prefix('\'')
                .ok_or_else(|| format!("Expected a quoted value for '{}' in search '{}'", name, text))?;
            let close = tail
                .find('\'')
                .ok_or_else(|| format!("Unterminated value for '{}' in search '{}'", name, text))?;

            clauses.push((name.to_string(), tail[..close].to_string()));

            rest = tail[close + 1..].trim_start();
            if rest.is_empty() {
                break;
            }
            rest = strip_keyword(rest, "and")
                .ok_or_else(|| format!("Expected 'and' between clauses of search '{}'", text))?;
        }

        Ok(Self { clauses })
    }

    /// Checks every clause against the value `lookup` returns for its field.
    pub(crate) fn matches<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.clauses
            .iter()
            .all(|(name, value)| lookup(name).as_deref() == Some(value.as_str()))
    }
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    let tail = &text[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword) && tail.starts_with(char::is_whitespace) {
        Some(tail.trim_start())
    } else {
        None
    }
}

/// Parsed `order` parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Order {
    field: String,
    descending: bool,
}

impl Order {
    pub(crate) fn parse(text: &str, fields: &[&str]) -> Result<Self, String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let (field, descending) = match words.as_slice() {
            [field] => (*field, false),
            [field, direction] if direction.eq_ignore_ascii_case("asc") => (*field, false),
            [field, direction] if direction.eq_ignore_ascii_case("desc") => (*field, true),
            _ => return Err(format!("Can't parse order '{}'", text)),
        };
        if !fields.contains(&field) {
            return Err(format!(
                "Field '{}' isn't supported in orders, supported fields are {}",
                field,
                fields.join(", ")
            ));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }

    /// Sorts `items` in place. Items without a value go first.
    pub(crate) fn sort<T, F>(&self, items: &mut [T], lookup: F)
    where
        F: Fn(&T, &str) -> Option<String>,
    {
        items.sort_by(|a, b| {
            let ordering = lookup(a, &self.field).cmp(&lookup(b, &self.field));
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

/// Filters and sorts `items` with the optional `search` and `order` texts.
pub(crate) fn select<T, F>(
    mut items: Vec<T>,
    search: Option<&str>,
    order: Option<&str>,
    fields: &[&str],
    lookup: F,
) -> Result<Vec<T>, String>
where
    F: Fn(&T, &str) -> Option<String>,
{
    if let Some(text) = search {
        let search = Search::parse(text, fields)?;
        items.retain(|item| search.matches(|name| lookup(item, name)));
    }
    if let Some(text) = order {
        Order::parse(text, fields)?.sort(&mut items, &lookup);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["name", "state"];

    #[test]
    fn test_parse_single_clause() {
        let search = Search::parse("name = 'mycluster'", FIELDS).unwrap();
        assert_eq!(
            search.clauses,
            vec![("name".to_string(), "mycluster".to_string())]
        );
    }

    #[test]
    fn test_parse_conjunction() {
        let search = Search::parse("name='a b' AND state = 'ready'", FIELDS).unwrap();
        assert_eq!(search.clauses.len(), 2);
        assert_eq!(search.clauses[0].1, "a b");
        assert_eq!(search.clauses[1].0, "state");
    }

    #[test]
    fn test_parse_errors() {
        assert!(Search::parse("region = 'x'", FIELDS)
            .unwrap_err()
            .contains("'region'"));
        assert!(Search::parse("name like 'x%'", FIELDS).is_err());
        assert!(Search::parse("name = x", FIELDS).is_err());
        assert!(Search::parse("name = 'x", FIELDS).is_err());
        assert!(Search::parse("name = 'x' or state = 'ready'", FIELDS).is_err());
    }

    #[test]
    fn test_matches() {
        let search = Search::parse("name = 'a' and state = 'ready'", FIELDS).unwrap();
        assert!(search.matches(|name| match name {
            "name" => Some("a".into()),
            "state" => Some("ready".into()),
            _ => None,
        }));
        assert!(!search.matches(|name| match name {
            "name" => Some("a".into()),
            _ => None,
        }));
    }

    #[test]
    fn test_select_with_order() {
        let items = vec!["b", "c", "a"];
        let selected = select(items, None, Some("name desc"), FIELDS, |item, _| {
            Some(item.to_string())
        })
        .unwrap();
        assert_eq!(selected, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_order_errors() {
        assert!(Order::parse("name sideways", FIELDS).is_err());
        assert!(Order::parse("region asc", FIELDS).is_err());
        assert!(Order::parse("", FIELDS).is_err());
    }
}
