//! A restricted JSONPath-like resolver: dotted field access plus bracketed
//! array indices (`a.b[0].c`). No wildcards, filters, or recursive descent —
//! the pattern engine only ever needs "the leaf at this path".

use serde_json::Value;

/// Resolve `path` (e.g. `"files[0].name"` or `"a.b.c"`) against `root`,
/// returning the leaf value if every segment exists, `None` otherwise.
#[must_use]
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_segments(path) {
        current = match segment {
            Segment::Key(k) => current.get(k)?,
            Segment::Index(i) => current.get(i)?,
        };
    }
    Some(current)
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn split_segments(path: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    for dotted in path.split('.') {
        if dotted.is_empty() {
            continue;
        }
        let mut rest = dotted;
        if let Some(bracket_start) = rest.find('[') {
            let key = &rest[..bracket_start];
            if !key.is_empty() {
                out.push(Segment::Key(key));
            }
            rest = &rest[bracket_start..];
            while let Some(stripped) = rest.strip_prefix('[') {
                if let Some(end) = stripped.find(']') {
                    let idx_str = &stripped[..end];
                    if let Ok(idx) = idx_str.parse::<usize>() {
                        out.push(Segment::Index(idx));
                    }
                    rest = &stripped[end + 1..];
                } else {
                    break;
                }
            }
        } else {
            out.push(Segment::Key(rest));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_dotted_path() {
        let v = json!({"a": {"b": {"c": 42}}});
        assert_eq!(resolve(&v, "a.b.c"), Some(&json!(42)));
    }

    #[test]
    fn resolves_array_index() {
        let v = json!({"files": [{"name": "x"}, {"name": "y"}]});
        assert_eq!(resolve(&v, "files[1].name"), Some(&json!("y")));
    }

    #[test]
    fn missing_path_returns_none() {
        let v = json!({"a": 1});
        assert_eq!(resolve(&v, "a.b.c"), None);
    }

    #[test]
    fn out_of_bounds_index_returns_none() {
        let v = json!({"files": [1, 2]});
        assert_eq!(resolve(&v, "files[5]"), None);
    }
}
