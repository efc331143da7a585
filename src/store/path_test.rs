use super::*;

#[test]
fn test_parse_dotted_and_bracket_segments() {
    let path = StorePath::parse("user.items[2].name").unwrap();
    assert_eq!(
        path.segments(),
        &[
            PathSegment::Key("user".into()),
            PathSegment::Key("items".into()),
            PathSegment::Index(2),
            PathSegment::Key("name".into()),
        ]
    );
    assert_eq!(path.as_str(), "user.items[2].name");
}

#[test]
fn test_parse_nested_indices() {
    let path = StorePath::parse("grid[1][0]").unwrap();
    assert_eq!(
        path.segments(),
        &[
            PathSegment::Key("grid".into()),
            PathSegment::Index(1),
            PathSegment::Index(0),
        ]
    );
}

#[test]
fn test_parse_rejects_malformed_paths() {
    for bad in ["", ".a", "a.", "a..b", "[0]", "a[x]", "a[1", "a]", "a[0]b"] {
        assert!(StorePath::parse(bad).is_err(), "'{}' should be rejected", bad);
    }
}

#[test]
fn test_parse_caps_bracket_index() {
    let at_cap = format!("a[{}]", MAX_INDEX);
    assert_eq!(
        StorePath::parse(&at_cap).unwrap().segments()[1],
        PathSegment::Index(MAX_INDEX)
    );
    assert!(StorePath::parse(&format!("a[{}]", MAX_INDEX + 1)).is_err());
    assert!(StorePath::parse("a[18446744073709551616]").is_err());
}

#[test]
fn test_intersects_descendant_ancestor_and_equal() {
    assert!(intersects("a.b.c", "a.b"));
    assert!(intersects("a.b", "a.b.c"));
    assert!(intersects("a.b", "a.b"));
}

#[test]
fn test_intersects_requires_segment_boundary() {
    assert!(!intersects("ab", "a"));
    assert!(!intersects("a", "ab"));
    assert!(!intersects("a.bc", "a.b"));
}

#[test]
fn test_intersects_bracket_indices() {
    assert!(intersects("list[0]", "list"));
    assert!(intersects("list", "list[0].name"));
    assert!(!intersects("list[0]", "list[1]"));
}

#[test]
fn test_any_intersects() {
    let changed = vec!["user.jwt".to_string(), "app.ready".to_string()];
    assert!(any_intersects(&changed, &["user"]));
    assert!(any_intersects(&changed, &["app.ready.flag"]));
    assert!(!any_intersects(&changed, &["users", "application"]));
    assert!(!any_intersects::<String, &str>(&[], &["user"]));
}
