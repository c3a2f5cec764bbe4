use salesintel_core::Error;
use salesintel_oracle::parse_json_object;

#[test]
fn fenced_object_is_parsed() -> anyhow::Result<()> {
    let map = parse_json_object("```json\n{\"title\": \"Week 42\", \"recommendations\": [\"call back\"]}\n```")?;
    assert_eq!(map["title"], "Week 42");
    assert_eq!(map["recommendations"][0], "call back");
    Ok(())
}

#[test]
fn prose_is_an_oracle_error() {
    let err = parse_json_object("Sure! Here is your summary.").expect_err("invalid");
    assert!(matches!(err, Error::Oracle(_)));
}

#[test]
fn non_object_json_is_refused() {
    let err = parse_json_object("[\"a\", \"b\"]").expect_err("array");
    assert_eq!(err.kind(), "oracle");
    assert!(matches!(err, Error::Oracle(msg) if msg.contains("an array")));
}
