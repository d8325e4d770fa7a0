use super::*;

#[test]
fn test_no_directives() {
    let directives = parse_directives("CREATE TABLE t (id INT64)").unwrap();
    assert_eq!(directives, MigrationDirectives::default());
}

#[test]
fn test_statement_kind_from_line_comment() {
    let sql = "-- @ratchet.StatementKind=ConvergentDML\nUPDATE t SET x = x + 1 WHERE x < 5";
    let directives = parse_directives(sql).unwrap();
    assert_eq!(
        directives.statement_kind,
        Some(StatementKind::ConvergentDml)
    );
    assert_eq!(directives.concurrency, None);
}

#[test]
fn test_legacy_key_alias() {
    let sql = "-- @ratchet.migrationKind=PartitionedDML\nDELETE FROM t WHERE x = 1";
    let directives = parse_directives(sql).unwrap();
    assert_eq!(
        directives.statement_kind,
        Some(StatementKind::PartitionedDml)
    );
}

#[test]
fn test_concurrency_from_hash_comment() {
    let sql = "# @ratchet.Concurrency=4\nDELETE FROM t WHERE x = 1";
    let directives = parse_directives(sql).unwrap();
    assert_eq!(directives.concurrency, Some(4));
}

#[test]
fn test_block_comment_preamble() {
    let sql = "/*\n  @ratchet.StatementKind=ConvergentDML\n  @ratchet.Concurrency=2\n*/\nUPDATE t SET x = 1";
    let directives = parse_directives(sql).unwrap();
    assert_eq!(
        directives.statement_kind,
        Some(StatementKind::ConvergentDml)
    );
    assert_eq!(directives.concurrency, Some(2));
}

#[test]
fn test_directive_after_sql_is_not_a_directive() {
    let sql = "SELECT 1;\n-- @ratchet.Concurrency=4";
    let directives = parse_directives(sql).unwrap();
    assert_eq!(directives, MigrationDirectives::default());
}

#[test]
fn test_unknown_key_fails() {
    let err = parse_directives("-- @ratchet.Nope=1\nSELECT 1").unwrap_err();
    assert!(matches!(err, CoreError::UnknownDirective { ref key } if key == "Nope"));
}

#[test]
fn test_unknown_statement_kind_value_passes_through() {
    let sql = "-- @ratchet.StatementKind=Sideways\nSELECT 1";
    let directives = parse_directives(sql).unwrap();
    assert_eq!(
        directives.statement_kind,
        Some(StatementKind::Other("Sideways".to_string()))
    );
}

#[test]
fn test_bad_concurrency_values_fail() {
    let err = parse_directives("-- @ratchet.Concurrency=zero\nSELECT 1").unwrap_err();
    assert!(matches!(err, CoreError::InvalidDirectiveValue { .. }));

    let err = parse_directives("-- @ratchet.Concurrency=0\nSELECT 1").unwrap_err();
    assert!(matches!(err, CoreError::InvalidDirectiveValue { .. }));
}

#[test]
fn test_preamble_stops_at_first_sql_line() {
    let preamble = extract_preamble(
        "-- one\n\n# two\n/* three\nfour */\nSELECT 1;\n-- five",
    );
    assert_eq!(preamble, "one\ntwo\nthree\nfour");
}
