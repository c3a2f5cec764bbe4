use salesintel_query::{QueryValidator, RejectReason, Verdict, CANNOT_ANSWER};

fn validator() -> QueryValidator {
    QueryValidator::new(["leads", "customers", "campaigns", "sales_records", "users"], 4000).expect("validator")
}

fn rejected(sql: &str) -> RejectReason {
    match validator().validate(sql) {
        Verdict::Rejected(reason) => reason,
        Verdict::Safe => panic!("expected rejection for {sql:?}"),
    }
}

#[test]
fn plain_select_on_allowed_entity_is_safe() {
    assert_eq!(validator().validate("SELECT * FROM leads"), Verdict::Safe);
    assert_eq!(validator().validate("  select count(*) as total from leads l  "), Verdict::Safe);
}

#[test]
fn realistic_generated_queries_are_safe() {
    let v = validator();
    let queries = [
        "SELECT l.status, COUNT(*) AS n FROM leads l GROUP BY l.status ORDER BY n DESC LIMIT 100",
        "SELECT c.company_name, SUM(s.amount) AS revenue FROM customers c JOIN sales_records s ON s.customer_id = c.id \
         WHERE s.stage = 'closed_won' GROUP BY c.company_name LIMIT 100",
        "SELECT cp.name, cp.roi FROM campaigns cp WHERE cp.updated_at > '2024-01-01' AND cp.created_at IS NOT NULL",
        "SELECT strftime('%Y-%m', s.actual_close_date) AS month, SUM(s.amount) FROM sales_records s GROUP BY month",
        "SELECT EXTRACT(MONTH FROM s.close_date) AS m FROM sales_records s",
        "SELECT u.full_name FROM users u WHERE u.id IN (SELECT l.assigned_to FROM leads l WHERE l.source = 'cold_call')",
        "SELECT l.company_name FROM leads l, customers c WHERE c.lead_id = l.id",
        "SELECT * FROM (leads l JOIN customers c ON c.lead_id = l.id)",
        "SELECT c.company_name FROM customers c JOIN leads l USING (id) ORDER BY c.company_name, l.id",
        CANNOT_ANSWER,
    ];
    for q in queries {
        assert_eq!(v.validate(q), Verdict::Safe, "{q}");
    }
}

#[test]
fn anything_not_starting_with_select_is_rejected() {
    for sql in [
        "DELETE FROM customers",
        "UPDATE leads SET status = 'new'",
        "WITH x AS (SELECT 1) SELECT * FROM x",
        "EXPLAIN SELECT * FROM leads",
        "SELECTED * FROM leads",
        "(SELECT * FROM leads)",
        "Sure! SELECT * FROM leads",
    ] {
        assert_eq!(rejected(sql), RejectReason::NotReadOnly, "{sql}");
    }
}

#[test]
fn mutating_keyword_after_valid_prefix_is_rejected() {
    assert!(!validator().validate("SELECT 1; DROP TABLE leads").is_safe());
    for sql in [
        "SELECT * FROM leads WHERE id IN (DELETE FROM leads RETURNING id)",
        "SELECT * INTO backup FROM customers",
        "SELECT 1 FROM leads UNION SELECT password FROM users",
        "SELECT 1 FROM leads union all select 2 FROM users",
        "select * from leads; pragma writable_schema = 1",
        "SELECT * FROM leads WHERE EXISTS (SELECT 1) AND 1 = 1 OR truncate = 1",
    ] {
        assert_eq!(rejected(sql), RejectReason::ForbiddenKeyword, "{sql}");
    }
}

#[test]
fn comments_and_terminators_are_rejected() {
    for sql in [
        "SELECT * FROM leads -- only leads",
        "SELECT * FROM leads /* hi */",
        "SELECT * FROM leads;",
        "SELECT * FROM leads; SELECT * FROM users",
    ] {
        assert_eq!(rejected(sql), RejectReason::ForbiddenSequence, "{sql}");
    }
}

#[test]
fn system_catalogs_are_rejected() {
    for sql in [
        "SELECT * FROM sqlite_master",
        "SELECT name FROM pg_catalog.pg_tables",
        "SELECT * FROM information_schema.tables",
        "SELECT * FROM sys.objects",
    ] {
        assert_eq!(rejected(sql), RejectReason::SystemCatalog, "{sql}");
    }
}

#[test]
fn entities_outside_allow_list_are_rejected() {
    for sql in [
        "SELECT * FROM secrets",
        "SELECT * FROM leads l JOIN api_keys k ON k.user_id = l.assigned_to",
        "SELECT * FROM leads, payroll",
        "SELECT * FROM (SELECT * FROM audit_log) a",
        "SELECT * FROM main.leads",
        r#"SELECT * FROM "tokens""#,
        "SELECT * FROM (secrets)",
        "SELECT * FROM leads l JOIN (secrets s) ON 1=1",
        "SELECT k.secret FROM (api_keys k)",
        "SELECT * FROM ((leads l JOIN api_keys k ON 1=1))",
        "SELECT * FROM leads l JOIN customers c ON c.lead_id = l.id, payroll",
        "SELECT * FROM (SELECT id FROM leads) x, (payroll)",
    ] {
        assert_eq!(rejected(sql), RejectReason::UnknownEntity, "{sql}");
    }
}

#[test]
fn allow_list_is_case_insensitive() {
    let v = QueryValidator::new(["Leads"], 100).expect("validator");
    assert!(v.validate("SELECT * FROM LEADS").is_safe());
    assert!(!v.validate("SELECT * FROM customers").is_safe());
}

#[test]
fn empty_and_oversized_input_is_rejected() {
    assert_eq!(rejected(""), RejectReason::Empty);
    assert_eq!(rejected("   \n\t"), RejectReason::Empty);
    let v = QueryValidator::new(["leads"], 30).expect("validator");
    assert_eq!(v.validate("SELECT * FROM leads WHERE id > 1000000"), Verdict::Rejected(RejectReason::TooLong));
    assert_eq!(v.validate("SELECT * FROM leads"), Verdict::Safe);
}

#[test]
fn reason_codes_are_stable() {
    assert_eq!(RejectReason::ForbiddenKeyword.code(), "forbidden_keyword");
    assert_eq!(RejectReason::UnknownEntity.to_string(), "unknown_entity");
}
