//! Integration tests for the keyword search engine.

mod common;

use attachgrab::model::message_id::MessageId;
use attachgrab::search::search;

use common::MockMailbox;

// ─── Mediafill scenario: one message, one id ────────────────────────

#[test]
fn test_uppercase_subject_found_once() {
    let mut session = MockMailbox::new()
        .with_fixture(7, "report_pdf.eml")
        .into_session();

    let outcome = search(&mut session, "Mediafill");

    assert_eq!(outcome.ids.len(), 1);
    assert!(outcome.ids.contains(&MessageId::new(7)));
    assert!(outcome.failures.is_empty());
}

// ─── Duplicates across variants collapse ────────────────────────────

#[test]
fn test_id_matched_by_several_variants_appears_once() {
    // plain.eml mentions MEDIAFILL, mediafill and Mediafill
    let mut session = MockMailbox::new()
        .with_fixture(9, "plain.eml")
        .into_session();

    let outcome = search(&mut session, "Mediafill");

    assert_eq!(outcome.variants, vec!["MEDIAFILL", "mediafill", "Mediafill"]);
    assert_eq!(outcome.ids.len(), 1);
    assert!(outcome.ids.contains(&MessageId::new(9)));
}

#[test]
fn test_results_are_unioned_across_variants() {
    // each fixture spells the keyword differently
    let mut session = MockMailbox::new()
        .with_fixture(1, "report_pdf.eml")
        .with_fixture(2, "two_pdfs.eml")
        .with_fixture(3, "nested.eml")
        .into_session();

    let outcome = search(&mut session, "mEDIAFILL");

    let ids: Vec<u32> = outcome.ids.iter().map(|id| id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(outcome.variants.len(), 4);
    assert_eq!(session.transport().unwrap().queries.len(), 4);
}

#[test]
fn test_caseless_keyword_collapses_to_one_query() {
    let mut session = MockMailbox::new()
        .with_fixture(5, "report_pdf.eml")
        .into_session();

    // Digits have no case, so every variant is the same query
    let outcome = search(&mut session, "2024");
    assert_eq!(outcome.variants, vec!["2024"]);
    assert_eq!(outcome.ids.len(), 1);
    assert_eq!(session.transport().unwrap().queries.len(), 1);
}

// ─── Zero matches is empty, not an error ────────────────────────────

#[test]
fn test_no_match_returns_empty_set() {
    let mut session = MockMailbox::new()
        .with_fixture(1, "report_pdf.eml")
        .into_session();

    let outcome = search(&mut session, "quarterly forecast");
    assert!(outcome.ids.is_empty());
    assert!(outcome.failures.is_empty());
    assert!(!outcome.all_failed());
}

#[test]
fn test_empty_keyword_issues_no_queries() {
    let mut session = MockMailbox::new()
        .with_fixture(1, "report_pdf.eml")
        .into_session();

    let outcome = search(&mut session, "   ");
    assert!(outcome.ids.is_empty());
    assert!(outcome.variants.is_empty());
    assert!(session.transport().unwrap().queries.is_empty());
}

// ─── Failing variants are skipped ───────────────────────────────────

#[test]
fn test_failing_variant_does_not_abort_search() {
    let mut session = MockMailbox::new()
        .with_fixture(1, "report_pdf.eml")
        .with_fixture(2, "two_pdfs.eml")
        .with_failing_variant("MEDIAFILL")
        .into_session();

    let outcome = search(&mut session, "Mediafill");

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].variant, "MEDIAFILL");
    // report_pdf.eml is only reachable through the failed variant
    let ids: Vec<u32> = outcome.ids.iter().map(|id| id.get()).collect();
    assert_eq!(ids, vec![2]);
    // the remaining variants still ran
    assert_eq!(session.transport().unwrap().queries.len(), 3);
}

#[test]
fn test_non_ascii_keyword_sends_utf8_charset() {
    let mut session = MockMailbox::new().into_session();
    search(&mut session, "café");

    let queries = &session.transport().unwrap().queries;
    assert_eq!(queries.len(), 3);
    assert!(queries.iter().all(|q| q.starts_with("CHARSET UTF-8 TEXT \"")));
}

#[test]
fn test_strict_server_rejection_is_not_an_empty_match() {
    let mut session = MockMailbox::new()
        .with_fixture(1, "report_pdf.eml")
        .seven_bit_only()
        .into_session();

    let outcome = search(&mut session, "Médiafill");
    assert!(outcome.ids.is_empty());
    assert!(outcome.all_failed());
    assert_eq!(outcome.failures.len(), outcome.variants.len());

    // ASCII keywords are unaffected
    let outcome = search(&mut session, "Mediafill");
    assert!(!outcome.all_failed());
    assert_eq!(outcome.ids.len(), 1);
}

#[test]
fn test_closed_session_reports_failures_not_panic() {
    let mut session = MockMailbox::new()
        .with_fixture(1, "report_pdf.eml")
        .into_session();
    session.close();

    let outcome = search(&mut session, "Mediafill");
    assert!(outcome.ids.is_empty());
    assert!(outcome.all_failed());
}

#[test]
fn test_variants_are_queried_in_fixed_order() {
    let mut session = MockMailbox::new().into_session();
    search(&mut session, "hello World");

    assert_eq!(
        session.transport().unwrap().queries,
        vec![
            "TEXT \"HELLO WORLD\"",
            "TEXT \"hello world\"",
            "TEXT \"Hello world\"",
            "TEXT \"Hello World\"",
            "TEXT \"hello World\"",
        ]
    );
}
