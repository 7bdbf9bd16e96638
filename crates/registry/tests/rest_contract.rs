use std::collections::BTreeSet;

const API_MOD_SOURCE: &str = include_str!("../src/api/mod.rs");
const ACCESSES_SOURCE: &str = include_str!("../src/api/accesses.rs");
const DOCUMENTS_SOURCE: &str = include_str!("../src/api/documents.rs");
const EVENTS_SOURCE: &str = include_str!("../src/api/events.rs");
const SERVER_SOURCE: &str = include_str!("../src/server.rs");

#[test]
fn rest_contract_declares_registry_endpoint_matrix() {
    let expected_paths = [
        "/jsonrpc",
        "/accesses",
        "/documents",
        "/documents/{document_id}",
        "/documents/{document_id}/events",
        "/documents/{document_id}/events/{event_id}",
        "/documents/{document_id}/accesses",
        "/abi",
        "/healthz",
    ];

    let mut missing = BTreeSet::new();
    for path in expected_paths {
        if !API_MOD_SOURCE.contains(&format!(".route(\"{path}\"")) {
            missing.insert(path);
        }
    }

    assert!(missing.is_empty(), "missing route declarations for: {missing:?}");
}

#[test]
fn rest_contract_declares_expected_http_method_bindings() {
    let expectations = [
        ("/jsonrpc", &["post(jsonrpc::handle)"][..]),
        ("/accesses", &["get(accesses::list_accesses)", ".head(accesses::check_creator)"][..]),
        ("/documents", &["get(documents::list_documents)"][..]),
        ("/documents/{document_id}", &["get(documents::get_document)"][..]),
        ("/documents/{document_id}/events", &["get(events::list_events)"][..]),
        ("/documents/{document_id}/events/{event_id}", &["get(events::get_event)"][..]),
        ("/documents/{document_id}/accesses", &["get(accesses::list_document_accesses)"][..]),
        ("/abi", &["get(abi)"][..]),
        ("/healthz", &["get(healthz)"][..]),
    ];

    for (endpoint, required_tokens) in expectations {
        let declaration = API_MOD_SOURCE
            .lines()
            .find(|line| line.contains(&format!(".route(\"{endpoint}\"")))
            .unwrap_or_else(|| panic!("route `{endpoint}` must exist"));
        for token in required_tokens {
            assert!(
                declaration.contains(token),
                "route `{endpoint}` must include token `{token}`",
            );
        }
    }
}

#[test]
fn rest_contract_is_read_only_outside_jsonrpc() {
    for source in [ACCESSES_SOURCE, DOCUMENTS_SOURCE, EVENTS_SOURCE] {
        for forbidden in ["Commit::Now", "Commit::Deferred", ".create(", ".update(", ".delete("] {
            assert!(!source.contains(forbidden), "REST handlers must not write (`{forbidden}`)");
        }
    }
}

#[test]
fn rest_contract_listings_share_the_page_envelope() {
    for source in [ACCESSES_SOURCE, DOCUMENTS_SOURCE, EVENTS_SOURCE] {
        assert!(source.contains("PageEnvelope<"), "list endpoints must return PageEnvelope");
        assert!(source.contains("list_page("), "list endpoints must page through list_page");
    }
}

#[test]
fn rest_contract_server_applies_body_limit_and_request_ids() {
    assert!(SERVER_SOURCE.contains("DefaultBodyLimit::max(MAX_REST_BODY_BYTES)"));
    assert!(SERVER_SOURCE.contains("with_request_id_scope("));
    assert!(SERVER_SOURCE.contains("cors_layer("));
}
