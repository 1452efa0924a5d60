#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use kbmeter_core::label::join_kb_stores;
use kbmeter_core::protocol::rag::{AskLabelView, AskRequest, AskResponse, UploadResponse};
use kbmeter_core::protocol::store_log::{KbStoreCodesRequest, KbStoreCodesResponse};

#[test]
fn ask_requires_kb_stores() {
    let err = AskRequest::from_slice(br#"{"stores":["a"]}"#).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");

    let err = AskRequest::from_slice(b"not json").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");

    let err = AskRequest::from_slice(br#"{"kbStores":"finance"}"#).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ask_parses_store_list() {
    let req = AskRequest::from_slice(br#"{"kbStores":["finance","hr"]}"#).unwrap();
    assert_eq!(req.kb_stores, vec!["finance", "hr"]);
    assert_eq!(join_kb_stores(&req.kb_stores), "finance,hr");
}

#[test]
fn label_view_defaults_to_empty() {
    let view: AskLabelView = serde_json::from_slice(br#"{}"#).unwrap();
    assert!(view.kb_stores.is_empty());
    assert_eq!(join_kb_stores(&view.kb_stores), "");
}

#[test]
fn responses_use_wire_field_names() {
    let v = serde_json::to_value(AskResponse::received("kbs-1".into())).unwrap();
    assert_eq!(v["message"], "Successfully received kbStores!");
    assert_eq!(v["session"], "kbs-1");

    let v = serde_json::to_value(UploadResponse::uploaded("notes.pdf")).unwrap();
    assert_eq!(v["message"], "File 'notes.pdf' uploaded successfully!");

    let v = serde_json::to_value(KbStoreCodesResponse {
        received_kb_store_codes: vec![" HR ".into()],
    })
    .unwrap();
    assert_eq!(v["received_kb_store_codes"][0], " HR ");
}

#[test]
fn store_codes_body_is_strict() {
    let req = KbStoreCodesRequest::from_slice(br#"{"kb_store_codes":["A",""]}"#).unwrap();
    assert_eq!(req.kb_store_codes, vec!["A", ""]);

    let err = KbStoreCodesRequest::from_slice(br#"{"kbStores":[]}"#).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}
