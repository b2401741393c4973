use std::time::Duration;

use lsp_types::{CompletionTriggerKind, Position};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::config::CompletionConfig;
use crate::position::OffsetEncoding;
use crate::provider::ProviderId;
use crate::testing::{MockClient, MockEditor, MockResponse};

const FIRST: ProviderId = ProviderId(1);
const SECOND: ProviderId = ProviderId(2);

fn session(providers: Vec<Provider>, text: &str) -> CompletionSession<MockClient, MockEditor> {
	CompletionSession::new(MockClient::new(providers), MockEditor::new(text), CompletionConfig::default())
}

fn context(input: &str, complete_pos: usize, is_incomplete: bool) -> GatherContext {
	GatherContext {
		input: input.to_string(),
		is_incomplete,
		complete_pos,
		complete_str: input.chars().skip(complete_pos).collect(),
		timeout: Duration::from_millis(500),
	}
}

fn words(result: &GatherResult) -> Vec<&str> {
	result.items.iter().map(|item| item.word.as_str()).collect()
}

#[tokio::test]
async fn complete_response_is_returned_and_then_forgotten() {
	let session = session(vec![Provider::new(FIRST)], "print.c|");
	session.client().respond_json(FIRST, json!([{ "label": "console" }]));

	let result = session.gather(&context("print.c", 6, false)).await.unwrap();
	assert_eq!(words(&result), vec!["console"]);
	assert!(!result.is_incomplete);
	assert_eq!(result.items[0].user_data.line_on_request, "print.c");
	assert_eq!(result.items[0].user_data.request_character, 7);
	assert_eq!(result.items[0].user_data.suggest_character, 6);
	assert!(session.cached_items(FIRST).await.is_none());

	// The next keystroke asks the provider again rather than replaying.
	session.editor().set_text("print.co|");
	session.client().respond_json(FIRST, json!({ "isIncomplete": false, "items": [{ "label": "console" }, { "label": "const" }] }));
	let result = session.gather(&context("print.co", 6, false)).await.unwrap();
	assert_eq!(words(&result), vec!["console", "const"]);
	assert_eq!(session.client().request_count(FIRST), 2);
}

#[tokio::test]
async fn mixed_completeness_keeps_only_complete_providers_cached() {
	let session = session(vec![Provider::new(FIRST), Provider::new(SECOND)], "x.fo|");
	session.client().respond_json(FIRST, json!({ "isIncomplete": true, "items": [{ "label": "foo" }] }));
	session.client().respond_json(SECOND, json!({ "isIncomplete": false, "items": [{ "label": "for" }, { "label": "format" }] }));

	let result = session.gather(&context("x.fo", 2, false)).await.unwrap();
	assert!(result.is_incomplete);
	assert_eq!(words(&result), vec!["foo", "for", "format"]);
	assert!(session.cached_items(FIRST).await.is_none());
	assert_eq!(session.cached_items(SECOND).await.map(|items| items.len()), Some(2));

	session.editor().set_text("x.foo|");
	session.client().respond_json(FIRST, json!({ "isIncomplete": true, "items": [{ "label": "foobar" }] }));
	let result = session.gather(&context("x.foo", 2, true)).await.unwrap();
	assert_eq!(words(&result), vec!["foobar", "for", "format"]);
	assert_eq!(session.client().request_count(FIRST), 2);
	assert_eq!(session.client().request_count(SECOND), 1);

	let (_, params) = session.client().requests().pop().unwrap();
	assert_eq!(
		params.context.map(|cx| cx.trigger_kind),
		Some(CompletionTriggerKind::TRIGGER_FOR_INCOMPLETE_COMPLETIONS)
	);
}

#[tokio::test]
async fn stable_cycle_clears_every_entry() {
	let session = session(vec![Provider::new(FIRST), Provider::new(SECOND)], "fo|");
	session.client().respond_json(FIRST, json!({ "isIncomplete": true, "items": [] }));
	session.client().respond_json(SECOND, json!([{ "label": "foo" }]));
	session.gather(&context("fo", 0, false)).await.unwrap();
	assert!(session.cached_items(SECOND).await.is_some());

	session.client().respond_json(FIRST, json!({ "isIncomplete": false, "items": [{ "label": "fold" }] }));
	let result = session.gather(&context("fo", 0, true)).await.unwrap();
	assert!(!result.is_incomplete);
	assert_eq!(words(&result), vec!["fold", "foo"]);
	assert!(session.cached_items(FIRST).await.is_none());
	assert!(session.cached_items(SECOND).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn timeout_drops_the_provider_silently() {
	let session = session(vec![Provider::new(FIRST), Provider::new(SECOND)], "ab|");
	session.client().respond(FIRST, MockResponse::Hang);
	session.client().respond_json(SECOND, json!([{ "label": "abc" }]));

	let result = session.gather(&context("ab", 0, false)).await.unwrap();
	assert_eq!(words(&result), vec!["abc"]);
	assert!(session.editor().errors().is_empty());
}

#[tokio::test]
async fn failures_are_reported_without_losing_siblings() {
	let session = session(vec![Provider::new(FIRST), Provider::new(SECOND)], "ab|");
	session.client().respond(FIRST, MockResponse::Error(String::from("server crashed")));
	session.client().respond_json(SECOND, json!([{ "label": "abc" }]));

	let result = session.gather(&context("ab", 0, false)).await.unwrap();
	assert_eq!(words(&result), vec!["abc"]);
	assert_eq!(session.editor().errors(), vec![String::from("LSP#1: language client error: server crashed")]);
}

#[tokio::test]
async fn undecodable_response_is_reported() {
	let session = session(vec![Provider::new(FIRST)], "ab|");
	session.client().respond_json(FIRST, json!("not a list"));

	let result = session.gather(&context("ab", 0, false)).await.unwrap();
	assert!(result.items.is_empty());
	assert_eq!(session.editor().errors().len(), 1);
}

#[tokio::test]
async fn null_response_is_an_empty_complete_list() {
	let session = session(vec![Provider::new(FIRST)], "ab|");
	session.client().respond(FIRST, MockResponse::Value(None));

	let result = session.gather(&context("ab", 0, false)).await.unwrap();
	assert_eq!(result, GatherResult::default());
	assert!(session.editor().errors().is_empty());
}

#[tokio::test]
async fn request_position_follows_each_provider_encoding() {
	let providers = vec![
		Provider::new(FIRST).with_offset_encoding(OffsetEncoding::Utf16),
		Provider::new(SECOND).with_offset_encoding(OffsetEncoding::Utf8),
	];
	let session = session(providers, "\u{1F600}.|");

	session.gather(&context("\u{1F600}.", 2, false)).await.unwrap();
	let positions: Vec<_> = session
		.client()
		.requests()
		.into_iter()
		.map(|(id, params)| (id, params.text_document_position.position))
		.collect();
	assert_eq!(positions.len(), 2);
	assert!(positions.contains(&(FIRST, Position { line: 0, character: 3 })));
	assert!(positions.contains(&(SECOND, Position { line: 0, character: 5 })));
}

#[tokio::test]
async fn suggestion_start_is_clamped_to_the_cursor() {
	let session = session(vec![Provider::new(FIRST)], "ab|");
	session.client().respond_json(FIRST, json!([{ "label": "abc" }]));

	let result = session.gather(&context("ab", 9, false)).await.unwrap();
	assert_eq!(result.items[0].user_data.suggest_character, 2);
}

#[test]
fn trigger_character_wins() {
	let provider = Provider::new(FIRST).with_trigger_characters(["."]);
	let cx = completion_context(&provider, "print.", true);
	assert_eq!(cx.trigger_kind, CompletionTriggerKind::TRIGGER_CHARACTER);
	assert_eq!(cx.trigger_character.as_deref(), Some("."));
}

#[test]
fn continuing_session_asks_for_more() {
	let provider = Provider::new(FIRST).with_trigger_characters(["."]);
	let cx = completion_context(&provider, "print.c", true);
	assert_eq!(cx.trigger_kind, CompletionTriggerKind::TRIGGER_FOR_INCOMPLETE_COMPLETIONS);
	assert_eq!(cx.trigger_character, None);
}

#[test]
fn otherwise_invoked() {
	let provider = Provider::new(FIRST);
	assert_eq!(completion_context(&provider, "print.", false).trigger_kind, CompletionTriggerKind::INVOKED);
	assert_eq!(completion_context(&provider, "", false).trigger_kind, CompletionTriggerKind::INVOKED);
}

#[tokio::test]
async fn byte_based_word_start_is_recovered_from_the_word() {
	let session = session(vec![Provider::new(FIRST)], "\u{1F600}.fo|");
	session.client().respond_json(FIRST, json!([{ "label": "foo" }]));

	// Byte 5 is where `fo` starts; the character offset is 2.
	let cx = GatherContext {
		complete_pos: 5,
		complete_str: String::from("fo"),
		..context("\u{1F600}.fo", 2, false)
	};
	let result = session.gather(&cx).await.unwrap();
	assert_eq!(result.items[0].user_data.suggest_character, 2);
}

#[test]
fn suggest_character_trusts_a_consistent_position() {
	let cx = context("print.co", 6, false);
	assert_eq!(cx.suggest_character("print.co", 8), 6);
}

#[test]
fn suggest_character_falls_back_to_the_word_suffix() {
	let cx = GatherContext {
		complete_pos: 7,
		complete_str: String::from("bar"),
		..context("", 0, false)
	};
	assert_eq!(cx.suggest_character("\u{e9}\u{e9}.bar", 6), 3);
}

#[test]
fn suggest_character_keeps_the_clamped_position_when_the_word_is_missing() {
	let cx = GatherContext {
		complete_pos: 1,
		complete_str: String::from("zz"),
		..context("", 0, false)
	};
	assert_eq!(cx.suggest_character("abc", 3), 1);
}
