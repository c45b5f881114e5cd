mod common;

use common::*;
use followup_chat::clock::Clock;
use followup_chat::dispatch::{ Notice, Rejection, RollbackPolicy, SubmitOutcome };
use followup_chat::models::{ ChatMessage, Role };
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn answered_question_is_appended_after_the_optimistic_one_and_persisted() {
    let h = harness();
    h.cache.activate(id("exp1")).await;
    h.client.push(Reply::Answer("A function bundled with its environment."));

    let outcome = h.dispatcher.submit_question("What is a closure?", RollbackPolicy::RetainOptimistic).await;
    assert!(matches!(outcome, SubmitOutcome::Answered(ref m) if m.role == Role::Assistant));

    let transcript = h.cache.transcript();
    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].text, "What is a closure?");
    assert_eq!(messages[0].user_id.as_deref(), Some("user-1"));
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].text, "A function bundled with its environment.");

    settle().await;
    let envelope = h.store.envelope("conv:exp1").unwrap();
    assert_eq!(envelope.data, transcript.to_vec());
    assert_eq!(envelope.timestamp, h.clock.now_millis());
    assert_eq!(envelope.expiry, envelope.timestamp + WEEK_MS);
    assert_eq!(h.store.writes_to("conv:exp1").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn question_shows_up_before_the_answer_arrives() {
    let h = harness();
    h.cache.activate(id("exp1")).await;
    h.client.set_delay(Duration::from_secs(2));
    h.client.push(Reply::Answer("later"));
    let mut loading = h.dispatcher.subscribe_loading();

    let handle = h.dispatcher.spawn_submit("Why?", RollbackPolicy::RetainOptimistic);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.dispatcher.is_loading());
    assert!(*loading.borrow_and_update());
    assert_eq!(texts(h.cache.transcript().messages()), ["Why?"]);

    let outcome = handle.await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Answered(_)));
    assert!(!h.dispatcher.is_loading());
    assert_eq!(texts(h.cache.transcript().messages()), ["Why?", "later"]);
}

#[tokio::test(start_paused = true)]
async fn blank_questions_change_nothing() {
    let h = harness();
    h.cache.activate(id("exp1")).await;
    let before = h.cache.transcript();

    let outcome = h.dispatcher.submit_question("   ", RollbackPolicy::RetainOptimistic).await;
    assert_eq!(outcome, SubmitOutcome::Rejected(Rejection::EmptyInput));
    assert!(h.cache.transcript().same_as(&before));
    assert!(h.client.requests().is_empty());
    assert!(!h.dispatcher.is_loading());
    settle().await;
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_question_is_rejected_while_one_is_in_flight() {
    let h = harness();
    h.cache.activate(id("exp1")).await;
    h.client.set_delay(Duration::from_secs(1));
    h.client.push(Reply::Answer("first"));

    let handle = h.dispatcher.spawn_submit("first?", RollbackPolicy::RetainOptimistic);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.dispatcher.check("second?"), Err(Rejection::InFlight));
    let outcome = h.dispatcher.submit_question("second?", RollbackPolicy::RetainOptimistic).await;
    assert_eq!(outcome, SubmitOutcome::Rejected(Rejection::InFlight));

    handle.await.unwrap();
    assert_eq!(h.client.requests().len(), 1);
    assert_eq!(h.dispatcher.check("second?"), Ok(()));
}

#[tokio::test(start_paused = true)]
async fn remote_call_sees_a_frozen_history_snapshot() {
    let h = harness();
    h.cache.activate(id("exp1")).await;
    h.client.push(Reply::Answer("a1"));
    h.dispatcher.submit_question("q1", RollbackPolicy::RetainOptimistic).await;
    let before_second = h.cache.transcript().to_vec();

    h.client.set_delay(Duration::from_secs(1));
    h.client.push(Reply::Answer("a2"));
    let handle = h.dispatcher.spawn_submit("q2", RollbackPolicy::RetainOptimistic);
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.cache.append(h.cache.generation(), ChatMessage::user("from elsewhere", START_MS, None));
    handle.await.unwrap();

    let requests = h.client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].question, "q2");
    assert_eq!(requests[1].history, before_second);
    assert_eq!(
        texts(h.cache.transcript().messages()),
        ["q1", "a1", "q2", "from elsewhere", "a2"]
    );
}

#[tokio::test(start_paused = true)]
async fn failure_with_retain_policy_keeps_the_question_and_notifies() {
    let h = harness();
    h.cache.activate(id("exp1")).await;
    let mut notices = h.dispatcher.subscribe_notices();
    h.client.push(Reply::Fail("upstream 502"));

    let outcome = h.dispatcher.submit_question("Explain monads", RollbackPolicy::RetainOptimistic).await;
    assert_eq!(outcome, SubmitOutcome::Failed {
        error: "upstream 502".to_string(),
        rolled_back: false,
    });
    assert_eq!(texts(h.cache.transcript().messages()), ["Explain monads"]);
    assert!(!h.dispatcher.is_loading());
    match notices.try_recv().unwrap() {
        Notice::AnswerFailed { message } => assert!(message.contains("upstream 502")),
        other => panic!("unexpected notice {:?}", other),
    }

    settle().await;
    assert_eq!(texts(&h.store.envelope("conv:exp1").unwrap().data), ["Explain monads"]);
}

#[tokio::test(start_paused = true)]
async fn failure_with_remove_policy_restores_the_previous_transcript() {
    let h = harness();
    h.cache.activate(id("exp1")).await;
    h.client.push(Reply::Fail("timeout"));

    let outcome = h.dispatcher.submit_question("Explain monads", RollbackPolicy::RemoveOptimistic).await;
    assert_eq!(outcome, SubmitOutcome::Failed {
        error: "timeout".to_string(),
        rolled_back: true,
    });
    assert!(h.cache.transcript().is_empty());
    settle().await;
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_answer_for_a_previous_conversation_is_discarded() {
    let h = harness();
    h.cache.activate(id("a")).await;
    h.client.set_delay(Duration::from_secs(1));
    h.client.push(Reply::Answer("for a"));

    let handle = h.dispatcher.spawn_submit("question about a", RollbackPolicy::RetainOptimistic);
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.cache.activate(id("b")).await;

    assert_eq!(handle.await.unwrap(), SubmitOutcome::Discarded);
    assert!(h.cache.transcript().is_empty());
    assert!(!h.dispatcher.is_loading());
    settle().await;
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_failure_after_teardown_is_silent() {
    let h = harness();
    h.cache.activate(id("a")).await;
    let mut notices = h.dispatcher.subscribe_notices();
    h.client.set_delay(Duration::from_secs(1));
    h.client.push(Reply::Fail("boom"));

    let handle = h.dispatcher.spawn_submit("q", RollbackPolicy::RemoveOptimistic);
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.cache.teardown();

    assert_eq!(handle.await.unwrap(), SubmitOutcome::Discarded);
    assert!(notices.try_recv().is_err());
}
