//! Request lifecycle integration tests
//!
//! Caller question -> help request -> supervisor answer -> knowledge entry,
//! against a real libSQL file.

mod common;

use common::{create_offline_desk, create_test_desk, RecordingNotifier};
use frontdesk_core::{
    agent::DEFERRAL_MESSAGE, AskOutcome, CallSession, ChatMessage, FrontdeskError,
    KnowledgeBaseView, PendingRequestsView, RequestHistoryView, RequestStatus, Table, WatchSignal,
};
use std::sync::Arc;

#[tokio::test]
async fn test_known_question_gets_canned_answer() {
    let (desk, _dir) = create_test_desk().await;
    let mut call = CallSession::new("Beauty Salon");
    call.start_call();

    let outcome = call.ask_question(&desk, "What are your hours?").await.unwrap();

    assert_eq!(
        outcome,
        AskOutcome::Answered {
            answer: "We're open Monday-Saturday, 9 AM to 7 PM. Closed on Sundays.".to_string()
        }
    );
    assert_eq!(
        call.conversation().last(),
        Some(&ChatMessage::agent(
            "We're open Monday-Saturday, 9 AM to 7 PM. Closed on Sundays."
        ))
    );
    assert_eq!(desk.count_requests(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_question_creates_one_pending_request() {
    let (desk, _dir) = create_test_desk().await;
    let mut call = CallSession::new("Beauty Salon");
    call.start_call();

    let outcome = call
        .ask_question(&desk, "Do you do eyebrow threading?")
        .await
        .unwrap();

    let request = match outcome {
        AskOutcome::Escalated { request } => request,
        other => panic!("expected escalation, got {:?}", other),
    };
    assert_eq!(request.question, "Do you do eyebrow threading?");
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.caller_info["simulated"], true);
    assert_eq!(request.caller_info["call_id"], call.id().to_string());

    assert_eq!(
        call.conversation().last(),
        Some(&ChatMessage::agent(DEFERRAL_MESSAGE))
    );

    let pending = desk.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, request.id);
    assert_eq!(desk.count_requests(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_answer_resolves_and_learns() {
    let (desk, _dir) = create_test_desk().await;
    let mut call = CallSession::new("Beauty Salon");
    call.start_call();
    call.ask_question(&desk, "Do you do eyebrow threading?")
        .await
        .unwrap();

    let mut pending = PendingRequestsView::new(desk.clone());
    pending.refresh().await.unwrap();
    let id = pending.requests()[0].id;

    pending.set_draft(id, "  Yes, $15 per session.  ");
    let resolution = pending.submit_draft(id).await.unwrap();

    assert_eq!(resolution.request.status, RequestStatus::Resolved);
    assert!(resolution.request.resolved_at.is_some());
    assert_eq!(resolution.response.request_id, id);
    assert_eq!(resolution.response.answer, "Yes, $15 per session.");
    assert_eq!(resolution.entry.source_request_id, id);
    assert_eq!(resolution.entry.question, "Do you do eyebrow threading?");
    assert_eq!(resolution.entry.answer, "Yes, $15 per session.");

    assert_eq!(pending.count(), 0);
    assert_eq!(pending.draft(id), "");

    let stored = desk.get_request(id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Resolved);

    let mut history = RequestHistoryView::new(desk.clone());
    history.refresh().await.unwrap();
    assert_eq!(history.count(), 1);
    assert_eq!(history.resolved_count(), 1);
    assert_eq!(
        history.rows()[0].answer.as_deref(),
        Some("Yes, $15 per session.")
    );

    let knowledge = desk.knowledge().await.unwrap();
    assert_eq!(knowledge.len(), 1);
    assert_eq!(knowledge[0].id, resolution.entry.id);
}

#[tokio::test]
async fn test_blank_answer_writes_nothing() {
    let (desk, _dir) = create_test_desk().await;
    let mut call = CallSession::new("Beauty Salon");
    call.start_call();
    call.ask_question(&desk, "Can I bring my dog?").await.unwrap();

    let mut pending = PendingRequestsView::new(desk.clone());
    pending.refresh().await.unwrap();
    let id = pending.requests()[0].id;

    let mut watcher = desk.watch(KnowledgeBaseView::watch_filter());

    for blank in ["", "   ", "\n\t"] {
        let err = pending.submit_answer(id, blank).await.unwrap_err();
        assert!(matches!(err, FrontdeskError::Validation(ref msg) if msg == "Please provide an answer"));
    }

    assert_eq!(desk.count_requests(Some(RequestStatus::Pending)).await.unwrap(), 1);
    assert!(desk.knowledge().await.unwrap().is_empty());
    assert!(!pending.is_submitting(id));

    // Nothing was published either: the first change seen is the real answer
    let resolution = desk.resolve(id, "Only service dogs, sorry.").await.unwrap();
    match watcher.next().await.unwrap() {
        WatchSignal::Changed(event) => {
            assert_eq!(event.table, Table::KnowledgeBase);
            assert_eq!(event.row_id, resolution.entry.id.to_string());
        }
        other => panic!("unexpected signal {:?}", other),
    }
}

#[tokio::test]
async fn test_second_answer_is_rejected() {
    let (desk, _dir) = create_test_desk().await;
    let mut call = CallSession::new("Beauty Salon");
    call.start_call();
    call.ask_question(&desk, "Do you sell gift cards?").await.unwrap();

    let id = desk.pending_requests().await.unwrap()[0].id;
    desk.resolve(id, "Yes, at the front desk.").await.unwrap();

    let err = desk.resolve(id, "Actually no.").await.unwrap_err();
    assert!(matches!(err, FrontdeskError::InvalidOperation(_)));

    let knowledge = desk.knowledge().await.unwrap();
    assert_eq!(knowledge.len(), 1);
    assert_eq!(knowledge[0].answer, "Yes, at the front desk.");

    // A view that already dropped the request refuses it too
    let mut pending = PendingRequestsView::new(desk.clone());
    pending.refresh().await.unwrap();
    let err = pending.submit_answer(id, "Again").await.unwrap_err();
    assert!(matches!(err, FrontdeskError::NotFound(_)));
}

#[tokio::test]
async fn test_views_follow_changes() {
    let (desk, _dir) = create_test_desk().await;

    let mut pending = PendingRequestsView::new(desk.clone());
    let mut history = RequestHistoryView::new(desk.clone());
    let mut knowledge = KnowledgeBaseView::new(desk.clone());
    let mut pending_watch = pending.watch();
    let mut history_watch = history.watch();
    let mut knowledge_watch = knowledge.watch();

    let mut call = CallSession::new("Beauty Salon");
    call.start_call();
    call.ask_question(&desk, "Is there parking nearby?").await.unwrap();

    assert!(pending.follow(&mut pending_watch).await.unwrap());
    assert_eq!(pending.count(), 1);

    let id = pending.requests()[0].id;
    pending
        .submit_answer(id, "Free lot behind the building.")
        .await
        .unwrap();

    // The pending view hears about the request leaving `pending`
    assert!(pending.follow(&mut pending_watch).await.unwrap());
    assert_eq!(pending.count(), 0);

    // History skips the insert and wakes on the status update
    assert!(history.follow(&mut history_watch).await.unwrap());
    assert_eq!(history.resolved_count(), 1);

    assert!(knowledge.follow(&mut knowledge_watch).await.unwrap());
    assert_eq!(knowledge.count(), 1);

    knowledge.set_search("PARKING");
    assert_eq!(knowledge.filtered().len(), 1);
    knowledge.set_search("lot behind");
    assert_eq!(knowledge.filtered().len(), 1);
    knowledge.set_search("balayage");
    assert!(knowledge.filtered().is_empty());
    assert_eq!(knowledge.empty_message().0, "No matching knowledge found");
}

#[tokio::test]
async fn test_notifier_sees_both_messages() {
    let (desk, _dir) = create_test_desk().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let desk = desk.with_notifier(notifier.clone());

    let mut call = CallSession::new("Beauty Salon");
    call.start_call();
    call.ask_question(&desk, "Do you do eyebrow threading?")
        .await
        .unwrap();
    let id = desk.pending_requests().await.unwrap()[0].id;
    desk.resolve(id, "Yes, $15.").await.unwrap();

    assert_eq!(
        notifier.messages(),
        vec![
            "supervisor: Do you do eyebrow threading?".to_string(),
            "caller: Do you do eyebrow threading? -> Yes, $15.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_failed_escalation_keeps_deferral() {
    let desk = create_offline_desk();
    let mut call = CallSession::new("Beauty Salon");
    call.start_call();

    let err = call
        .ask_question(&desk, "Do you do eyebrow threading?")
        .await
        .unwrap_err();
    assert!(matches!(err, FrontdeskError::Database(_)));

    // greeting, question, deferral
    assert_eq!(call.conversation().len(), 3);
    assert_eq!(
        call.conversation().last(),
        Some(&ChatMessage::agent(DEFERRAL_MESSAGE))
    );
    assert!(call.is_active());
}

#[tokio::test]
async fn test_newest_first_ordering() {
    let (desk, _dir) = create_test_desk().await;
    let mut call = CallSession::new("Beauty Salon");
    call.start_call();

    for question in ["first?", "second?", "third?"] {
        call.ask_question(&desk, question).await.unwrap();
    }

    let questions: Vec<String> = desk
        .pending_requests()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.question)
        .collect();
    assert_eq!(questions, vec!["third?", "second?", "first?"]);
}
