//! Property-based tests for the complaint status state machine
//!
//! This module uses proptest to verify that the transition logic on
//! `Complaint` behaves correctly across a wide variety of action sequences.
//! The transition logic is critical - bugs here corrupt the audit trail of
//! every grievance case.
//!
//! These tests focus on invariants that should hold regardless of the
//! specific action sequence, helping catch edge cases in the state machine
//! that would be difficult to find with manual test case selection.

use proptest::prelude::*;
use result_grievance::{
    complaint::{ComplaintDetails, ComplaintDraft},
    error::WorkflowError,
    utils::excerpt,
    workflow::{Complaint, ReviewAction, Status, EXCERPT_LEN},
};

// These property tests cover:
//
// 1. Append-only history - fundamental audit requirement
// 2. Terminal state stability - ensures workflow endpoints are truly final
// 3. Base case (fresh submission) - validates initial conditions
// 4. Feedback tracking - the latest staff note always wins
// 5. Assignment consistency - a routed case always names its lecturer
// 6. Excerpt bounds - quoted student text never overruns a history line
//
// What these tests DON'T cover (deliberately):
//
// - Database persistence (requires tempfile, covered in integration tests)
// - Role checks on the session (handled by the service layer, not the
//   record-level state machine)

/// One record-level workflow action with its acting user
#[derive(Debug, Clone)]
enum CaseAction {
    Assign { lecturer: String, by: String },
    Respond {
        action: ReviewAction,
        comment: String,
        by: String,
    },
    SupplyInfo { message: String, by: String },
    Resolve { message: String, by: String },
}

fn apply(case: &mut Complaint, action: &CaseAction) -> Result<(), WorkflowError> {
    match action {
        CaseAction::Assign { lecturer, by } => case.assign_to(lecturer, by),
        CaseAction::Respond { action, comment, by } => case.record_response(*action, comment, by),
        CaseAction::SupplyInfo { message, by } => case.record_student_info(message, by),
        CaseAction::Resolve { message, by } => case.record_resolution(message, by),
    }
}

/// Small actor pool so sequences hit both the right and the wrong user for
/// each action
fn actor_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("l1".to_string()),
        Just("l2".to_string()),
        Just("s1".to_string()),
        Just("admin1".to_string()),
    ]
}

fn review_action_strategy() -> impl Strategy<Value = ReviewAction> {
    prop_oneof![
        Just(ReviewAction::Approve),
        Just(ReviewAction::Reject),
        Just(ReviewAction::RequestInfo),
    ]
}

fn case_action_strategy() -> impl Strategy<Value = CaseAction> {
    prop_oneof![
        actor_strategy().prop_map(|lecturer| CaseAction::Assign {
            lecturer,
            by: "admin1".to_string(),
        }),
        (review_action_strategy(), "[a-z ]{0,40}", actor_strategy()).prop_map(
            |(action, comment, by)| CaseAction::Respond { action, comment, by }
        ),
        ("[a-z ]{0,120}", actor_strategy())
            .prop_map(|(message, by)| CaseAction::SupplyInfo { message, by }),
        ("[a-z ]{0,40}", actor_strategy())
            .prop_map(|(message, by)| CaseAction::Resolve { message, by }),
    ]
}

fn action_sequence_strategy() -> impl Strategy<Value = Vec<CaseAction>> {
    prop::collection::vec(case_action_strategy(), 1..=12)
}

fn details_strategy() -> impl Strategy<Value = ComplaintDetails> {
    ("[A-Z]{3}[0-9]{3}", "[a-z]{1,20}", "[a-z]{1,30}").prop_map(|(code, lecturer, desc)| {
        ComplaintDraft::new()
            .set_course_code(&code)
            .set_lecturer_name(&lecturer)
            .set_description(&desc)
            .finalise()
            .unwrap()
    })
}

// PROPERTY TESTS
proptest! {
    /// Property: history is append-only. A successful transition appends
    /// exactly one entry, a failed one appends nothing, and entries already
    /// recorded are never rewritten.
    #[test]
    fn prop_history_is_append_only(
        details in details_strategy(),
        actions in action_sequence_strategy(),
    ) {
        let mut case = Complaint::new(1, "s1", details);

        for action in &actions {
            let before = case.history.clone();
            let result = apply(&mut case, action);

            match result {
                Ok(()) => prop_assert_eq!(case.history.len(), before.len() + 1),
                Err(_) => prop_assert_eq!(case.history.len(), before.len()),
            }
            prop_assert_eq!(&case.history[..before.len()], &before[..]);
        }
    }

    /// Property: Resolved and Rejected are truly terminal. Once a case
    /// reaches either, every further action fails and changes nothing.
    #[test]
    fn prop_terminal_states_are_stable(
        details in details_strategy(),
        actions in action_sequence_strategy(),
    ) {
        let mut case = Complaint::new(1, "s1", details);
        let mut closed_at: Option<usize> = None;

        for action in &actions {
            let was_terminal = case.status.is_terminal();
            let history_len = case.history.len();
            let status = case.status;

            let result = apply(&mut case, action);

            if was_terminal {
                prop_assert!(result.is_err(), "terminal case accepted {:?}", action);
                prop_assert_eq!(case.status, status);
                prop_assert_eq!(case.history.len(), history_len);
            } else if case.status.is_terminal() && closed_at.is_none() {
                closed_at = Some(case.history.len());
            }
        }

        if let Some(len) = closed_at {
            // nothing was recorded after closure
            prop_assert_eq!(case.history.len(), len);
        }
    }

    /// Property: a fresh submission always starts Received, unassigned,
    /// with exactly the seeded history entry.
    #[test]
    fn prop_new_case_base_state(details in details_strategy()) {
        let case = Complaint::new(1, "s1", details);

        prop_assert_eq!(case.status, Status::Received);
        prop_assert_eq!(case.assigned_to, None);
        prop_assert_eq!(case.feedback, "");
        prop_assert_eq!(case.history.len(), 1);
        prop_assert_eq!(case.history[0].action.as_str(), "Complaint submitted");
        prop_assert_eq!(case.history[0].by.as_deref(), Some("s1"));
    }

    /// Property: feedback always holds the comment of the most recent
    /// successful staff action (lecturer response or admin resolution),
    /// and is untouched by assignment and student replies.
    #[test]
    fn prop_feedback_tracks_latest_staff_note(
        details in details_strategy(),
        actions in action_sequence_strategy(),
    ) {
        let mut case = Complaint::new(1, "s1", details);
        let mut expected = String::new();

        for action in &actions {
            if apply(&mut case, action).is_ok() {
                match action {
                    CaseAction::Respond { comment, .. } => expected = comment.clone(),
                    CaseAction::Resolve { message, .. } => expected = message.clone(),
                    CaseAction::Assign { .. } | CaseAction::SupplyInfo { .. } => {}
                }
            }
            prop_assert_eq!(&case.feedback, &expected);
        }
    }

    /// Property: whenever a case sits with a lecturer, it names one, and a
    /// successful response always came from exactly that lecturer.
    #[test]
    fn prop_routed_cases_always_name_their_lecturer(
        details in details_strategy(),
        actions in action_sequence_strategy(),
    ) {
        let mut case = Complaint::new(1, "s1", details);

        for action in &actions {
            let assigned = case.assigned_to.clone();
            let result = apply(&mut case, action);

            if case.status == Status::SentToLecturer {
                prop_assert!(case.assigned_to.is_some());
            }
            if result.is_ok() {
                if let CaseAction::Respond { by, .. } = action {
                    prop_assert_eq!(assigned.as_deref(), Some(by.as_str()));
                }
            }
        }
    }

    /// Property: the storage encoding round-trips any reachable case state.
    #[test]
    fn prop_case_cbor_roundtrip(
        details in details_strategy(),
        actions in action_sequence_strategy(),
    ) {
        let mut case = Complaint::new(1, "s1", details);
        for action in &actions {
            let _ = apply(&mut case, action);
        }

        let encoded = minicbor::to_vec(&case).unwrap();
        let decoded: Complaint = minicbor::decode(&encoded).unwrap();

        prop_assert_eq!(decoded, case);
    }

    /// Property: quoted student text in a history line is bounded and is
    /// always a prefix of the original message, whatever the input.
    #[test]
    fn prop_excerpt_is_bounded_prefix(message in "\\PC{0,200}") {
        let cut = excerpt(&message, EXCERPT_LEN);

        prop_assert!(cut.chars().count() <= EXCERPT_LEN + 3);
        let prefix: String = message.chars().take(EXCERPT_LEN).collect();
        prop_assert!(prefix.starts_with(cut.trim_end_matches("...")) || cut == message);
    }
}
