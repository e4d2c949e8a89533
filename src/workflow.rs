use super::complaint::{ComplaintDetails, TimeStamp};
use super::error::WorkflowError;
use super::utils::excerpt;
use chrono::Utc;
use std::fmt;
use std::str::FromStr;

// History lines quote at most this many chars of a student's message.
pub const EXCERPT_LEN: usize = 70;

/// Where a case currently sits in the grievance workflow.
///
/// `Resolved` and `Rejected` are terminal, no transition leaves them.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Status {
    #[n(0)]
    Received,
    #[n(1)]
    UnderReview,
    #[n(2)]
    SentToLecturer,
    #[n(3)]
    AdminVerification,
    #[n(4)]
    AwaitingStudentResponse,
    #[n(5)]
    Resolved,
    #[n(6)]
    Rejected,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Resolved | Status::Rejected)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Received => "Received",
            Status::UnderReview => "Under Review",
            Status::SentToLecturer => "Sent to Lecturer",
            Status::AdminVerification => "Admin Verification",
            Status::AwaitingStudentResponse => "Awaiting Student Response",
            Status::Resolved => "Resolved",
            Status::Rejected => "Rejected",
        };
        f.write_str(label)
    }
}

impl FromStr for Status {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // "Pending" is the legacy label for a freshly filed case
            "Received" | "Pending" => Ok(Status::Received),
            "Under Review" => Ok(Status::UnderReview),
            "Sent to Lecturer" => Ok(Status::SentToLecturer),
            "Admin Verification" => Ok(Status::AdminVerification),
            "Awaiting Student Response" => Ok(Status::AwaitingStudentResponse),
            "Resolved" => Ok(Status::Resolved),
            "Rejected" => Ok(Status::Rejected),
            other => Err(WorkflowError::UnknownStatus(other.to_string())),
        }
    }
}

/// The three ways a lecturer can answer a case routed to them.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReviewAction {
    Approve,
    Reject,
    RequestInfo,
}

impl ReviewAction {
    pub fn label(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::RequestInfo => "request_info",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One audit-log line. Entries are only ever appended, never edited.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct HistoryEntry {
    #[n(0)]
    pub date: TimeStamp<Utc>,
    #[n(1)]
    pub action: String,
    #[n(2)]
    pub by: Option<String>,
}

impl HistoryEntry {
    pub fn now(action: impl Into<String>, by: Option<&str>) -> Self {
        Self {
            date: TimeStamp::new(),
            action: action.into(),
            by: by.map(str::to_string),
        }
    }
}

/// A grievance case. Workflow fields (`status`, `assigned_to`, `feedback`,
/// `history`) only change through the named transition methods below, so a
/// record can never hold a status its history does not account for.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct Complaint {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub student_id: String,
    #[n(2)]
    pub details: ComplaintDetails,
    #[n(3)]
    pub date_submitted: TimeStamp<Utc>,
    #[n(4)]
    pub status: Status,
    #[n(5)]
    pub assigned_to: Option<String>,
    #[n(6)]
    pub feedback: String,
    #[n(7)]
    pub history: Vec<HistoryEntry>,
}

impl Complaint {
    /// A freshly filed case: status `Received`, unassigned, with the single
    /// seeded history entry.
    pub fn new(id: u64, student_id: impl Into<String>, details: ComplaintDetails) -> Self {
        let student_id = student_id.into();
        let seed = HistoryEntry::now("Complaint submitted", Some(&student_id));

        Self {
            id,
            student_id,
            details,
            date_submitted: TimeStamp::new(),
            status: Status::Received,
            assigned_to: None,
            feedback: String::new(),
            history: vec![seed],
        }
    }

    fn push_history(&mut self, action: impl Into<String>, by: &str) {
        self.history.push(HistoryEntry::now(action, Some(by)));
    }

    /// Route the case to a lecturer. Permitted while the case is freshly
    /// received or still with a lecturer; re-assignment appends its own
    /// history line. A case in admin verification or a terminal status can
    /// no longer be routed.
    pub fn assign_to(&mut self, lecturer_id: &str, by: &str) -> Result<(), WorkflowError> {
        match self.status {
            Status::Received | Status::SentToLecturer | Status::UnderReview => {}
            from => {
                return Err(WorkflowError::InvalidTransition {
                    from,
                    action: "assign",
                });
            }
        }

        self.status = Status::SentToLecturer;
        self.assigned_to = Some(lecturer_id.to_string());
        self.push_history(format!("Assigned to {lecturer_id}"), by);

        Ok(())
    }

    /// The assigned lecturer's verdict. Approval hands the case to admin
    /// verification, rejection closes it, and an information request parks
    /// it until the student answers. The comment becomes the staff-facing
    /// feedback in every branch.
    pub fn record_response(
        &mut self,
        action: ReviewAction,
        comment: &str,
        by: &str,
    ) -> Result<(), WorkflowError> {
        match self.status {
            Status::SentToLecturer | Status::UnderReview => {}
            from => {
                return Err(WorkflowError::InvalidTransition {
                    from,
                    action: action.label(),
                });
            }
        }
        if self.assigned_to.as_deref() != Some(by) {
            return Err(WorkflowError::NotAssignedLecturer);
        }

        let (next, message) = match action {
            ReviewAction::Approve => (
                Status::AdminVerification,
                format!("Lecturer recommended Approval. Waiting Admin Verification. Comment: {comment}"),
            ),
            ReviewAction::Reject => (
                Status::Rejected,
                format!("Lecturer recommended Rejection. Comment: {comment}"),
            ),
            ReviewAction::RequestInfo => (
                Status::AwaitingStudentResponse,
                format!("Lecturer requested more information from student. Comment: {comment}"),
            ),
        };

        self.status = next;
        self.feedback = comment.to_string();
        self.push_history(message, by);

        Ok(())
    }

    /// The filing student answers an information request, which puts the
    /// case back under review. Only the quoted excerpt of the message lands
    /// in the history.
    pub fn record_student_info(&mut self, message: &str, by: &str) -> Result<(), WorkflowError> {
        if self.status != Status::AwaitingStudentResponse {
            return Err(WorkflowError::InvalidTransition {
                from: self.status,
                action: "supply_info",
            });
        }
        if by != self.student_id {
            return Err(WorkflowError::NotCaseOwner);
        }

        self.status = Status::UnderReview;
        self.push_history(
            format!(
                "Student provided requested information: \"{}\"",
                excerpt(message, EXCERPT_LEN)
            ),
            by,
        );

        Ok(())
    }

    /// Final admin closure. Only a case already through lecturer approval
    /// (`AdminVerification`) can be resolved; in particular an already
    /// resolved case cannot be resolved twice.
    pub fn record_resolution(&mut self, final_message: &str, by: &str) -> Result<(), WorkflowError> {
        if self.status != Status::AdminVerification {
            return Err(WorkflowError::InvalidTransition {
                from: self.status,
                action: "resolve",
            });
        }

        self.status = Status::Resolved;
        self.feedback = final_message.to_string();
        self.push_history("Admin Verified and Resolved. Case Closed.", by);

        Ok(())
    }
}
