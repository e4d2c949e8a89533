//! Service layer API for grievance workflow and account operations
use super::complaint::ComplaintDraft;
use super::directory::{
    AccountAction, Actor, NewUser, ProfileUpdate, RoleKind, Session, User,
};
use super::error::{DirectoryError, ValidationError, WorkflowError};
use super::utils::normalize_id;
use super::workflow::{Complaint, ReviewAction, Status};
use anyhow::Context;
use sled::{Db, Tree};
use std::sync::Arc;
use tracing::info;

const COMPLAINTS_TREE: &str = "complaints";
const USERS_TREE: &str = "users";

/// Persistence-backed operation surface. Complaints and users live in two
/// sled trees, every write is a single-record upsert.
pub struct GrievanceService {
    complaints: Tree,
    users: Tree,
}

impl GrievanceService {
    pub fn new(instance: Arc<Db>) -> anyhow::Result<Self> {
        let complaints = instance.open_tree(COMPLAINTS_TREE)?;
        let users = instance.open_tree(USERS_TREE)?;

        Ok(Self { complaints, users })
    }

    // ---- storage helpers ----

    fn load_complaint(&self, id: u64) -> anyhow::Result<Complaint> {
        let bytes = self
            .complaints
            .get(id.to_be_bytes())?
            .ok_or(WorkflowError::CaseNotFound(id))?;

        minicbor::decode(&bytes).context("decoding stored complaint")
    }

    fn save_complaint(&self, complaint: &Complaint) -> anyhow::Result<()> {
        self.complaints
            .insert(complaint.id.to_be_bytes(), minicbor::to_vec(complaint)?)?;
        Ok(())
    }

    // Complaint keys are big-endian u64, so the last key is the highest id.
    fn next_case_id(&self) -> anyhow::Result<u64> {
        match self.complaints.last()? {
            Some((key, _)) => {
                let raw: [u8; 8] = key.as_ref().try_into().context("malformed complaint key")?;
                Ok(u64::from_be_bytes(raw) + 1)
            }
            None => Ok(1),
        }
    }

    fn load_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let key = normalize_id(id);
        match self.users.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(
                minicbor::decode(&bytes).context("decoding stored user")?,
            )),
            None => Ok(None),
        }
    }

    fn save_user(&self, user: &User) -> anyhow::Result<()> {
        self.users
            .insert(user.id.as_bytes(), minicbor::to_vec(user)?)?;
        Ok(())
    }

    // ---- session helpers ----

    fn require_actor<'a>(&self, session: &'a Session) -> Result<&'a Actor, DirectoryError> {
        session.current().ok_or(DirectoryError::NotSignedIn)
    }

    fn require_role<'a>(
        &self,
        session: &'a Session,
        kind: RoleKind,
    ) -> Result<&'a Actor, DirectoryError> {
        let actor = self.require_actor(session)?;
        if actor.kind != kind {
            return Err(DirectoryError::Forbidden(kind.label()));
        }
        Ok(actor)
    }

    // ---- accounts ----

    /// Insert an account with no authenticated session. Intended for
    /// bootstrapping a fresh store: the initial administrator, or fixture
    /// data. Duplicate ids are still rejected.
    pub fn seed_user(&self, new: NewUser) -> anyhow::Result<User> {
        self.insert_user(new)
    }

    /// Open self-registration, students only.
    pub fn register_student(&self, new: NewUser) -> anyhow::Result<User> {
        if new.role.kind() != RoleKind::Student {
            return Err(DirectoryError::SelfRegistrationRestricted.into());
        }
        self.insert_user(new)
    }

    /// Admin-created accounts (lecturers, further admins).
    pub fn register_staff(&self, session: &Session, new: NewUser) -> anyhow::Result<User> {
        self.require_role(session, RoleKind::Admin)?;
        self.insert_user(new)
    }

    fn insert_user(&self, new: NewUser) -> anyhow::Result<User> {
        let user = User::from_new(new);
        if self.users.contains_key(user.id.as_bytes())? {
            return Err(DirectoryError::DuplicateId(user.id).into());
        }

        self.save_user(&user)?;
        info!(id = %user.id, role = %user.role.kind(), "registered user");

        Ok(user)
    }

    /// Case-insensitive id match, exact password match, active accounts
    /// only. On success the session holds the actor until `logout`.
    pub fn login(&self, session: &mut Session, id: &str, password: &str) -> anyhow::Result<Actor> {
        let user = self
            .load_user(id)?
            .ok_or(DirectoryError::InvalidCredentials)?;
        user.check_credentials(password)?;

        let actor = user.actor();
        session.set(actor.clone());
        info!(id = %actor.id, role = %actor.kind, "login");

        Ok(actor)
    }

    pub fn logout(&self, session: &mut Session) {
        if let Some(actor) = session.current() {
            info!(id = %actor.id, "logout");
        }
        session.clear();
    }

    /// Password reset, deactivation and reactivation, admin only.
    /// Deactivating the account behind the acting session signs it out.
    pub fn manage_account(
        &self,
        session: &mut Session,
        user_id: &str,
        action: AccountAction,
    ) -> anyhow::Result<User> {
        self.require_role(session, RoleKind::Admin)?;

        let key = normalize_id(user_id);
        let mut user = self
            .load_user(&key)?
            .ok_or_else(|| DirectoryError::UserNotFound(key))?;
        user.apply_account_action(action);
        self.save_user(&user)?;
        info!(id = %user.id, active = user.is_active, "account state changed");

        if !user.is_active && session.current().is_some_and(|a| a.id == user.id) {
            session.clear();
        }

        Ok(user)
    }

    /// Merge profile fields into the signed-in user's own record. Identity
    /// fields are preserved by [`User::apply_update`].
    pub fn update_profile(
        &self,
        session: &mut Session,
        update: ProfileUpdate,
    ) -> anyhow::Result<User> {
        let actor = self.require_actor(session)?.clone();
        let mut user = self
            .load_user(&actor.id)?
            .ok_or(DirectoryError::UserNotFound(actor.id))?;

        user.apply_update(update);
        self.save_user(&user)?;
        session.set(user.actor());

        Ok(user)
    }

    // ---- workflow ----

    /// File a new complaint for the signed-in student. Allocates the next
    /// case id and persists the record with its seeded history entry.
    pub fn submit_complaint(
        &self,
        session: &Session,
        draft: ComplaintDraft,
    ) -> anyhow::Result<Complaint> {
        let actor = self.require_role(session, RoleKind::Student)?;

        let details = draft.finalise()?;
        let id = self.next_case_id()?;
        let complaint = Complaint::new(id, actor.id.clone(), details);
        self.save_complaint(&complaint)?;
        info!(case = id, student = %complaint.student_id, "complaint submitted");

        Ok(complaint)
    }

    /// Route a case to a lecturer, admin only. The target must be an
    /// active lecturer account; arbitrary ids are not accepted.
    pub fn assign_complaint(
        &self,
        session: &Session,
        complaint_id: u64,
        lecturer_id: &str,
    ) -> anyhow::Result<Complaint> {
        let actor = self.require_role(session, RoleKind::Admin)?;

        let key = normalize_id(lecturer_id);
        let lecturer = self
            .load_user(&key)?
            .ok_or_else(|| WorkflowError::LecturerIneligible(key.clone()))?;
        if lecturer.role.kind() != RoleKind::Lecturer || !lecturer.is_active {
            return Err(WorkflowError::LecturerIneligible(key).into());
        }

        let mut complaint = self.load_complaint(complaint_id)?;
        complaint.assign_to(&lecturer.id, &actor.id)?;
        self.save_complaint(&complaint)?;
        info!(case = complaint_id, lecturer = %lecturer.id, "complaint assigned");

        Ok(complaint)
    }

    /// The signed-in lecturer's verdict on a case routed to them. The
    /// engine checks the assignment, the comment must be non-empty.
    pub fn lecturer_response(
        &self,
        session: &Session,
        complaint_id: u64,
        action: ReviewAction,
        comment: &str,
    ) -> anyhow::Result<Complaint> {
        let actor = self.require_role(session, RoleKind::Lecturer)?;
        if comment.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let mut complaint = self.load_complaint(complaint_id)?;
        complaint.record_response(action, comment, &actor.id)?;
        self.save_complaint(&complaint)?;
        info!(
            case = complaint_id,
            action = %action,
            status = %complaint.status,
            "lecturer responded"
        );

        Ok(complaint)
    }

    /// The signed-in student answers an information request on their own
    /// case, putting it back under review.
    pub fn supply_info(
        &self,
        session: &Session,
        complaint_id: u64,
        message: &str,
    ) -> anyhow::Result<Complaint> {
        let actor = self.require_role(session, RoleKind::Student)?;
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let mut complaint = self.load_complaint(complaint_id)?;
        complaint.record_student_info(message, &actor.id)?;
        self.save_complaint(&complaint)?;
        info!(case = complaint_id, "student supplied information");

        Ok(complaint)
    }

    /// Final admin closure of a case in the verification queue.
    pub fn resolve_complaint(
        &self,
        session: &Session,
        complaint_id: u64,
        final_message: &str,
    ) -> anyhow::Result<Complaint> {
        let actor = self.require_role(session, RoleKind::Admin)?;

        let mut complaint = self.load_complaint(complaint_id)?;
        complaint.record_resolution(final_message, &actor.id)?;
        self.save_complaint(&complaint)?;
        info!(case = complaint_id, "complaint resolved");

        Ok(complaint)
    }

    // ---- read surface ----

    pub fn complaint(&self, id: u64) -> anyhow::Result<Complaint> {
        self.load_complaint(id)
    }

    pub fn all_complaints(&self) -> anyhow::Result<Vec<Complaint>> {
        let mut out = Vec::new();
        for entry in self.complaints.iter() {
            let (_, bytes) = entry?;
            out.push(minicbor::decode(&bytes).context("decoding stored complaint")?);
        }
        Ok(out)
    }

    pub fn complaints_for_student(&self, student_id: &str) -> anyhow::Result<Vec<Complaint>> {
        let key = normalize_id(student_id);
        Ok(self
            .all_complaints()?
            .into_iter()
            .filter(|c| c.student_id == key)
            .collect())
    }

    pub fn complaints_assigned_to(&self, lecturer_id: &str) -> anyhow::Result<Vec<Complaint>> {
        let key = normalize_id(lecturer_id);
        Ok(self
            .all_complaints()?
            .into_iter()
            .filter(|c| c.assigned_to.as_deref() == Some(key.as_str()))
            .collect())
    }

    pub fn complaints_with_status(&self, status: Status) -> anyhow::Result<Vec<Complaint>> {
        Ok(self
            .all_complaints()?
            .into_iter()
            .filter(|c| c.status == status)
            .collect())
    }

    pub fn user(&self, id: &str) -> anyhow::Result<Option<User>> {
        self.load_user(id)
    }

    pub fn users_with_role(&self, kind: RoleKind) -> anyhow::Result<Vec<User>> {
        let mut out = Vec::new();
        for entry in self.users.iter() {
            let (_, bytes) = entry?;
            let user: User = minicbor::decode(&bytes).context("decoding stored user")?;
            if user.role.kind() == kind {
                out.push(user);
            }
        }
        Ok(out)
    }
}
