//! Role-tagged user accounts and the session boundary
use super::error::DirectoryError;
use super::utils::normalize_id;
use std::fmt;

/// Assigned when an account is created without an explicit password, and on
/// an admin password reset with no replacement given.
pub const DEFAULT_PASSWORD: &str = "password123";

/// Discriminated role. Each variant carries only its own extra attributes,
/// the shared account fields live on [`User`].
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub enum Role {
    #[n(0)]
    Student {
        #[n(0)]
        department: String,
        #[n(1)]
        level: String,
    },
    #[n(1)]
    Lecturer {
        #[n(0)]
        department: String,
    },
    #[n(2)]
    Admin,
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Student { .. } => RoleKind::Student,
            Role::Lecturer { .. } => RoleKind::Lecturer,
            Role::Admin => RoleKind::Admin,
        }
    }
}

/// Fieldless discriminant, used for filtering and permission checks.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RoleKind {
    Student,
    Lecturer,
    Admin,
}

impl RoleKind {
    pub fn label(&self) -> &'static str {
        match self {
            RoleKind::Student => "student",
            RoleKind::Lecturer => "lecturer",
            RoleKind::Admin => "admin",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored account. Ids are kept in canonical form (see
/// [`normalize_id`]) so lookups match any casing. Accounts are
/// deactivated rather than deleted. Passwords are stored in the clear,
/// as the system this replaces did.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct User {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub password: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub email: String,
    #[n(4)]
    pub phone_number: Option<String>,
    #[n(5)]
    pub is_active: bool,
    #[n(6)]
    pub role: Role,
}

/// Registration input. `password: None` falls back to [`DEFAULT_PASSWORD`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub password: Option<String>,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Fields a user may change on their own profile. `id`, `role` and
/// `is_active` are deliberately absent, they survive any update.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
}

/// Admin account-state actions.
#[derive(Debug, Clone)]
pub enum AccountAction {
    ResetPassword(Option<String>),
    Deactivate,
    Reactivate,
}

impl User {
    pub fn from_new(new: NewUser) -> Self {
        Self {
            id: normalize_id(&new.id),
            password: new.password.unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            name: new.name,
            email: new.email,
            phone_number: new.phone_number,
            is_active: true,
            role: new.role,
        }
    }

    /// Exact password match on an active account. A wrong password reports
    /// `InvalidCredentials` even when the account is also deactivated.
    pub fn check_credentials(&self, password: &str) -> Result<(), DirectoryError> {
        if self.password != password {
            return Err(DirectoryError::InvalidCredentials);
        }
        if !self.is_active {
            return Err(DirectoryError::Deactivated);
        }
        Ok(())
    }

    pub fn apply_update(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(phone_number) = update.phone_number {
            self.phone_number = Some(phone_number);
        }
        if let Some(password) = update.password {
            self.password = password;
        }
    }

    pub fn apply_account_action(&mut self, action: AccountAction) {
        match action {
            AccountAction::ResetPassword(new) => {
                self.password = new.unwrap_or_else(|| DEFAULT_PASSWORD.to_string());
            }
            AccountAction::Deactivate => self.is_active = false,
            AccountAction::Reactivate => self.is_active = true,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.role.kind(),
        }
    }
}

/// The identity a workflow operation runs as.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub kind: RoleKind,
}

/// Holds the current actor between login and logout. One session per
/// signed-in client; the service consumes it for every mutation.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<Actor>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn current(&self) -> Option<&Actor> {
        self.current.as_ref()
    }
    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }
    pub(crate) fn set(&mut self, actor: Actor) {
        self.current = Some(actor);
    }
    pub fn clear(&mut self) {
        self.current = None;
    }
}
