use crate::error::{AuthError, AuthResult};

/// Signup request.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password: String,
    /// `None` when no phone number was supplied.
    pub phone: Option<String>,
}

impl NewUser {
    /// An empty `phone` is recorded as absent.
    pub fn new(
        email: impl Into<String>,
        full_name: impl Into<String>,
        password: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        let phone = phone.into();
        Self {
            email: email.into(),
            full_name: full_name.into(),
            password: password.into(),
            phone: (!phone.is_empty()).then_some(phone),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        if self.email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if self.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password", &"<redacted>")
            .field("phone", &self.phone)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_phone_is_absent() {
        assert_eq!(NewUser::new("a@b.com", "A", "p", "").phone, None);
        assert_eq!(NewUser::new("a@b.com", "A", "p", "111").phone.as_deref(), Some("111"));
    }

    #[test]
    fn required_fields() {
        assert!(NewUser::new("a@b.com", "", "p", "").validate().is_ok());
        assert!(matches!(
            NewUser::new("", "A", "p", "").validate(),
            Err(AuthError::MissingField("email"))
        ));
        assert!(matches!(
            NewUser::new("a@b.com", "A", "", "").validate(),
            Err(AuthError::MissingField("password"))
        ));
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", NewUser::new("a@b.com", "A", "hunter2", ""));
        assert!(!rendered.contains("hunter2"));
    }
}
