//! Login form state.

use crate::backend::auth::AuthError;

pub const INVALID_CREDENTIALS: &str = "Credenciales incorrectas. Verificá tu email y contraseña.";
pub const MISSING_FIELDS: &str = "Ingresá email y contraseña.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl LoginForm {
    pub fn new(email: Option<&str>) -> Self {
        let email = email.unwrap_or_default().to_string();
        // Straight to the password when the e-mail is known
        let focus = if email.is_empty() {
            LoginField::Email
        } else {
            LoginField::Password
        };
        Self {
            email,
            focus,
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn input(&mut self, c: char) {
        if self.submitting {
            return;
        }
        self.focused_mut().push(c);
    }

    pub fn backspace(&mut self) {
        if self.submitting {
            return;
        }
        self.focused_mut().pop();
    }

    pub fn switch_field(&mut self) {
        self.focus = match self.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    /// Validate locally and mark the form busy. Returns the credentials to
    /// submit, or `None` if the form is incomplete or already submitting.
    pub fn begin_submit(&mut self) -> Option<(String, String)> {
        if self.submitting {
            return None;
        }
        let email = self.email.trim().to_string();
        if email.is_empty() || self.password.is_empty() {
            self.error = Some(MISSING_FIELDS.to_string());
            return None;
        }
        self.error = None;
        self.submitting = true;
        Some((email, self.password.clone()))
    }

    /// Sign-in failed: show the message and let the operator retry.
    pub fn fail(&mut self, message: String) {
        self.submitting = false;
        self.password.clear();
        self.focus = LoginField::Password;
        self.error = Some(message);
    }

    pub fn masked_password(&self) -> String {
        "•".repeat(self.password.chars().count())
    }
}

/// Inline message for a failed sign-in.
pub fn sign_in_error_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => INVALID_CREDENTIALS.to_string(),
        AuthError::Backend(e) => format!("Error de conexión: {}", e),
    }
}
