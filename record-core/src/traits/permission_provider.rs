use crate::models::permission::PermissionStatus;

/// Completion invoked with the user's answer to a permission prompt.
pub type PermissionCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// Platform microphone-consent API.
pub trait PermissionProvider: Send {
    /// Current permission without prompting.
    fn status(&self) -> PermissionStatus;

    /// Show the consent prompt. `completion` may run on any thread, at any
    /// later time.
    fn request(&mut self, completion: PermissionCompletion);
}
