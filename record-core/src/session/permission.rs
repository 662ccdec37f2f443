use crate::models::permission::PermissionStatus;
use crate::session::main_context::{Mailbox, Message};
use crate::traits::permission_provider::PermissionProvider;

/// Caches the microphone permission and mediates the consent prompt.
///
/// Only `Undetermined` triggers a prompt. The answer is posted back to the
/// main context and applied by [`PermissionNegotiator::resolve`], so the call
/// that triggered the prompt always returns the value cached before it.
pub struct PermissionNegotiator<P: PermissionProvider> {
    provider: P,
    granted: bool,
    prompt_pending: bool,
}

impl<P: PermissionProvider> PermissionNegotiator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            granted: false,
            prompt_pending: false,
        }
    }

    /// Read the platform status, prompting if it is undetermined, and return
    /// the cached answer.
    pub fn check(&mut self, mailbox: &Mailbox) -> bool {
        match self.provider.status() {
            PermissionStatus::Granted => self.granted = true,
            PermissionStatus::Denied => self.granted = false,
            PermissionStatus::Undetermined if self.prompt_pending => {
                log::debug!("permission prompt already pending");
            }
            PermissionStatus::Undetermined => {
                log::info!("requesting microphone permission");
                self.prompt_pending = true;
                let mailbox = mailbox.clone();
                self.provider.request(Box::new(move |granted| {
                    if mailbox.post(Message::PermissionResolved { granted }).is_err() {
                        log::warn!("permission answer arrived after main context closed");
                    }
                }));
            }
        }
        self.granted
    }

    /// Apply the answer to a prompt. Runs on the main context.
    pub fn resolve(&mut self, granted: bool) {
        log::info!("microphone permission {}", if granted { "granted" } else { "denied" });
        self.prompt_pending = false;
        self.granted = granted;
    }

    pub fn cached(&self) -> bool {
        self.granted
    }

    pub fn is_prompt_pending(&self) -> bool {
        self.prompt_pending
    }
}
