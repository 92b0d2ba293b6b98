//! Side-effect descriptions returned by reducers and services.
//!
//! Reducers never talk to the outside world. They return [`Effect`] values which the
//! [`crate::runtime::EffectRunner`] executes after the state change has been stored.

use crate::notify::OutgoingEmail;

/// Something to do once a state change is durable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing
    None,

    /// Deliver an e-mail
    Notify(OutgoingEmail),

    /// Independent effects, run concurrently
    Parallel(Vec<Effect>),
}

impl Effect {
    /// One notify effect per message, run in parallel.
    #[must_use]
    pub fn notify_all(emails: Vec<OutgoingEmail>) -> Self {
        match emails.len() {
            0 => Self::None,
            _ => Self::Parallel(emails.into_iter().map(Self::Notify).collect()),
        }
    }

    /// `true` if running this effect does nothing.
    #[must_use]
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Notify(_) => false,
            Self::Parallel(effects) => effects.iter().all(Self::is_none),
        }
    }

    /// The e-mails this effect would send, in order.
    #[must_use]
    pub fn emails(&self) -> Vec<&OutgoingEmail> {
        match self {
            Self::Notify(email) => vec![email],
            Self::Parallel(effects) => effects.iter().flat_map(Self::emails).collect(),
            Self::None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Recipient;

    fn email(subject: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: Recipient::Staff,
            subject: subject.to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn notify_all_of_nothing_is_none() {
        assert_eq!(Effect::notify_all(Vec::new()), Effect::None);
        assert!(Effect::Parallel(vec![Effect::None]).is_none());
    }

    #[test]
    fn emails_are_flattened_in_order() {
        let effect = Effect::Parallel(vec![
            Effect::Notify(email("a")),
            Effect::None,
            Effect::notify_all(vec![email("b"), email("c")]),
        ]);
        let subjects: Vec<&str> = effect.emails().iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, ["a", "b", "c"]);
        assert!(!effect.is_none());
    }
}
