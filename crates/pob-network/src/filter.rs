//! Subscription filters

use crate::types::{Message, ReqType};

/// Decides which messages a subscription receives.
///
/// Member lists match the sender. With neither list set every sender
/// passes; an allow list admits only its members and takes precedence over
/// a deny list; a deny list alone admits everyone else. Accept and reject
/// type lists work the same way on [`ReqType`]. A message must pass both.
///
/// A list set to empty is still present: `allow_members([])` admits nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    allow: Option<Vec<String>>,
    deny: Option<Vec<String>>,
    accept: Option<Vec<ReqType>>,
    reject: Option<Vec<ReqType>>,
}

impl Filter {
    /// Filter passing everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Admit only these senders
    pub fn allow_members<S: Into<String>>(mut self, members: impl IntoIterator<Item = S>) -> Self {
        self.allow = Some(members.into_iter().map(Into::into).collect());
        self
    }

    /// Refuse these senders
    pub fn deny_members<S: Into<String>>(mut self, members: impl IntoIterator<Item = S>) -> Self {
        self.deny = Some(members.into_iter().map(Into::into).collect());
        self
    }

    /// Admit only these request types
    pub fn accept_types(mut self, types: impl IntoIterator<Item = ReqType>) -> Self {
        self.accept = Some(types.into_iter().collect());
        self
    }

    /// Refuse these request types
    pub fn reject_types(mut self, types: impl IntoIterator<Item = ReqType>) -> Self {
        self.reject = Some(types.into_iter().collect());
        self
    }

    /// Whether `msg` passes
    pub fn check(&self, msg: &Message) -> bool {
        let member = match (&self.allow, &self.deny) {
            (Some(allow), _) => allow.iter().any(|m| *m == msg.from),
            (None, Some(deny)) => !deny.iter().any(|m| *m == msg.from),
            (None, None) => true,
        };
        let kind = match (&self.accept, &self.reject) {
            (Some(accept), _) => accept.contains(&msg.req_type),
            (None, Some(reject)) => !reject.contains(&msg.req_type),
            (None, None) => true,
        };
        member && kind
    }
}
