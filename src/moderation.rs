use crate::credential::CredentialCodec;
use crate::models::{Reply, Thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied,
}

impl Authorization {
    pub fn is_granted(self) -> bool {
        matches!(self, Authorization::Granted)
    }
}

/// Decides whether a supplied delete password may remove a post.
///
/// Threads and replies carry independent credentials: a reply is only ever
/// checked against its own hash, never its parent thread's.
#[derive(Clone, Debug, Default)]
pub struct Moderator {
    codec: CredentialCodec,
}

impl Moderator {
    pub fn new(codec: CredentialCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    pub fn authorize_thread_delete(&self, thread: &Thread, password: &str) -> Authorization {
        self.check(password, &thread.delete_password_hash)
    }

    pub fn authorize_reply_delete(&self, reply: &Reply, password: &str) -> Authorization {
        self.check(password, &reply.delete_password_hash)
    }

    fn check(&self, password: &str, hash: &str) -> Authorization {
        if self.codec.verify(password, hash) {
            Authorization::Granted
        } else {
            Authorization::Denied
        }
    }
}
