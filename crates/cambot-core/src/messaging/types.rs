/// Outgoing "chat action" shown while slower work happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
}

/// Transport-opaque options attached to an outgoing reply. The core only
/// decides *that* the command keyboard should be shown; rendering it is the
/// adapter's business.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplyOptions {
    pub command_keyboard: bool,
}

impl ReplyOptions {
    pub fn with_command_keyboard() -> Self {
        Self {
            command_keyboard: true,
        }
    }
}

/// Transport-assigned reference to a delivered photo, reusable in later
/// lookups without recapturing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoRef {
    pub file_id: String,
}
