use serde::{Deserialize, Serialize};

use crate::rocketreach::Profile;

/// Slash command webhook payload. Slack sends more fields; only these are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandRequest {
    /// Raw command as typed, e.g. `/linkedin`.
    pub command: String,
    pub text: String,
    /// Verification token shared between Slack and the app.
    pub token: String,
}

/// Every slash command the app answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Rocket,
    Linkedin,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::Rocket, Command::Linkedin];

    pub fn name(self) -> &'static str {
        match self {
            Command::Rocket => "rocket",
            Command::Linkedin => "linkedin",
        }
    }

    /// Resolves a command name without the leading slash.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }
}

/// Message posted back to the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl CommandReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn no_profile() -> Self {
        Self::text("No Profile on `RocketReach`")
    }

    pub fn profile(profile: &Profile) -> Self {
        let name = profile.name.as_deref().unwrap_or_default();

        Self {
            text: format!("This is the profile of `{name}`"),
            attachments: vec![Attachment::profile(profile)],
        }
    }
}

/// Legacy message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    pub fields: Vec<AttachmentField>,
}

impl Attachment {
    pub const PROFILE_COLOR: &'static str = "#aaefab";

    fn profile(profile: &Profile) -> Self {
        let link_or = |network: &str, missing: &str| {
            profile.link(network).unwrap_or(missing).to_owned()
        };

        Self {
            color: Self::PROFILE_COLOR.to_owned(),
            title: profile.name.clone().unwrap_or_default(),
            title_link: profile.link("linkedin").map(ToOwned::to_owned),
            thumb_url: profile.profile_pic.clone(),
            fields: vec![
                AttachmentField::new(
                    "Current Work Email",
                    profile.current_work_email.clone().unwrap_or_default(),
                ),
                AttachmentField::new(
                    "Facebook Profile",
                    link_or("facebook", "No Facebook Account"),
                ),
                AttachmentField::new("Twitter Profile", link_or("twitter", "No Twitter Account")),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl AttachmentField {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: false,
        }
    }
}
