//! Event-type classification.
//!
//! The group numbers and labels are consumed verbatim by the D3 frontend,
//! which assigns one colour per group. Changing them breaks existing
//! visualizations.

use serde::{Deserialize, Serialize};

/// The kind of an upstream event, as far as the graph cares.
///
/// Classification is total: any type string that is not one of the known
/// GitHub event types maps to [`EventKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    CommitComment,
    Create,
    Delete,
    Fork,
    Gollum,
    IssueComment,
    Issues,
    Member,
    Public,
    PullRequest,
    PullRequestReviewComment,
    Push,
    Release,
    Watch,
    Unknown,
}

impl EventKind {
    /// Every known kind, in group order. `Unknown` is not included.
    pub const KNOWN: [EventKind; 14] = [
        Self::CommitComment,
        Self::Create,
        Self::Delete,
        Self::Fork,
        Self::Gollum,
        Self::IssueComment,
        Self::Issues,
        Self::Member,
        Self::Public,
        Self::PullRequest,
        Self::PullRequestReviewComment,
        Self::Push,
        Self::Release,
        Self::Watch,
    ];

    /// Maps an upstream `type` string to its kind.
    pub fn classify(event_type: &str) -> Self {
        match event_type {
            "CommitCommentEvent" => Self::CommitComment,
            "CreateEvent" => Self::Create,
            "DeleteEvent" => Self::Delete,
            "ForkEvent" => Self::Fork,
            "GollumEvent" => Self::Gollum,
            "IssueCommentEvent" => Self::IssueComment,
            "IssuesEvent" => Self::Issues,
            "MemberEvent" => Self::Member,
            "PublicEvent" => Self::Public,
            "PullRequestEvent" => Self::PullRequest,
            "PullRequestReviewCommentEvent" => Self::PullRequestReviewComment,
            "PushEvent" => Self::Push,
            "ReleaseEvent" => Self::Release,
            "WatchEvent" => Self::Watch,
            _ => Self::Unknown,
        }
    }

    /// The upstream type string for this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CommitComment => "CommitCommentEvent",
            Self::Create => "CreateEvent",
            Self::Delete => "DeleteEvent",
            Self::Fork => "ForkEvent",
            Self::Gollum => "GollumEvent",
            Self::IssueComment => "IssueCommentEvent",
            Self::Issues => "IssuesEvent",
            Self::Member => "MemberEvent",
            Self::Public => "PublicEvent",
            Self::PullRequest => "PullRequestEvent",
            Self::PullRequestReviewComment => "PullRequestReviewCommentEvent",
            Self::Push => "PushEvent",
            Self::Release => "ReleaseEvent",
            Self::Watch => "WatchEvent",
            Self::Unknown => "",
        }
    }

    /// Group number used for node colouring. Repositories use group 0.
    pub fn group(&self) -> u32 {
        match self {
            Self::CommitComment => 1,
            Self::Create => 2,
            Self::Delete => 3,
            Self::Fork => 4,
            Self::Gollum => 5,
            Self::IssueComment => 6,
            Self::Issues => 7,
            Self::Member => 8,
            Self::Public => 9,
            Self::PullRequest => 10,
            Self::PullRequestReviewComment => 11,
            Self::Push => 12,
            Self::Release => 13,
            Self::Watch => 14,
            Self::Unknown => 99,
        }
    }

    /// Human readable label shown as the node title.
    pub fn label(&self) -> &'static str {
        match self {
            // Attached to the repository node; the commit itself is not a node.
            Self::CommitComment => "Comment to commit",
            Self::Create => "New repo created",
            Self::Delete => "Something has been deleted",
            Self::Fork => "Repo has been forked",
            Self::Gollum => "Wiki page edited",
            Self::IssueComment => "Issue has been commented",
            Self::Issues => "An issue has changed",
            Self::Member => "New collaborator added",
            Self::Public => "Repo made public!",
            Self::PullRequest => "New pull request",
            Self::PullRequestReviewComment => "PR's code has been commented",
            Self::Push => "New commit pushed",
            Self::Release => "New release created",
            Self::Watch => "Repo has been starred",
            Self::Unknown => "Unknown event",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
