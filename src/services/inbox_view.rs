//! Inbox view state machine.
//!
//! Transitions are pure: they take the current view, an event and the
//! snapshot the event was raised against, and return the next view together
//! with the side effects the engine must run. Nothing here talks to the
//! network.
//!
//! ```text
//! Closed --Open--> List(Unread) --SwitchTab--> List(t)
//!   ^                  |  ^
//!   |               Select  Back (tab resets to Unread)
//!   |                  v  |
//!   +------Close------ Detail(m)
//! ```

use crate::models::notification::{NotificationId, NotificationMessage};
use crate::models::snapshot::{InboxSnapshot, InboxTab};
use serde::Serialize;

/// Which inbox screen is showing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum InboxView {
    #[default]
    Closed,
    List {
        tab: InboxTab,
    },
    Detail {
        message: NotificationMessage,
    },
}

/// User-driven inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Open,
    SwitchTab(InboxTab),
    Select(NotificationMessage),
    Back,
    Close,
    /// Jump straight to the detail screen (popup "view detail").
    OpenDetail(NotificationMessage),
    /// Billing action from the detail screen.
    Charge,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    MarkRead(Vec<NotificationId>),
    DismissPopup,
    LaunchBilling,
}

/// Result of applying an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub view: InboxView,
    pub effects: Vec<ViewEffect>,
    /// False when the event did not apply to the current view.
    pub accepted: bool,
}

impl Transition {
    fn to(view: InboxView, effects: Vec<ViewEffect>) -> Self {
        Self {
            view,
            effects,
            accepted: true,
        }
    }

    fn ignored(view: InboxView) -> Self {
        Self {
            view,
            effects: Vec::new(),
            accepted: false,
        }
    }
}

impl InboxView {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Active tab while listing.
    pub fn tab(&self) -> Option<InboxTab> {
        match self {
            Self::List { tab } => Some(*tab),
            _ => None,
        }
    }

    /// Message shown in the detail screen.
    pub fn detail(&self) -> Option<&NotificationMessage> {
        match self {
            Self::Detail { message } => Some(message),
            _ => None,
        }
    }

    /// Apply `event`. Events that make no sense for the current view leave it
    /// unchanged and produce no effects.
    pub fn transition(self, event: ViewEvent, snapshot: &InboxSnapshot) -> Transition {
        match (self, event) {
            (Self::Closed, ViewEvent::Open) => Transition::to(
                Self::List {
                    tab: InboxTab::Unread,
                },
                vec![ViewEffect::DismissPopup],
            ),
            (Self::List { .. }, ViewEvent::SwitchTab(tab)) => {
                Transition::to(Self::List { tab }, Vec::new())
            }
            (Self::List { .. }, ViewEvent::Select(message)) => {
                let effects = if snapshot.is_unread(&message.id) {
                    vec![ViewEffect::MarkRead(vec![message.id.clone()])]
                } else {
                    Vec::new()
                };
                Transition::to(Self::Detail { message }, effects)
            }
            (Self::Detail { .. }, ViewEvent::Back) => Transition::to(
                Self::List {
                    tab: InboxTab::Unread,
                },
                Vec::new(),
            ),
            (_, ViewEvent::Close) => Transition::to(Self::Closed, Vec::new()),
            (_, ViewEvent::OpenDetail(message)) => {
                Transition::to(Self::Detail { message }, vec![ViewEffect::DismissPopup])
            }
            (Self::Detail { message }, ViewEvent::Charge) if message.is_billing() => {
                Transition::to(Self::Closed, vec![ViewEffect::LaunchBilling])
            }
            (view, event) => {
                log::debug!("[inbox] Ignoring {:?} in {:?}", event, view);
                Transition::ignored(view)
            }
        }
    }
}
